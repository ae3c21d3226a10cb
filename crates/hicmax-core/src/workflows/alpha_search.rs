use crate::core::metrics::MetricsSummary;
use crate::core::models::observation::RawObservation;
use crate::engine::config::{AlphaSweep, ReconstructionConfig};
use crate::engine::error::EngineError;
use crate::engine::preprocess;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::workflows::reconstruct::generate_structure;
use rand::Rng;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub alpha: f64,
    /// Averages over the trial structures generated for this exponent.
    pub summary: MetricsSummary,
}

impl CandidateScore {
    /// Mean Spearman correlation of IF against reconstructed distance; lower is better.
    pub fn score(&self) -> Option<f64> {
        self.summary.spearman_if_vs_distance
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlphaSearchResult {
    pub candidates: Vec<CandidateScore>,
    pub best_alpha: f64,
    pub best_score: f64,
}

/// Generates a few trial structures per candidate exponent and returns the
/// exponent whose structures anti-correlate frequency and distance the most.
#[instrument(skip_all, name = "alpha_search_workflow")]
pub fn run<R: Rng + ?Sized>(
    observations: &[RawObservation],
    config: &ReconstructionConfig,
    sweep: &AlphaSweep,
    rng: &mut R,
    reporter: &ProgressReporter,
) -> Result<AlphaSearchResult, EngineError> {
    let alphas = sweep.candidates();
    reporter.report(Progress::PhaseStart {
        name: "Searching Conversion Exponent",
    });
    info!(
        candidates = alphas.len(),
        trials = sweep.trials_per_candidate,
        "Sweeping conversion exponents."
    );
    reporter.report(Progress::TaskStart {
        total_steps: alphas.len() as u64,
    });

    let mut candidates = Vec::with_capacity(alphas.len());
    for alpha in alphas {
        let model = preprocess::run(observations, &config.model, alpha)?;
        let trials = (0..sweep.trials_per_candidate)
            .map(|index| generate_structure(&model, config, index, &mut *rng, reporter))
            .collect::<Result<Vec<_>, _>>()?;
        let summary = MetricsSummary::average(trials.iter().map(|t| &t.metrics));
        let candidate = CandidateScore { alpha, summary };
        match candidate.score() {
            Some(score) => info!(alpha, score, rmse = summary.rmse, "Candidate scored."),
            None => warn!(alpha, "Candidate has no defined correlation; skipped."),
        }
        candidates.push(candidate);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let (best_alpha, best_score) = pick_best(&candidates).ok_or_else(|| {
        EngineError::Configuration(
            "no conversion exponent produced a defined correlation score".to_string(),
        )
    })?;
    info!(best_alpha, best_score, "Best conversion exponent selected.");
    reporter.report(Progress::Message(format!(
        "Best conversion exponent: {:.2}",
        best_alpha
    )));
    reporter.report(Progress::PhaseFinish);

    Ok(AlphaSearchResult {
        candidates,
        best_alpha,
        best_score,
    })
}

/// Lowest defined score; the earliest candidate wins ties.
fn pick_best(candidates: &[CandidateScore]) -> Option<(f64, f64)> {
    candidates
        .iter()
        .filter_map(|c| c.score().map(|s| (c.alpha, s)))
        .fold(None, |best, (alpha, score)| match best {
            Some((_, best_score)) if best_score <= score => best,
            _ => Some((alpha, score)),
        })
}
