use crate::core::metrics::{MetricsSummary, StructureMetrics};
use crate::core::models::observation::RawObservation;
use crate::core::models::structure::Structure;
use crate::engine::config::{ConversionMode, ReconstructionConfig};
use crate::engine::error::EngineError;
use crate::engine::objective::LikelihoodObjective;
use crate::engine::optimizer::{AscentOutcome, GradientAscent};
use crate::engine::preprocess::{self, ContactModel};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::workflows::alpha_search::{self, AlphaSearchResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct GeneratedStructure {
    /// Zero-based position in the generation order.
    pub index: usize,
    pub structure: Structure,
    pub outcome: AscentOutcome,
    pub metrics: StructureMetrics,
}

#[derive(Debug, Clone)]
pub struct ReconstructionResult {
    pub model: ContactModel,
    pub structures: Vec<GeneratedStructure>,
    pub summary: MetricsSummary,
    /// Present when the conversion exponent was searched rather than given.
    pub alpha_search: Option<AlphaSearchResult>,
}

impl ReconstructionResult {
    pub fn alpha(&self) -> f64 {
        self.model.alpha
    }
}

pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn run(
    observations: &[RawObservation],
    config: &ReconstructionConfig,
    reporter: &ProgressReporter,
) -> Result<ReconstructionResult, EngineError> {
    run_with_sink(observations, config, reporter, |_, _| Ok::<(), EngineError>(()))
}

/// Like [`run`], but hands every structure to `sink` as soon as it is
/// optimized. Structures already accepted by the sink are unaffected when a
/// later structure fails; the first error from generation or from the sink
/// ends the run.
#[instrument(skip_all, name = "reconstruction_workflow")]
pub fn run_with_sink<F, E>(
    observations: &[RawObservation],
    config: &ReconstructionConfig,
    reporter: &ProgressReporter,
    mut sink: F,
) -> Result<ReconstructionResult, E>
where
    F: FnMut(&ContactModel, &GeneratedStructure) -> Result<(), E>,
    E: From<EngineError>,
{
    config.validate().map_err(EngineError::from)?;
    let mut rng = make_rng(config.seed);

    // === Phase 1: Conversion exponent ===
    let (alpha, alpha_search) = match &config.conversion {
        ConversionMode::Fixed(alpha) => (*alpha, None),
        ConversionMode::Search(sweep) => {
            let search = alpha_search::run(observations, config, sweep, &mut rng, reporter)?;
            (search.best_alpha, Some(search))
        }
    };

    // === Phase 2: Preprocessing ===
    reporter.report(Progress::PhaseStart {
        name: "Preprocessing",
    });
    let model = preprocess::run(observations, &config.model, alpha)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Structure generation ===
    reporter.report(Progress::PhaseStart {
        name: "Generating Structures",
    });
    info!(
        alpha,
        structures = config.num_structures,
        loci = model.num_loci(),
        constraints = model.constraints.len(),
        "Generating structures."
    );
    reporter.report(Progress::TaskStart {
        total_steps: config.num_structures as u64,
    });
    let mut structures = Vec::with_capacity(config.num_structures);
    for index in 0..config.num_structures {
        let generated = generate_structure(&model, config, index, &mut rng, reporter)?;
        sink(&model, &generated)?;
        structures.push(generated);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let summary = MetricsSummary::average(structures.iter().map(|s| &s.metrics));
    info!(
        rmse = summary.rmse,
        spearman_if_vs_distance = ?summary.spearman_if_vs_distance,
        "Reconstruction complete."
    );

    Ok(ReconstructionResult {
        model,
        structures,
        summary,
        alpha_search,
    })
}

/// Optimizes one randomly initialized structure against `model`.
pub(crate) fn generate_structure<R: Rng + ?Sized>(
    model: &ContactModel,
    config: &ReconstructionConfig,
    index: usize,
    rng: &mut R,
    reporter: &ProgressReporter,
) -> Result<GeneratedStructure, EngineError> {
    let objective = LikelihoodObjective::new(model, &config.parallel);
    let optimizer = GradientAscent::new(&config.optimization);

    let mut structure = Structure::random(model.num_loci(), rng);
    let outcome = optimizer.run(&objective, structure.coords_mut(), reporter)?;
    structure.center();

    let metrics = StructureMetrics::compute(structure.coords(), &model.constraints);
    info!(
        index,
        cost = outcome.cost,
        iterations = outcome.iterations,
        stop = ?outcome.stop_reason,
        rmse = metrics.rmse,
        "Structure generated."
    );
    Ok(GeneratedStructure {
        index,
        structure,
        outcome,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{
        AlphaSweep, ConvergenceConfig, CostAggregation, ReconstructionConfigBuilder,
    };

    fn helix_observations(n: u64) -> Vec<RawObservation> {
        let mut observations = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let d = (j - i) as f64;
                observations.push(RawObservation::new(i * 1000, j * 1000, 100.0 / d.powi(2)));
            }
        }
        observations
    }

    fn small_config(conversion: ConversionMode) -> ReconstructionConfig {
        ReconstructionConfigBuilder::new()
            .if_threshold(0.0)
            .avg_distance(10.0)
            .conversion(conversion)
            .learning_rate(1.0)
            .max_iterations(60)
            .convergence(ConvergenceConfig {
                cost_threshold: 1e-6,
                patience_iterations: 5,
            })
            .num_workers(2)
            .cost_aggregation(CostAggregation::PerWorker)
            .num_structures(2)
            .seed(Some(7))
            .build()
            .unwrap()
    }

    #[test]
    fn fixed_exponent_run_generates_requested_structures() {
        let observations = helix_observations(8);
        let config = small_config(ConversionMode::Fixed(1.0));
        let result = run(&observations, &config, &ProgressReporter::new()).unwrap();

        assert_eq!(result.alpha(), 1.0);
        assert!(result.alpha_search.is_none());
        assert_eq!(result.structures.len(), 2);
        assert_eq!(result.summary.count, 2);
        for generated in &result.structures {
            assert_eq!(generated.structure.num_points(), 8);
            assert!(generated.outcome.iterations > 0);
            assert!(generated.structure.coords().iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn optimization_recovers_distance_ordering() {
        let observations = helix_observations(6);
        let mut config = small_config(ConversionMode::Fixed(1.0));
        config.optimization.max_iterations = 400;
        config.num_structures = 1;
        let result = run(&observations, &config, &ProgressReporter::new()).unwrap();
        let rho = result.structures[0]
            .metrics
            .spearman_if_vs_distance
            .unwrap();
        assert!(rho < -0.5, "rho = {}", rho);
    }

    #[test]
    fn same_seed_reproduces_structures() {
        let observations = helix_observations(6);
        let config = small_config(ConversionMode::Fixed(0.8));
        let a = run(&observations, &config, &ProgressReporter::new()).unwrap();
        let b = run(&observations, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(
            a.structures[1].structure.coords(),
            b.structures[1].structure.coords()
        );
    }

    #[test]
    fn search_mode_records_the_sweep() {
        let observations = helix_observations(6);
        let sweep = AlphaSweep {
            start: 0.5,
            end: 1.0,
            step: 0.5,
            trials_per_candidate: 1,
        };
        let config = small_config(ConversionMode::Search(sweep));
        let result = run(&observations, &config, &ProgressReporter::new()).unwrap();
        let search = result.alpha_search.as_ref().unwrap();
        assert_eq!(search.candidates.len(), 2);
        assert_eq!(result.alpha(), search.best_alpha);
    }

    #[test]
    fn sink_sees_each_structure_before_the_next_is_generated() {
        let observations = helix_observations(6);
        let config = small_config(ConversionMode::Fixed(1.0));
        let mut seen = Vec::new();
        let result = run_with_sink(&observations, &config, &ProgressReporter::new(), |model, generated| {
            assert_eq!(model.num_loci(), 6);
            seen.push((generated.index, generated.structure.coords().to_vec()));
            Ok::<(), EngineError>(())
        })
        .unwrap();

        assert_eq!(seen.len(), 2);
        for ((index, coords), generated) in seen.iter().zip(&result.structures) {
            assert_eq!(*index, generated.index);
            assert_eq!(coords.as_slice(), generated.structure.coords());
        }
    }

    #[test]
    fn failure_on_a_later_structure_keeps_earlier_ones_delivered() {
        let observations = helix_observations(6);
        let mut config = small_config(ConversionMode::Fixed(1.0));
        config.num_structures = 3;
        let mut delivered = Vec::new();
        let err = run_with_sink(&observations, &config, &ProgressReporter::new(), |_, generated| {
            if generated.index == 1 {
                return Err(EngineError::NumericDegeneracy {
                    context: "test",
                    reason: "second structure rejected".to_string(),
                });
            }
            delivered.push(generated.index);
            Ok(())
        })
        .unwrap_err();

        assert!(matches!(err, EngineError::NumericDegeneracy { .. }));
        assert_eq!(delivered, vec![0]);
    }

    #[test]
    fn preprocessing_failure_aborts_before_generation() {
        let observations = vec![RawObservation::new(0, 2, 1.0), RawObservation::new(1, 3, 1.0)];
        let config = small_config(ConversionMode::Fixed(1.0));
        let err = run(&observations, &config, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
