use crate::core::models::chromosome::ChromosomePartition;
use crate::core::models::constraint::{ConstraintSet, ConstraintSetBuilder, RawConstraint};
use crate::core::models::locus::LocusIndex;
use crate::core::models::observation::RawObservation;
use crate::engine::config::ModelConfig;
use crate::engine::error::EngineError;
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

/// Scale factors computed while normalizing; logged and written to run logs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationStats {
    /// Mean raw frequency; every frequency is divided by it.
    pub avg_if: f64,
    /// Sum of normalized frequencies before adjacency completion.
    pub total_if: f64,
    /// Largest normalized frequency before adjacency completion.
    pub max_if_raw: f64,
    /// Mean normalized frequency over same-chromosome adjacent pairs.
    pub avg_adj_if: f64,
    /// Adjacency floor, `min(avg_adj_if, max_if_raw)`.
    pub max_if: f64,
    /// Mean of `IF^-alpha`, the unscaled distance.
    pub avg_dist: f64,
    /// Largest target distance after scaling.
    pub max_target_distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdjacencyReport {
    /// Adjacent pairs that had no constraint and received one at the floor.
    pub synthesized: usize,
    /// Adjacent pairs whose frequency was raised to the floor.
    pub replaced: usize,
}

impl AdjacencyReport {
    pub fn is_noop(&self) -> bool {
        self.synthesized == 0 && self.replaced == 0
    }
}

/// Everything the objective engine and the output side need from the input.
#[derive(Debug, Clone)]
pub struct ContactModel {
    pub loci: LocusIndex,
    pub chromosomes: ChromosomePartition,
    pub constraints: ConstraintSet,
    pub stats: NormalizationStats,
    pub adjacency: AdjacencyReport,
    pub alpha: f64,
}

impl ContactModel {
    pub fn num_loci(&self) -> usize {
        self.loci.len()
    }
}

/// Turns raw observations into the frozen constraint model for exponent `alpha`.
#[instrument(skip_all, name = "preprocess_task")]
pub fn run(
    observations: &[RawObservation],
    config: &ModelConfig,
    alpha: f64,
) -> Result<ContactModel, EngineError> {
    if !(alpha.is_finite() && alpha > 0.0) {
        return Err(EngineError::Configuration(format!(
            "conversion exponent must be a positive number, got {}",
            alpha
        )));
    }
    if !(config.avg_distance.is_finite() && config.avg_distance > 0.0) {
        return Err(EngineError::Configuration(format!(
            "average distance must be a positive number, got {}",
            config.avg_distance
        )));
    }

    let merged = merge_observations(observations, config.if_threshold);
    if merged.is_empty() {
        return Err(EngineError::Configuration(format!(
            "no observations remain above the IF threshold {}",
            config.if_threshold
        )));
    }

    let loci = LocusIndex::from_positions(merged.iter().flat_map(|&((a, b), _)| [a, b]));
    let chromosomes = build_partition(config.chromosome_lengths.as_deref(), loci.len())?;
    info!(
        observations = observations.len(),
        constraints = merged.len(),
        loci = loci.len(),
        chromosomes = chromosomes.num_chromosomes(),
        "Built locus index."
    );

    let mut builder = ConstraintSetBuilder::with_capacity(merged.len() + loci.len());
    builder.extend(merged.iter().filter_map(|&((a, b), frequency)| {
        Some(RawConstraint::new(
            loci.index_of(a)?,
            loci.index_of(b)?,
            frequency,
        ))
    }));

    let avg_if = normalize(&mut builder);
    let total_if: f64 = builder.iter().map(|c| c.frequency).sum();
    let max_if_raw = builder
        .iter()
        .map(|c| c.frequency)
        .fold(f64::NEG_INFINITY, f64::max);

    let (adj_sum, adj_count) = builder
        .iter()
        .filter(|c| chromosomes.is_adjacent(c.pos1(), c.pos2()))
        .fold((0.0, 0usize), |(sum, count), c| (sum + c.frequency, count + 1));
    if adj_count == 0 {
        return Err(EngineError::Configuration(
            "no observed contacts between adjacent loci on the same chromosome".to_string(),
        ));
    }
    let avg_adj_if = adj_sum / adj_count as f64;
    let max_if = avg_adj_if.min(max_if_raw);

    let avg_dist =
        builder.iter().map(|c| c.frequency.powf(-alpha)).sum::<f64>() / builder.len() as f64;

    builder.sort();
    let adjacency = complete_adjacency(&mut builder, &chromosomes, max_if);

    let constraints = builder
        .freeze(|c| config.avg_distance / (c.frequency.powf(alpha) * avg_dist));

    let max_target_distance = constraints
        .iter()
        .map(|c| c.target_distance())
        .fold(0.0, f64::max);
    if !max_target_distance.is_finite() {
        return Err(EngineError::NumericDegeneracy {
            context: "preprocessing",
            reason: "target distances are not finite".to_string(),
        });
    }

    let stats = NormalizationStats {
        avg_if,
        total_if,
        max_if_raw,
        avg_adj_if,
        max_if,
        avg_dist,
        max_target_distance,
    };
    info!(
        avg_if,
        total_if,
        max_if,
        avg_adj_if,
        avg_dist,
        max_target_distance,
        synthesized = adjacency.synthesized,
        replaced = adjacency.replaced,
        constraints = constraints.len(),
        "Preprocessing complete."
    );

    Ok(ContactModel {
        loci,
        chromosomes,
        constraints,
        stats,
        adjacency,
        alpha,
    })
}

/// Drops unusable observations and averages repeated pairs. Returns
/// `((low, high), frequency)` sorted by pair.
fn merge_observations(observations: &[RawObservation], threshold: f64) -> Vec<((u64, u64), f64)> {
    let mut kept: Vec<((u64, u64), f64)> = observations
        .iter()
        .filter(|o| {
            !o.is_self_contact()
                && o.frequency.is_finite()
                && o.frequency > threshold
                && o.frequency > 0.0
        })
        .map(|o| (o.canonical_pair(), o.frequency))
        .collect();
    let dropped = observations.len() - kept.len();
    if dropped > 0 {
        debug!(dropped, threshold, "Discarded observations.");
    }

    kept.sort_by_key(|&(pair, _)| pair);
    let merged: Vec<_> = kept
        .into_iter()
        .chunk_by(|&(pair, _)| pair)
        .into_iter()
        .map(|(pair, group)| {
            let (sum, count) = group.fold((0.0, 0usize), |(s, n), (_, f)| (s + f, n + 1));
            (pair, sum / count as f64)
        })
        .collect();
    merged
}

fn build_partition(
    lengths: Option<&[usize]>,
    num_loci: usize,
) -> Result<ChromosomePartition, EngineError> {
    let Some(lengths) = lengths else {
        return Ok(ChromosomePartition::single(num_loci));
    };
    let partition = ChromosomePartition::from_lengths(lengths, num_loci)
        .map_err(|e| EngineError::Configuration(e.to_string()))?;
    let covered: usize = lengths.iter().sum();
    if covered > num_loci {
        warn!(
            covered,
            loci = num_loci,
            "Chromosome lengths cover more loci than observed; trailing entries map nothing."
        );
    }
    Ok(partition)
}

/// Divides every frequency by the mean frequency and returns that mean.
fn normalize(builder: &mut ConstraintSetBuilder) -> f64 {
    let avg_if = builder.iter().map(|c| c.frequency).sum::<f64>() / builder.len() as f64;
    for c in builder.iter_mut() {
        c.frequency /= avg_if;
    }
    avg_if
}

/// Ensures every same-chromosome pair `(i, i + 1)` carries a constraint with
/// frequency at least `max_if`. Leaves the builder sorted.
pub fn complete_adjacency(
    builder: &mut ConstraintSetBuilder,
    chromosomes: &ChromosomePartition,
    max_if: f64,
) -> AdjacencyReport {
    builder.sort();
    let mut report = AdjacencyReport::default();
    let mut missing = Vec::new();

    for i in 1..chromosomes.num_loci() {
        if !chromosomes.is_adjacent(i - 1, i) {
            continue;
        }
        match builder.search(i - 1, i) {
            Ok(idx) => {
                if let Some(existing) = builder.get_mut(idx) {
                    if existing.frequency < max_if {
                        existing.frequency = max_if;
                        report.replaced += 1;
                    }
                }
            }
            Err(_) => missing.push(RawConstraint::new(i - 1, i, max_if)),
        }
    }

    report.synthesized = missing.len();
    if !missing.is_empty() {
        builder.extend(missing);
        builder.sort();
    }
    debug!(
        synthesized = report.synthesized,
        replaced = report.replaced,
        max_if,
        "Adjacency completion done."
    );
    report
}
