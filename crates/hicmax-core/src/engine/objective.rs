use crate::core::models::chromosome::ChromosomePartition;
use crate::core::models::constraint::ConstraintSet;
use crate::core::utils::geometry;
use crate::engine::config::{CostAggregation, ParallelConfig};
use crate::engine::error::EngineError;
use crate::engine::partition::{self, PartialResult, WorkerPartitioner};
use crate::engine::preprocess::ContactModel;
use std::ops::Range;
use tracing::{Level, instrument, trace};

/// Structural distances below this are replaced by it in the `err / d` ratio.
pub const MIN_DISTANCE: f64 = 1e-10;

/// Something a maximizing optimizer can query.
pub trait Objective {
    /// Length of the coordinate vector.
    fn dimension(&self) -> usize;

    fn evaluate(&self, x: &[f64]) -> Result<f64, EngineError>;

    /// Cost and its gradient. The cost equals [`Objective::evaluate`] bit for bit.
    fn evaluate_with_gradient(&self, x: &[f64]) -> Result<(f64, Vec<f64>), EngineError>;
}

/// Gaussian log-likelihood of `n` loci with residual sum of squares `v`:
/// `-(n / 2) - n ln(sqrt(v / n))`, with `n / 2` taken on integers.
pub fn log_likelihood(num_loci: usize, sum_of_squares: f64) -> f64 {
    let n = num_loci as f64;
    -((num_loci / 2) as f64) - n * (sum_of_squares / n).sqrt().ln()
}

/// `dCost/dw` and `dw/dv` for `w = sqrt(v / n)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainFactors {
    pub dl_dw: f64,
    pub dw_dv: f64,
}

impl ChainFactors {
    pub fn new(num_loci: usize, sum_of_squares: f64) -> Result<Self, EngineError> {
        if !(sum_of_squares.is_finite() && sum_of_squares > 0.0) {
            return Err(EngineError::NumericDegeneracy {
                context: "objective",
                reason: format!("sum of squared errors is {}", sum_of_squares),
            });
        }
        let n = num_loci as f64;
        let w = (sum_of_squares / n).sqrt();
        Ok(Self {
            dl_dw: -n / w,
            dw_dv: 1.0 / (2.0 * (n * sum_of_squares).sqrt()),
        })
    }

    /// Coefficient applied to `p_i - p_j` for one constraint.
    #[inline]
    fn scale(&self, err: f64, distance: f64) -> f64 {
        self.dl_dw * self.dw_dv * 2.0 * (err / distance.max(MIN_DISTANCE))
    }
}

/// The maximum-likelihood objective over a frozen constraint set.
pub struct LikelihoodObjective<'a> {
    constraints: &'a ConstraintSet,
    chromosomes: &'a ChromosomePartition,
    max_if: f64,
    aggregation: CostAggregation,
    partitioner: WorkerPartitioner,
}

impl<'a> LikelihoodObjective<'a> {
    pub fn new(model: &'a ContactModel, parallel: &ParallelConfig) -> Self {
        Self::from_parts(
            &model.constraints,
            &model.chromosomes,
            model.stats.max_if,
            parallel,
        )
    }

    /// Constraint indices must lie below `chromosomes.num_loci()`.
    pub fn from_parts(
        constraints: &'a ConstraintSet,
        chromosomes: &'a ChromosomePartition,
        max_if: f64,
        parallel: &ParallelConfig,
    ) -> Self {
        Self {
            constraints,
            chromosomes,
            max_if,
            aggregation: parallel.cost_aggregation,
            partitioner: WorkerPartitioner::new(constraints.len(), parallel.num_workers),
        }
    }

    pub fn num_loci(&self) -> usize {
        self.chromosomes.num_loci()
    }

    pub fn num_workers(&self) -> usize {
        self.partitioner.num_workers()
    }

    fn check_dimension(&self, x: &[f64]) -> Result<(), EngineError> {
        if x.len() != self.dimension() {
            return Err(EngineError::DimensionMismatch {
                expected: self.dimension(),
                actual: x.len(),
            });
        }
        Ok(())
    }

    /// Pass 1: residual sum of squares over a range, stored frequencies only.
    fn sum_of_squares(&self, x: &[f64], range: Range<usize>) -> f64 {
        self.constraints.as_slice()[range]
            .iter()
            .filter(|c| c.frequency() > 0.0)
            .map(|c| {
                let err = geometry::distance(x, c.pos1(), c.pos2()) - c.target_distance();
                err * err
            })
            .sum()
    }

    /// Frequency mass of a range, with adjacent pairs counted at `max_if`.
    fn effective_weight(&self, range: Range<usize>) -> f64 {
        self.constraints.as_slice()[range]
            .iter()
            .filter(|c| c.frequency() > 0.0)
            .map(|c| {
                let (i, j) = c.pair();
                if self.chromosomes.is_adjacent(i, j) {
                    self.max_if
                } else {
                    c.frequency()
                }
            })
            .sum()
    }

    /// Pass 2: gradient contributions of a range into `gradient`.
    fn accumulate_gradient(
        &self,
        x: &[f64],
        range: Range<usize>,
        factors: ChainFactors,
        gradient: &mut [f64],
    ) {
        for c in &self.constraints.as_slice()[range.clone()] {
            if c.frequency() <= 0.0 {
                continue;
            }
            let (i, j) = c.pair();
            let diff = geometry::displacement(x, i, j);
            let distance = diff.norm();
            let tmp = factors.scale(distance - c.target_distance(), distance);
            for k in 0..3 {
                gradient[3 * i + k] += tmp * diff[k];
                gradient[3 * j + k] -= tmp * diff[k];
            }
        }
        if tracing::enabled!(Level::TRACE) {
            trace!(effective_weight = self.effective_weight(range), "Gradient pass done.");
        }
    }

    fn cost(&self, v: f64) -> Result<f64, EngineError> {
        if !(v.is_finite() && v > 0.0) {
            return Err(EngineError::NumericDegeneracy {
                context: "objective",
                reason: format!("sum of squared errors is {}", v),
            });
        }
        Ok(log_likelihood(self.num_loci(), v))
    }

    fn worker_sums(&self, x: &[f64]) -> Result<Vec<f64>, EngineError> {
        self.partitioner
            .run(|range| Ok(self.sum_of_squares(x, range)))
    }

    fn evaluate_cost(&self, x: &[f64]) -> Result<f64, EngineError> {
        let sums = self.worker_sums(x)?;
        match self.aggregation {
            CostAggregation::PerWorker => sums
                .into_iter()
                .try_fold(0.0, |total, v| -> Result<f64, EngineError> {
                    Ok(total + self.cost(v)?)
                }),
            CostAggregation::Global => self.cost(sums.into_iter().sum()),
        }
    }

    fn evaluate_both(&self, x: &[f64]) -> Result<PartialResult, EngineError> {
        let dimension = self.dimension();
        let parts = match self.aggregation {
            CostAggregation::PerWorker => self.partitioner.run(|range| {
                let v = self.sum_of_squares(x, range.clone());
                let cost = self.cost(v)?;
                let factors = ChainFactors::new(self.num_loci(), v)?;
                let mut gradient = vec![0.0; dimension];
                self.accumulate_gradient(x, range, factors, &mut gradient);
                Ok(PartialResult { cost, gradient })
            })?,
            CostAggregation::Global => {
                let v: f64 = self.worker_sums(x)?.into_iter().sum();
                let cost = self.cost(v)?;
                let factors = ChainFactors::new(self.num_loci(), v)?;
                let gradients = self.partitioner.run(|range| {
                    let mut gradient = vec![0.0; dimension];
                    self.accumulate_gradient(x, range, factors, &mut gradient);
                    Ok(PartialResult {
                        cost: 0.0,
                        gradient,
                    })
                })?;
                let mut total = partition::aggregate(gradients, dimension);
                total.cost = cost;
                return Ok(total);
            }
        };
        Ok(partition::aggregate(parts, dimension))
    }
}

fn ensure_finite(cost: f64, gradient: Option<&[f64]>) -> Result<(), EngineError> {
    if !cost.is_finite() {
        return Err(EngineError::NumericDegeneracy {
            context: "objective",
            reason: format!("cost evaluated to {}", cost),
        });
    }
    if let Some(g) = gradient {
        if let Some(pos) = g.iter().position(|v| !v.is_finite()) {
            return Err(EngineError::NumericDegeneracy {
                context: "objective",
                reason: format!("gradient component {} is {}", pos, g[pos]),
            });
        }
    }
    Ok(())
}

impl Objective for LikelihoodObjective<'_> {
    fn dimension(&self) -> usize {
        self.num_loci() * 3
    }

    #[instrument(skip_all, name = "objective_evaluate")]
    fn evaluate(&self, x: &[f64]) -> Result<f64, EngineError> {
        self.check_dimension(x)?;
        let cost = self.evaluate_cost(x)?;
        ensure_finite(cost, None)?;
        Ok(cost)
    }

    #[instrument(skip_all, name = "objective_evaluate_with_gradient")]
    fn evaluate_with_gradient(&self, x: &[f64]) -> Result<(f64, Vec<f64>), EngineError> {
        self.check_dimension(x)?;
        let total = self.evaluate_both(x)?;
        ensure_finite(total.cost, Some(&total.gradient))?;
        Ok((total.cost, total.gradient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::constraint::Constraint;

    fn f64_approx_equal(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance * (1.0 + a.abs().max(b.abs()))
    }

    fn parallel(workers: usize, aggregation: CostAggregation) -> ParallelConfig {
        ParallelConfig {
            num_workers: workers,
            cost_aggregation: aggregation,
        }
    }

    fn triangle() -> (ConstraintSet, ChromosomePartition) {
        let constraints = ConstraintSet::from_constraints(vec![
            Constraint::new(0, 1, 1.2, 1.0),
            Constraint::new(1, 2, 0.8, 1.5),
        ]);
        (constraints, ChromosomePartition::single(3))
    }

    fn chain(n: usize) -> (ConstraintSet, ChromosomePartition) {
        let mut constraints = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n.min(i + 4) {
                let f = 1.0 / (j - i) as f64;
                constraints.push(Constraint::new(i, j, f, (j - i) as f64));
            }
        }
        (
            ConstraintSet::from_constraints(constraints),
            ChromosomePartition::single(n),
        )
    }

    fn coords(n: usize) -> Vec<f64> {
        (0..3 * n)
            .map(|k| ((k * 7 + 3) % 11) as f64 * 0.37 - 1.1)
            .collect()
    }

    #[test]
    fn log_likelihood_uses_integer_half() {
        assert_eq!(log_likelihood(3, 3.0), -1.0);
        assert!(f64_approx_equal(
            log_likelihood(4, 16.0),
            -2.0 - 4.0 * 2.0f64.ln(),
            1e-12
        ));
    }

    #[test]
    fn analytic_gradient_matches_finite_differences() {
        let (constraints, chromosomes) = triangle();
        let objective = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(1, CostAggregation::PerWorker),
        );
        let x = vec![0.0, 0.0, 0.0, 0.7, 0.2, -0.1, 1.1, 0.9, 0.4];
        let (_, gradient) = objective.evaluate_with_gradient(&x).unwrap();

        let h = 1e-6;
        for k in 0..x.len() {
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[k] += h;
            minus[k] -= h;
            let numeric =
                (objective.evaluate(&plus).unwrap() - objective.evaluate(&minus).unwrap()) / (2.0 * h);
            assert!(
                f64_approx_equal(gradient[k], numeric, 1e-4),
                "component {}: analytic {} numeric {}",
                k,
                gradient[k],
                numeric
            );
        }
    }

    #[test]
    fn gradient_points_uphill() {
        let (constraints, chromosomes) = chain(6);
        let objective = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(1, CostAggregation::PerWorker),
        );
        let x = coords(6);
        let (cost, gradient) = objective.evaluate_with_gradient(&x).unwrap();
        let stepped: Vec<f64> = x.iter().zip(&gradient).map(|(a, g)| a + 1e-4 * g).collect();
        assert!(objective.evaluate(&stepped).unwrap() > cost);
    }

    #[test]
    fn both_entry_points_agree_exactly() {
        let (constraints, chromosomes) = chain(8);
        let x = coords(8);
        for aggregation in [CostAggregation::PerWorker, CostAggregation::Global] {
            for workers in [1, 3] {
                let objective = LikelihoodObjective::from_parts(
                    &constraints,
                    &chromosomes,
                    1.0,
                    &parallel(workers, aggregation),
                );
                let cost = objective.evaluate(&x).unwrap();
                let (cost_g, _) = objective.evaluate_with_gradient(&x).unwrap();
                assert_eq!(cost.to_bits(), cost_g.to_bits());
            }
        }
    }

    #[test]
    fn global_aggregation_is_partition_invariant() {
        let (constraints, chromosomes) = chain(10);
        let x = coords(10);
        let single = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(1, CostAggregation::Global),
        );
        let (cost_1, grad_1) = single.evaluate_with_gradient(&x).unwrap();
        for workers in [2, 4, 7] {
            let split = LikelihoodObjective::from_parts(
                &constraints,
                &chromosomes,
                1.0,
                &parallel(workers, CostAggregation::Global),
            );
            assert_eq!(split.num_workers(), workers);
            let (cost_k, grad_k) = split.evaluate_with_gradient(&x).unwrap();
            assert!(f64_approx_equal(cost_1, cost_k, 1e-10));
            for (a, b) in grad_1.iter().zip(&grad_k) {
                assert!(f64_approx_equal(*a, *b, 1e-10));
            }
        }
    }

    #[test]
    fn per_worker_aggregation_sums_worker_likelihoods() {
        let (constraints, chromosomes) = chain(10);
        let x = coords(10);
        let objective = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(3, CostAggregation::PerWorker),
        );
        let expected: f64 = WorkerPartitioner::new(constraints.len(), 3)
            .ranges()
            .iter()
            .map(|r| log_likelihood(10, objective.sum_of_squares(&x, r.clone())))
            .sum();
        let cost = objective.evaluate(&x).unwrap();
        assert!(f64_approx_equal(cost, expected, 1e-12));

        let one = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(1, CostAggregation::PerWorker),
        );
        assert!(!f64_approx_equal(cost, one.evaluate(&x).unwrap(), 1e-6));
    }

    #[test]
    fn modes_agree_with_one_worker() {
        let (constraints, chromosomes) = chain(5);
        let x = coords(5);
        let per_worker = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(1, CostAggregation::PerWorker),
        );
        let global = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(1, CostAggregation::Global),
        );
        assert_eq!(
            per_worker.evaluate_with_gradient(&x).unwrap(),
            global.evaluate_with_gradient(&x).unwrap()
        );
    }

    #[test]
    fn coincident_points_stay_finite() {
        let (constraints, chromosomes) = triangle();
        let objective = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(1, CostAggregation::PerWorker),
        );
        let x = vec![0.0; 9];
        let (cost, gradient) = objective.evaluate_with_gradient(&x).unwrap();
        assert!(cost.is_finite());
        assert!(gradient.iter().all(|g| *g == 0.0));
    }

    #[test]
    fn non_positive_frequencies_are_skipped() {
        let with_zero = ConstraintSet::from_constraints(vec![
            Constraint::new(0, 1, 1.0, 1.0),
            Constraint::new(0, 2, 0.0, 50.0),
            Constraint::new(1, 2, 1.0, 2.0),
        ]);
        let without = ConstraintSet::from_constraints(vec![
            Constraint::new(0, 1, 1.0, 1.0),
            Constraint::new(1, 2, 1.0, 2.0),
        ]);
        let chromosomes = ChromosomePartition::single(3);
        let config = parallel(1, CostAggregation::PerWorker);
        let x = coords(3);
        let a = LikelihoodObjective::from_parts(&with_zero, &chromosomes, 1.0, &config);
        let b = LikelihoodObjective::from_parts(&without, &chromosomes, 1.0, &config);
        assert_eq!(
            a.evaluate_with_gradient(&x).unwrap(),
            b.evaluate_with_gradient(&x).unwrap()
        );
    }

    #[test]
    fn exact_fit_is_a_numeric_degeneracy() {
        let constraints = ConstraintSet::from_constraints(vec![Constraint::new(0, 1, 1.0, 1.0)]);
        let chromosomes = ChromosomePartition::single(2);
        let objective = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(1, CostAggregation::PerWorker),
        );
        let x = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        assert!(matches!(
            objective.evaluate(&x),
            Err(EngineError::NumericDegeneracy { .. })
        ));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let (constraints, chromosomes) = triangle();
        let objective = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(1, CostAggregation::PerWorker),
        );
        assert!(matches!(
            objective.evaluate(&[0.0; 6]),
            Err(EngineError::DimensionMismatch {
                expected: 9,
                actual: 6
            })
        ));
    }

    #[test]
    fn out_of_range_constraint_surfaces_as_worker_failure() {
        let constraints = ConstraintSet::from_constraints(vec![
            Constraint::new(0, 1, 1.0, 1.0),
            Constraint::new(1, 5, 1.0, 1.0),
        ]);
        let chromosomes = ChromosomePartition::single(2);
        let objective = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            1.0,
            &parallel(2, CostAggregation::PerWorker),
        );
        let x = vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        assert!(matches!(
            objective.evaluate_with_gradient(&x),
            Err(EngineError::WorkerExecution { worker: 1, .. })
        ));
    }

    #[test]
    fn effective_weight_counts_adjacent_pairs_at_max_if() {
        let constraints = ConstraintSet::from_constraints(vec![
            Constraint::new(0, 1, 1.2, 1.0),
            Constraint::new(0, 2, 0.5, 2.0),
            Constraint::new(1, 2, 0.0, 1.0),
            Constraint::new(2, 3, 0.7, 1.0),
        ]);
        let chromosomes = ChromosomePartition::from_lengths(&[3, 1], 4).unwrap();
        let objective = LikelihoodObjective::from_parts(
            &constraints,
            &chromosomes,
            4.0,
            &parallel(1, CostAggregation::PerWorker),
        );

        // 0-1 is adjacent, 1-2 has no frequency, 2-3 crosses chromosomes.
        assert!(f64_approx_equal(objective.effective_weight(0..4), 4.0 + 0.5 + 0.7, 1e-12));
        assert!(f64_approx_equal(objective.effective_weight(1..2), 0.5, 1e-12));
        assert_eq!(objective.effective_weight(2..3), 0.0);
    }
}
