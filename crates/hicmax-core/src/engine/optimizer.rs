use crate::engine::config::{ConvergenceConfig, OptimizationConfig};
use crate::engine::error::EngineError;
use crate::engine::objective::Objective;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{debug, instrument};

/// Smallest step size tried before giving up on a line search.
pub const MIN_LEARNING_RATE: f64 = 1e-12;
const RATE_GROWTH: f64 = 1.5;
const RATE_BACKOFF: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Improvement stayed below the threshold for the patience window.
    Converged,
    /// No step along the gradient increased the cost.
    StepCollapsed,
    MaxIterations,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AscentOutcome {
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub stop_reason: StopReason,
}

/// Maximizes an [`Objective`] by stepping along its gradient with an
/// adaptive step size: grow after an accepted step, halve and retry after a
/// rejected one.
#[derive(Debug, Clone)]
pub struct GradientAscent {
    learning_rate: f64,
    max_iterations: usize,
    convergence: ConvergenceConfig,
}

impl GradientAscent {
    pub fn new(config: &OptimizationConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            max_iterations: config.max_iterations,
            convergence: config.convergence.clone(),
        }
    }

    /// Improves `x` in place. On error `x` holds the last accepted point.
    #[instrument(skip_all, name = "gradient_ascent")]
    pub fn run<O: Objective + ?Sized>(
        &self,
        objective: &O,
        x: &mut [f64],
        reporter: &ProgressReporter,
    ) -> Result<AscentOutcome, EngineError> {
        let (mut cost, mut gradient) = objective.evaluate_with_gradient(x)?;
        let mut evaluations = 1;
        let mut iterations = 0;
        let mut stale = 0;
        let mut rate = self.learning_rate;
        let mut candidate = vec![0.0; x.len()];

        let stop_reason = loop {
            if iterations >= self.max_iterations {
                break StopReason::MaxIterations;
            }

            let accepted = loop {
                for ((c, xi), g) in candidate.iter_mut().zip(x.iter()).zip(&gradient) {
                    *c = xi + rate * g;
                }
                let trial = objective.evaluate(&candidate)?;
                evaluations += 1;
                if trial > cost {
                    break Some(trial);
                }
                rate *= RATE_BACKOFF;
                if rate < MIN_LEARNING_RATE {
                    break None;
                }
            };
            let Some(new_cost) = accepted else {
                break StopReason::StepCollapsed;
            };

            x.copy_from_slice(&candidate);
            iterations += 1;
            let improvement = new_cost - cost;
            reporter.report(Progress::Iteration {
                iteration: iterations,
                cost: new_cost,
            });
            rate *= RATE_GROWTH;

            if improvement < self.convergence.cost_threshold {
                stale += 1;
                if stale >= self.convergence.patience_iterations {
                    cost = new_cost;
                    break StopReason::Converged;
                }
            } else {
                stale = 0;
            }

            (cost, gradient) = objective.evaluate_with_gradient(x)?;
            evaluations += 1;
        };

        debug!(
            cost,
            iterations,
            evaluations,
            reason = ?stop_reason,
            "Gradient ascent finished."
        );
        Ok(AscentOutcome {
            cost,
            iterations,
            evaluations,
            stop_reason,
        })
    }
}
