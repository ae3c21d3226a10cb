use crate::engine::error::EngineError;
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Splits `[0, m)` into contiguous, balanced, non-empty ranges and runs one
/// task per range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPartitioner {
    ranges: Vec<Range<usize>>,
}

impl WorkerPartitioner {
    /// At most `min(workers, total)` ranges; the first `total % k` are one longer.
    pub fn new(total: usize, workers: usize) -> Self {
        let k = workers.max(1).min(total);
        if k == 0 {
            return Self { ranges: Vec::new() };
        }
        let base = total / k;
        let extra = total % k;
        let mut ranges = Vec::with_capacity(k);
        let mut start = 0;
        for worker in 0..k {
            let len = base + usize::from(worker < extra);
            ranges.push(start..start + len);
            start += len;
        }
        Self { ranges }
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn num_workers(&self) -> usize {
        self.ranges.len()
    }

    /// Runs `task` once per range and returns the results in range order.
    ///
    /// A task that returns an error fails the whole call with that error; a
    /// task that panics fails it with [`EngineError::WorkerExecution`]. The
    /// first failure in range order wins, so the outcome does not depend on
    /// scheduling.
    pub fn run<T, F>(&self, task: F) -> Result<Vec<T>, EngineError>
    where
        T: Send,
        F: Fn(Range<usize>) -> Result<T, EngineError> + Sync,
    {
        let execute = |(worker, range): (usize, &Range<usize>)| {
            trace!(worker, start = range.start, end = range.end, "Worker started.");
            match panic::catch_unwind(AssertUnwindSafe(|| task(range.clone()))) {
                Ok(result) => result,
                Err(payload) => Err(EngineError::WorkerExecution {
                    worker,
                    start: range.start,
                    end: range.end,
                    reason: panic_message(payload.as_ref()),
                }),
            }
        };

        #[cfg(not(feature = "parallel"))]
        let iterator = self.ranges.iter().enumerate();

        #[cfg(feature = "parallel")]
        let iterator = self.ranges.par_iter().enumerate();

        let results: Vec<Result<T, EngineError>> = iterator.map(execute).collect();
        results.into_iter().collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// One worker's contribution to an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialResult {
    pub cost: f64,
    pub gradient: Vec<f64>,
}

/// Sums costs and gradients elementwise in the order given.
pub fn aggregate<I>(parts: I, dimension: usize) -> PartialResult
where
    I: IntoIterator<Item = PartialResult>,
{
    parts.into_iter().fold(
        PartialResult {
            cost: 0.0,
            gradient: vec![0.0; dimension],
        },
        |mut total, part| {
            total.cost += part.cost;
            for (acc, g) in total.gradient.iter_mut().zip(&part.gradient) {
                *acc += g;
            }
            total
        },
    )
}
