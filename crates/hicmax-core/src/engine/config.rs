use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

/// Parameters of the IF-to-distance model consumed by preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Observations with frequency at or below this value are discarded.
    pub if_threshold: f64,
    /// Mean target distance after scaling.
    pub avg_distance: f64,
    /// Loci per chromosome in index order; `None` treats the data as one chromosome.
    pub chromosome_lengths: Option<Vec<usize>>,
}

/// Candidate exponents tried when no conversion exponent is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaSweep {
    pub start: f64,
    pub end: f64,
    pub step: f64,
    pub trials_per_candidate: usize,
}

impl Default for AlphaSweep {
    fn default() -> Self {
        Self {
            start: 0.1,
            end: 2.0,
            step: 0.1,
            trials_per_candidate: 3,
        }
    }
}

impl AlphaSweep {
    /// `start, start + step, ...` up to and including `end`, computed by index
    /// and rounded to 1e-9 so `0.1 * 3` reads as `0.3`.
    pub fn candidates(&self) -> Vec<f64> {
        let count = ((self.end - self.start) / self.step + 1e-9).floor() as usize;
        (0..=count)
            .map(|i| ((self.start + i as f64 * self.step) * 1e9).round() / 1e9)
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.start.is_finite() && self.start > 0.0) {
            return Err(invalid("alpha-sweep.start", "must be a positive number"));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(invalid("alpha-sweep.step", "must be a positive number"));
        }
        if !(self.end.is_finite() && self.end >= self.start) {
            return Err(invalid("alpha-sweep.end", "must not be smaller than start"));
        }
        if self.trials_per_candidate == 0 {
            return Err(invalid(
                "alpha-sweep.trials-per-candidate",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionMode {
    /// Use this exponent for `distance ∝ IF^-alpha`.
    Fixed(f64),
    /// Pick the exponent from a sweep before the full run.
    Search(AlphaSweep),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceConfig {
    /// Minimum cost gain per step that counts as progress.
    pub cost_threshold: f64,
    /// Consecutive steps without progress before stopping.
    pub patience_iterations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationConfig {
    pub learning_rate: f64,
    pub max_iterations: usize,
    pub convergence: ConvergenceConfig,
}

/// How partial costs from workers are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostAggregation {
    /// Each worker evaluates the log-likelihood over its own sum of squares
    /// and the per-worker costs are added.
    #[default]
    PerWorker,
    /// One sum of squares over all constraints, one cost. Independent of the
    /// worker count.
    Global,
}

impl fmt::Display for CostAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostAggregation::PerWorker => write!(f, "per-worker"),
            CostAggregation::Global => write!(f, "global"),
        }
    }
}

impl FromStr for CostAggregation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "per-worker" | "perworker" => Ok(CostAggregation::PerWorker),
            "global" => Ok(CostAggregation::Global),
            _ => Err(invalid(
                "cost-aggregation",
                format!("'{}' (expected 'per-worker' or 'global')", s),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParallelConfig {
    pub num_workers: usize,
    pub cost_aggregation: CostAggregation,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            cost_aggregation: CostAggregation::PerWorker,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionConfig {
    pub model: ModelConfig,
    pub conversion: ConversionMode,
    pub optimization: OptimizationConfig,
    pub parallel: ParallelConfig,
    pub num_structures: usize,
    pub seed: Option<u64>,
}

#[derive(Default)]
pub struct ReconstructionConfigBuilder {
    if_threshold: Option<f64>,
    avg_distance: Option<f64>,
    chromosome_lengths: Option<Vec<usize>>,
    conversion: Option<ConversionMode>,
    learning_rate: Option<f64>,
    max_iterations: Option<usize>,
    convergence: Option<ConvergenceConfig>,
    num_workers: Option<usize>,
    cost_aggregation: Option<CostAggregation>,
    num_structures: Option<usize>,
    seed: Option<u64>,
}

impl ReconstructionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn if_threshold(mut self, threshold: f64) -> Self {
        self.if_threshold = Some(threshold);
        self
    }
    pub fn avg_distance(mut self, distance: f64) -> Self {
        self.avg_distance = Some(distance);
        self
    }
    pub fn chromosome_lengths(mut self, lengths: Option<Vec<usize>>) -> Self {
        self.chromosome_lengths = lengths;
        self
    }
    pub fn conversion(mut self, mode: ConversionMode) -> Self {
        self.conversion = Some(mode);
        self
    }
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = Some(rate);
        self
    }
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn convergence(mut self, convergence: ConvergenceConfig) -> Self {
        self.convergence = Some(convergence);
        self
    }
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.num_workers = Some(workers);
        self
    }
    pub fn cost_aggregation(mut self, aggregation: CostAggregation) -> Self {
        self.cost_aggregation = Some(aggregation);
        self
    }
    pub fn num_structures(mut self, n: usize) -> Self {
        self.num_structures = Some(n);
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<ReconstructionConfig, ConfigError> {
        let model = ModelConfig {
            if_threshold: self
                .if_threshold
                .ok_or(ConfigError::MissingParameter("if_threshold"))?,
            avg_distance: self
                .avg_distance
                .ok_or(ConfigError::MissingParameter("avg_distance"))?,
            chromosome_lengths: self.chromosome_lengths,
        };
        let optimization = OptimizationConfig {
            learning_rate: self
                .learning_rate
                .ok_or(ConfigError::MissingParameter("learning_rate"))?,
            max_iterations: self
                .max_iterations
                .ok_or(ConfigError::MissingParameter("max_iterations"))?,
            convergence: self
                .convergence
                .ok_or(ConfigError::MissingParameter("convergence"))?,
        };
        let parallel = ParallelConfig {
            num_workers: self
                .num_workers
                .ok_or(ConfigError::MissingParameter("num_workers"))?,
            cost_aggregation: self.cost_aggregation.unwrap_or_default(),
        };
        let config = ReconstructionConfig {
            model,
            conversion: self
                .conversion
                .ok_or(ConfigError::MissingParameter("conversion"))?,
            optimization,
            parallel,
            num_structures: self
                .num_structures
                .ok_or(ConfigError::MissingParameter("num_structures"))?,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

impl ReconstructionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.model.if_threshold.is_finite() {
            return Err(invalid("if_threshold", "must be finite"));
        }
        if !(self.model.avg_distance.is_finite() && self.model.avg_distance > 0.0) {
            return Err(invalid("avg_distance", "must be a positive number"));
        }
        match &self.conversion {
            ConversionMode::Fixed(alpha) if !(alpha.is_finite() && *alpha > 0.0) => {
                return Err(invalid("alpha", "must be a positive number"));
            }
            ConversionMode::Search(sweep) => sweep.validate()?,
            ConversionMode::Fixed(_) => {}
        }
        if !(self.optimization.learning_rate.is_finite() && self.optimization.learning_rate > 0.0)
        {
            return Err(invalid("learning_rate", "must be a positive number"));
        }
        if self.optimization.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        let threshold = self.optimization.convergence.cost_threshold;
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(invalid("cost_threshold", "must be a non-negative number"));
        }
        if self.optimization.convergence.patience_iterations == 0 {
            return Err(invalid("patience_iterations", "must be at least 1"));
        }
        if self.parallel.num_workers == 0 {
            return Err(invalid("num_workers", "must be at least 1"));
        }
        if self.num_structures == 0 {
            return Err(invalid("num_structures", "must be at least 1"));
        }
        Ok(())
    }
}
