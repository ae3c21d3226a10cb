use super::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Numeric degeneracy in {context}: {reason}")]
    NumericDegeneracy {
        context: &'static str,
        reason: String,
    },

    #[error("Worker {worker} failed on constraints {start}..{end}: {reason}")]
    WorkerExecution {
        worker: usize,
        start: usize,
        end: usize,
        reason: String,
    },

    #[error("Coordinate vector has length {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
