use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileModelConfig {
    pub if_threshold: Option<f64>,
    pub avg_distance: Option<f64>,
    pub chromosome_lengths: Option<Vec<usize>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSweepConfig {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub step: Option<f64>,
    pub trials_per_candidate: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConversionConfig {
    pub alpha: Option<f64>,
    pub sweep: Option<FileSweepConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConvergenceConfig {
    pub cost_threshold: Option<f64>,
    pub patience_iterations: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOptimizationConfig {
    pub learning_rate: Option<f64>,
    pub max_iterations: Option<usize>,
    pub convergence: Option<FileConvergenceConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileParallelConfig {
    pub workers: Option<usize>,
    pub cost_aggregation: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub num_structures: Option<usize>,
    pub seed: Option<u64>,
    pub model: Option<FileModelConfig>,
    pub conversion: Option<FileConversionConfig>,
    pub optimization: Option<FileOptimizationConfig>,
    pub parallel: Option<FileParallelConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
