use hicmax::core::io::contacts::ContactFormat;
use hicmax::engine::config::ReconstructionConfig;
use std::path::PathBuf;

pub struct AppConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    /// Stem shared by every output file name.
    pub prefix: String,
    pub format: Option<ContactFormat>,
    pub core_config: ReconstructionConfig,
}
