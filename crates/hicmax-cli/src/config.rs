mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_preprocess_config, build_reconstruct_config};
pub use models::AppConfig;
