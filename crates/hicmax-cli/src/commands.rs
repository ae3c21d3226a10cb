pub mod preprocess;
pub mod reconstruct;

use crate::error::{CliError, Result};
use hicmax::core::io::contacts;
use hicmax::core::models::observation::RawObservation;
use std::path::Path;
use tracing::info;

/// Creates the output directory if needed.
pub(crate) fn prepare_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| CliError::FileWriting {
        path: dir.to_path_buf(),
        source: e.into(),
    })
}

pub(crate) fn load_observations(
    path: &Path,
    format: Option<contacts::ContactFormat>,
) -> Result<Vec<RawObservation>> {
    info!("Loading contacts from {:?}", path);
    let observations =
        contacts::read_contacts_from_path(path, format).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
    info!("Read {} contact observations.", observations.len());
    Ok(observations)
}
