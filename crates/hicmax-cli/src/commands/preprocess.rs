use super::{load_observations, prepare_output_dir};
use crate::cli::PreprocessArgs;
use crate::config::{AppConfig, build_preprocess_config};
use crate::error::{CliError, Result};
use hicmax::core::io::mapping;
use hicmax::engine::config::ConversionMode;
use hicmax::engine::preprocess::{self, ContactModel};
use std::path::PathBuf;
use tracing::info;

pub async fn run(args: PreprocessArgs) -> Result<()> {
    let app = build_preprocess_config(&args)?;
    prepare_output_dir(&app.output_dir)?;
    let observations = load_observations(&app.input_path, app.format)?;

    let model = build_model(&app, &observations)?;
    let stats = &model.stats;
    println!(
        "✓ {} loci on {} chromosome(s), {} constraints ({} adjacency pairs added, {} raised).",
        model.num_loci(),
        model.chromosomes.num_chromosomes(),
        model.constraints.len(),
        model.adjacency.synthesized,
        model.adjacency.replaced
    );
    println!(
        "  avgIF = {:.4}, totalIF = {:.4}, maxIF = {:.4}, avgAdjIF = {:.4}, avgDist = {:.4}, max target distance = {:.4}",
        stats.avg_if,
        stats.total_if,
        stats.max_if,
        stats.avg_adj_if,
        stats.avg_dist,
        stats.max_target_distance
    );

    for path in write_outputs(&app, &model)? {
        println!("  Wrote {}", path.display());
    }
    Ok(())
}

fn build_model(
    app: &AppConfig,
    observations: &[hicmax::core::models::observation::RawObservation],
) -> Result<ContactModel> {
    let ConversionMode::Fixed(alpha) = app.core_config.conversion else {
        return Err(CliError::Config(
            "Preprocessing requires a fixed conversion exponent.".to_string(),
        ));
    };
    info!("Preprocessing with alpha = {}", alpha);
    Ok(preprocess::run(observations, &app.core_config.model, alpha)?)
}

/// Writes `{prefix}_constraints.txt` and `{prefix}_coordinate_mapping.txt`.
pub fn write_outputs(app: &AppConfig, model: &ContactModel) -> Result<Vec<PathBuf>> {
    let constraints_path = app
        .output_dir
        .join(format!("{}_constraints.txt", app.prefix));
    mapping::write_constraint_table_to_path(&model.constraints, &constraints_path).map_err(
        |e| CliError::FileWriting {
            path: constraints_path.clone(),
            source: e.into(),
        },
    )?;

    let mapping_path = app
        .output_dir
        .join(format!("{}_coordinate_mapping.txt", app.prefix));
    mapping::write_coordinate_mapping_to_path(&model.loci, &mapping_path).map_err(|e| {
        CliError::FileWriting {
            path: mapping_path.clone(),
            source: e.into(),
        }
    })?;

    Ok(vec![constraints_path, mapping_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{InputFormat, IoArgs, ModelArgs};
    use hicmax::engine::error::EngineError;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn preprocess_args(input: PathBuf, output: PathBuf, alpha: Option<f64>) -> PreprocessArgs {
        PreprocessArgs {
            io: IoArgs {
                input,
                output,
                config: None,
                format: InputFormat::Matrix,
                prefix: Some("toy".to_string()),
                set_values: vec![],
            },
            model: ModelArgs {
                alpha,
                ..ModelArgs::default()
            },
        }
    }

    fn write_matrix(dir: &Path) -> PathBuf {
        let path = dir.join("matrix.txt");
        fs::write(
            &path,
            "0 4 1 0\n4 0 4 1\n1 4 0 0\n0 1 0 0\n",
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn writes_constraint_table_and_mapping() {
        let dir = tempdir().unwrap();
        let input = write_matrix(dir.path());
        let out = dir.path().join("out");

        run(preprocess_args(input, out.clone(), Some(1.0)))
            .await
            .unwrap();

        let table = fs::read_to_string(out.join("toy_constraints.txt")).unwrap();
        let rows: Vec<&str> = table.lines().skip(1).collect();
        // Four observed pairs plus the missing 2-3 adjacency.
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().any(|r| r.starts_with("2\t3\t")));

        let mapping = fs::read_to_string(out.join("toy_coordinate_mapping.txt")).unwrap();
        assert_eq!(mapping.lines().count(), 4);
    }

    #[tokio::test]
    async fn missing_exponent_is_rejected_before_reading_input() {
        let dir = tempdir().unwrap();
        let result = run(preprocess_args(
            dir.path().join("absent.txt"),
            dir.path().join("out"),
            None,
        ))
        .await;
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[tokio::test]
    async fn short_chromosome_lengths_surface_as_core_error() {
        let dir = tempdir().unwrap();
        let input = write_matrix(dir.path());
        let mut args = preprocess_args(input, dir.path().join("out"), Some(1.0));
        args.model.chromosome_lengths = Some(vec![2]);

        let result = run(args).await;
        assert!(matches!(
            result,
            Err(CliError::Core(EngineError::Configuration(_)))
        ));
    }
}
