use super::{load_observations, prepare_output_dir};
use crate::cli::ReconstructArgs;
use crate::config::{AppConfig, build_reconstruct_config};
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use crate::utils::report::{AlphaLog, RunHeader, StructureLog, SummaryLog};
use hicmax::core::io::{mapping, pdb};
use hicmax::engine::preprocess::ContactModel;
use hicmax::engine::progress::ProgressReporter;
use hicmax::workflows::reconstruct::{self, GeneratedStructure, ReconstructionResult};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn run(args: ReconstructArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let app = build_reconstruct_config(&args)?;
    prepare_output_dir(&app.output_dir)?;
    let observations = load_observations(&app.input_path, app.format)?;

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut writer = OutputWriter::new(&app);

    println!("Starting structure reconstruction...");
    info!("Invoking the core reconstruction workflow...");
    let outcome = tokio::task::block_in_place(|| {
        reconstruct::run_with_sink(
            &observations,
            &app.core_config,
            &reporter,
            |model, generated| writer.write_structure(model, generated),
        )
    });
    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            if writer.structures_written() > 0 {
                warn!(
                    "Run aborted; {} completed structure(s) remain in {:?}.",
                    writer.structures_written(),
                    app.output_dir
                );
            }
            return Err(e);
        }
    };

    info!(
        "Workflow finished with {} structure(s) at alpha = {}.",
        result.structures.len(),
        result.alpha()
    );
    writer.write_summary(&result)?;

    if let Some(search) = &result.alpha_search {
        println!("Best conversion exponent: {:.2}", search.best_alpha);
    }
    println!(
        "✓ {} structure(s) written to: {} (AVG RMSE: {:.4})",
        result.structures.len(),
        app.output_dir.display(),
        result.summary.rmse
    );
    for path in writer.written() {
        info!("Wrote {:?}", path);
    }

    Ok(())
}

fn write_text(path: &Path, content: String) -> Result<()> {
    std::fs::write(path, content).map_err(|e| CliError::FileWriting {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Writes run outputs as they become available: the coordinate mapping with
/// the first structure, then one PDB and one log per structure, and finally
/// the summary log plus `best_alpha_log.txt` after a sweep.
pub struct OutputWriter<'a> {
    app: &'a AppConfig,
    written: Vec<PathBuf>,
    structures: usize,
}

impl<'a> OutputWriter<'a> {
    pub fn new(app: &'a AppConfig) -> Self {
        Self {
            app,
            written: Vec::new(),
            structures: 0,
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn structures_written(&self) -> usize {
        self.structures
    }

    fn output_path(&self, name: String) -> PathBuf {
        self.app.output_dir.join(name)
    }

    fn header(&self, alpha: f64) -> RunHeader<'a> {
        RunHeader {
            input: &self.app.input_path,
            alpha,
            learning_rate: self.app.core_config.optimization.learning_rate,
            chromosome_lengths: self.app.core_config.model.chromosome_lengths.as_deref(),
        }
    }

    fn write_mapping(&mut self, model: &ContactModel) -> Result<()> {
        let path = self.output_path(format!("{}_coordinate_mapping.txt", self.app.prefix));
        mapping::write_coordinate_mapping_to_path(&model.loci, &path).map_err(|e| {
            CliError::FileWriting {
                path: path.clone(),
                source: e.into(),
            }
        })?;
        self.written.push(path);
        Ok(())
    }

    pub fn write_structure(
        &mut self,
        model: &ContactModel,
        generated: &GeneratedStructure,
    ) -> Result<()> {
        if self.structures == 0 {
            self.write_mapping(model)?;
        }
        let prefix = &self.app.prefix;
        let number = generated.index + 1;

        let pdb_path = self.output_path(format!("{}_{}.pdb", prefix, number));
        let pdb_header = format!(
            "hicmax structure {} of {}\nconversion exponent {}",
            number, self.app.core_config.num_structures, model.alpha
        );
        pdb::write_structure_to_path(
            generated.structure.coords(),
            &model.chromosomes,
            &pdb_header,
            &pdb_path,
        )
        .map_err(|e| CliError::FileWriting {
            path: pdb_path.clone(),
            source: e.into(),
        })?;
        self.written.push(pdb_path);

        let log_path = self.output_path(format!("{}_log_{}.txt", prefix, number));
        let header = self.header(model.alpha);
        let log = StructureLog {
            header: &header,
            metrics: &generated.metrics,
            cost: generated.outcome.cost,
            iterations: generated.outcome.iterations,
        };
        write_text(&log_path, log.to_string())?;
        self.written.push(log_path);

        self.structures += 1;
        info!("Structure {} written.", number);
        Ok(())
    }

    pub fn write_summary(&mut self, result: &ReconstructionResult) -> Result<()> {
        let summary_path = self.output_path(format!("{}_log.txt", self.app.prefix));
        let header = self.header(result.alpha());
        let summary = SummaryLog {
            header: &header,
            summary: &result.summary,
        };
        write_text(&summary_path, summary.to_string())?;
        self.written.push(summary_path);

        if let Some(search) = &result.alpha_search {
            let alpha_path = self.output_path("best_alpha_log.txt".to_string());
            write_text(&alpha_path, AlphaLog(search).to_string())?;
            self.written.push(alpha_path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{InputFormat, IoArgs, ModelArgs};
    use std::fs;
    use tempfile::tempdir;

    fn write_contacts(dir: &Path) -> PathBuf {
        let path = dir.join("toy.txt");
        let mut content = String::from("# pos1 pos2 IF\n");
        for i in 0..6u64 {
            for j in (i + 1)..6 {
                let d = (j - i) as f64;
                content.push_str(&format!("{}\t{}\t{}\n", i * 100, j * 100, 40.0 / (d * d)));
            }
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn args(input: PathBuf, output: PathBuf) -> ReconstructArgs {
        ReconstructArgs {
            io: IoArgs {
                input,
                output,
                config: None,
                format: InputFormat::Auto,
                prefix: None,
                set_values: vec!["optimization.convergence.patience-iterations=3".to_string()],
            },
            model: ModelArgs {
                alpha: Some(1.0),
                chromosome_lengths: Some(vec![3, 3]),
                ..ModelArgs::default()
            },
            search_alpha: false,
            num_structures: Some(2),
            learning_rate: None,
            max_iterations: Some(30),
            workers: Some(2),
            cost_aggregation: None,
            seed: Some(5),
        }
    }

    #[test]
    fn output_writer_produces_every_file() {
        let dir = tempdir().unwrap();
        let input = write_contacts(dir.path());
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();

        let app = build_reconstruct_config(&args(input.clone(), out.clone())).unwrap();
        let observations = load_observations(&input, None).unwrap();
        let mut writer = OutputWriter::new(&app);
        let result = reconstruct::run_with_sink(
            &observations,
            &app.core_config,
            &ProgressReporter::new(),
            |model, generated| writer.write_structure(model, generated),
        )
        .unwrap();
        writer.write_summary(&result).unwrap();

        assert_eq!(writer.structures_written(), 2);
        let written = writer.written().to_vec();
        for name in [
            "toy_coordinate_mapping.txt",
            "toy_1.pdb",
            "toy_2.pdb",
            "toy_log_1.txt",
            "toy_log_2.txt",
            "toy_log.txt",
        ] {
            assert!(written.contains(&out.join(name)), "missing {}", name);
            assert!(out.join(name).is_file());
        }
        assert!(!out.join("best_alpha_log.txt").exists());

        let mapping = fs::read_to_string(out.join("toy_coordinate_mapping.txt")).unwrap();
        assert_eq!(mapping.lines().next(), Some("0\t0"));
        assert_eq!(mapping.lines().count(), 6);

        let pdb = fs::read_to_string(out.join("toy_1.pdb")).unwrap();
        assert_eq!(pdb.lines().filter(|l| l.starts_with("ATOM")).count(), 6);
        assert_eq!(pdb.lines().filter(|l| l.starts_with("CONECT")).count(), 4);

        let summary = fs::read_to_string(out.join("toy_log.txt")).unwrap();
        assert!(summary.contains("Chromosome lengths: 3 3"));
        assert!(summary.contains("Structures: 2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_with_sweep_writes_best_alpha_log() {
        let dir = tempdir().unwrap();
        let input = write_contacts(dir.path());
        let out = dir.path().join("nested").join("out");
        let mut args = args(input, out.clone());
        args.model.alpha = None;
        args.num_structures = Some(1);
        args.io.prefix = Some("swept".to_string());
        args.io.set_values.extend([
            "conversion.sweep.start=0.5".to_string(),
            "conversion.sweep.end=1.0".to_string(),
            "conversion.sweep.step=0.5".to_string(),
            "conversion.sweep.trials-per-candidate=1".to_string(),
        ]);
        let (sender, _receiver) = mpsc::channel(1024);

        run(args, sender).await.unwrap();

        let alpha_log = fs::read_to_string(out.join("best_alpha_log.txt")).unwrap();
        assert!(alpha_log.starts_with("Best convert factor: "));
        assert!(out.join("swept_1.pdb").is_file());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn completed_structures_survive_a_later_failure() {
        let dir = tempdir().unwrap();
        let input = write_contacts(dir.path());
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("toy_2.pdb")).unwrap();
        let (sender, _receiver) = mpsc::channel(1024);

        let result = run(args(input, out.clone()), sender).await;

        match result {
            Err(CliError::FileWriting { path, .. }) => assert_eq!(path, out.join("toy_2.pdb")),
            other => panic!("expected a write failure, got {:?}", other.err()),
        }
        assert!(out.join("toy_coordinate_mapping.txt").is_file());
        assert!(out.join("toy_1.pdb").is_file());
        assert!(out.join("toy_log_1.txt").is_file());
        let pdb = fs::read_to_string(out.join("toy_1.pdb")).unwrap();
        assert!(pdb.trim_end().ends_with("END"));
        assert!(!out.join("toy_log_2.txt").exists());
        assert!(!out.join("toy_log.txt").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unreadable_input_is_a_parsing_error() {
        let dir = tempdir().unwrap();
        let args = args(dir.path().join("absent.txt"), dir.path().join("out"));
        let (sender, _receiver) = mpsc::channel(16);

        let result = run(args, sender).await;
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
