use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileConvergenceConfig, FileSweepConfig};
use super::models::AppConfig;
use crate::cli::{IoArgs, ModelArgs, PreprocessArgs, ReconstructArgs};
use crate::error::{CliError, Result};
use hicmax::engine::config::{
    AlphaSweep, ConversionMode, ConvergenceConfig, CostAggregation, ReconstructionConfig,
    ReconstructionConfigBuilder,
};
use std::str::FromStr;

pub fn build_reconstruct_config(args: &ReconstructArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.io)?;

    let conversion_file = file_config.conversion.take().unwrap_or_default();
    let sweep = merge_sweep(conversion_file.sweep, &defaults);
    let conversion = if args.search_alpha {
        ConversionMode::Search(sweep)
    } else {
        match args.model.alpha.or(conversion_file.alpha) {
            Some(alpha) => ConversionMode::Fixed(alpha),
            None => ConversionMode::Search(sweep),
        }
    };

    let opt_file = file_config.optimization.take().unwrap_or_default();
    let learning_rate = args
        .learning_rate
        .or(opt_file.learning_rate)
        .unwrap_or(defaults.learning_rate);
    let max_iterations = args
        .max_iterations
        .or(opt_file.max_iterations)
        .unwrap_or(defaults.max_iterations);
    let convergence = merge_convergence(opt_file.convergence, &defaults);

    let parallel_file = file_config.parallel.take().unwrap_or_default();
    let num_workers = args
        .workers
        .or(parallel_file.workers)
        .unwrap_or(defaults.workers);
    let cost_aggregation = match args
        .cost_aggregation
        .as_deref()
        .or(parallel_file.cost_aggregation.as_deref())
    {
        Some(mode) => {
            CostAggregation::from_str(mode).map_err(|e| CliError::Config(e.to_string()))?
        }
        None => defaults.cost_aggregation,
    };

    let num_structures = args
        .num_structures
        .or(file_config.num_structures)
        .unwrap_or(defaults.num_structures);
    let seed = args.seed.or(file_config.seed);

    let core_config = model_builder(&args.model, &mut file_config, &defaults)
        .conversion(conversion)
        .learning_rate(learning_rate)
        .max_iterations(max_iterations)
        .convergence(convergence)
        .num_workers(num_workers)
        .cost_aggregation(cost_aggregation)
        .num_structures(num_structures)
        .seed(seed)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    app_config(&args.io, core_config)
}

/// Preprocessing needs a fixed exponent; the optimizer settings are filled
/// from defaults and never used.
pub fn build_preprocess_config(args: &PreprocessArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.io)?;

    let file_alpha = file_config
        .conversion
        .take()
        .and_then(|conversion| conversion.alpha);
    let alpha = args.model.alpha.or(file_alpha).ok_or_else(|| {
        CliError::Config(
            "`conversion.alpha` is required for preprocessing, either in the config file or via --alpha."
                .to_string(),
        )
    })?;

    let core_config = model_builder(&args.model, &mut file_config, &defaults)
        .conversion(ConversionMode::Fixed(alpha))
        .learning_rate(defaults.learning_rate)
        .max_iterations(defaults.max_iterations)
        .convergence(merge_convergence(None, &defaults))
        .num_workers(defaults.workers)
        .num_structures(defaults.num_structures)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    app_config(&args.io, core_config)
}

fn load_file_config(io: &IoArgs) -> Result<FileConfig> {
    let file_config = match &io.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    apply_set_values(file_config, &io.set_values)
}

fn model_builder(
    args: &ModelArgs,
    file_config: &mut FileConfig,
    defaults: &DefaultsConfig,
) -> ReconstructionConfigBuilder {
    let model_file = file_config.model.take().unwrap_or_default();
    ReconstructionConfigBuilder::new()
        .if_threshold(
            args.if_threshold
                .or(model_file.if_threshold)
                .unwrap_or(defaults.if_threshold),
        )
        .avg_distance(
            args.avg_distance
                .or(model_file.avg_distance)
                .unwrap_or(defaults.avg_distance),
        )
        .chromosome_lengths(
            args.chromosome_lengths
                .clone()
                .or(model_file.chromosome_lengths),
        )
}

fn app_config(io: &IoArgs, core_config: ReconstructionConfig) -> Result<AppConfig> {
    let prefix = match &io.prefix {
        Some(prefix) => prefix.clone(),
        None => io
            .input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                CliError::Argument(format!(
                    "Cannot derive an output prefix from {:?}; pass --prefix.",
                    io.input
                ))
            })?,
    };

    Ok(AppConfig {
        input_path: io.input.clone(),
        output_dir: io.output.clone(),
        prefix,
        format: io.format.to_contact_format(),
        core_config,
    })
}

fn merge_sweep(file_val: Option<FileSweepConfig>, defaults: &DefaultsConfig) -> AlphaSweep {
    let file_val = file_val.unwrap_or_default();
    AlphaSweep {
        start: file_val.start.unwrap_or(defaults.sweep.start),
        end: file_val.end.unwrap_or(defaults.sweep.end),
        step: file_val.step.unwrap_or(defaults.sweep.step),
        trials_per_candidate: file_val
            .trials_per_candidate
            .unwrap_or(defaults.sweep.trials_per_candidate),
    }
}

fn merge_convergence(
    file_val: Option<FileConvergenceConfig>,
    defaults: &DefaultsConfig,
) -> ConvergenceConfig {
    let file_val = file_val.unwrap_or_default();
    ConvergenceConfig {
        cost_threshold: file_val.cost_threshold.unwrap_or(defaults.cost_threshold),
        patience_iterations: file_val
            .patience_iterations
            .unwrap_or(defaults.patience_iterations),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

fn parse_lengths(key: &str, value: &str) -> Result<Vec<usize>> {
    value
        .split(',')
        .map(|part| parse_value(key, part))
        .collect()
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            ))
        })?;
        let key = key.trim();

        match key {
            "num-structures" => config.num_structures = Some(parse_value(key, value)?),
            "seed" => config.seed = Some(parse_value(key, value)?),
            "model.if-threshold" => {
                config.model.get_or_insert_with(Default::default).if_threshold =
                    Some(parse_value(key, value)?)
            }
            "model.avg-distance" => {
                config.model.get_or_insert_with(Default::default).avg_distance =
                    Some(parse_value(key, value)?)
            }
            "model.chromosome-lengths" => {
                config
                    .model
                    .get_or_insert_with(Default::default)
                    .chromosome_lengths = Some(parse_lengths(key, value)?)
            }
            "conversion.alpha" => {
                config.conversion.get_or_insert_with(Default::default).alpha =
                    Some(parse_value(key, value)?)
            }
            "conversion.sweep.start"
            | "conversion.sweep.end"
            | "conversion.sweep.step"
            | "conversion.sweep.trials-per-candidate" => {
                let sweep = config
                    .conversion
                    .get_or_insert_with(Default::default)
                    .sweep
                    .get_or_insert_with(Default::default);
                match key {
                    "conversion.sweep.start" => sweep.start = Some(parse_value(key, value)?),
                    "conversion.sweep.end" => sweep.end = Some(parse_value(key, value)?),
                    "conversion.sweep.step" => sweep.step = Some(parse_value(key, value)?),
                    _ => sweep.trials_per_candidate = Some(parse_value(key, value)?),
                }
            }
            "optimization.learning-rate" => {
                config
                    .optimization
                    .get_or_insert_with(Default::default)
                    .learning_rate = Some(parse_value(key, value)?)
            }
            "optimization.max-iterations" => {
                config
                    .optimization
                    .get_or_insert_with(Default::default)
                    .max_iterations = Some(parse_value(key, value)?)
            }
            "optimization.convergence.cost-threshold" => {
                config
                    .optimization
                    .get_or_insert_with(Default::default)
                    .convergence
                    .get_or_insert_with(Default::default)
                    .cost_threshold = Some(parse_value(key, value)?)
            }
            "optimization.convergence.patience-iterations" => {
                config
                    .optimization
                    .get_or_insert_with(Default::default)
                    .convergence
                    .get_or_insert_with(Default::default)
                    .patience_iterations = Some(parse_value(key, value)?)
            }
            "parallel.workers" => {
                config.parallel.get_or_insert_with(Default::default).workers =
                    Some(parse_value(key, value)?)
            }
            "parallel.cost-aggregation" => {
                config
                    .parallel
                    .get_or_insert_with(Default::default)
                    .cost_aggregation = Some(value.trim().to_string())
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::InputFormat;
    use hicmax::core::io::contacts::ContactFormat;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn base_io() -> IoArgs {
        IoArgs {
            input: PathBuf::from("data/chr7.txt"),
            output: PathBuf::from("out"),
            config: None,
            format: InputFormat::Auto,
            prefix: None,
            set_values: vec![],
        }
    }

    fn base_reconstruct_args() -> ReconstructArgs {
        ReconstructArgs {
            io: base_io(),
            model: ModelArgs::default(),
            search_alpha: false,
            num_structures: None,
            learning_rate: None,
            max_iterations: None,
            workers: None,
            cost_aggregation: None,
            seed: None,
        }
    }

    #[test]
    fn defaults_fill_everything_and_search_the_exponent() {
        let app = build_reconstruct_config(&base_reconstruct_args()).unwrap();
        let defaults = DefaultsConfig::default();
        let cfg = app.core_config;

        assert_eq!(app.prefix, "chr7");
        assert_eq!(app.format, None);
        assert_eq!(cfg.num_structures, defaults.num_structures);
        assert_eq!(cfg.model.avg_distance, defaults.avg_distance);
        assert_eq!(cfg.model.if_threshold, defaults.if_threshold);
        assert_eq!(cfg.model.chromosome_lengths, None);
        assert_eq!(cfg.optimization.learning_rate, defaults.learning_rate);
        assert_eq!(cfg.optimization.max_iterations, defaults.max_iterations);
        assert_eq!(
            cfg.optimization.convergence.patience_iterations,
            defaults.patience_iterations
        );
        assert_eq!(cfg.parallel.num_workers, 1);
        assert_eq!(cfg.parallel.cost_aggregation, CostAggregation::PerWorker);
        assert_eq!(cfg.conversion, ConversionMode::Search(AlphaSweep::default()));
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn cli_overrides_file_which_overrides_defaults() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(
            &cfg_path,
            r#"
            num-structures = 5
            seed = 9

            [model]
            avg-distance = 6.0
            chromosome-lengths = [4, 4]

            [conversion]
            alpha = 0.7

            [optimization]
            learning-rate = 0.25
            max-iterations = 200

            [parallel]
            workers = 3
            cost-aggregation = "global"
            "#,
        )
        .unwrap();

        let mut args = base_reconstruct_args();
        args.io.config = Some(cfg_path);
        args.io.format = InputFormat::Matrix;
        args.io.prefix = Some("run".to_string());
        args.num_structures = Some(2);
        args.model.avg_distance = Some(12.0);

        let app = build_reconstruct_config(&args).unwrap();
        let cfg = app.core_config;
        assert_eq!(app.prefix, "run");
        assert_eq!(app.format, Some(ContactFormat::Matrix));
        assert_eq!(cfg.num_structures, 2);
        assert_eq!(cfg.seed, Some(9));
        assert_eq!(cfg.model.avg_distance, 12.0);
        assert_eq!(cfg.model.chromosome_lengths, Some(vec![4, 4]));
        assert_eq!(cfg.conversion, ConversionMode::Fixed(0.7));
        assert_eq!(cfg.optimization.learning_rate, 0.25);
        assert_eq!(cfg.optimization.max_iterations, 200);
        assert_eq!(cfg.parallel.num_workers, 3);
        assert_eq!(cfg.parallel.cost_aggregation, CostAggregation::Global);
    }

    #[test]
    fn search_flag_overrides_file_alpha() {
        let mut args = base_reconstruct_args();
        args.io.set_values = vec![
            "conversion.alpha=1.1".to_string(),
            "conversion.sweep.start=0.5".to_string(),
            "conversion.sweep.trials-per-candidate=1".to_string(),
        ];
        args.search_alpha = true;

        let cfg = build_reconstruct_config(&args).unwrap().core_config;
        let ConversionMode::Search(sweep) = cfg.conversion else {
            panic!("expected a sweep");
        };
        assert_eq!(sweep.start, 0.5);
        assert_eq!(sweep.end, AlphaSweep::default().end);
        assert_eq!(sweep.trials_per_candidate, 1);
    }

    #[test]
    fn set_values_reach_nested_keys() {
        let mut args = base_reconstruct_args();
        args.io.set_values = vec![
            "optimization.convergence.cost-threshold=0.01".to_string(),
            "optimization.convergence.patience-iterations=3".to_string(),
            "model.chromosome-lengths=5, 6".to_string(),
            "parallel.cost-aggregation=global".to_string(),
            "seed=11".to_string(),
        ];

        let cfg = build_reconstruct_config(&args).unwrap().core_config;
        assert_eq!(cfg.optimization.convergence.cost_threshold, 0.01);
        assert_eq!(cfg.optimization.convergence.patience_iterations, 3);
        assert_eq!(cfg.model.chromosome_lengths, Some(vec![5, 6]));
        assert_eq!(cfg.parallel.cost_aggregation, CostAggregation::Global);
        assert_eq!(cfg.seed, Some(11));
    }

    #[test]
    fn set_values_reject_bad_input() {
        let bad_format = apply_set_values(FileConfig::default(), &["seed".to_string()]);
        assert!(matches!(bad_format, Err(CliError::Config(_))));

        let bad_key = apply_set_values(FileConfig::default(), &["model.alpha=1".to_string()]);
        assert!(matches!(bad_key, Err(CliError::Config(_))));

        let bad_value = apply_set_values(
            FileConfig::default(),
            &["optimization.max-iterations=many".to_string()],
        );
        assert!(matches!(bad_value, Err(CliError::Config(_))));
    }

    #[test]
    fn unknown_cost_aggregation_is_a_config_error() {
        let mut args = base_reconstruct_args();
        args.cost_aggregation = Some("mean".to_string());
        let result = build_reconstruct_config(&args);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn invalid_values_fail_core_validation() {
        let mut args = base_reconstruct_args();
        args.model.alpha = Some(1.0);
        args.learning_rate = Some(-1.0);
        let result = build_reconstruct_config(&args);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn preprocess_requires_an_exponent() {
        let args = PreprocessArgs {
            io: base_io(),
            model: ModelArgs::default(),
        };
        assert!(matches!(
            build_preprocess_config(&args),
            Err(CliError::Config(_))
        ));

        let args = PreprocessArgs {
            io: base_io(),
            model: ModelArgs {
                alpha: Some(1.5),
                if_threshold: Some(0.2),
                ..ModelArgs::default()
            },
        };
        let cfg = build_preprocess_config(&args).unwrap().core_config;
        assert_eq!(cfg.conversion, ConversionMode::Fixed(1.5));
        assert_eq!(cfg.model.if_threshold, 0.2);
    }
}
