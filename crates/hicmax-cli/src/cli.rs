use clap::{Args, Parser, Subcommand, ValueEnum};
use hicmax::core::io::contacts::ContactFormat;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The hicmax developers",
    version,
    about = "hicmax - Reconstruct 3D genome structures from chromosome contact frequencies by maximum likelihood.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate 3D structures from a contact list or contact matrix.
    Reconstruct(ReconstructArgs),
    /// Run only the preprocessing pipeline and write the resulting constraints.
    Preprocess(PreprocessArgs),
}

/// Layout of the contact input.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Detect from the data.
    Auto,
    /// `pos1 pos2 frequency` per line.
    List,
    /// Dense square matrix.
    Matrix,
}

impl InputFormat {
    pub fn to_contact_format(self) -> Option<ContactFormat> {
        match self {
            InputFormat::Auto => None,
            InputFormat::List => Some(ContactFormat::List),
            InputFormat::Matrix => Some(ContactFormat::Matrix),
        }
    }
}

/// Input, output and configuration file arguments shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct IoArgs {
    /// Path to the contact file (list of `pos1 pos2 IF` triples or a square matrix).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory where output files are written. Created if missing.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Layout of the input file.
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// Prefix for output file names. Defaults to the input file stem.
    #[arg(long, value_name = "NAME")]
    pub prefix: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S optimization.max-iterations=500
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Overrides for the IF-to-distance model.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Conversion exponent alpha in `distance ∝ IF^-alpha`.
    /// When absent everywhere, the best exponent is searched.
    #[arg(short, long, value_name = "FLOAT")]
    pub alpha: Option<f64>,

    /// Discard contacts with frequency at or below this value.
    #[arg(long, value_name = "FLOAT")]
    pub if_threshold: Option<f64>,

    /// Mean target distance after scaling.
    #[arg(long, value_name = "FLOAT")]
    pub avg_distance: Option<f64>,

    /// Loci per chromosome, in index order (e.g. 120,95,80).
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub chromosome_lengths: Option<Vec<usize>>,
}

/// Arguments for the `reconstruct` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ReconstructArgs {
    #[command(flatten)]
    pub io: IoArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Search the conversion exponent even if the config file fixes one.
    #[arg(long, conflicts_with = "alpha")]
    pub search_alpha: bool,

    /// Override the number of structures to generate.
    #[arg(short, long, value_name = "INT")]
    pub num_structures: Option<usize>,

    /// Override the initial learning rate of the optimizer.
    #[arg(long, value_name = "FLOAT")]
    pub learning_rate: Option<f64>,

    /// Override the maximum number of optimizer iterations per structure.
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Number of constraint partitions evaluated concurrently.
    #[arg(short, long, value_name = "INT")]
    pub workers: Option<usize>,

    /// How per-worker costs are combined ('per-worker' or 'global').
    #[arg(long, value_name = "MODE")]
    pub cost_aggregation: Option<String>,

    /// Seed for the random initial structures, for reproducible runs.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,
}

/// Arguments for the `preprocess` subcommand.
#[derive(Args, Debug, Clone)]
pub struct PreprocessArgs {
    #[command(flatten)]
    pub io: IoArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}
