use crate::{BestOfConfig, ParallelConfig};
use clap::{error::ErrorKind, Parser};

/// Command line arguments for the kernel profiler.
#[derive(Parser, Debug)]
#[command(name = "padshrink-profile", about = "Compare shrink kernels on convolution layer shapes")]
struct Args {
    /// Batch size used for every layer shape
    #[arg(long, default_value_t = 64, value_parser = validate_positive)]
    batch: usize,

    /// Vertical padding added around each layer input
    #[arg(long, default_value_t = 1)]
    vpadding: usize,

    /// Horizontal padding added around each layer input
    #[arg(long, default_value_t = 1)]
    hpadding: usize,

    /// Maximum competition rounds per problem size
    #[arg(long, default_value_t = 10, value_parser = validate_positive)]
    rounds: usize,

    /// Worker threads (defaults to one per logical core)
    #[arg(long, value_parser = validate_positive)]
    threads: Option<usize>,

    /// Seed for the random layer inputs
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Skip the competition and always run the first alternative
    #[arg(long)]
    first_only: bool,
}

/// Settings for a profiling run
#[derive(Debug, Clone)]
pub struct ProfileSettings {
    pub batch: usize,
    pub vpadding: usize,
    pub hpadding: usize,
    pub seed: u64,
    pub first_only: bool,
    pub parallel: ParallelConfig,
    pub best_of: BestOfConfig,
}

/// Validates that a numeric argument is at least one
fn validate_positive(value: &str) -> Result<usize, clap::Error> {
    let parsed: usize = value.parse().map_err(|_| {
        clap::Error::raw(
            ErrorKind::InvalidValue,
            format!("Not a positive integer: {}", value),
        )
    })?;
    if parsed == 0 {
        return Err(clap::Error::raw(
            ErrorKind::InvalidValue,
            "Value must be at least 1",
        ));
    }
    Ok(parsed)
}

impl From<Args> for ProfileSettings {
    fn from(args: Args) -> Self {
        ProfileSettings {
            batch: args.batch,
            vpadding: args.vpadding,
            hpadding: args.hpadding,
            seed: args.seed,
            first_only: args.first_only,
            parallel: ParallelConfig {
                num_threads: args.threads,
            },
            best_of: BestOfConfig {
                rounds: args.rounds,
                ..BestOfConfig::default()
            },
        }
    }
}

/// Parses and validates command line arguments
pub fn parse_arguments() -> Result<ProfileSettings, clap::Error> {
    validate_args(Args::try_parse()?)
}

fn validate_args(args: Args) -> Result<ProfileSettings, clap::Error> {
    if args.vpadding == 0 && args.hpadding == 0 {
        return Err(clap::Error::raw(
            ErrorKind::ArgumentConflict,
            "At least one of --vpadding and --hpadding must be positive",
        ));
    }
    Ok(args.into())
}
