//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use eyre::Result;

/// Default model location: a local directory, falling back to a HuggingFace model ID.
pub const DEFAULT_MODEL: &str = "model";

#[derive(Debug, Parser)]
#[command(name = "urbs")]
#[command(about = "Urban sound classification from log-mel spectrograms")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify an audio file and print the top predictions
    Classify(crate::classify::Args),

    /// Extract the feature tensor of an audio file as JSON
    Features(crate::features::Args),

    /// Extract features for a labeled dataset directory as JSON lines
    Extract(crate::extract::Args),

    /// Print duration, sample rate and channel count of an audio file
    Info(crate::info::Args),
}

/// Where to look up the model.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelSource {
    /// Local directory if it exists, HuggingFace API otherwise
    #[default]
    Auto,
    /// Local directory
    Path,
    /// HuggingFace cache only
    Cache,
    /// HuggingFace API (downloads on demand)
    Api,
}

/// Model location arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ModelArgs {
    /// Model directory or HuggingFace model ID
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// How to resolve `--model`
    #[arg(long, value_enum, default_value_t = ModelSource::Auto)]
    pub model_source: ModelSource,
}

/// Execute CLI command - separated for testing.
pub fn run_cli(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Classify(args) => crate::classify::execute(args.try_into()?),
        Commands::Features(args) => crate::features::execute(args.try_into()?),
        Commands::Extract(args) => crate::extract::execute(args.try_into()?),
        Commands::Info(args) => crate::info::execute(args.try_into()?),
    }
}
