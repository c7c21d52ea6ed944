use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cfd",
    about = "Content-addressed file deployer",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy every file in a directory to a store
    Deploy(DeployArgs),
    /// Show the writes a deployment would issue, without writing
    Plan(PlanArgs),
    /// Rebuild deployed files from a manifest
    Restore(RestoreArgs),
    /// Read back every file in a manifest and check it
    Verify(VerifyArgs),
}

/// Settings shared by commands that run the pipeline.
#[derive(Args)]
pub struct PipelineArgs {
    /// Directory holding the files to deploy
    pub source: PathBuf,
    /// Store directory (created if missing)
    #[arg(long)]
    pub store: PathBuf,
    /// TOML file with deployment settings
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub max_chunk_bytes: Option<usize>,
    #[arg(long)]
    pub max_chunks_per_tx: Option<usize>,
    /// Include files in subdirectories
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
    /// Where to write the manifest (default: <STORE>/manifest.json)
    #[arg(long)]
    pub manifest: Option<PathBuf>,
    /// Skip reading files back after deploying
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args)]
pub struct RestoreArgs {
    pub manifest: PathBuf,
    #[arg(long)]
    pub store: PathBuf,
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub manifest: PathBuf,
    #[arg(long)]
    pub store: PathBuf,
}
