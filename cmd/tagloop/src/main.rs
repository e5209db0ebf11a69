//! tagloop - iterative feedback tagging.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod util;

/// tagloop - keep a feedback tag taxonomy current.
///
/// Records are sampled, labeled, clustered into an initial taxonomy, matched
/// to their closest tag, and the leftovers are escalated to grow the
/// taxonomy for the next run.
#[derive(Parser)]
#[command(name = "tagloop")]
#[command(about = "Iterative feedback tagging pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.tagloop/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON instead of YAML
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest raw feedback from a YAML or JSON file
    Ingest {
        /// Feedback file: a list of {product, channel, content, create_time}
        #[arg(short = 'f', long = "file")]
        file: String,
    },
    /// Draw a fresh stratified sample set
    Sample,
    /// Label samples that have no label yet
    Label,
    /// Build the initial taxonomy from sample labels
    Cluster,
    /// Embed records and match them to tags
    Match,
    /// Label edge records and grow the taxonomy
    Escalate,
    /// Run sample, label, cluster, match and escalate in order
    Run,
    /// Show record and tag statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    commands::run(&cli).await
}
