use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vodforge")]
#[command(author, version, about = "Queue-driven HLS transcoding worker")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wait for dependencies, then claim and transcode jobs
    Worker {
        /// Number of concurrent workers (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Drain the queue once and exit instead of polling forever
        #[arg(long)]
        once: bool,
    },

    /// Validate an uploaded original and enqueue a transcode job
    Enqueue {
        /// Content identifier; becomes the published directory name
        #[arg(required = true)]
        content_id: String,

        /// Path to the original video file
        #[arg(required = true)]
        source: PathBuf,

        /// Comma-separated rendition labels (default: the whole ladder)
        #[arg(long, value_delimiter = ',')]
        renditions: Vec<String>,

        /// Copy the original into the media root before enqueueing
        #[arg(long)]
        copy: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one job by content id or job id
    Status {
        /// Content id or job id
        #[arg(required = true)]
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List jobs, newest first
    List {
        /// Only show jobs in this state (pending, claimed, succeeded, failed)
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of jobs to show
        #[arg(long, default_value = "50")]
        limit: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Return jobs with expired leases to the queue
    Reap,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
