//! Command-line argument parsing for Update Relay
//!
//! This module defines the CLI structure using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Update Relay - serve an update manifest for the latest GitHub release
#[derive(Parser, Debug)]
#[command(
    name = "update_relay",
    version,
    about = "Serve an auto-update manifest built from the latest GitHub release",
    long_about = "Polls a GitHub release repository with conditional requests, classifies the
published artifacts per platform and serves the resulting update manifest over HTTP."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path (.yaml, .yml or .toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP manifest endpoint
    Serve(ServeArgs),

    /// Run one request through the service and print the manifest
    Fetch(FetchArgs),

    /// Show request counters and the last fetch time
    Stats,

    /// Print the platform each file name maps to
    Classify(ClassifyArgs),
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (overrides server.bind_address)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Run a fetch cycle even if the cached manifest is still fresh
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the classify command
#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// File names to classify
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by flags, if any
    ///
    /// Without a flag the configured `logging.level` applies.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::TRACE)
        } else if self.global.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }

    /// Whether the command needs the configuration file
    pub fn needs_config(&self) -> bool {
        !matches!(self.command, Commands::Classify(_))
    }
}
