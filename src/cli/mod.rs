//! Command-line interface components
//!
//! Argument parsing and the handlers behind each subcommand.

pub mod args;
pub mod commands;

pub use args::{ClassifyArgs, Cli, Commands, FetchArgs, GlobalArgs, ServeArgs};
pub use commands::{handle_classify, handle_fetch, handle_serve, handle_stats};
