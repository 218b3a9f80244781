// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `execdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "execdag",
    version,
    about = "Run external tools as nodes of a dependency-driven build graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build config file (TOML).
    ///
    /// Default: `Execdag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Execdag.toml")]
    pub config: String,

    /// Dump captured stdout/stderr for every node, not just failing ones.
    #[arg(long)]
    pub show_output: bool,

    /// Log the fully-resolved command line for each node before running it.
    #[arg(long)]
    pub show_command_lines: bool,

    /// Overall per-process timeout in seconds (0 = no timeout).
    ///
    /// Overrides `[options].process_timeout_secs` from the config.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Per-process output inactivity timeout in seconds (0 = no timeout).
    ///
    /// Overrides `[options].process_output_timeout_secs` from the config.
    #[arg(long, value_name = "SECS")]
    pub output_timeout: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXECDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved nodes, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
