// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build front-end assets from a declarative task graph, and rebuild them on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Assetdag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Assetdag.toml")]
    pub config: String,

    /// Run production command templates (`production_cmd`).
    #[arg(long)]
    pub production: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task tree, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Dev server host (overrides `[server].host`).
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Dev server port (overrides `[server].port`).
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Watch without starting the dev server.
    #[arg(long)]
    pub no_server: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Clean the destination root, then run every build transform.
    Build,
    /// Build once, then rebuild on change and serve with live reload (default).
    Watch,
    /// Print the registered tasks and their structure.
    List,
    /// Run a single named task (transform, composite or `clean`).
    #[command(external_subcommand)]
    Task(Vec<String>),
}

impl CliArgs {
    /// The command to run; `watch` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch)
    }
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
