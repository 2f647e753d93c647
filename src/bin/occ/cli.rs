//! # Cli
//!
//! This module contains everything needed for parsing `occ`'s CLI arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Specify the log level of the compiler.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    #[default]
    #[value(alias("0"))]
    Error,
    #[value(alias("1"))]
    Warn,
    #[value(alias("2"))]
    Info,
    #[value(alias("3"))]
    Debug,
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new project scaffold with a default `.ocproj`.
    Create(CreateArgs),

    /// Build every source file under the project root and link the result.
    Build(BuildArgs),

    /// Remove the `obj/` and `bin/` output directories.
    Clean,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// The name of the project to scaffold.
    #[arg(index = 1)]
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// The project root (defaults to the current directory).
    #[arg(index = 1, default_value = ".")]
    pub project_dir: PathBuf,

    /// Number of worker threads for Wave 1 parsing (defaults to the available parallelism).
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Skip linking against the standard runtime.
    #[arg(long)]
    pub no_std: bool,

    /// Skip invoking the linker; only emit object files.
    #[arg(long)]
    pub no_autolink: bool,

    /// Dump the generated LLVM IR for each file alongside its object file.
    #[arg(long)]
    pub emit_llvm: bool,
}
