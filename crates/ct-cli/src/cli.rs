//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::detect::DetectArgs;
use crate::commands::parse::ParseArgs;

/// Camera capture timeline reconstruction from Android dumpstate logs.
///
/// Parses dumpsys sections into timestamped events and infers which
/// foreground sessions took photos.
#[derive(Debug, Parser)]
#[command(name = "ct", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse a log file and print the normalized events.
    Parse(ParseArgs),

    /// Detect camera captures in the given foreground sessions.
    Detect(DetectArgs),
}
