//! Command-line interface definition for zipview.
//!
//! This module defines the CLI structure using `clap` derive macros,
//! providing a familiar interface similar to the standard `unzip` utility.

use clap::Parser;

/// Command-line arguments for the zipview utility.
#[derive(Parser, Debug)]
#[command(name = "zipview")]
#[command(version)]
#[command(about = "A read-only ZIP/ZIP64 archive reader", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipview data1.zip -x joe        extract all files except joe from data1.zip\n  \
  zipview -p foo.zip | more       send contents of foo.zip via pipe into more\n  \
  zipview -v archive.zip          show detailed archive contents")]
pub struct Cli {
    /// Path to the ZIP archive.
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (default: all).
    ///
    /// Optional list of file patterns to extract from the archive.
    /// Supports substring matching and basic glob patterns (* and ?).
    /// If not specified, all files are extracted.
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format).
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely: size, compression ratio, and timestamps.
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages.
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir.
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow.
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files.
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting.
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories).
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter).
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Log structural parse events (end record found, zip64 resolved, each
    /// header parsed) to stderr via `RUST_LOG`.
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Check if quiet mode is enabled.
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    /// Check if very quiet mode is enabled.
    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }
}
