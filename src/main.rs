//! # BuildTools CLI
//!
//! This is the binary entry point for the `buildtools` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap` (malformed arguments exit
//!   with status 2).
//! - Running the build pipeline.
//! - Turning a failed run into a printed error and exit status 1.
//!
//! The pipeline itself lives in the `buildtools` library crate; the binary
//! is a thin wrapper around it.

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
