//! Stages of a BuildTools run.
//!
//! ## Overview
//!
//! A run is a linear sequence of stages, each in its own module with an
//! `execute` entry point:
//!
//! 1. [`resolve`] - Validate the configuration and prepare the workspace
//! 2. [`environment`] - Probe shell, git, Maven and Java (installing the portable tools)
//! 3. [`workspace`] - Clone the repositories, resolve the version, check compatibility, synchronize
//! 4. [`vanilla`] - Read the build metadata and acquire the vanilla server jar
//! 5. [`remap`] - Produce the mapped jar (cached) and install it into the local Maven repository
//! 6. [`decompile`] - Decompile the mapped server classes (cached)
//! 7. [`patching`] - Apply the CraftBukkit patches and commit the result
//! 8. [`legacy`] - Link nested repositories for old source layouts
//! 9. [`compile`] - Run Maven and the Spigot patch script
//! 10. [`package`] - Copy the produced jars to the output directory
//!
//! The [`orchestrator`] runs them in order and stops early for
//! `--compile-if-changed` and `--exit-after-fetch`. Any stage failure
//! aborts the run.

use std::path::{Path, PathBuf};

pub mod compile;
pub mod decompile;
pub mod environment;
pub mod legacy;
pub mod orchestrator;
pub mod package;
pub mod patching;
pub mod remap;
pub mod resolve;
pub mod vanilla;
pub mod workspace;

/// Render `path` for a command template run from `workspace`.
///
/// Templates are split on single spaces, so workspace-relative paths are
/// used wherever possible.
pub(crate) fn template_arg(path: &Path, workspace: &Path) -> String {
    path.strip_prefix(workspace)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Result of a run that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The build completed; contains the packaged jars.
    Built { artifacts: Vec<PathBuf> },
    /// `--compile-if-changed` found nothing new.
    Unchanged,
    /// `--exit-after-fetch` stopped after synchronizing.
    FetchedOnly,
}
