//! # Build Configuration
//!
//! [`BuildConfig`] is the immutable description of one run. The CLI builds
//! it once from the parsed arguments; every stage reads it and none of them
//! changes it.
//!
//! Contradictory combinations are rejected up front by
//! [`BuildConfig::validate`]:
//!
//! - `--dont-update` together with an explicit `--rev`,
//! - `--dev` together with an explicit `--rev`,
//! - a workspace path containing characters that break the shell scripts
//!   run during the build.

use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::defaults;
use crate::error::{Error, Result};

/// Artifacts the compile stage can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum CompileTarget {
    /// Compile nothing.
    None,
    /// Bukkit and CraftBukkit.
    Craftbukkit,
    /// Spigot and the Spigot API.
    Spigot,
}

/// How refs are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Refs come from the requested version descriptor.
    #[default]
    Release,
    /// Every repository follows its default branch; hashes are advisory.
    Development,
}

/// Immutable configuration of a single pipeline run
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory holding the managed repositories and `work/`.
    pub workspace: PathBuf,
    /// Where packaged jars are copied.
    pub output_dir: PathBuf,
    pub mode: RunMode,
    /// Explicit version pin; `None` builds the default revision.
    pub revision: Option<String>,
    /// Skip version resolution and repository synchronization.
    pub dont_update: bool,
    /// Requested targets; empty selects the defaults for the version.
    pub compile: Vec<CompileTarget>,
    pub generate_source: bool,
    pub generate_docs: bool,
    pub exit_after_fetch: bool,
    pub compile_if_changed: bool,
    pub java_check: bool,
    pub certificate_check: bool,
    /// JVM options whose heap sizing flags are forwarded to child JVMs.
    pub jvm_options: Vec<String>,
    /// Directory of published version descriptors.
    pub versions_url: String,
    /// Build number of this tool, when it was stamped at build time.
    pub build_number: Option<i32>,
}

impl BuildConfig {
    /// Configuration with default options for `workspace`.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            output_dir: defaults::default_output_dir(),
            mode: RunMode::Release,
            revision: None,
            dont_update: false,
            compile: Vec::new(),
            generate_source: false,
            generate_docs: false,
            exit_after_fetch: false,
            compile_if_changed: false,
            java_check: true,
            certificate_check: true,
            jvm_options: Vec::new(),
            versions_url: defaults::VERSIONS_BASE_URL.to_string(),
            build_number: defaults::build_number(),
        }
    }

    pub fn is_dev(&self) -> bool {
        self.mode == RunMode::Development
    }

    /// The revision to resolve.
    pub fn revision(&self) -> &str {
        self.revision.as_deref().unwrap_or(defaults::DEFAULT_REVISION)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.workspace.join("work")
    }

    pub fn log_file(&self) -> PathBuf {
        self.workspace.join(defaults::LOG_FILE)
    }

    /// Reject contradictory options and unusable workspaces.
    pub fn validate(&self) -> Result<()> {
        if self.revision.is_some() {
            if self.dont_update {
                return Err(Error::Configuration {
                    message: "--dont-update cannot be combined with --rev: no version is resolved without updating".to_string(),
                });
            }
            if self.is_dev() {
                return Err(Error::Configuration {
                    message: "--dev cannot be combined with --rev: development builds always use the default branches".to_string(),
                });
            }
        }
        check_workspace_path(&self.workspace)
    }
}

/// Reject workspace paths containing characters that break shell scripts.
pub fn check_workspace_path(path: &Path) -> Result<()> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let text = absolute.to_string_lossy();
    if let Some(c) = text.chars().find(|c| defaults::FORBIDDEN_PATH_CHARS.contains(c)) {
        return Err(Error::Configuration {
            message: format!(
                "Please do not run in a path with special characters! '{}' contains '{}'",
                text, c
            ),
        });
    }
    Ok(())
}
