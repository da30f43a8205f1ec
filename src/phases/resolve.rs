//! Stage 1: Resolve
//!
//! Rejects contradictory option combinations and unusable workspace paths,
//! then creates the workspace and its `work/` directory.

use std::fs;

use log::{info, warn};

use crate::config::BuildConfig;
use crate::error::Result;

pub fn execute(config: &BuildConfig) -> Result<()> {
    config.validate()?;

    if config.is_dev() {
        warn!("Running in development mode: every repository follows its default branch");
    }
    if config.dont_update {
        info!("Skipping version resolution and repository updates");
    }
    if !config.java_check {
        warn!("Java version checks are disabled");
    }

    fs::create_dir_all(config.work_dir())?;
    Ok(())
}
