//! Stage 9: Compile
//!
//! Runs Maven over the synchronized repositories. Without an explicit
//! `--compile` list, builds up to tools version 104 (and development
//! builds) compile CraftBukkit and Spigot; newer builds compile Spigot only.
//!
//! The Spigot patch script always runs, even when nothing is compiled,
//! since it lays out `Spigot-API` and `Spigot-Server`. Failures from that
//! point on are reported as [`Error::Compile`] with support guidance.

use std::path::Path;

use log::info;

use crate::config::{BuildConfig, CompileTarget};
use crate::defaults::COMBINED_COMPILE_UP_TO_TOOLS_VERSION;
use crate::error::{Error, Result};
use crate::process::Invocation;
use crate::repository::{ManagedRepository, RepositoryManager};
use crate::toolchain::Toolchain;

use super::vanilla::VanillaArtifact;

pub const PATCH_SCRIPT: &str = "applyPatches.sh";

const SPIGOT_FAILURE_GUIDANCE: &str = "Error compiling Spigot. Please check the wiki for FAQs. If this does not resolve your issue then please pastebin the entire BuildTools.log.txt file when seeking support.";

/// Targets to build for `requested`.
pub fn resolve_targets(
    requested: &[CompileTarget],
    tools_version: i32,
    dev_mode: bool,
) -> Vec<CompileTarget> {
    if !requested.is_empty() {
        return requested.to_vec();
    }
    if tools_version <= COMBINED_COMPILE_UP_TO_TOOLS_VERSION || dev_mode {
        vec![CompileTarget::Craftbukkit, CompileTarget::Spigot]
    } else {
        vec![CompileTarget::Spigot]
    }
}

/// Returns the targets that were compiled.
pub fn execute(
    config: &BuildConfig,
    toolchain: &Toolchain,
    repos: &RepositoryManager,
    vanilla: &VanillaArtifact,
) -> Result<Vec<CompileTarget>> {
    let targets = resolve_targets(
        &config.compile,
        vanilla.metadata.tools_version,
        config.is_dev(),
    );
    let maven = |dir: &Path, goals: &[&str]| -> Result<()> {
        let mut invocation = toolchain.mvn(dir);
        if config.is_dev() {
            invocation = invocation.args(["-P", "development"]);
        }
        toolchain.executor().run(&invocation.args(goals.iter().copied()))?;
        Ok(())
    };

    if targets.contains(&CompileTarget::Craftbukkit) {
        let bukkit = repos.path(ManagedRepository::Bukkit);
        info!("Compiling Bukkit");
        maven(&bukkit, &["clean", "install"])?;
        if config.generate_docs {
            maven(&bukkit, &["javadoc:jar"])?;
        }
        if config.generate_source {
            maven(&bukkit, &["source:jar"])?;
        }

        info!("Compiling CraftBukkit");
        maven(&repos.path(ManagedRepository::CraftBukkit), &["clean", "install"])?;
    }

    let spigot = repos.path(ManagedRepository::Spigot);
    let spigot_section = || -> Result<()> {
        toolchain
            .executor()
            .run(&Invocation::new(&spigot, &vanilla.patch_shell).arg(PATCH_SCRIPT))?;
        info!("*** Spigot patches applied!");

        if targets.contains(&CompileTarget::Spigot) {
            info!("Compiling Spigot & Spigot-API");
            maven(&spigot, &["clean", "install"])?;
        }
        Ok(())
    };
    spigot_section().map_err(|e| Error::Compile {
        message: SPIGOT_FAILURE_GUIDANCE.to_string(),
        source: Box::new(e),
    })?;

    Ok(targets)
}
