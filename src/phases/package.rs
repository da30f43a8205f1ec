//! Stage 10: Package
//!
//! Copies the produced server jars into the output directory:
//!
//! - `CraftBukkit/target/craftbukkit*.jar` to `craftbukkit-<version>.jar`
//!   for builds before tools version 101, or after 104 when CraftBukkit
//!   was compiled;
//! - `Spigot/Spigot-Server/target/spigot*.jar` to `spigot-<version>.jar`
//!   when Spigot was compiled.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::{BuildConfig, CompileTarget};
use crate::defaults::{COMBINED_COMPILE_UP_TO_TOOLS_VERSION, CRAFTBUKKIT_JAR_BELOW_TOOLS_VERSION};
use crate::error::Result;
use crate::metadata::BuildMetadata;
use crate::repository::{ManagedRepository, RepositoryManager};

/// Whether the CraftBukkit jar is part of the output.
pub fn ships_craftbukkit(tools_version: i32, compiled: &[CompileTarget]) -> bool {
    tools_version < CRAFTBUKKIT_JAR_BELOW_TOOLS_VERSION
        || (tools_version > COMBINED_COMPILE_UP_TO_TOOLS_VERSION
            && compiled.contains(&CompileTarget::Craftbukkit))
}

/// Returns the jars written to the output directory.
pub fn execute(
    config: &BuildConfig,
    repos: &RepositoryManager,
    metadata: &BuildMetadata,
    compiled: &[CompileTarget],
) -> Result<Vec<PathBuf>> {
    info!("Success! Everything completed successfully. Copying final .jar files now.");
    let version = &metadata.minecraft_version;
    let mut artifacts = Vec::new();

    if ships_craftbukkit(metadata.tools_version, compiled) {
        let dir = repos.path(ManagedRepository::CraftBukkit).join("target");
        let out = config.output_dir.join(format!("craftbukkit-{}.jar", version));
        artifacts.extend(copy_jar(&dir, "craftbukkit", &out)?);
    }
    if compiled.contains(&CompileTarget::Spigot) {
        let dir = repos
            .path(ManagedRepository::Spigot)
            .join("Spigot-Server")
            .join("target");
        let out = config.output_dir.join(format!("spigot-{}.jar", version));
        artifacts.extend(copy_jar(&dir, "spigot", &out)?);
    }

    Ok(artifacts)
}

/// Copy the jar in `dir` named `<prefix>*.jar` to `out`.
///
/// When several match, the shortest name wins, which skips classifier
/// jars such as `-sources` or `-shaded`.
pub fn copy_jar(dir: &Path, prefix: &str, out: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.is_file()
                    && path.file_name().and_then(|n| n.to_str()).is_some_and(|name| {
                        name.starts_with(prefix) && name.ends_with(".jar")
                    })
            })
            .collect(),
        Err(e) => {
            warn!("Could not list {}: {}", dir.display(), e);
            return Ok(None);
        }
    };
    candidates.sort_by_key(|path| (path.as_os_str().len(), path.clone()));

    let Some(jar) = candidates.into_iter().next() else {
        warn!("No {}*.jar found in {}", prefix, dir.display());
        return Ok(None);
    };

    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&jar, out)?;
    info!("  - Saved as {}", out.display());
    Ok(Some(out.to_path_buf()))
}
