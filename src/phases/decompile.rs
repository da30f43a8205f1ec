//! Stage 6: Decompile
//!
//! Produces `work/decompile-<key>/` from the mapped jar. Only the classes
//! under `net/minecraft/server` are extracted (into `classes/`) and handed
//! to the decompile command, which writes its sources next to them. The
//! `decompile-latest` link is refreshed on every run.

use std::path::PathBuf;

use log::{debug, info};

use crate::archive;
use crate::cache::{ArtifactCache, ArtifactKind};
use crate::config::BuildConfig;
use crate::defaults::DECOMPILE_CLASS_PREFIX;
use crate::error::Result;
use crate::metadata::BuildMetadata;
use crate::toolchain::Toolchain;

use super::remap::MappedJar;
use super::template_arg;

pub fn execute(
    config: &BuildConfig,
    toolchain: &Toolchain,
    cache: &ArtifactCache,
    metadata: &BuildMetadata,
    mapped: &MappedJar,
) -> Result<PathBuf> {
    let artifact = cache.resolve(ArtifactKind::DecompileDir, &mapped.key);
    let workspace = config.workspace.as_path();

    let built = cache.build_if_missing(&artifact, |staging| {
        let classes = staging.join("classes");
        let extracted = archive::extract(&mapped.jar, &classes, |name| {
            name.starts_with(DECOMPILE_CLASS_PREFIX)
        })?;
        debug!("Extracted {} classes from {}", extracted, mapped.jar.display());

        info!("Decompiling classes");
        let invocation = metadata.decompile_command.to_invocation(
            workspace,
            &[
                &template_arg(&classes, workspace),
                &template_arg(staging, workspace),
            ],
        )?;
        toolchain.executor().run(&invocation)?;
        Ok(())
    })?;
    if !built {
        info!("Decompiled sources {} are up to date", artifact.path.display());
    }

    cache.link_latest(&artifact);
    Ok(artifact.path)
}
