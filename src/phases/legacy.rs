//! Stage 8: Legacy linking
//!
//! Builds whose metadata predates tools version 93 expect Bukkit and
//! CraftBukkit as nested clones inside `Spigot/`. Both are cloned from the
//! local repositories, in parallel, when absent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::defaults::LEGACY_LINK_BELOW_TOOLS_VERSION;
use crate::error::Result;
use crate::metadata::BuildMetadata;
use crate::repository::{ManagedRepository, RepositoryManager};
use crate::tasks::{task, TaskRunner};

/// Returns whether any nested clone was created.
pub fn execute(
    metadata: &BuildMetadata,
    repos: &RepositoryManager,
    runner: &TaskRunner,
) -> Result<bool> {
    if metadata.tools_version >= LEGACY_LINK_BELOW_TOOLS_VERSION {
        return Ok(false);
    }

    let spigot = repos.path(ManagedRepository::Spigot);
    let cloned = Arc::new(AtomicBool::new(false));
    let tasks = [ManagedRepository::Bukkit, ManagedRepository::CraftBukkit]
        .into_iter()
        .map(|source| {
            let repos = repos.clone();
            let target = spigot.join(source.dir_name());
            let cloned = Arc::clone(&cloned);
            task(move || {
                if repos.clone_local(source, &target)? {
                    cloned.store(true, Ordering::SeqCst);
                }
                Ok(0)
            })
        })
        .collect();
    runner.run(tasks)?;
    Ok(cloned.load(Ordering::SeqCst))
}
