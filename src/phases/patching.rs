//! Stage 7: Patch application
//!
//! Rebuilds CraftBukkit's `src/main/java/net` from the decompiled sources
//! and the `nms-patches/` directory, then records the result in git.
//!
//! ## Process
//!
//! 1.  **Backup**: an existing `src/main/java/net` is moved to
//!     `work/nms.old.<millis>`.
//!
//! 2.  **Patch**: every `<Name>.patch`, in file name order, is applied to
//!     `net/minecraft/server/<Name>.java` of the decompiled tree and written
//!     into the fresh source tree. A hunk that does not match aborts the run.
//!
//! 3.  **Commit**: the tree is copied to `tmp-nms`, committed on a
//!     force-created `patched` branch, the descriptor's CraftBukkit ref is
//!     checked out again and `tmp-nms` is moved back into place.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use log::info;
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::error::Result;
use crate::metadata::VersionDescriptor;
use crate::patch::PatchSet;
use crate::repository::{ManagedRepository, RepositoryManager};

pub const PATCHES_DIR: &str = "nms-patches";
pub const PATCHED_BRANCH: &str = "patched";
const SOURCE_ROOT: &str = "src/main/java";
const TMP_NMS_DIR: &str = "tmp-nms";

/// Returns the written files, relative to CraftBukkit's source root.
pub fn execute(
    config: &BuildConfig,
    repos: &RepositoryManager,
    descriptor: &VersionDescriptor,
    decompile_dir: &Path,
) -> Result<Vec<PathBuf>> {
    info!("Applying CraftBukkit Patches");
    let craftbukkit = repos.path(ManagedRepository::CraftBukkit);
    let source_root = craftbukkit.join(SOURCE_ROOT);
    let nms_dir = source_root.join("net");

    let patches = PatchSet::load(&craftbukkit.join(PATCHES_DIR))?;

    if nms_dir.exists() {
        let backup = config
            .work_dir()
            .join(format!("nms.old.{}", Utc::now().timestamp_millis()));
        info!("Backing up NMS dir to {}", backup.display());
        fs::create_dir_all(config.work_dir())?;
        fs::rename(&nms_dir, &backup)?;
    }

    let written = patches.apply_all(decompile_dir, &source_root)?;
    info!("Applied {} patches", written.len());
    fs::create_dir_all(&nms_dir)?;

    let tmp_nms = craftbukkit.join(TMP_NMS_DIR);
    if tmp_nms.exists() {
        fs::remove_dir_all(&tmp_nms)?;
    }
    copy_dir(&nms_dir, &tmp_nms)?;

    let git = repos.git();
    git.create_branch(&craftbukkit, PATCHED_BRANCH)?;
    git.add(&craftbukkit, &format!("{}/net/", SOURCE_ROOT))?;
    git.commit(&craftbukkit, &commit_message())?;
    git.checkout(&craftbukkit, descriptor.ref_for(ManagedRepository::CraftBukkit))?;

    if nms_dir.exists() {
        fs::remove_dir_all(&nms_dir)?;
    }
    fs::rename(&tmp_nms, &nms_dir)?;

    Ok(written)
}

fn commit_message() -> String {
    format!("CraftBukkit $ {}", Local::now().format("%a %b %d %H:%M:%S %Z %Y"))
}

/// Recursively copy `from` into `to`.
pub fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::repository::testing::MockGitOperations;
    use std::sync::Arc;
    use tempfile::TempDir;

    const BASE: &str = "package net.minecraft.server;\n\npublic class Block {\n    int id;\n}\n";
    const PATCH: &str = "--- a/net/minecraft/server/Block.java\n+++ b/net/minecraft/server/Block.java\n@@ -3,3 +3,4 @@\n public class Block {\n     int id;\n+    boolean patched;\n }\n";

    struct Fixture {
        _temp_dir: TempDir,
        config: BuildConfig,
        repos: RepositoryManager,
        mock: Arc<MockGitOperations>,
        decompiled: PathBuf,
        craftbukkit: PathBuf,
    }

    fn fixture(patch: &str) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let decompiled = root.join("work/decompile-abcd1234");
        fs::create_dir_all(decompiled.join("net/minecraft/server")).unwrap();
        fs::write(decompiled.join("net/minecraft/server/Block.java"), BASE).unwrap();
        fs::write(decompiled.join("net/minecraft/server/World.java"), "class World {}\n").unwrap();

        let craftbukkit = root.join("CraftBukkit");
        fs::create_dir_all(craftbukkit.join(PATCHES_DIR)).unwrap();
        fs::write(craftbukkit.join(PATCHES_DIR).join("Block.patch"), patch).unwrap();

        let mock = Arc::new(MockGitOperations::new());
        Fixture {
            config: BuildConfig::new(&root),
            repos: RepositoryManager::with_operations(&root, mock.clone()),
            mock,
            decompiled,
            craftbukkit,
            _temp_dir: temp_dir,
        }
    }

    #[test]
    fn test_tree_contains_exactly_patch_targets() {
        let f = fixture(PATCH);
        let written = execute(&f.config, &f.repos, &VersionDescriptor::development(), &f.decompiled)
            .unwrap();

        assert_eq!(written, vec![PathBuf::from("net/minecraft/server/Block.java")]);
        let nms = f.craftbukkit.join("src/main/java/net/minecraft/server");
        let files: Vec<_> = fs::read_dir(&nms).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(files, vec!["Block.java"]);
        assert!(fs::read_to_string(nms.join("Block.java"))
            .unwrap()
            .contains("boolean patched;"));
        assert!(!f.craftbukkit.join(TMP_NMS_DIR).exists());
    }

    #[test]
    fn test_commits_on_patched_branch_and_restores_ref() {
        let f = fixture(PATCH);
        let mut descriptor = VersionDescriptor::development();
        descriptor.refs.craftbukkit = "cb1".to_string();
        execute(&f.config, &f.repos, &descriptor, &f.decompiled).unwrap();

        let calls = f.mock.calls_for("CraftBukkit");
        assert_eq!(calls[0], "branch patched [CraftBukkit]");
        assert_eq!(calls[1], "add src/main/java/net/ [CraftBukkit]");
        assert!(calls[2].starts_with("commit CraftBukkit $ "));
        assert_eq!(calls[3], "checkout cb1 [CraftBukkit]");
    }

    #[test]
    fn test_existing_tree_is_backed_up() {
        let f = fixture(PATCH);
        let stale = f.craftbukkit.join("src/main/java/net/minecraft/server/Stale.java");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "stale").unwrap();

        execute(&f.config, &f.repos, &VersionDescriptor::development(), &f.decompiled).unwrap();

        assert!(!stale.exists());
        let backups: Vec<_> = fs::read_dir(f.config.work_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("nms.old."))
            .collect();
        assert_eq!(backups.len(), 1);
        assert!(f
            .config
            .work_dir()
            .join(&backups[0])
            .join("minecraft/server/Stale.java")
            .exists());
    }

    #[test]
    fn test_mismatched_patch_aborts_before_commit() {
        let f = fixture("@@ -3,2 +3,2 @@\n public class Chunk {\n-    int id;\n+    long id;\n");
        let err = execute(&f.config, &f.repos, &VersionDescriptor::development(), &f.decompiled)
            .unwrap_err();

        assert!(matches!(err, Error::PatchApplication { .. }));
        assert!(f.mock.calls_for("CraftBukkit").is_empty());
    }

    #[test]
    fn test_copy_dir() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("from");
        fs::create_dir_all(from.join("a/b")).unwrap();
        fs::write(from.join("a/b/c.txt"), "c").unwrap();
        fs::write(from.join("top.txt"), "top").unwrap();

        let to = temp_dir.path().join("to");
        copy_dir(&from, &to).unwrap();
        assert_eq!(fs::read_to_string(to.join("a/b/c.txt")).unwrap(), "c");
        assert_eq!(fs::read_to_string(to.join("top.txt")).unwrap(), "top");
    }
}
