//! Stage 5: Remap
//!
//! Produces `work/mapped.<key>.jar`, where the key is derived from the most
//! recent `BuildData` commit touching `mappings/`. An existing jar for the
//! current key is reused; otherwise the class, member and final remap
//! commands run strictly in sequence:
//!
//! ```text
//! vanilla jar -> mapped.<key>.jar-cl -> mapped.<key>.jar-m -> mapped.<key>.jar
//! ```
//!
//! The mapped jar is then installed into the local Maven repository as
//! `org.spigotmc:minecraft-server:<version>-SNAPSHOT`, on every run.

use std::path::{Path, PathBuf};

use log::info;

use crate::cache::{self, ArtifactCache, ArtifactKind, CacheKey};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::metadata::CommandTemplate;
use crate::repository::{ManagedRepository, RepositoryManager};
use crate::toolchain::Toolchain;

use super::template_arg;
use super::vanilla::VanillaArtifact;

/// Path whose history determines the remap key.
pub const MAPPINGS_PATH: &str = "mappings/";

/// The cached output of the stage
#[derive(Debug, Clone)]
pub struct MappedJar {
    pub key: CacheKey,
    pub jar: PathBuf,
}

/// Key of the current mappings.
pub fn mappings_key(repos: &RepositoryManager) -> Result<CacheKey> {
    let commit = repos.last_commit_touching(ManagedRepository::BuildData, MAPPINGS_PATH)?;
    Ok(cache::compute_key(commit))
}

pub fn execute(
    config: &BuildConfig,
    toolchain: &Toolchain,
    repos: &RepositoryManager,
    cache: &ArtifactCache,
    vanilla: &VanillaArtifact,
) -> Result<MappedJar> {
    let key = mappings_key(repos)?;
    let artifact = cache.resolve(ArtifactKind::MappedJar, &key);
    let workspace = config.workspace.as_path();
    let metadata = &vanilla.metadata;

    let run = |template: &CommandTemplate, args: &[&str]| -> Result<()> {
        let invocation = template.to_invocation(workspace, args)?;
        toolchain.executor().run(&invocation)?;
        Ok(())
    };
    let mapping = |file: &str| metadata.mapping_path(file).to_string_lossy().into_owned();

    let built = cache.build_if_missing(&artifact, |staging| {
        let class_mapped = artifact.with_suffix("-cl");
        let member_mapped = artifact.with_suffix("-m");

        info!("Applying class mappings");
        run(
            &metadata.class_map_command,
            &[
                &template_arg(&vanilla.jar, workspace),
                &mapping(&metadata.class_mappings),
                &template_arg(&class_mapped, workspace),
            ],
        )?;

        info!("Applying member mappings");
        run(
            &metadata.member_map_command,
            &[
                &template_arg(&class_mapped, workspace),
                &mapping(&metadata.member_mappings),
                &template_arg(&member_mapped, workspace),
            ],
        )?;

        info!("Creating remapped jar");
        run(
            &metadata.final_map_command,
            &[
                &template_arg(&member_mapped, workspace),
                &mapping(&metadata.access_transforms),
                &mapping(&metadata.package_mappings),
                &template_arg(staging, workspace),
            ],
        )
    })?;
    if !built {
        info!("Mapped jar {} is up to date", artifact.path.display());
    }

    install_mapped_jar(toolchain, workspace, &artifact.path, &metadata.minecraft_version)?;

    Ok(MappedJar {
        key,
        jar: artifact.path,
    })
}

/// Install `jar` into the local Maven repository.
pub fn install_mapped_jar(
    toolchain: &Toolchain,
    workspace: &Path,
    jar: &Path,
    minecraft_version: &str,
) -> Result<()> {
    let invocation = toolchain.mvn(workspace).args([
        "install:install-file".to_string(),
        format!("-Dfile={}", jar.display()),
        "-Dpackaging=jar".to_string(),
        "-DgroupId=org.spigotmc".to_string(),
        "-DartifactId=minecraft-server".to_string(),
        format!("-Dversion={}-SNAPSHOT", minecraft_version),
    ]);
    toolchain.executor().run(&invocation)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::MockGitOperations;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_mappings_key_from_build_data_history() {
        let temp_dir = TempDir::new().unwrap();
        let mock = Arc::new(MockGitOperations::new());
        let repos = RepositoryManager::with_operations(temp_dir.path(), mock.clone());

        let key = mappings_key(&repos).unwrap();
        assert_eq!(key, cache::compute_key(["feedface"]));
        assert_eq!(key.as_str().len(), cache::KEY_LENGTH);
        assert_eq!(mock.calls_for("BuildData"), vec!["log mappings/ [BuildData]"]);
    }
}
