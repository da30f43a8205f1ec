//! Stage 4: Vanilla artifact acquisition
//!
//! Reads `BuildData/info.json` (falling back to the legacy 1.8 metadata),
//! re-checks the tool build against it and makes sure
//! `work/minecraft_server.<version>.jar` is present and matches its pinned
//! MD5, downloading it otherwise.

use std::path::PathBuf;

use log::info;

use crate::config::BuildConfig;
use crate::download::{self, Fetcher};
use crate::error::Result;
use crate::hash::HashAlgorithm;
use crate::metadata::BuildMetadata;
use crate::repository::{ManagedRepository, RepositoryManager};

use super::workspace::check_tools_version;

/// Output of the stage
#[derive(Debug, Clone)]
pub struct VanillaArtifact {
    pub metadata: BuildMetadata,
    /// Verified vanilla server jar.
    pub jar: PathBuf,
    /// Shell that runs the Spigot patch script.
    pub patch_shell: String,
}

pub fn execute(
    config: &BuildConfig,
    repos: &RepositoryManager,
    fetcher: &dyn Fetcher,
) -> Result<VanillaArtifact> {
    let info_file = repos.path(ManagedRepository::BuildData).join("info.json");
    let metadata = BuildMetadata::load(&info_file)?;
    info!(
        "Attempting to build Minecraft {} (class mappings {}, member mappings {})",
        metadata.minecraft_version, metadata.class_mappings, metadata.member_mappings
    );
    check_tools_version(config.build_number, metadata.requires_tools_version())?;

    let jar = config.work_dir().join(metadata.vanilla_jar_name());
    let expected = metadata.minecraft_hash.as_deref();
    let usable = jar.is_file()
        && download::check_hash(&jar, HashAlgorithm::Md5, expected, config.is_dev())?;
    if !usable {
        download::download(
            fetcher,
            &metadata.vanilla_url(),
            &jar,
            HashAlgorithm::Md5,
            expected,
            config.is_dev(),
        )?;
    }

    let patch_shell = patch_shell(&metadata, std::env::var("SHELL").ok());
    Ok(VanillaArtifact {
        metadata,
        jar,
        patch_shell,
    })
}

/// `sh`, unless the metadata predates `serverUrl`: legacy patch scripts
/// need a bash-compatible shell, taken from `$SHELL` when set.
pub fn patch_shell(metadata: &BuildMetadata, shell: Option<String>) -> String {
    if metadata.server_url.is_some() {
        return "sh".to_string();
    }
    shell
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(|| "bash".to_string())
}
