//! Stage 3: Workspace sync
//!
//! Clones any missing repository, resolves the version descriptor,
//! enforces the compatibility checks and synchronizes every repository to
//! the descriptor's refs.
//!
//! ## Process
//!
//! 1.  **Clone**: the four repositories are cloned in parallel when absent.
//!
//! 2.  **Resolve**: unless updates are skipped, the descriptor is read from
//!     `<versions-url>/<rev>.json` (or from a local `.json` file named by
//!     `--rev`). Development mode uses the default branch everywhere.
//!
//! 3.  **Check**: a tool build older than the descriptor's `toolsVersion`
//!     and a Java runtime outside the descriptor's range are rejected.
//!
//! 4.  **Sync**: all four repositories are reset to their refs in parallel.
//!     The stage reports a change when any fetch moved a ref or any
//!     repository was freshly cloned.

use std::fs;
use std::path::Path;

use log::{debug, info};
use url::Url;

use crate::config::BuildConfig;
use crate::defaults;
use crate::download::Fetcher;
use crate::error::{Error, Result};
use crate::metadata::VersionDescriptor;
use crate::repository::RepositoryManager;
use crate::runtime::{self, JavaRuntime};
use crate::tasks::TaskRunner;

/// What the later stages need from a synchronized workspace
#[derive(Debug, Clone)]
pub struct WorkspaceState {
    pub descriptor: VersionDescriptor,
    /// Whether anything was cloned or fetched.
    pub changed: bool,
}

pub fn execute(
    config: &BuildConfig,
    repos: &RepositoryManager,
    fetcher: &dyn Fetcher,
    runner: &TaskRunner,
    java: Option<&JavaRuntime>,
) -> Result<WorkspaceState> {
    let cloned = repos.ensure_all_cloned(runner)?;

    if config.dont_update {
        return Ok(WorkspaceState {
            descriptor: VersionDescriptor::development(),
            changed: cloned,
        });
    }

    let descriptor = resolve_descriptor(config, fetcher)?;
    check_tools_version(config.build_number, descriptor.requires_tools_version())?;

    if config.java_check {
        match java {
            Some(java) => {
                let range = descriptor
                    .java_versions
                    .clone()
                    .unwrap_or_else(|| runtime::DEFAULT_JAVA_RANGE.to_vec());
                runtime::check_range(&java.version, &range)?;
            }
            None => debug!("No Java runtime detected, skipping the version range check"),
        }
    }

    let changed = repos.sync_all(runner, &descriptor)?;
    Ok(WorkspaceState {
        descriptor,
        changed: changed || cloned,
    })
}

/// URL of the descriptor for `revision` under `versions_url`.
pub fn descriptor_url(versions_url: &str, revision: &str) -> Result<Url> {
    let mut base = versions_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&base)?.join(&format!("{}.json", revision))?)
}

/// Read the descriptor the configuration asks for.
pub fn resolve_descriptor(config: &BuildConfig, fetcher: &dyn Fetcher) -> Result<VersionDescriptor> {
    if config.is_dev() {
        return Ok(VersionDescriptor::development());
    }

    let revision = config.revision();
    let local = Path::new(revision);
    let descriptor = if revision.ends_with(".json") && local.is_file() {
        info!("Using version descriptor {}", local.display());
        VersionDescriptor::parse(&fs::read_to_string(local)?, revision)?
    } else {
        info!("Attempting to build version: '{}' use --rev <version> to override", revision);
        let url = descriptor_url(&config.versions_url, revision)?;
        let text = fetcher.fetch_text(url.as_str()).map_err(|e| match e {
            Error::Network { url, message } => Error::Network {
                url,
                message: format!("could not get version {} ({})", revision, message),
            },
            other => other,
        })?;
        VersionDescriptor::parse(&text, url.as_str())?
    };

    info!("Found version");
    info!("{}", descriptor.name);
    info!("{}", descriptor.description);
    Ok(descriptor)
}

/// Reject a tool build older than `required`. Unstamped builds pass.
pub fn check_tools_version(build_number: Option<i32>, required: Option<i32>) -> Result<()> {
    match (build_number, required) {
        (Some(current), Some(required)) if current < required => {
            Err(Error::VersionCompatibility {
                message: format!(
                    "Your BuildTools (build {}) is out of date and will not build the requested version, which needs build {} or newer",
                    current, required
                ),
                hint: Some(defaults::DOWNLOAD_HINT.to_string()),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::download::testing::MockFetcher;
    use crate::repository::testing::MockGitOperations;
    use crate::runtime::JavaVersion;
    use std::sync::Arc;
    use tempfile::TempDir;

    const VERSIONS: &str = "https://hub.example.invalid/versions/";

    fn descriptor_json(tools_version: i32, java: &str) -> String {
        format!(
            r#"{{"name": "3000", "description": "Build 3000", "toolsVersion": {}, "javaVersions": {},
                "refs": {{"BuildData": "bd1", "Bukkit": "bk1", "CraftBukkit": "cb1", "Spigot": "sp1"}}}}"#,
            tools_version, java
        )
    }

    fn config_for(workspace: &Path) -> BuildConfig {
        let mut config = BuildConfig::new(workspace);
        config.versions_url = VERSIONS.to_string();
        config.build_number = Some(150);
        config
    }

    fn java(class_version: u32) -> JavaRuntime {
        JavaRuntime {
            home: None,
            version: JavaVersion::from_class_version(class_version),
        }
    }

    #[test]
    fn test_descriptor_url() {
        assert_eq!(
            descriptor_url("https://hub.spigotmc.org/versions/", "latest")
                .unwrap()
                .as_str(),
            "https://hub.spigotmc.org/versions/latest.json"
        );
        assert_eq!(
            descriptor_url("https://hub.spigotmc.org/versions", "1.16.5")
                .unwrap()
                .as_str(),
            "https://hub.spigotmc.org/versions/1.16.5.json"
        );
        assert!(descriptor_url("not a url", "latest").is_err());
    }

    #[test]
    fn test_check_tools_version() {
        assert!(check_tools_version(Some(100), Some(99)).is_ok());
        assert!(check_tools_version(Some(100), Some(100)).is_ok());
        assert!(check_tools_version(None, Some(200)).is_ok());
        assert!(check_tools_version(Some(100), None).is_ok());

        let err = check_tools_version(Some(98), Some(100)).unwrap_err();
        assert!(matches!(err, Error::VersionCompatibility { .. }));
        assert!(err.to_string().contains("buildtools-dl"));
    }

    #[test]
    fn test_resolve_descriptor_remote() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_for(temp_dir.path());
        config.revision = Some("1.16.5".to_string());
        let fetcher = MockFetcher::new().with(
            &format!("{}1.16.5.json", VERSIONS),
            descriptor_json(100, "null"),
        );

        let descriptor = resolve_descriptor(&config, &fetcher).unwrap();
        assert_eq!(descriptor.refs.craftbukkit, "cb1");
        assert_eq!(descriptor.tools_version, 100);
    }

    #[test]
    fn test_resolve_descriptor_local_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("custom.json");
        fs::write(&file, descriptor_json(-1, "[52, 65]")).unwrap();
        let mut config = config_for(temp_dir.path());
        config.revision = Some(file.to_string_lossy().into_owned());
        let fetcher = MockFetcher::new();

        let descriptor = resolve_descriptor(&config, &fetcher).unwrap();
        assert_eq!(descriptor.java_versions, Some(vec![52, 65]));
        assert_eq!(fetcher.request_count(), 0);
    }

    #[test]
    fn test_resolve_descriptor_unknown_version() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_for(temp_dir.path());
        config.revision = Some("0.0.1".to_string());

        let err = resolve_descriptor(&config, &MockFetcher::new()).unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
        assert!(err.to_string().contains("0.0.1"));
    }

    #[test]
    fn test_development_descriptor_needs_no_network() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_for(temp_dir.path());
        config.mode = RunMode::Development;
        let fetcher = MockFetcher::new();

        let descriptor = resolve_descriptor(&config, &fetcher).unwrap();
        assert_eq!(descriptor.refs.spigot, "master");
        assert_eq!(fetcher.request_count(), 0);
    }

    #[test]
    fn test_execute_syncs_to_descriptor_refs() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_for(temp_dir.path());
        let fetcher = MockFetcher::new().with(
            &format!("{}latest.json", VERSIONS),
            descriptor_json(100, "[52, 65]"),
        );
        let mock = Arc::new(MockGitOperations::new());
        let repos = RepositoryManager::with_operations(temp_dir.path(), mock.clone());

        let state = execute(&config, &repos, &fetcher, &TaskRunner::new(), Some(&java(61))).unwrap();

        assert!(state.changed, "fresh clones count as changes");
        assert!(mock
            .calls_for("CraftBukkit")
            .contains(&"reset cb1 [CraftBukkit]".to_string()));
        assert!(mock
            .calls_for("BuildData")
            .contains(&"reset bd1 [BuildData]".to_string()));
    }

    #[test]
    fn test_execute_unchanged_workspace() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["BuildData", "Bukkit", "CraftBukkit", "Spigot"] {
            fs::create_dir_all(temp_dir.path().join(name).join(".git")).unwrap();
        }
        let config = config_for(temp_dir.path());
        let fetcher = MockFetcher::new().with(
            &format!("{}latest.json", VERSIONS),
            descriptor_json(100, "[52, 65]"),
        );
        let repos =
            RepositoryManager::with_operations(temp_dir.path(), Arc::new(MockGitOperations::new()));

        let state = execute(&config, &repos, &fetcher, &TaskRunner::new(), Some(&java(61))).unwrap();
        assert!(!state.changed);
    }

    #[test]
    fn test_execute_rejects_java_outside_range() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_for(temp_dir.path());
        let fetcher = MockFetcher::new().with(
            &format!("{}latest.json", VERSIONS),
            descriptor_json(100, "null"),
        );
        let mock = Arc::new(MockGitOperations::new());
        let repos = RepositoryManager::with_operations(temp_dir.path(), mock.clone());

        let err = execute(&config, &repos, &fetcher, &TaskRunner::new(), Some(&java(61))).unwrap_err();
        assert!(err.to_string().contains("[Java 7, Java 8]"));
        assert!(mock.calls_for("Spigot").iter().all(|call| !call.starts_with("fetch")));
    }

    #[test]
    fn test_execute_java_check_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_for(temp_dir.path());
        config.java_check = false;
        let fetcher = MockFetcher::new().with(
            &format!("{}latest.json", VERSIONS),
            descriptor_json(100, "null"),
        );
        let repos =
            RepositoryManager::with_operations(temp_dir.path(), Arc::new(MockGitOperations::new()));

        assert!(execute(&config, &repos, &fetcher, &TaskRunner::new(), Some(&java(61))).is_ok());
    }

    #[test]
    fn test_execute_dont_update_skips_network_and_sync() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_for(temp_dir.path());
        config.dont_update = true;
        let fetcher = MockFetcher::new();
        let mock = Arc::new(MockGitOperations::new());
        let repos = RepositoryManager::with_operations(temp_dir.path(), mock.clone());

        let state = execute(&config, &repos, &fetcher, &TaskRunner::new(), None).unwrap();
        assert_eq!(fetcher.request_count(), 0);
        assert_eq!(state.descriptor.refs.bukkit, "master");
        assert!(mock.calls_for("Bukkit").iter().all(|call| !call.starts_with("fetch")));
    }
}
