//! # Managed Repository Workspace
//!
//! This module provides the `RepositoryManager`, which keeps the four
//! version-controlled source trees of a build present and synchronized to
//! the refs a version descriptor pins.
//!
//! ## Design
//!
//! The manager is built around the **`GitOperations`** trait, which defines
//! the git capability the pipeline needs (clone, fetch, hard reset, commit
//! identities, branch, add, commit, checkout). The application uses
//! `DefaultGitOperations`, which drives the system `git` binary through the
//! process executor. Tests substitute a mock that records calls and
//! simulates fetch results without touching the network.
//!
//! Cloning and synchronizing the four repositories are independent of each
//! other, so both run as one batch on the parallel task runner.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::defaults;
use crate::error::Result;
use crate::metadata::VersionDescriptor;
use crate::process::ProcessExecutor;
use crate::tasks::{task, TaskRunner};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Clone `url` into `target`.
    fn clone_repository(&self, url: &str, target: &Path) -> Result<()>;

    fn set_config(&self, repo: &Path, key: &str, value: &str) -> Result<()>;

    /// Fetch from the remote; true when any remote-tracking ref changed.
    fn fetch(&self, repo: &Path) -> Result<bool>;

    fn reset_hard(&self, repo: &Path, target: &str) -> Result<()>;

    fn head_commit(&self, repo: &Path) -> Result<String>;

    fn last_commit_touching(&self, repo: &Path, path: &str) -> Result<Option<String>>;

    /// Force-create `branch` at the current commit and switch to it.
    fn create_branch(&self, repo: &Path, branch: &str) -> Result<()>;

    fn add(&self, repo: &Path, pattern: &str) -> Result<()>;

    fn commit(&self, repo: &Path, message: &str) -> Result<()>;

    fn checkout(&self, repo: &Path, r#ref: &str) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command.
#[derive(Debug, Clone, Default)]
pub struct DefaultGitOperations {
    executor: ProcessExecutor,
}

impl DefaultGitOperations {
    pub fn new(executor: ProcessExecutor) -> Self {
        Self { executor }
    }
}

impl GitOperations for DefaultGitOperations {
    fn clone_repository(&self, url: &str, target: &Path) -> Result<()> {
        crate::git::clone(&self.executor, url, target)
    }

    fn set_config(&self, repo: &Path, key: &str, value: &str) -> Result<()> {
        crate::git::set_config(&self.executor, repo, key, value)
    }

    fn fetch(&self, repo: &Path) -> Result<bool> {
        crate::git::fetch(&self.executor, repo)
    }

    fn reset_hard(&self, repo: &Path, target: &str) -> Result<()> {
        crate::git::reset_hard(&self.executor, repo, target)
    }

    fn head_commit(&self, repo: &Path) -> Result<String> {
        crate::git::head_commit(&self.executor, repo)
    }

    fn last_commit_touching(&self, repo: &Path, path: &str) -> Result<Option<String>> {
        crate::git::last_commit_touching(&self.executor, repo, path)
    }

    fn create_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        crate::git::create_branch(&self.executor, repo, branch)
    }

    fn add(&self, repo: &Path, pattern: &str) -> Result<()> {
        crate::git::add(&self.executor, repo, pattern)
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        crate::git::commit(&self.executor, repo, message)
    }

    fn checkout(&self, repo: &Path, r#ref: &str) -> Result<()> {
        crate::git::checkout(&self.executor, repo, r#ref)
    }
}

/// The four repositories every build works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedRepository {
    /// The API.
    Bukkit,
    /// The server implementation and its `nms-patches/`.
    CraftBukkit,
    /// The distribution and its patch scripts.
    Spigot,
    /// Mappings, tool jars and `info.json`.
    BuildData,
}

impl ManagedRepository {
    pub const ALL: [ManagedRepository; 4] = [
        ManagedRepository::Bukkit,
        ManagedRepository::CraftBukkit,
        ManagedRepository::Spigot,
        ManagedRepository::BuildData,
    ];

    /// Directory name inside the workspace.
    pub fn dir_name(self) -> &'static str {
        match self {
            ManagedRepository::Bukkit => "Bukkit",
            ManagedRepository::CraftBukkit => "CraftBukkit",
            ManagedRepository::Spigot => "Spigot",
            ManagedRepository::BuildData => "BuildData",
        }
    }

    fn remote_name(self) -> &'static str {
        match self {
            ManagedRepository::Bukkit => "bukkit",
            ManagedRepository::CraftBukkit => "craftbukkit",
            ManagedRepository::Spigot => "spigot",
            ManagedRepository::BuildData => "builddata",
        }
    }

    /// Canonical remote URL under `base`.
    pub fn url(self, base: &str) -> String {
        format!("{}/{}.git", base.trim_end_matches('/'), self.remote_name())
    }
}

impl fmt::Display for ManagedRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Keeps the managed repositories of one workspace in sync.
#[derive(Clone)]
pub struct RepositoryManager {
    root: PathBuf,
    remote_base: String,
    autocrlf: bool,
    git: Arc<dyn GitOperations>,
}

impl RepositoryManager {
    /// Manager for the workspace at `root` using the system git.
    pub fn new(root: impl Into<PathBuf>, executor: ProcessExecutor) -> Self {
        Self::with_operations(root, Arc::new(DefaultGitOperations::new(executor)))
    }

    /// Creates a manager with custom operations.
    ///
    /// This is primarily used for testing to inject mock operations.
    pub fn with_operations(root: impl Into<PathBuf>, git: Arc<dyn GitOperations>) -> Self {
        Self {
            root: root.into(),
            remote_base: defaults::REPOSITORY_BASE_URL.to_string(),
            autocrlf: defaults::autocrlf(),
            git,
        }
    }

    pub fn with_remote_base(mut self, base: impl Into<String>) -> Self {
        self.remote_base = base.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git(&self) -> &dyn GitOperations {
        self.git.as_ref()
    }

    pub fn path(&self, repository: ManagedRepository) -> PathBuf {
        self.root.join(repository.dir_name())
    }

    /// Clone `repository` unless it is already present. Returns true when a
    /// clone happened.
    pub fn ensure_cloned(&self, repository: ManagedRepository) -> Result<bool> {
        let dir = self.path(repository);
        if dir.join(".git").exists() {
            return Ok(false);
        }
        self.clone_into(&repository.url(&self.remote_base), &dir)?;
        Ok(true)
    }

    fn clone_into(&self, url: &str, dir: &Path) -> Result<()> {
        info!("Starting clone of {} to {}", url, dir.display());
        self.git.clone_repository(url, dir)?;
        self.git
            .set_config(dir, "core.autocrlf", if self.autocrlf { "true" } else { "false" })?;
        let head = self.git.head_commit(dir)?;
        info!("Cloned git repository {} to {}. Current HEAD: {}", url, dir.display(), head);
        Ok(())
    }

    /// Clone every missing repository in parallel. Returns true when any
    /// clone happened.
    pub fn ensure_all_cloned(&self, runner: &TaskRunner) -> Result<bool> {
        let cloned = Arc::new(AtomicBool::new(false));
        let tasks = ManagedRepository::ALL
            .into_iter()
            .map(|repository| {
                let manager = self.clone();
                let cloned = Arc::clone(&cloned);
                task(move || {
                    if manager.ensure_cloned(repository)? {
                        cloned.store(true, Ordering::SeqCst);
                    }
                    Ok(0)
                })
            })
            .collect();
        runner.run(tasks)?;
        Ok(cloned.load(Ordering::SeqCst))
    }

    /// Bring `repository` to `target_ref`. Returns whether the fetch changed
    /// any remote-tracking ref.
    pub fn sync(&self, repository: ManagedRepository, target_ref: &str) -> Result<bool> {
        let dir = self.path(repository);
        info!("Pulling updates for {}", dir.display());

        if let Err(e) = self.git.reset_hard(&dir, defaults::UPSTREAM_DEFAULT_BRANCH) {
            warn!(
                "*** Warning, could not find {} ref, but continuing anyway ({})",
                defaults::UPSTREAM_DEFAULT_BRANCH,
                e
            );
            warn!("*** If further errors occur please delete {} and retry.", dir.display());
        }

        let changed = self.git.fetch(&dir)?;
        info!("Successfully fetched updates!");

        self.git.reset_hard(&dir, target_ref)?;
        if target_ref == defaults::DEFAULT_BRANCH {
            self.git.reset_hard(&dir, defaults::UPSTREAM_DEFAULT_BRANCH)?;
        }
        info!("Checked out: {}", target_ref);
        Ok(changed)
    }

    /// Synchronize all four repositories to the descriptor's refs in
    /// parallel. Returns true when any of them changed.
    pub fn sync_all(&self, runner: &TaskRunner, descriptor: &VersionDescriptor) -> Result<bool> {
        let changed = Arc::new(AtomicBool::new(false));
        let tasks = ManagedRepository::ALL
            .into_iter()
            .map(|repository| {
                let manager = self.clone();
                let changed = Arc::clone(&changed);
                let target_ref = descriptor.ref_for(repository).to_string();
                task(move || {
                    if manager.sync(repository, &target_ref)? {
                        changed.store(true, Ordering::SeqCst);
                    }
                    Ok(0)
                })
            })
            .collect();
        runner.run(tasks)?;
        Ok(changed.load(Ordering::SeqCst))
    }

    /// Clone `source` into `target` through a `file://` URL unless `target`
    /// exists. Returns true when a clone happened.
    pub fn clone_local(&self, source: ManagedRepository, target: &Path) -> Result<bool> {
        if target.exists() {
            return Ok(false);
        }
        let source_dir = self.path(source);
        let source_dir = source_dir.canonicalize().unwrap_or(source_dir);
        let url = format!("file://{}", source_dir.display());
        self.clone_into(&url, target)?;
        Ok(true)
    }

    pub fn head_commit(&self, repository: ManagedRepository) -> Result<String> {
        self.git.head_commit(&self.path(repository))
    }

    pub fn last_commit_touching(
        &self,
        repository: ManagedRepository,
        path: &str,
    ) -> Result<Option<String>> {
        self.git.last_commit_touching(&self.path(repository), path)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Error;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Mock git operations for testing
    #[derive(Default)]
    pub struct MockGitOperations {
        pub calls: Mutex<Vec<String>>,
        pub changed_repos: HashSet<String>,
        pub missing_upstream: bool,
        pub fail_fetch: bool,
    }

    impl MockGitOperations {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        pub fn calls_for(&self, repo: &str) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|call| call.contains(&format!("[{}]", repo)))
                .cloned()
                .collect()
        }

        fn name(repo: &Path) -> String {
            repo.file_name().unwrap().to_string_lossy().into_owned()
        }
    }

    impl GitOperations for MockGitOperations {
        fn clone_repository(&self, url: &str, target: &Path) -> Result<()> {
            std::fs::create_dir_all(target.join(".git"))?;
            self.record(format!("clone {} [{}]", url, Self::name(target)));
            Ok(())
        }

        fn set_config(&self, repo: &Path, key: &str, value: &str) -> Result<()> {
            self.record(format!("config {}={} [{}]", key, value, Self::name(repo)));
            Ok(())
        }

        fn fetch(&self, repo: &Path) -> Result<bool> {
            let name = Self::name(repo);
            self.record(format!("fetch [{}]", name));
            if self.fail_fetch {
                return Err(Error::GitCommand {
                    repository: name,
                    command: "git fetch origin".to_string(),
                    stderr: "could not resolve host".to_string(),
                });
            }
            Ok(self.changed_repos.contains(&name))
        }

        fn reset_hard(&self, repo: &Path, target: &str) -> Result<()> {
            self.record(format!("reset {} [{}]", target, Self::name(repo)));
            if self.missing_upstream && target == "origin/master" {
                return Err(Error::GitCommand {
                    repository: Self::name(repo),
                    command: "git reset --hard origin/master".to_string(),
                    stderr: "unknown revision".to_string(),
                });
            }
            Ok(())
        }

        fn head_commit(&self, _repo: &Path) -> Result<String> {
            Ok("0123456789abcdef".to_string())
        }

        fn last_commit_touching(&self, repo: &Path, path: &str) -> Result<Option<String>> {
            self.record(format!("log {} [{}]", path, Self::name(repo)));
            Ok(Some("feedface".to_string()))
        }

        fn create_branch(&self, repo: &Path, branch: &str) -> Result<()> {
            self.record(format!("branch {} [{}]", branch, Self::name(repo)));
            Ok(())
        }

        fn add(&self, repo: &Path, pattern: &str) -> Result<()> {
            self.record(format!("add {} [{}]", pattern, Self::name(repo)));
            Ok(())
        }

        fn commit(&self, repo: &Path, message: &str) -> Result<()> {
            self.record(format!("commit {} [{}]", message, Self::name(repo)));
            Ok(())
        }

        fn checkout(&self, repo: &Path, r#ref: &str) -> Result<()> {
            self.record(format!("checkout {} [{}]", r#ref, Self::name(repo)));
            Ok(())
        }
    }
}
