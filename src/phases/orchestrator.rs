//! Orchestrator for a complete BuildTools run
//!
//! [`Pipeline`] threads the immutable [`BuildConfig`] and the resolved
//! [`Toolchain`] through every stage in order. Any stage failure aborts the
//! run; two options stop it early with success:
//!
//! - `--compile-if-changed` when no repository was cloned or moved;
//! - `--exit-after-fetch` once the repositories are synchronized.

use std::sync::Arc;

use log::info;

use super::{
    compile, decompile, environment, legacy, package, patching, remap, resolve, vanilla,
    workspace, Outcome,
};
use crate::cache::ArtifactCache;
use crate::config::BuildConfig;
use crate::download::{Fetcher, HttpFetcher};
use crate::error::Result;
use crate::repository::{GitOperations, RepositoryManager};
use crate::tasks::TaskRunner;
use crate::toolchain::Toolchain;

/// A configured run
pub struct Pipeline {
    config: BuildConfig,
    fetcher: Arc<dyn Fetcher>,
    runner: TaskRunner,
    git: Option<Arc<dyn GitOperations>>,
    toolchain: Option<Toolchain>,
}

impl Pipeline {
    /// Pipeline using HTTP downloads, the system git and a probed toolchain.
    pub fn new(config: BuildConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(!config.certificate_check)?);
        Ok(Self {
            config,
            fetcher,
            runner: TaskRunner::new(),
            git: None,
            toolchain: None,
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_runner(mut self, runner: TaskRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Use `git` instead of the system git for the managed repositories.
    pub fn with_git_operations(mut self, git: Arc<dyn GitOperations>) -> Self {
        self.git = Some(git);
        self
    }

    /// Skip the environment probe and use `toolchain`.
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run every stage.
    pub fn run(&self) -> Result<Outcome> {
        let config = &self.config;

        // Stage 1: Resolve
        resolve::execute(config)?;

        // Stage 2: Environment probe
        let toolchain = match &self.toolchain {
            Some(toolchain) => toolchain.clone(),
            None => environment::execute(config, Arc::clone(&self.fetcher), &self.runner)?,
        };

        let repos = match &self.git {
            Some(git) => RepositoryManager::with_operations(&config.workspace, Arc::clone(git)),
            None => RepositoryManager::new(&config.workspace, toolchain.executor().clone()),
        };

        // Stage 3: Workspace sync
        let state = workspace::execute(
            config,
            &repos,
            self.fetcher.as_ref(),
            &self.runner,
            toolchain.java(),
        )?;

        if config.compile_if_changed && !state.changed {
            info!("*** No changes detected in any of the repositories!");
            info!("*** Exiting due to the --compile-if-changed option");
            return Ok(Outcome::Unchanged);
        }
        if config.exit_after_fetch {
            info!("Exiting after fetching repositories");
            return Ok(Outcome::FetchedOnly);
        }

        // Stage 4: Vanilla artifact acquisition
        let vanilla = vanilla::execute(config, &repos, self.fetcher.as_ref())?;

        // Stages 5 and 6: cached remap and decompile
        let cache = ArtifactCache::new(config.work_dir());
        let mapped = remap::execute(config, &toolchain, &repos, &cache, &vanilla)?;
        let decompile_dir =
            decompile::execute(config, &toolchain, &cache, &vanilla.metadata, &mapped)?;

        // Stage 7: Patch application
        patching::execute(config, &repos, &state.descriptor, &decompile_dir)?;

        // Stage 8: Legacy linking
        legacy::execute(&vanilla.metadata, &repos, &self.runner)?;

        // Stage 9: Compile
        let compiled = compile::execute(config, &toolchain, &repos, &vanilla)?;

        // Stage 10: Package
        let artifacts = package::execute(config, &repos, &vanilla.metadata, &compiled)?;

        Ok(Outcome::Built { artifacts })
    }
}

/// Run a complete build for `config` with the default collaborators.
pub fn execute(config: BuildConfig) -> Result<Outcome> {
    Pipeline::new(config)?.run()
}
