//! Stage 2: Environment probe
//!
//! Makes sure the external tools a build drives are usable and resolves
//! the [`Toolchain`] every later stage runs them through.
//!
//! ## Process
//!
//! 1.  **Parallel probes**: one task checks the shell (`sh -c exit`) and
//!     then `git --version`; another locates Maven, installing the pinned
//!     portable distribution into the workspace when `M2_HOME` is unusable.
//!
//! 2.  **Shell fallback**: without a usable shell, Windows hosts get a
//!     PortableGit installation whose shell wraps every later command.
//!     Other hosts fail with an environment error.
//!
//! 3.  **Java**: the runtime `java` resolves to is detected and must be
//!     at least Java 8. Its home is forced into every child environment.
//!
//! 4.  **Git identity**: a global `user.name` and `user.email` are
//!     configured when unset, since the patch stage commits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use log::info;

use crate::config::BuildConfig;
use crate::download::Fetcher;
use crate::error::{Error, Result};
use crate::process::{ExecutorSettings, ProcessExecutor};
use crate::runtime;
use crate::tasks::{task, TaskRunner};
use crate::toolchain::{self, Toolchain};

pub fn execute(
    config: &BuildConfig,
    fetcher: Arc<dyn Fetcher>,
    runner: &TaskRunner,
) -> Result<Toolchain> {
    let workspace = config.workspace.clone();
    let dev_mode = config.is_dev();
    let mut settings = ExecutorSettings {
        jvm_options: config.jvm_options.clone(),
        ..Default::default()
    };
    let probe = ProcessExecutor::new(settings.clone());

    let shell_usable = Arc::new(AtomicBool::new(true));
    let maven_home = Arc::new(OnceLock::new());

    let shell_task = {
        let probe = probe.clone();
        let workspace = workspace.clone();
        let shell_usable = Arc::clone(&shell_usable);
        task(move || {
            if toolchain::probe_shell(&probe, &workspace) {
                toolchain::probe_git(&probe, &workspace)?;
            } else {
                shell_usable.store(false, Ordering::SeqCst);
            }
            Ok(0)
        })
    };

    let maven_task = {
        let fetcher = Arc::clone(&fetcher);
        let workspace = workspace.clone();
        let maven_home = Arc::clone(&maven_home);
        let m2_home = std::env::var("M2_HOME").ok();
        task(move || {
            let home = toolchain::ensure_maven(
                fetcher.as_ref(),
                &workspace,
                m2_home.as_deref(),
                dev_mode,
            )?;
            maven_home.set(home).ok();
            Ok(0)
        })
    };

    runner.run(vec![shell_task, maven_task])?;

    if !shell_usable.load(Ordering::SeqCst) {
        if !cfg!(windows) {
            return Err(Error::Environment {
                tool: "sh".to_string(),
                message: "could not run a POSIX shell".to_string(),
                hint: Some("BuildTools must be run with sh or bash available on PATH".to_string()),
            });
        }
        let msys_dir = toolchain::ensure_portable_git(fetcher.as_ref(), &probe, &workspace, dev_mode)?;
        settings.msys_dir = Some(msys_dir);
        toolchain::probe_git(&ProcessExecutor::new(settings.clone()), &workspace)?;
    }

    let maven_home = maven_home.get().cloned().ok_or_else(|| Error::Environment {
        tool: "mvn".to_string(),
        message: "Maven location was not resolved".to_string(),
        hint: None,
    })?;
    info!("Maven: {}", maven_home.display());

    let java = runtime::detect(&ProcessExecutor::new(settings.clone()), &workspace)?;
    runtime::check_minimum(&java.version)?;
    match &java.home {
        Some(home) => info!("Java: {} ({})", java.version, home.display()),
        None => info!("Java: {}", java.version),
    }

    settings.java_home = java.home.clone();
    let executor = ProcessExecutor::new(settings);
    toolchain::ensure_git_identity(&executor)?;

    Ok(Toolchain::new(executor, maven_home, Some(java)))
}
