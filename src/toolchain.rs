//! # Toolchain
//!
//! Probing of the external tools a build needs and on-demand installation
//! of the portable ones:
//!
//! - a POSIX shell and `git`, with PortableGit downloaded on Windows when
//!   no shell is usable;
//! - Maven, taken from `M2_HOME` or installed into the workspace;
//! - the Java runtime used for every child JVM;
//! - a global git identity, defaulted when the user has none.
//!
//! The result is a [`Toolchain`], resolved once and passed to every later
//! stage.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::archive;
use crate::defaults;
use crate::download::{self, Fetcher};
use crate::error::{Error, Result};
use crate::git;
use crate::hash::HashAlgorithm;
use crate::process::{Invocation, ProcessExecutor};
use crate::runtime::JavaRuntime;

/// Resolved external tools of a run
#[derive(Debug, Clone)]
pub struct Toolchain {
    executor: ProcessExecutor,
    maven_home: PathBuf,
    java: Option<JavaRuntime>,
}

impl Toolchain {
    pub fn new(executor: ProcessExecutor, maven_home: PathBuf, java: Option<JavaRuntime>) -> Self {
        Self {
            executor,
            maven_home,
            java,
        }
    }

    /// Executor configured with the detected Java home and shell.
    pub fn executor(&self) -> &ProcessExecutor {
        &self.executor
    }

    pub fn maven_home(&self) -> &Path {
        &self.maven_home
    }

    pub fn java(&self) -> Option<&JavaRuntime> {
        self.java.as_ref()
    }

    /// `sh <maven>/bin/mvn`, ready for Maven arguments.
    pub fn mvn(&self, dir: &Path) -> Invocation {
        let script = self.maven_home.join("bin").join("mvn");
        Invocation::new(dir, "sh").arg(script.to_string_lossy())
    }
}

/// Whether a POSIX shell can be started.
pub fn probe_shell(executor: &ProcessExecutor, dir: &Path) -> bool {
    !executor.fails(&Invocation::new(dir, "sh").args(["-c", "exit"]).quiet())
}

/// Require a working `git`.
pub fn probe_git(executor: &ProcessExecutor, dir: &Path) -> Result<()> {
    executor
        .run(&Invocation::new(dir, "git").arg("--version"))
        .map(|_| ())
        .map_err(|e| Error::Environment {
            tool: "git".to_string(),
            message: format!("could not successfully run git: {}", e),
            hint: Some("Please ensure git is installed and functioning".to_string()),
        })
}

/// Maven home to use: `M2_HOME` when it exists, otherwise the portable
/// installation inside the workspace.
pub fn maven_home(m2_home: Option<&str>, workspace: &Path) -> (PathBuf, bool) {
    match m2_home.map(PathBuf::from).filter(|home| home.exists()) {
        Some(home) => (home, false),
        None => (workspace.join(defaults::MAVEN_VERSION), true),
    }
}

/// Locate Maven, downloading the pinned distribution when needed.
pub fn ensure_maven(
    fetcher: &dyn Fetcher,
    workspace: &Path,
    m2_home: Option<&str>,
    dev_mode: bool,
) -> Result<PathBuf> {
    let (home, portable) = maven_home(m2_home, workspace);
    if !portable || home.exists() {
        return Ok(home);
    }

    info!("Maven does not exist, downloading. Please wait.");
    let archive_name = format!("{}-bin.zip", defaults::MAVEN_VERSION);
    let archive_path = workspace.join(&archive_name);
    download::download(
        fetcher,
        &format!("{}{}", defaults::MAVEN_DOWNLOAD_BASE, archive_name),
        &archive_path,
        HashAlgorithm::Sha512,
        Some(defaults::MAVEN_SHA512),
        dev_mode,
    )?;
    archive::extract_all(&archive_path, workspace)?;
    fs::remove_file(&archive_path)?;

    if !home.exists() {
        return Err(Error::Environment {
            tool: "mvn".to_string(),
            message: format!("{} did not contain {}", archive_name, defaults::MAVEN_VERSION),
            hint: Some("Set M2_HOME to an existing Maven installation".to_string()),
        });
    }
    Ok(home)
}

fn portable_git_release() -> (String, &'static str) {
    if cfg!(target_pointer_width = "64") {
        (
            format!("{}-64-bit", defaults::PORTABLE_GIT_VERSION),
            defaults::PORTABLE_GIT_SHA256_64,
        )
    } else {
        (
            format!("{}-32-bit", defaults::PORTABLE_GIT_VERSION),
            defaults::PORTABLE_GIT_SHA256_32,
        )
    }
}

/// Directory a portable git installation lives in.
pub fn portable_git_dir(workspace: &Path) -> PathBuf {
    workspace.join(portable_git_release().0).join("PortableGit")
}

/// Install PortableGit into the workspace unless present.
pub fn ensure_portable_git(
    fetcher: &dyn Fetcher,
    executor: &ProcessExecutor,
    workspace: &Path,
    dev_mode: bool,
) -> Result<PathBuf> {
    let (release, sha256) = portable_git_release();
    let msys_dir = portable_git_dir(workspace);
    if msys_dir.is_dir() {
        return Ok(msys_dir);
    }

    info!("*** Could not find PortableGit installation, downloading. ***");
    let installer_name = format!("{}.7z.exe", release);
    let install_dir = workspace.join(&release);
    let installer = install_dir.join(&installer_name);
    if !installer.exists() {
        download::download(
            fetcher,
            &format!("{}{}", defaults::PORTABLE_GIT_DOWNLOAD_BASE, installer_name),
            &installer,
            HashAlgorithm::Sha256,
            Some(sha256),
            dev_mode,
        )?;
    }

    info!("Extracting downloaded git install");
    // Yes to all, silent, don't run.
    executor.run(
        &Invocation::new(&install_dir, installer.to_string_lossy()).args(["-y", "-gm2", "-nr"]),
    )?;
    fs::remove_file(&installer)?;

    info!("*** Using downloaded git {} ***", msys_dir.display());
    Ok(msys_dir)
}

/// Configure the default global git identity where none is set.
pub fn ensure_git_identity(executor: &ProcessExecutor) -> Result<()> {
    for (key, default) in [
        ("user.name", defaults::GIT_DEFAULT_NAME),
        ("user.email", defaults::GIT_DEFAULT_EMAIL),
    ] {
        if git::global_config(executor, key)?.is_none() {
            info!("Git {} not set, setting it to default value.", key);
            git::set_global_config(executor, key, default)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::testing::MockFetcher;
    use tempfile::TempDir;

    #[test]
    fn test_maven_home_prefers_existing_m2_home() {
        let temp_dir = TempDir::new().unwrap();
        let m2 = temp_dir.path().join("maven");
        fs::create_dir_all(&m2).unwrap();

        let (home, portable) = maven_home(Some(m2.to_str().unwrap()), temp_dir.path());
        assert_eq!(home, m2);
        assert!(!portable);
    }

    #[test]
    fn test_maven_home_falls_back_to_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let (home, portable) = maven_home(Some("/does/not/exist"), temp_dir.path());
        assert_eq!(home, temp_dir.path().join("apache-maven-3.6.0"));
        assert!(portable);

        let (_, portable) = maven_home(None, temp_dir.path());
        assert!(portable);
    }

    #[test]
    fn test_ensure_maven_skips_download_when_installed() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("apache-maven-3.6.0/bin")).unwrap();
        let fetcher = MockFetcher::new();

        let home = ensure_maven(&fetcher, temp_dir.path(), None, false).unwrap();
        assert_eq!(home, temp_dir.path().join("apache-maven-3.6.0"));
        assert_eq!(fetcher.request_count(), 0);
    }

    #[test]
    fn test_ensure_maven_rejects_tampered_download() {
        let temp_dir = TempDir::new().unwrap();
        let url = format!(
            "{}{}-bin.zip",
            defaults::MAVEN_DOWNLOAD_BASE,
            defaults::MAVEN_VERSION
        );
        let fetcher = MockFetcher::new().with(&url, "not maven");

        let err = ensure_maven(&fetcher, temp_dir.path(), None, false).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
        assert!(!temp_dir.path().join("apache-maven-3.6.0-bin.zip").exists());
    }

    #[test]
    fn test_mvn_invocation() {
        let toolchain = Toolchain::new(
            ProcessExecutor::default(),
            PathBuf::from("/opt/maven"),
            None,
        );
        let invocation = toolchain.mvn(Path::new("/ws/Bukkit")).args(["clean", "install"]);
        assert_eq!(
            invocation.command_line(),
            format!(
                "sh {} clean install",
                Path::new("/opt/maven").join("bin").join("mvn").display()
            )
        );
    }

    #[test]
    fn test_portable_git_dir_layout() {
        let dir = portable_git_dir(Path::new("/ws"));
        assert!(dir.ends_with("PortableGit"));
        assert!(dir
            .parent()
            .unwrap()
            .to_string_lossy()
            .contains("PortableGit-2.24.1.2-"));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_shell_on_unix() {
        let temp_dir = TempDir::new().unwrap();
        assert!(probe_shell(&ProcessExecutor::default(), temp_dir.path()));
    }
}
