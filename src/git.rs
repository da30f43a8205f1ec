//! Thin wrappers around the system `git` command
//!
//! Every call goes through the [`ProcessExecutor`], so a portable git
//! installation on `PATH` is picked up the same way as for other tools.
//! Non-zero exits become [`Error::GitCommand`] carrying git's stderr.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::process::{Invocation, ProcessExecutor};

/// Run git in `dir` and return its stdout.
fn git(executor: &ProcessExecutor, dir: &Path, args: &[&str]) -> Result<String> {
    let invocation = Invocation::new(dir, "git").args(args.iter().copied()).quiet();
    let output = executor.execute(&invocation)?;
    if !output.success() {
        return Err(Error::GitCommand {
            repository: dir.display().to_string(),
            command: invocation.command_line(),
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Clone `url` into `target`. Parent directories are created.
pub fn clone(executor: &ProcessExecutor, url: &str, target: &Path) -> Result<()> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    fs::create_dir_all(&parent)?;

    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Configuration {
            message: format!("cannot clone into {}", target.display()),
        })?;
    git(executor, &parent, &["clone", url, &name])?;
    Ok(())
}

/// Set a repository-local config value.
pub fn set_config(executor: &ProcessExecutor, repo: &Path, key: &str, value: &str) -> Result<()> {
    git(executor, repo, &["config", key, value])?;
    Ok(())
}

/// Read a global config value; `None` when unset.
pub fn global_config(executor: &ProcessExecutor, key: &str) -> Result<Option<String>> {
    let dir = std::env::current_dir()?;
    let invocation = Invocation::new(&dir, "git")
        .args(["config", "--global", "--includes", key])
        .quiet();
    let output = executor.execute(&invocation)?;
    // `git config` exits 1 for a missing key.
    let value = output.stdout.trim();
    if !output.success() || value.is_empty() {
        return Ok(None);
    }
    Ok(Some(value.to_string()))
}

pub fn set_global_config(executor: &ProcessExecutor, key: &str, value: &str) -> Result<()> {
    let dir = std::env::current_dir()?;
    git(executor, &dir, &["config", "--global", key, value])?;
    Ok(())
}

/// Remote-tracking references and the objects they point at.
pub fn remote_refs(executor: &ProcessExecutor, repo: &Path) -> Result<BTreeMap<String, String>> {
    let stdout = git(
        executor,
        repo,
        &["for-each-ref", "--format=%(refname) %(objectname)", "refs/remotes"],
    )?;
    Ok(parse_ref_listing(&stdout))
}

fn parse_ref_listing(listing: &str) -> BTreeMap<String, String> {
    listing
        .lines()
        .filter_map(|line| {
            let (name, object) = line.trim().split_once(' ')?;
            Some((name.to_string(), object.to_string()))
        })
        .collect()
}

/// Fetch from `origin`. Returns whether any remote-tracking reference
/// moved, appeared or disappeared.
pub fn fetch(executor: &ProcessExecutor, repo: &Path) -> Result<bool> {
    let before = remote_refs(executor, repo)?;
    git(executor, repo, &["fetch", "origin"])?;
    let after = remote_refs(executor, repo)?;

    let changed = before != after;
    debug!(
        "Fetch in {} {}",
        repo.display(),
        if changed { "updated remote refs" } else { "found nothing new" }
    );
    Ok(changed)
}

pub fn reset_hard(executor: &ProcessExecutor, repo: &Path, target: &str) -> Result<()> {
    git(executor, repo, &["reset", "--hard", target])?;
    Ok(())
}

/// Full object name of `HEAD`.
pub fn head_commit(executor: &ProcessExecutor, repo: &Path) -> Result<String> {
    Ok(git(executor, repo, &["rev-parse", "HEAD"])?.trim().to_string())
}

/// Object name of the newest commit touching `path`, if any.
pub fn last_commit_touching(
    executor: &ProcessExecutor,
    repo: &Path,
    path: &str,
) -> Result<Option<String>> {
    let stdout = git(executor, repo, &["log", "-1", "--format=%H", "--", path])?;
    let commit = stdout.trim();
    Ok((!commit.is_empty()).then(|| commit.to_string()))
}

/// Force-create `branch` at `HEAD` and switch to it, keeping the working
/// tree.
pub fn create_branch(executor: &ProcessExecutor, repo: &Path, branch: &str) -> Result<()> {
    git(executor, repo, &["checkout", "-f", "-B", branch])?;
    Ok(())
}

pub fn add(executor: &ProcessExecutor, repo: &Path, pattern: &str) -> Result<()> {
    git(executor, repo, &["add", "--", pattern])?;
    Ok(())
}

/// Commit the index. An unchanged index still records a commit.
pub fn commit(executor: &ProcessExecutor, repo: &Path, message: &str) -> Result<()> {
    git(executor, repo, &["commit", "--quiet", "--allow-empty", "-m", message])?;
    Ok(())
}

pub fn checkout(executor: &ProcessExecutor, repo: &Path, r#ref: &str) -> Result<()> {
    git(executor, repo, &["checkout", r#ref])?;
    Ok(())
}
