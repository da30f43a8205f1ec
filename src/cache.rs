//! Content-addressed cache of derived build artifacts
//!
//! Remapping and decompiling the vanilla server are the most expensive
//! steps of a build. Their outputs live in the work directory under names
//! that embed a short key derived from the upstream inputs, so an
//! unchanged input set maps to the same path and the work is skipped.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::hash::{HashAlgorithm, Hasher};

/// Number of trailing hex digits of the digest kept as the key.
pub const KEY_LENGTH: usize = 8;

/// Name of the link that always points at the newest decompile output.
pub const LATEST_DECOMPILE_LINK: &str = "decompile-latest";

const STAGING_SUFFIX: &str = ".staging";

/// Short version tag derived from upstream identities
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive a key from the identities of every relevant upstream change.
///
/// Identities are sorted first, so the key does not depend on the order
/// they were supplied in.
pub fn compute_key<I, S>(identities: I) -> CacheKey
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = identities
        .into_iter()
        .map(|identity| identity.as_ref().to_string())
        .collect();
    sorted.sort();

    let mut hasher = HashAlgorithm::Md5.hasher();
    for identity in &sorted {
        hasher.update(identity.as_bytes());
    }
    let digest = hasher.digest();
    CacheKey(digest[digest.len() - KEY_LENGTH..].to_string())
}

/// The kinds of artifact the cache holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `mapped.<key>.jar`: the fully remapped server jar.
    MappedJar,
    /// `decompile-<key>/`: decompiled sources of the mapped jar.
    DecompileDir,
}

impl ArtifactKind {
    pub fn file_name(self, key: &CacheKey) -> String {
        match self {
            ArtifactKind::MappedJar => format!("mapped.{}.jar", key),
            ArtifactKind::DecompileDir => format!("decompile-{}", key),
        }
    }
}

/// A resolved artifact location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub kind: ArtifactKind,
    pub key: CacheKey,
    pub path: PathBuf,
    pub exists: bool,
}

impl CachedArtifact {
    /// Path the artifact is built under before being renamed into place.
    pub fn staging_path(&self) -> PathBuf {
        self.with_suffix(STAGING_SUFFIX)
    }

    /// A sibling path sharing the artifact's name, e.g. intermediate jars.
    pub fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }
}

/// Artifact cache rooted at the workspace's `work/` directory
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    work_dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn resolve(&self, kind: ArtifactKind, key: &CacheKey) -> CachedArtifact {
        let path = self.work_dir.join(kind.file_name(key));
        let exists = path.exists();
        CachedArtifact {
            kind,
            key: key.clone(),
            path,
            exists,
        }
    }

    /// Run `builder` against the staging path unless the artifact exists.
    ///
    /// Returns whether the builder ran. On failure the staging output is
    /// discarded and the artifact path is left untouched.
    pub fn build_if_missing<F>(&self, artifact: &CachedArtifact, builder: F) -> Result<bool>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        if artifact.path.exists() {
            debug!("Reusing cached {}", artifact.path.display());
            return Ok(false);
        }

        fs::create_dir_all(&self.work_dir)?;
        let staging = artifact.staging_path();
        remove_path(&staging)?;

        if let Err(e) = builder(&staging) {
            if let Err(cleanup) = remove_path(&staging) {
                warn!("Could not clean up {}: {}", staging.display(), cleanup);
            }
            return Err(e);
        }

        if !staging.exists() {
            return Err(Error::Configuration {
                message: format!(
                    "building {} produced no output at {}",
                    artifact.path.display(),
                    staging.display()
                ),
            });
        }
        fs::rename(&staging, &artifact.path)?;
        Ok(true)
    }

    /// Point `decompile-latest` at `artifact` with a relative link.
    ///
    /// Best-effort: failures are logged.
    pub fn link_latest(&self, artifact: &CachedArtifact) {
        let link = self.work_dir.join(LATEST_DECOMPILE_LINK);
        if let Err(e) = replace_link(&link, &artifact.path) {
            warn!(
                "Could not link {} to {}: {}",
                link.display(),
                artifact.path.display(),
                e
            );
        }
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn replace_link(link: &Path, target: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link).or_else(|_| fs::remove_dir_all(link))?;
    }
    let relative = target
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| target.to_path_buf());

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(relative, link)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_dir(relative, link)
    }
}
