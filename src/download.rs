//! # Downloads
//!
//! HTTP access for version descriptors, the vanilla server jar and the
//! portable tool distributions, behind the [`Fetcher`] trait so stages can
//! be exercised without a network.
//!
//! Binary downloads are verified against a pinned digest before they are
//! written. In development mode a mismatch is only reported. Content is
//! written to `<target>.part` and renamed into place, so an interrupted
//! write never leaves a truncated file under the final name.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;

/// Connect and read timeout of metadata requests.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of remote content.
pub trait Fetcher: Send + Sync {
    /// Fetch a (potentially large) binary resource.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Fetch a small text document.
    fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// `Fetcher` backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// `allow_invalid_certs` disables TLS certificate and host name checks.
    pub fn new(allow_invalid_certs: bool) -> Result<Self> {
        if allow_invalid_certs {
            warn!("HTTPS certificate checking is disabled");
        }
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(METADATA_TIMEOUT)
            .timeout(None)
            .danger_accept_invalid_certs(allow_invalid_certs)
            .user_agent(concat!("buildtools/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<reqwest::blocking::Response> {
        let network = |e: reqwest::Error| Error::Network {
            url: url.to_string(),
            message: if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            },
        };

        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        request
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(network)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url, None)?;
        let bytes = response.bytes().map_err(|e| Error::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        self.get(url, Some(METADATA_TIMEOUT))?
            .text()
            .map_err(|e| Error::Network {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

/// Compare `actual` with an optional pinned digest. Outside development
/// mode a mismatch is an [`Error::Integrity`]; in development mode it is
/// logged.
fn verify(target: &Path, actual: &str, expected: Option<&str>, dev_mode: bool) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    if expected.eq_ignore_ascii_case(actual) {
        return Ok(());
    }
    if dev_mode {
        warn!(
            "Downloaded file {} did not match expected hash {}, continuing in development mode",
            target.display(),
            expected
        );
        return Ok(());
    }
    Err(Error::Integrity {
        target: target.display().to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Download `url` to `target`, verifying it against `expected` first.
///
/// Nothing is written when verification fails.
pub fn download(
    fetcher: &dyn Fetcher,
    url: &str,
    target: &Path,
    algorithm: HashAlgorithm,
    expected: Option<&str>,
    dev_mode: bool,
) -> Result<()> {
    info!("Starting download of {}", url);
    let bytes = fetcher.fetch_bytes(url)?;
    let actual = algorithm.digest_of(&bytes);
    info!(
        "Downloaded file: {} with {} hash: {}",
        target.display(),
        algorithm.name(),
        actual
    );

    verify(target, &actual, expected, dev_mode)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = partial_path(target);
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, target)?;
    Ok(())
}

/// Where `target` is written before it is complete.
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

/// Whether an existing file matches its pinned digest.
///
/// Without a pinned digest, or in development mode, any file is accepted.
pub fn check_hash(
    path: &Path,
    algorithm: HashAlgorithm,
    expected: Option<&str>,
    dev_mode: bool,
) -> Result<bool> {
    let actual = algorithm.hash_file(path)?;
    match expected {
        Some(expected) if !dev_mode && !expected.eq_ignore_ascii_case(&actual) => {
            warn!(
                "**** Warning, hash of {} is {}, which does not match stored hash of {}",
                path.display(),
                actual,
                expected
            );
            Ok(false)
        }
        _ => {
            info!("Found good hash ({}) for {}", actual, path.display());
            Ok(true)
        }
    }
}
