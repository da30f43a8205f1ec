//! # Error Handling
//!
//! This module defines the centralized error type for the `buildtools`
//! library. It uses the `thiserror` library to create a single `Error` enum
//! covering every failure the pipeline can raise, each variant carrying the
//! context needed to diagnose it.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants map onto the failure families of
//!   the build pipeline:
//!   - Configuration errors (contradictory flags, unusable workspace path).
//!   - Environment errors (a required external tool is unavailable).
//!   - Network and integrity errors (metadata fetch failures, hash
//!     mismatches on downloads).
//!   - Version compatibility errors (stale tool build, unsupported Java).
//!   - Patch parse and application errors.
//!   - External process failures (spawn failures and non-zero exits).
//!   - Wrapped library errors (I/O, JSON, zip, HTTP, URL parsing).
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Lower components never terminate the process. They return these typed
//! errors, and the binary's top level decides the exit code exactly once.

use thiserror::Error;

/// Main error type for buildtools operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested combination of options is contradictory, or the
    /// workspace cannot be used.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A required external tool is unavailable, even after an attempted
    /// automatic install.
    #[error("Environment error: {tool} - {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Environment {
        tool: String,
        message: String,
        /// Remediation text shown to the user
        hint: Option<String>,
    },

    /// A network operation failed.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// A downloaded or cached file did not match its pinned digest.
    #[error("Integrity error: {target} has hash {actual}, expected {expected}")]
    Integrity {
        target: String,
        expected: String,
        actual: String,
    },

    /// The running tool or Java runtime cannot build the requested version.
    #[error("Version compatibility error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    VersionCompatibility {
        message: String,
        /// Where to obtain a compatible tool or runtime
        hint: Option<String>,
    },

    /// A metadata document could not be parsed.
    #[error("Metadata error in {path}: {message}")]
    Metadata { path: String, message: String },

    /// A patch file could not be parsed as a unified diff.
    #[error("Patch parse error in {patch}: {message}")]
    PatchParse { patch: String, message: String },

    /// A hunk's context did not match the base file.
    ///
    /// This signals either a stale decompile cache or a corrupted patch and
    /// is never skipped.
    #[error("Patch application error in {patch}: hunk {hunk} at line {line}: {message}")]
    PatchApplication {
        patch: String,
        hunk: usize,
        line: usize,
        message: String,
    },

    /// An external process could not be started.
    #[error("Failed to start {command}: {message}")]
    ProcessSpawn { command: String, message: String },

    /// A pipeline-critical external process exited unsuccessfully.
    #[error("Error running command, return status {status}: {command}")]
    ProcessFailed { command: String, status: i32 },

    /// A git invocation against a managed repository failed.
    #[error("Git command failed for {repository}: {command} - {stderr}")]
    GitCommand {
        repository: String,
        command: String,
        stderr: String,
    },

    /// The compile stage failed.
    #[error("{message}\n  caused by: {source}")]
    Compile {
        message: String,
        #[source]
        source: Box<Error>,
    },

    /// A parallel batch did not finish within the runner's ceiling.
    #[error("Parallel tasks did not finish within {elapsed_secs}s")]
    TaskTimeout { elapsed_secs: u64 },

    /// A parallel task panicked.
    #[error("Parallel task panicked: {message}")]
    TaskPanicked { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A zip archive error, wrapped from `zip::result::ZipError`.
    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An HTTP client error, wrapped from `reqwest::Error`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
