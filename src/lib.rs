//! # BuildTools Library
//!
//! This library builds the Spigot and CraftBukkit Minecraft server jars from
//! source. It drives the whole pipeline: fetching the upstream repositories,
//! downloading the vanilla server, remapping and decompiling it, applying
//! the CraftBukkit patches and compiling the result with Maven. It is used
//! by the `buildtools` command-line tool but the stages can be driven
//! individually.
//!
//! ## Quick Example
//!
//! ```
//! use buildtools::cache::{compute_key, KEY_LENGTH};
//! use buildtools::patch;
//!
//! // Cache keys do not depend on the order of their inputs
//! let forward = compute_key(["1f3e", "a9c0"]);
//! let reverse = compute_key(["a9c0", "1f3e"]);
//! assert_eq!(forward, reverse);
//! assert_eq!(forward.as_str().len(), KEY_LENGTH);
//!
//! // Apply a unified diff to a file held in memory
//! let diff = "@@ -1,2 +1,2 @@\n class Foo {\n-}\n+ }\n";
//! let parsed = patch::parse("Foo.patch", diff).unwrap();
//! let patched = patch::apply(&["class Foo {", "}"], &parsed).unwrap();
//! assert_eq!(patched, vec!["class Foo {", " }"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`, `defaults`)**: The run options and the
//!   fixed URLs, checksums and tools-version thresholds.
//! - **Build data (`metadata`)**: The version descriptor naming the commits
//!   to build and the `info.json` metadata describing how to build them.
//! - **Repositories (`repository`, `git`)**: Cloning, fetching and resetting
//!   the four upstream repositories behind a mockable trait.
//! - **External programs (`process`, `toolchain`, `runtime`)**: Running
//!   child processes with forwarded output, and locating shell, git, Maven
//!   and Java.
//! - **Artifacts (`download`, `hash`, `archive`, `cache`)**: Verified
//!   downloads, zip extraction and the content-addressed cache of remapped
//!   and decompiled jars.
//! - **Patching (`patch`)**: A unified-diff engine for the CraftBukkit
//!   patch set.
//! - **Phases (`phases`)**: The stages of a run, wired together by
//!   `phases::orchestrator`.
//!
//! ## Execution Flow
//!
//! 1.  **Resolve**: Validate options and prepare the work directory.
//! 2.  **Environment**: Probe the shell, git and Maven in parallel, then Java.
//! 3.  **Workspace**: Clone and synchronize the repositories at the requested
//!     version.
//! 4.  **Vanilla**: Download and verify the vanilla server jar.
//! 5.  **Remap / Decompile**: Produce the mapped jar and its decompiled
//!     sources, reusing cached outputs.
//! 6.  **Patching**: Apply the patches and commit them on a `patched` branch.
//! 7.  **Compile / Package**: Run Maven and copy the jars to the output
//!     directory.

pub mod archive;
pub mod cache;
pub mod config;
pub mod defaults;
pub mod download;
pub mod error;
pub mod git;
pub mod hash;
pub mod logging;
pub mod metadata;
pub mod output;
pub mod patch;
pub mod phases;
pub mod process;
pub mod repository;
pub mod runtime;
pub mod tasks;
pub mod toolchain;

#[cfg(test)]
mod cache_proptest;
