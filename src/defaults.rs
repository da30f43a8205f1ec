//! Default values for the buildtools pipeline.
//!
//! This module provides centralized constants used across stages: remote
//! locations, pinned digests of third-party downloads, the canonical command
//! templates and the legacy build metadata.

use std::path::PathBuf;

/// Log file written into the workspace for every run.
pub const LOG_FILE: &str = "BuildTools.log.txt";

/// Where version descriptors are published, one `<name>.json` per version.
pub const VERSIONS_BASE_URL: &str = "https://hub.spigotmc.org/versions/";

/// Canonical remotes of the managed repositories, one `<name>.git` each.
pub const REPOSITORY_BASE_URL: &str = "https://hub.spigotmc.org/stash/scm/spigot/";

/// Version requested when `--rev` is not given.
pub const DEFAULT_REVISION: &str = "latest";

/// Default branch of every managed repository.
pub const DEFAULT_BRANCH: &str = "master";

/// Remote-tracking tip of the default branch.
pub const UPSTREAM_DEFAULT_BRANCH: &str = "origin/master";

/// Where to obtain a newer tool build.
pub const DOWNLOAD_HINT: &str =
    "Please grab a new copy from https://www.spigotmc.org/go/buildtools-dl";

/// Vanilla server download location used when the metadata names none.
/// `{0}` is the product version.
pub const VANILLA_URL_TEMPLATE: &str =
    "https://s3.amazonaws.com/Minecraft.Download/versions/{0}/minecraft_server.{0}.jar";

pub const CLASS_MAP_COMMAND: &str =
    "java -jar BuildData/bin/SpecialSource-2.jar map -i {0} -m {1} -o {2}";
pub const MEMBER_MAP_COMMAND: &str =
    "java -jar BuildData/bin/SpecialSource-2.jar map -i {0} -m {1} -o {2}";
pub const FINAL_MAP_COMMAND: &str =
    "java -jar BuildData/bin/SpecialSource.jar --kill-lvt -i {0} --access-transformer {1} -m {2} -o {3}";
pub const DECOMPILE_COMMAND: &str =
    "java -jar BuildData/bin/fernflower.jar -dgs=1 -hdc=0 -rbr=0 -asc=1 -udv=0 {0} {1}";

/// Build metadata used when `BuildData/info.json` is absent.
pub const LEGACY_MINECRAFT_VERSION: &str = "1.8";
pub const LEGACY_ACCESS_TRANSFORMS: &str = "bukkit-1.8.at";
pub const LEGACY_CLASS_MAPPINGS: &str = "bukkit-1.8-cl.csrg";
pub const LEGACY_MEMBER_MAPPINGS: &str = "bukkit-1.8-members.csrg";
pub const LEGACY_PACKAGE_MAPPINGS: &str = "package.srg";

/// Archive prefix extracted from the mapped jar before decompiling.
pub const DECOMPILE_CLASS_PREFIX: &str = "net/minecraft/server";

/// Tool versions at which the workspace layout changed.
pub const LEGACY_LINK_BELOW_TOOLS_VERSION: i32 = 93;
pub const CRAFTBUKKIT_JAR_BELOW_TOOLS_VERSION: i32 = 101;
pub const COMBINED_COMPILE_UP_TO_TOOLS_VERSION: i32 = 104;

pub const DEFAULT_MAVEN_OPTS: &str = "-Xmx1024M";
pub const JAVA_OPTIONS_BASE: &str = "-Djdk.net.URLClassPath.disableClassPathURLCheck=true";

/// Portable Maven installed into the workspace when `M2_HOME` is unusable.
pub const MAVEN_VERSION: &str = "apache-maven-3.6.0";
pub const MAVEN_DOWNLOAD_BASE: &str = "https://static.spigotmc.org/maven/";
pub const MAVEN_SHA512: &str = "7d14ab2b713880538974aa361b987231473fbbed20e83586d542c691ace1139026f232bd46fdcce5e8887f528ab1c3fbfc1b2adec90518b6941235952d3868e9";

/// Portable git for Windows.
pub const PORTABLE_GIT_VERSION: &str = "PortableGit-2.24.1.2";
pub const PORTABLE_GIT_DOWNLOAD_BASE: &str = "https://static.spigotmc.org/git/";
pub const PORTABLE_GIT_SHA256_64: &str =
    "cb75e4a557e01dd27b5af5eb59dfe28adcbad21638777dd686429dd905d13899";
pub const PORTABLE_GIT_SHA256_32: &str =
    "88f5525999228b0be8bb51788bfaa41b14430904bc65f1d4bbdcf441cac1f7fc";

/// Git identity configured when the user has none.
pub const GIT_DEFAULT_NAME: &str = "BuildTools";
pub const GIT_DEFAULT_EMAIL: &str = "unconfigured@null.spigotmc.org";

/// Characters that break the shell scripts run by the pipeline.
pub const FORBIDDEN_PATH_CHARS: [char; 5] = ['\'', '#', '~', '(', ')'];

/// Value of `core.autocrlf` for fresh clones, fixed for the process.
pub fn autocrlf() -> bool {
    cfg!(windows)
}

/// Build number stamped into the binary through
/// `BUILDTOOLS_BUILD_NUMBER` at compile time, if any.
pub fn build_number() -> Option<i32> {
    option_env!("BUILDTOOLS_BUILD_NUMBER").and_then(|n| n.trim().parse().ok())
}

/// Returns the default output directory for packaged jars.
///
/// Falls back to `.` when the current directory cannot be determined.
pub fn default_output_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
