//! Java runtime detection and version gating
//!
//! Versions are identified by their class-file major version (`52` is
//! Java 8). Version descriptors state the range of class versions able to
//! build them; [`check_range`] enforces it against the detected runtime.

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::process::{Invocation, ProcessExecutor};

/// Oldest runtime able to run the build tools at all.
pub const MINIMUM_CLASS_VERSION: u32 = 52;

/// Range assumed when a descriptor does not state one: Java 7 to Java 8.
pub const DEFAULT_JAVA_RANGE: [u32; 2] = [51, 52];

const KNOWN_VERSIONS: &[(&str, u32)] = &[
    ("Java 5", 49),
    ("Java 6", 50),
    ("Java 7", 51),
    ("Java 8", 52),
    ("Java 9", 53),
    ("Java 10", 54),
    ("Java 11", 55),
    ("Java 12", 56),
    ("Java 13", 57),
    ("Java 14", 58),
    ("Java 15", 59),
    ("Java 16", 60),
    ("Java 17", 61),
    ("Java 18", 62),
    ("Java 19", 63),
    ("Java 20", 64),
    ("Java 21", 65),
];

/// A Java release identified by class-file version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaVersion {
    name: String,
    class_version: u32,
    known: bool,
}

impl JavaVersion {
    /// Look up a class version. Unlisted versions get a derived name
    /// marked with `*`.
    pub fn from_class_version(class_version: u32) -> Self {
        match KNOWN_VERSIONS.iter().find(|(_, v)| *v == class_version) {
            Some((name, _)) => Self {
                name: name.to_string(),
                class_version,
                known: true,
            },
            None => Self {
                name: format!("Java {}*", class_version as i64 - 44),
                class_version,
                known: false,
            },
        }
    }

    pub fn class_version(&self) -> u32 {
        self.class_version
    }

    pub fn is_known(&self) -> bool {
        self.known
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// `[Java 7, Java 8]` style rendering of class versions.
pub fn print_versions(versions: &[u32]) -> String {
    let names: Vec<String> = versions
        .iter()
        .map(|v| JavaVersion::from_class_version(*v).to_string())
        .collect();
    format!("[{}]", names.join(", "))
}

/// The Java runtime used for child processes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaRuntime {
    pub home: Option<PathBuf>,
    pub version: JavaVersion,
}

/// Detect the runtime `java` resolves to, preferring `$JAVA_HOME`.
pub fn detect(executor: &ProcessExecutor, dir: &Path) -> Result<JavaRuntime> {
    let program = std::env::var_os("JAVA_HOME")
        .map(PathBuf::from)
        .map(|home| home.join("bin").join("java"))
        .filter(|java| java.exists())
        .map(|java| java.to_string_lossy().into_owned())
        .unwrap_or_else(|| "java".to_string());

    let invocation = Invocation::new(dir, program)
        .args(["-XshowSettings:properties", "-version"])
        .quiet();
    let output = executor.execute(&invocation).map_err(|e| Error::Environment {
        tool: "java".to_string(),
        message: e.to_string(),
        hint: Some("Install a Java runtime and make sure it is on PATH or JAVA_HOME".to_string()),
    })?;

    // The properties listing goes to stderr.
    let listing = format!("{}\n{}", output.stderr, output.stdout);
    let (home, class_version) = parse_properties(&listing);
    let class_version = class_version.ok_or_else(|| Error::Environment {
        tool: "java".to_string(),
        message: "could not determine java.class.version".to_string(),
        hint: None,
    })?;

    let runtime = JavaRuntime {
        home,
        version: JavaVersion::from_class_version(class_version),
    };
    debug!("Detected {} at {:?}", runtime.version, runtime.home);
    Ok(runtime)
}

/// Extract `java.home` and the major `java.class.version` from a
/// `-XshowSettings:properties` listing.
pub fn parse_properties(listing: &str) -> (Option<PathBuf>, Option<u32>) {
    let mut home = None;
    let mut class_version = None;
    for line in listing.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "java.home" => home = Some(PathBuf::from(value)),
            "java.class.version" => {
                class_version = value.split('.').next().and_then(|major| major.parse().ok())
            }
            _ => {}
        }
    }
    (home, class_version)
}

/// Reject runtimes too old to run the build tools.
pub fn check_minimum(current: &JavaVersion) -> Result<()> {
    if current.class_version() < MINIMUM_CLASS_VERSION {
        return Err(Error::Environment {
            tool: "java".to_string(),
            message: format!(
                "{} is not supported, {} or newer is required",
                current,
                JavaVersion::from_class_version(MINIMUM_CLASS_VERSION)
            ),
            hint: None,
        });
    }
    Ok(())
}

/// Check `current` against a `[min, max]` class version range.
pub fn check_range(current: &JavaVersion, range: &[u32]) -> Result<()> {
    let [min, max] = range else {
        return Err(Error::VersionCompatibility {
            message: format!(
                "Expected only two Java versions, got {}",
                print_versions(range)
            ),
            hint: None,
        });
    };

    if current.class_version() < *min || current.class_version() > *max {
        return Err(Error::VersionCompatibility {
            message: format!(
                "The version you have requested to build requires Java versions between {}, but you are using {}",
                print_versions(range),
                current
            ),
            hint: Some(
                "Please rerun using an appropriate Java version. Outdated versions do not support Java versions that did not exist at their release."
                    .to_string(),
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_versions() {
        assert_eq!(JavaVersion::from_class_version(52).to_string(), "Java 8");
        assert_eq!(JavaVersion::from_class_version(61).to_string(), "Java 17");
        let future = JavaVersion::from_class_version(70);
        assert_eq!(future.to_string(), "Java 26*");
        assert!(!future.is_known());
    }

    #[test]
    fn test_print_versions() {
        assert_eq!(print_versions(&DEFAULT_JAVA_RANGE), "[Java 7, Java 8]");
        assert_eq!(print_versions(&[]), "[]");
    }

    #[test]
    fn test_parse_properties() {
        let listing = "Property settings:\n    file.encoding = UTF-8\n    java.class.version = 61.0\n    java.home = /usr/lib/jvm/java-17\n";
        let (home, version) = parse_properties(listing);
        assert_eq!(home, Some(PathBuf::from("/usr/lib/jvm/java-17")));
        assert_eq!(version, Some(61));
    }

    #[test]
    fn test_parse_properties_missing() {
        assert_eq!(parse_properties("openjdk version \"17\""), (None, None));
    }

    #[test]
    fn test_check_range() {
        let java8 = JavaVersion::from_class_version(52);
        assert!(check_range(&java8, &[51, 52]).is_ok());
        assert!(check_range(&java8, &[52, 60]).is_ok());

        let java17 = JavaVersion::from_class_version(61);
        let err = check_range(&java17, &DEFAULT_JAVA_RANGE).unwrap_err();
        assert!(err.to_string().contains("[Java 7, Java 8]"));
        assert!(err.to_string().contains("Java 17"));
    }

    #[test]
    fn test_check_range_requires_two_entries() {
        let java8 = JavaVersion::from_class_version(52);
        let err = check_range(&java8, &[52]).unwrap_err();
        assert!(err.to_string().contains("Expected only two Java versions"));
        assert!(check_range(&java8, &[51, 52, 53]).is_err());
    }

    #[test]
    fn test_check_minimum() {
        assert!(check_minimum(&JavaVersion::from_class_version(51)).is_err());
        assert!(check_minimum(&JavaVersion::from_class_version(52)).is_ok());
    }
}
