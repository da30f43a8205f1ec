//! # Build Metadata Documents
//!
//! Two JSON documents drive a build:
//!
//! - **Version descriptors** (`<rev>.json` from the versions endpoint) pin
//!   the ref of every managed repository and state which tool build and
//!   Java range can build them. Parsed into [`VersionDescriptor`].
//!
//! - **Build metadata** (`BuildData/info.json`) names the mapping files,
//!   the vanilla jar and its hash, and the command templates of the remap
//!   and decompile tools. Parsed into [`BuildMetadata`].
//!
//! Optional command templates are resolved to their canonical defaults
//! once, right after parsing, so the rest of the pipeline only ever sees a
//! fully populated record.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::process::Invocation;
use crate::repository::ManagedRepository;

/// Marker for "no tools version requirement".
pub const NO_TOOLS_REQUIREMENT: i32 = -1;

fn no_tools_requirement() -> i32 {
    NO_TOOLS_REQUIREMENT
}

/// One ref per managed repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRefs {
    #[serde(rename = "BuildData")]
    pub build_data: String,
    #[serde(rename = "Bukkit")]
    pub bukkit: String,
    #[serde(rename = "CraftBukkit")]
    pub craftbukkit: String,
    #[serde(rename = "Spigot")]
    pub spigot: String,
}

impl RepositoryRefs {
    /// Every repository at the same ref.
    pub fn uniform(r#ref: &str) -> Self {
        Self {
            build_data: r#ref.to_string(),
            bukkit: r#ref.to_string(),
            craftbukkit: r#ref.to_string(),
            spigot: r#ref.to_string(),
        }
    }

    pub fn get(&self, repository: ManagedRepository) -> &str {
        match repository {
            ManagedRepository::BuildData => &self.build_data,
            ManagedRepository::Bukkit => &self.bukkit,
            ManagedRepository::CraftBukkit => &self.craftbukkit,
            ManagedRepository::Spigot => &self.spigot,
        }
    }
}

/// A requested build target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Minimum tool build able to build this version.
    #[serde(default = "no_tools_requirement")]
    pub tools_version: i32,
    /// Supported Java class-file versions as `[min, max]`.
    #[serde(default)]
    pub java_versions: Option<Vec<u32>>,
    pub refs: RepositoryRefs,
}

impl VersionDescriptor {
    /// Descriptor used when version resolution is skipped: every
    /// repository at its default branch.
    pub fn development() -> Self {
        Self {
            name: "Dev Build".to_string(),
            description: "Development".to_string(),
            tools_version: 0,
            java_versions: None,
            refs: RepositoryRefs::uniform(defaults::DEFAULT_BRANCH),
        }
    }

    /// Parse a descriptor document. `source` names it in errors.
    pub fn parse(json: &str, source: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Metadata {
            path: source.to_string(),
            message: e.to_string(),
        })
    }

    pub fn ref_for(&self, repository: ManagedRepository) -> &str {
        self.refs.get(repository)
    }

    pub fn requires_tools_version(&self) -> Option<i32> {
        (self.tools_version != NO_TOOLS_REQUIREMENT).then_some(self.tools_version)
    }
}

/// A tool command line with `{n}` positional placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute placeholders and split into words on single spaces.
    pub fn render(&self, args: &[&str]) -> Vec<String> {
        substitute(&self.0, args)
            .split(' ')
            .map(str::to_string)
            .collect()
    }

    /// Render into an invocation running in `dir`.
    pub fn to_invocation(&self, dir: &Path, args: &[&str]) -> Result<Invocation> {
        let mut words = self
            .render(args)
            .into_iter()
            .filter(|word| !word.trim().is_empty());
        let program = words.next().ok_or_else(|| Error::Metadata {
            path: "command template".to_string(),
            message: format!("template '{}' names no program", self.0),
        })?;
        Ok(Invocation::new(dir, program).args(words))
    }
}

/// Replace `{n}` with `args[n]`. Placeholders without an argument are
/// left untouched.
pub fn substitute(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let inner = &after[..close];
        let argument = Some(inner)
            .filter(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|index| index.parse::<usize>().ok())
            .and_then(|index| args.get(index));
        match argument {
            Some(arg) => out.push_str(arg),
            None => {
                out.push('{');
                out.push_str(inner);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// `info.json` as written, before defaults are applied.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuildMetadata {
    minecraft_version: String,
    access_transforms: String,
    class_mappings: String,
    member_mappings: String,
    package_mappings: String,
    #[serde(default)]
    minecraft_hash: Option<String>,
    #[serde(default)]
    class_map_command: Option<String>,
    #[serde(default)]
    member_map_command: Option<String>,
    #[serde(default)]
    final_map_command: Option<String>,
    #[serde(default)]
    decompile_command: Option<String>,
    #[serde(default)]
    server_url: Option<String>,
    #[serde(default = "no_tools_requirement")]
    tools_version: i32,
}

/// How to turn the vanilla jar into the mapped, decompiled form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub minecraft_version: String,
    pub access_transforms: String,
    pub class_mappings: String,
    pub member_mappings: String,
    pub package_mappings: String,
    /// MD5 of the vanilla jar; `None` skips verification.
    pub minecraft_hash: Option<String>,
    pub class_map_command: CommandTemplate,
    pub member_map_command: CommandTemplate,
    pub final_map_command: CommandTemplate,
    pub decompile_command: CommandTemplate,
    /// Explicit vanilla jar location.
    pub server_url: Option<String>,
    pub tools_version: i32,
}

impl BuildMetadata {
    /// The metadata of builds that predate `info.json`.
    pub fn legacy() -> Self {
        Self {
            minecraft_version: defaults::LEGACY_MINECRAFT_VERSION.to_string(),
            access_transforms: defaults::LEGACY_ACCESS_TRANSFORMS.to_string(),
            class_mappings: defaults::LEGACY_CLASS_MAPPINGS.to_string(),
            member_mappings: defaults::LEGACY_MEMBER_MAPPINGS.to_string(),
            package_mappings: defaults::LEGACY_PACKAGE_MAPPINGS.to_string(),
            minecraft_hash: None,
            class_map_command: CommandTemplate::new(defaults::CLASS_MAP_COMMAND),
            member_map_command: CommandTemplate::new(defaults::MEMBER_MAP_COMMAND),
            final_map_command: CommandTemplate::new(defaults::FINAL_MAP_COMMAND),
            decompile_command: CommandTemplate::new(defaults::DECOMPILE_COMMAND),
            server_url: None,
            tools_version: NO_TOOLS_REQUIREMENT,
        }
    }

    /// Parse `info.json` text. A JSON `null` document yields `None`.
    pub fn parse(json: &str, source: &str) -> Result<Option<Self>> {
        let raw: Option<RawBuildMetadata> =
            serde_json::from_str(json).map_err(|e| Error::Metadata {
                path: source.to_string(),
                message: e.to_string(),
            })?;
        Ok(raw.map(Self::resolve))
    }

    /// Load from disk, substituting the legacy metadata when the file is
    /// missing or empty.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::legacy());
        }
        let json = fs::read_to_string(path)?;
        if json.trim().is_empty() {
            return Ok(Self::legacy());
        }
        Ok(Self::parse(&json, &path.display().to_string())?.unwrap_or_else(Self::legacy))
    }

    fn resolve(raw: RawBuildMetadata) -> Self {
        fn template(value: Option<String>, fallback: &str) -> CommandTemplate {
            CommandTemplate::new(
                value
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            )
        }

        Self {
            minecraft_version: raw.minecraft_version,
            access_transforms: raw.access_transforms,
            class_mappings: raw.class_mappings,
            member_mappings: raw.member_mappings,
            package_mappings: raw.package_mappings,
            minecraft_hash: raw.minecraft_hash.filter(|h| !h.trim().is_empty()),
            class_map_command: template(raw.class_map_command, defaults::CLASS_MAP_COMMAND),
            member_map_command: template(raw.member_map_command, defaults::MEMBER_MAP_COMMAND),
            final_map_command: template(raw.final_map_command, defaults::FINAL_MAP_COMMAND),
            decompile_command: template(raw.decompile_command, defaults::DECOMPILE_COMMAND),
            server_url: raw.server_url.filter(|u| !u.trim().is_empty()),
            tools_version: raw.tools_version,
        }
    }

    /// Where the vanilla jar is downloaded from.
    pub fn vanilla_url(&self) -> String {
        match &self.server_url {
            Some(url) => url.clone(),
            None => substitute(defaults::VANILLA_URL_TEMPLATE, &[&self.minecraft_version]),
        }
    }

    /// Local file name of the vanilla jar inside the work directory.
    pub fn vanilla_jar_name(&self) -> String {
        format!("minecraft_server.{}.jar", self.minecraft_version)
    }

    /// Path of a mapping file relative to the workspace root.
    pub fn mapping_path(&self, file: &str) -> PathBuf {
        PathBuf::from(ManagedRepository::BuildData.dir_name())
            .join("mappings")
            .join(file)
    }

    pub fn requires_tools_version(&self) -> Option<i32> {
        (self.tools_version != NO_TOOLS_REQUIREMENT).then_some(self.tools_version)
    }
}
