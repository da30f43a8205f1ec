//! # Patch Engine
//!
//! Parses unified diffs and applies them to the decompiled server sources.
//!
//! The patches shipped in `CraftBukkit/nms-patches/` are plain unified
//! diffs, one per class, named `<ClassName>.patch`. Some of them omit the
//! `---`/`+++` prelude; a synthetic one is added before parsing.
//!
//! Application is strict: every hunk applies at its declared position and
//! its context must match the base exactly. A mismatch means the decompile
//! output and the patches disagree, and is always an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::error::{Error, Result};

/// Extension of patch files.
pub const PATCH_EXTENSION: &str = "patch";

/// Package directory every patch target lives in.
pub const TARGET_PACKAGE_DIR: &str = "net/minecraft/server";

/// `@@ -a[,b] +c[,d] @@`; an omitted length means 1.
static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@") {
        Ok(regex) => regex,
        Err(err) => panic!("hunk header regex is invalid: {err}"),
    }
});

/// One line of a hunk body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Delete(String),
    Insert(String),
}

/// A contiguous change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based first line in the base file.
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// 0-based index of the first base line the hunk touches.
    fn base_index(&self) -> usize {
        if self.old_len == 0 {
            // A pure insertion is declared against the line it follows.
            self.old_start
        } else {
            self.old_start.saturating_sub(1)
        }
    }
}

/// A parsed patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub name: String,
    pub hunks: Vec<Hunk>,
}

/// Whether the patch text carries its own `+++` prelude.
fn has_prelude(text: &str) -> bool {
    text.lines().take(3).any(|line| line.starts_with("+++"))
}

/// Parse unified-diff `text`. `name` identifies the patch in errors.
pub fn parse(name: &str, text: &str) -> Result<Patch> {
    let parse_error = |message: String| Error::PatchParse {
        patch: name.to_string(),
        message,
    };

    let synthesized;
    let text = if has_prelude(text) {
        text
    } else {
        synthesized = format!("+++\n{}", text);
        &synthesized
    };

    let mut hunks = Vec::new();
    let mut current: Option<(Hunk, usize, usize)> = None;

    for (index, line) in text.lines().enumerate() {
        if let Some((hunk, old_left, new_left)) = current.as_mut() {
            let (old_step, new_step, body) = match line.chars().next() {
                None => (1, 1, Some(HunkLine::Context(String::new()))),
                Some(' ') => (1, 1, Some(HunkLine::Context(line[1..].to_string()))),
                Some('-') => (1, 0, Some(HunkLine::Delete(line[1..].to_string()))),
                Some('+') => (0, 1, Some(HunkLine::Insert(line[1..].to_string()))),
                Some('\\') => (0, 0, None),
                Some(_) => {
                    return Err(parse_error(format!(
                        "line {}: unexpected line inside hunk: {}",
                        index + 1,
                        line
                    )));
                }
            };
            if old_step > *old_left || new_step > *new_left {
                return Err(parse_error(format!(
                    "line {}: hunk body longer than its header declares",
                    index + 1
                )));
            }
            *old_left -= old_step;
            *new_left -= new_step;
            if let Some(body) = body {
                hunk.lines.push(body);
            }
            if *old_left == 0 && *new_left == 0 {
                if let Some((hunk, _, _)) = current.take() {
                    hunks.push(hunk);
                }
            }
            continue;
        }

        if line.starts_with("@@") {
            let caps = HUNK_HEADER
                .captures(line)
                .ok_or_else(|| parse_error(format!("line {}: malformed hunk header: {}", index + 1, line)))?;
            let number = |group: usize| -> Result<usize> {
                match caps.get(group) {
                    Some(m) => m
                        .as_str()
                        .parse()
                        .map_err(|_| parse_error(format!("line {}: number out of range", index + 1))),
                    None => Ok(1),
                }
            };
            let hunk = Hunk {
                old_start: number(1)?,
                old_len: number(2)?,
                new_start: number(3)?,
                new_len: number(4)?,
                lines: Vec::new(),
            };
            if hunk.old_len == 0 && hunk.new_len == 0 {
                hunks.push(hunk);
            } else {
                let (old_len, new_len) = (hunk.old_len, hunk.new_len);
                current = Some((hunk, old_len, new_len));
            }
        }
        // Anything else outside a hunk is a header line.
    }

    if current.is_some() {
        return Err(parse_error("patch ends inside a hunk".to_string()));
    }
    if hunks.is_empty() {
        return Err(parse_error("no hunks found".to_string()));
    }

    Ok(Patch {
        name: name.to_string(),
        hunks,
    })
}

/// Apply `patch` to `base`, returning the patched lines.
pub fn apply<S: AsRef<str>>(base: &[S], patch: &Patch) -> Result<Vec<String>> {
    let mut output = Vec::with_capacity(base.len());
    let mut cursor = 0;

    for (number, hunk) in patch.hunks.iter().enumerate() {
        let number = number + 1;
        let failure = |line: usize, message: String| Error::PatchApplication {
            patch: patch.name.clone(),
            hunk: number,
            line,
            message,
        };

        let start = hunk.base_index();
        if start < cursor {
            return Err(failure(
                hunk.old_start,
                "hunk overlaps or precedes the previous hunk".to_string(),
            ));
        }
        if start > base.len() {
            return Err(failure(
                hunk.old_start,
                format!("base file has only {} lines", base.len()),
            ));
        }

        output.extend(base[cursor..start].iter().map(|line| line.as_ref().to_string()));
        cursor = start;

        for body in &hunk.lines {
            match body {
                HunkLine::Insert(text) => output.push(text.clone()),
                HunkLine::Context(expected) | HunkLine::Delete(expected) => {
                    let actual: &str = base.get(cursor).map(|line| line.as_ref()).ok_or_else(|| {
                        failure(cursor + 1, "base file ended inside the hunk".to_string())
                    })?;
                    if actual != expected.as_str() {
                        return Err(failure(
                            cursor + 1,
                            format!("expected '{}', found '{}'", expected, actual),
                        ));
                    }
                    if matches!(body, HunkLine::Context(_)) {
                        output.push(actual.to_string());
                    }
                    cursor += 1;
                }
            }
        }
    }

    output.extend(base[cursor..].iter().map(|line| line.as_ref().to_string()));
    Ok(output)
}

/// A patch file together with the source path it rewrites
#[derive(Debug, Clone)]
pub struct PatchFile {
    pub source: PathBuf,
    /// Target relative to the source root.
    pub target: PathBuf,
    pub patch: Patch,
}

/// Target of `<Name>.patch`: `net/minecraft/server/<Name>.java`.
pub fn target_for(patch_file: &Path) -> Option<PathBuf> {
    let stem = patch_file.file_stem()?.to_str()?;
    Some(Path::new(TARGET_PACKAGE_DIR).join(format!("{}.java", stem)))
}

/// Every patch of a directory, ordered by file name
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    patches: Vec<PatchFile>,
}

impl PatchSet {
    pub fn load(dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == PATCH_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let patches = paths
            .into_iter()
            .map(|source| {
                let name = source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let target = target_for(&source).ok_or_else(|| Error::PatchParse {
                    patch: name.clone(),
                    message: "patch file name is not valid UTF-8".to_string(),
                })?;
                let patch = parse(&name, &fs::read_to_string(&source)?)?;
                Ok(PatchFile {
                    source,
                    target,
                    patch,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patches })
    }

    pub fn patches(&self) -> &[PatchFile] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Patch every target read from `clean_root` into `out_root`.
    ///
    /// Returns the written paths relative to `out_root`.
    pub fn apply_all(&self, clean_root: &Path, out_root: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.patches.len());
        for file in &self.patches {
            debug!("Patching {} with {}", file.target.display(), file.patch.name);

            let base_path = clean_root.join(&file.target);
            if !base_path.is_file() {
                return Err(Error::PatchApplication {
                    patch: file.patch.name.clone(),
                    hunk: 0,
                    line: 0,
                    message: format!("base file {} does not exist", base_path.display()),
                });
            }
            let base = fs::read_to_string(&base_path)?;
            let base: Vec<&str> = base.lines().collect();
            let patched = apply(&base, &file.patch)?;

            let out_path = out_root.join(&file.target);
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut content = String::new();
            for line in &patched {
                content.push_str(line);
                content.push('\n');
            }
            fs::write(&out_path, content)?;
            written.push(file.target.clone());
        }
        Ok(written)
    }
}
