//! Zip extraction
//!
//! Used to unpack the portable Maven distribution and to pull the server
//! classes out of the mapped jar before decompiling.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use log::debug;

use crate::error::Result;

/// Extract every entry of `archive` into `target`.
pub fn extract_all(archive: &Path, target: &Path) -> Result<usize> {
    extract(archive, target, |_| true)
}

/// Extract the entries whose archive name satisfies `filter`.
///
/// Entries whose names would escape `target` are skipped. Returns the number
/// of files written.
pub fn extract<F>(archive: &Path, target: &Path, filter: F) -> Result<usize>
where
    F: Fn(&str) -> bool,
{
    fs::create_dir_all(target)?;
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if !filter(entry.name()) {
            continue;
        }

        let out_path = match entry.enclosed_name() {
            Some(path) => target.join(path),
            None => continue,
        };

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out_file = File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file)?;
        written += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode)).ok();
            }
        }

        debug!("Extracted: {}", out_path.display());
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(name.trim_end_matches('/'), SimpleFileOptions::default())
                    .unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_with_filter() {
        let temp_dir = TempDir::new().unwrap();
        let jar = temp_dir.path().join("mapped.jar");
        write_zip(
            &jar,
            &[
                ("net/minecraft/server/Block.class", "block"),
                ("net/minecraft/server/World.class", "world"),
                ("com/google/Gson.class", "gson"),
                ("META-INF/MANIFEST.MF", "manifest"),
            ],
        );

        let out = temp_dir.path().join("classes");
        let count = extract(&jar, &out, |name| name.starts_with("net/minecraft/server")).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            fs::read_to_string(out.join("net/minecraft/server/Block.class")).unwrap(),
            "block"
        );
        assert!(!out.join("com").exists());
        assert!(!out.join("META-INF").exists());
    }

    #[test]
    fn test_extract_all_with_directories() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("maven.zip");
        write_zip(
            &archive,
            &[
                ("apache-maven-3.6.0/", ""),
                ("apache-maven-3.6.0/bin/", ""),
                ("apache-maven-3.6.0/bin/mvn", "#!/bin/sh\n"),
            ],
        );

        let count = extract_all(&archive, temp_dir.path()).unwrap();
        assert_eq!(count, 1);
        assert!(temp_dir.path().join("apache-maven-3.6.0/bin/mvn").is_file());
    }

    #[test]
    fn test_extract_missing_archive() {
        let temp_dir = TempDir::new().unwrap();
        assert!(extract_all(&temp_dir.path().join("nope.zip"), temp_dir.path()).is_err());
    }
}
