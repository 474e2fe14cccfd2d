//! ZIP serialisation, safe extraction and manifest reading

use super::metadata::{BundleMetadata, MANIFEST_NAME};
use crate::error::{IoResultExt, WdlError};
use crate::fs_utils;
use indexmap::IndexMap;
use path_clean::PathClean;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

fn zip_error(context: &str, err: ZipError) -> WdlError {
    WdlError::bundle(format!("{}: {}", context, err))
}

/// Fixed entry attributes so identical contents produce identical bytes
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

/// Write `files` in lexicographic path order, then the manifest
pub(crate) fn write_archive<W: Write + Seek>(
    writer: W,
    files: &IndexMap<String, Vec<u8>>,
    metadata: Option<&BundleMetadata>,
) -> Result<W, WdlError> {
    let mut zip = ZipWriter::new(writer);

    let mut names: Vec<&String> = files.keys().collect();
    names.sort();
    for name in names {
        zip.start_file(name.as_str(), entry_options())
            .map_err(|e| zip_error(name, e))?;
        zip.write_all(&files[name])
            .map_err(|e| WdlError::bundle(format!("{}: {}", name, e)))?;
    }

    if let Some(metadata) = metadata {
        let manifest = serde_json::to_vec_pretty(metadata)
            .map_err(|e| WdlError::bundle(format!("cannot serialise manifest: {}", e)))?;
        zip.start_file(MANIFEST_NAME, entry_options())
            .map_err(|e| zip_error(MANIFEST_NAME, e))?;
        zip.write_all(&manifest)
            .map_err(|e| WdlError::bundle(format!("{}: {}", MANIFEST_NAME, e)))?;
    }

    zip.finish().map_err(|e| zip_error("cannot finish archive", e))
}

fn open_archive(archive_path: &Path) -> Result<ZipArchive<File>, WdlError> {
    let file = File::open(archive_path).with_path(archive_path)?;
    ZipArchive::new(file).map_err(|e| {
        zip_error(
            &format!("{} is not a valid bundle archive", archive_path.display()),
            e,
        )
    })
}

/// Map an entry name to its destination under the absolute directory
/// `base`, refusing anything that would land outside it
fn entry_target(base: &Path, name: &str) -> Result<PathBuf, WdlError> {
    let unsafe_entry = |reason: &str| {
        WdlError::bundle(format!("refusing to extract entry '{}': {}", name, reason))
    };

    let relative = Path::new(name);
    let rooted = name.starts_with('/')
        || name.starts_with('\\')
        || relative
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir));
    if name.is_empty() || rooted {
        return Err(unsafe_entry("absolute path"));
    }

    let target = base.join(relative).clean();
    if !fs_utils::path_is_within(&target, base) || target == base {
        return Err(unsafe_entry("path escapes the output directory"));
    }
    Ok(target)
}

/// Extract every entry of a bundle into `output_dir`, returning the paths
/// of the files written. All entry names are checked before anything is
/// written.
pub fn extract_bundle<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
) -> Result<Vec<PathBuf>, WdlError> {
    let archive_path = archive_path.as_ref();
    let output_dir = output_dir.as_ref();
    let mut archive = open_archive(archive_path)?;

    fs_utils::create_dir_all(output_dir)?;
    let base = fs_utils::absolute_path(output_dir)?;

    let mut plan = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| zip_error("cannot read archive entry", e))?;
        let target = entry_target(&base, entry.name())?;
        plan.push((index, target, entry.is_dir()));
    }

    let mut written = Vec::new();
    for (index, target, is_dir) in plan {
        if is_dir {
            fs_utils::create_dir_all(&target)?;
            continue;
        }
        let mut entry = archive
            .by_index(index)
            .map_err(|e| zip_error("cannot read archive entry", e))?;
        // The declared size is untrusted, so let the buffer grow as it reads
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| WdlError::bundle(format!("{}: {}", entry.name(), e)))?;
        fs_utils::write_file(&target, &contents)?;
        debug!("extracted {}", target.display());
        written.push(target);
    }

    Ok(written)
}

/// Read `manifest.json` from a bundle, if it has one
pub fn read_manifest<P: AsRef<Path>>(archive_path: P) -> Result<Option<BundleMetadata>, WdlError> {
    let archive_path = archive_path.as_ref();
    let mut archive = open_archive(archive_path)?;
    let mut entry = match archive.by_name(MANIFEST_NAME) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(zip_error(MANIFEST_NAME, e)),
    };

    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .map_err(|e| WdlError::bundle(format!("{}: {}", MANIFEST_NAME, e)))?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| WdlError::bundle(format!("invalid {}: {}", MANIFEST_NAME, e)))
}

/// Names of all entries in a bundle, in archive order
pub fn list_entries<P: AsRef<Path>>(archive_path: P) -> Result<Vec<String>, WdlError> {
    let archive = open_archive(archive_path.as_ref())?;
    Ok(archive.file_names().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn files(entries: &[(&str, &str)]) -> IndexMap<String, Vec<u8>> {
        entries
            .iter()
            .map(|(name, body)| (name.to_string(), body.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn test_entries_sorted_then_manifest() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("b.zip");
        let meta = BundleMetadata::new("z.wdl".to_string(), "1.0".to_string(), vec![], 2);
        let out = write_archive(
            File::create(&archive).unwrap(),
            &files(&[("z.wdl", "z"), ("a/b.wdl", "b")]),
            Some(&meta),
        )
        .unwrap();
        drop(out);

        assert_eq!(
            list_entries(&archive).unwrap(),
            vec!["a/b.wdl", "z.wdl", MANIFEST_NAME]
        );
        assert_eq!(read_manifest(&archive).unwrap(), Some(meta));
    }

    #[test]
    fn test_archive_bytes_are_deterministic() {
        let content = files(&[("main.wdl", "version 1.0\n"), ("lib.wdl", "version 1.0\n")]);
        let first = write_archive(Cursor::new(Vec::new()), &content, None)
            .unwrap()
            .into_inner();
        let second = write_archive(Cursor::new(Vec::new()), &content, None)
            .unwrap()
            .into_inner();
        assert_eq!(first, second);
    }

    /// Overwrite the uncompressed size recorded in every local and central
    /// header
    fn claim_size(bytes: &mut [u8], size: u32) {
        for i in 0..bytes.len().saturating_sub(4) {
            let field = match &bytes[i..i + 4] {
                b"PK\x03\x04" => i + 22,
                b"PK\x01\x02" => i + 24,
                _ => continue,
            };
            bytes[field..field + 4].copy_from_slice(&size.to_le_bytes());
        }
    }

    #[test]
    fn test_declared_size_is_not_trusted() {
        let temp = TempDir::new().unwrap();
        let mut bytes = write_archive(
            Cursor::new(Vec::new()),
            &files(&[("main.wdl", "version 1.0\n")]),
            None,
        )
        .unwrap()
        .into_inner();
        claim_size(&mut bytes, 0xFFFF_FFF0);
        let archive = temp.path().join("liar.zip");
        std::fs::write(&archive, &bytes).unwrap();

        let out = temp.path().join("out");
        let written = extract_bundle(&archive, &out).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(
            std::fs::read_to_string(out.join("main.wdl")).unwrap(),
            "version 1.0\n"
        );
    }

    #[test]
    fn test_entry_target() {
        let out = Path::new("/tmp/out");
        assert_eq!(
            entry_target(out, "tasks/a.wdl").unwrap(),
            PathBuf::from("/tmp/out/tasks/a.wdl")
        );
        assert!(entry_target(out, "tasks/../a.wdl").is_ok());
        assert!(entry_target(out, "../../etc/evil").is_err());
        assert!(entry_target(out, "a/../../evil").is_err());
        assert!(entry_target(out, "/etc/passwd").is_err());
        assert!(entry_target(out, "").is_err());
    }

    #[test]
    fn test_no_manifest() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("b.zip");
        write_archive(File::create(&archive).unwrap(), &files(&[("main.wdl", "")]), None).unwrap();
        assert_eq!(read_manifest(&archive).unwrap(), None);
    }

    #[test]
    fn test_not_an_archive() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.zip");
        std::fs::write(&bogus, b"definitely not a zip").unwrap();
        assert!(matches!(
            extract_bundle(&bogus, temp.path().join("out")),
            Err(WdlError::Bundle { .. })
        ));
        assert!(matches!(
            read_manifest(temp.path().join("missing.zip")),
            Err(WdlError::Io { .. })
        ));
    }
}
