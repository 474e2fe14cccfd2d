//! File system and path utilities shared by the analyzer and the bundler

use crate::error::{IoResultExt, WdlError};
use path_clean::PathClean;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Create a directory and all parent directories if they don't exist
pub fn create_dir_all<P: AsRef<Path>>(path: P) -> Result<(), WdlError> {
    let path = path.as_ref();
    fs::create_dir_all(path).with_path(path)
}

/// Read file contents as bytes
pub fn read_file_to_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, WdlError> {
    let path = path.as_ref();
    fs::read(path).with_path(path)
}

/// Write bytes to a file, creating parent directories first
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<(), WdlError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    fs::write(path, contents).with_path(path)
}

/// Get the canonical absolute path
pub fn absolute_path<P: AsRef<Path>>(path: P) -> Result<PathBuf, WdlError> {
    let path = path.as_ref();
    path.canonicalize().with_path(path)
}

/// Lexically check that `path` stays inside `base` once `..` and `.` are
/// resolved. Neither path needs to exist.
pub fn path_is_within<P: AsRef<Path>, Q: AsRef<Path>>(path: P, base: Q) -> bool {
    let path = path.as_ref().clean();
    let base = base.as_ref().clean();
    path.starts_with(base)
}

/// Deepest directory containing every given path
pub fn common_ancestor<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter = paths.into_iter();
    let mut ancestor = iter.next()?.to_path_buf();
    for path in iter {
        while !path.starts_with(&ancestor) {
            if !ancestor.pop() {
                return None;
            }
        }
    }
    Some(ancestor)
}

/// Lexical relative path from directory `from` to `to`, using `..` where
/// needed. Both paths must be absolute or both relative.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let shared = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in shared..from.len() {
        relative.push("..");
    }
    for component in &to[shared..] {
        relative.push(component.as_os_str());
    }
    relative
}

/// Render a relative path with `/` separators, as stored in archives
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("nested/dir/file.txt");
        write_file(&file, b"content").unwrap();
        assert_eq!(read_file_to_bytes(&file).unwrap(), b"content");
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.wdl");
        match read_file_to_bytes(&missing) {
            Err(WdlError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_path_is_within() {
        assert!(path_is_within("/out/a/b.wdl", "/out"));
        assert!(path_is_within("/out/a/../b.wdl", "/out"));
        assert!(!path_is_within("/out/../../etc/passwd", "/out"));
        assert!(!path_is_within("/outside/file", "/out"));
    }

    #[test]
    fn test_common_ancestor() {
        let paths = [
            Path::new("/work/proj/main.wdl"),
            Path::new("/work/proj/tasks/a.wdl"),
            Path::new("/work/shared/util.wdl"),
        ];
        assert_eq!(common_ancestor(paths), Some(PathBuf::from("/work")));
        assert_eq!(common_ancestor(Vec::<&Path>::new()), None);
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("tasks"), Path::new("common/util.wdl")),
            PathBuf::from("../common/util.wdl")
        );
        assert_eq!(
            relative_path(Path::new(""), Path::new("tasks/a.wdl")),
            PathBuf::from("tasks/a.wdl")
        );
        assert_eq!(
            relative_path(Path::new("a/b"), Path::new("a/b/c.wdl")),
            PathBuf::from("c.wdl")
        );
    }

    #[test]
    fn test_to_slash_path() {
        let path: PathBuf = ["tasks", "align", "bwa.wdl"].iter().collect();
        assert_eq!(to_slash_path(&path), "tasks/align/bwa.wdl");
    }
}
