//! Packaging a workflow and its imports into a single archive.
//!
//! A [`Bundler`] analyzes the main file, gives every file in the dependency
//! graph a unique path inside the archive, optionally rewrites imports so
//! the archive is self-contained, and writes a deterministic ZIP file.

mod archive;
mod metadata;
mod rewrite;

pub use archive::{extract_bundle, list_entries, read_manifest};
pub use metadata::{BundleMetadata, MANIFEST_NAME, MANIFEST_VERSION};

use crate::dependencies::{analyze_dependencies_from_file, DependencyGraph};
use crate::error::{IoResultExt, WdlError};
use crate::fs_utils;
use crate::parser::parse_document;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How a bundle is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleOptions {
    /// Add `manifest.json`
    #[serde(alias = "include_metadata")]
    pub include_metadata: bool,
    /// Keep paths relative to the archive root instead of bare file names
    #[serde(alias = "preserve_directory_structure")]
    pub preserve_directory_structure: bool,
    /// Point every import at the bundled copy of its target
    #[serde(alias = "flatten_imports")]
    pub flatten_imports: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            preserve_directory_structure: true,
            flatten_imports: false,
        }
    }
}

/// A built bundle, ready to be written out
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Archive path of the main workflow file
    pub main_workflow: String,
    /// Archive path to file contents, main file first
    pub files: IndexMap<String, Vec<u8>>,
    pub metadata: Option<BundleMetadata>,
    pub graph: DependencyGraph,
}

impl Bundle {
    /// Serialise the archive into `writer`
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, WdlError> {
        archive::write_archive(writer, &self.files, self.metadata.as_ref())
    }

    /// Serialise the archive to a file, creating parent directories
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), WdlError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs_utils::create_dir_all(parent)?;
        }
        let file = File::create(path).with_path(path)?;
        let mut writer = self.write_to(BufWriter::new(file))?;
        writer.flush().with_path(path)
    }
}

/// Append `-N` to the file stem of `name` (`dir/util.wdl` -> `dir/util-2.wdl`)
fn numbered(name: &str, n: usize) -> String {
    let (dir, file) = match name.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, name),
    };
    let file = match file.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &file[..dot], n, &file[dot..]),
        _ => format!("{}-{}", file, n),
    };
    match dir {
        Some(dir) => format!("{}/{}", dir, file),
        None => file,
    }
}

pub struct Bundler {
    options: BundleOptions,
}

impl Bundler {
    pub fn new(options: BundleOptions) -> Self {
        Self { options }
    }

    /// Directory archive paths are relative to: the main file's directory,
    /// widened when an import lives outside it
    fn archive_root(&self, graph: &DependencyGraph, files: &[&Path]) -> Result<PathBuf, WdlError> {
        let main_dir = graph
            .root
            .parent()
            .ok_or_else(|| WdlError::bundle(format!("{} has no parent directory", graph.root.display())))?;
        if files.iter().all(|f| f.starts_with(main_dir)) {
            return Ok(main_dir.to_path_buf());
        }

        let parents = files.iter().filter_map(|f| f.parent());
        let root = fs_utils::common_ancestor(parents)
            .ok_or_else(|| WdlError::bundle("bundled files share no common directory"))?;
        warn!(
            "imports reach outside {}, archive paths are relative to {}",
            main_dir.display(),
            root.display()
        );
        Ok(root)
    }

    /// Archive path for every file, in the order given
    fn assign_names(&self, files: &[&Path], root: &Path) -> Result<IndexMap<PathBuf, String>, WdlError> {
        let mut taken = HashSet::new();
        if self.options.include_metadata {
            taken.insert(MANIFEST_NAME.to_string());
        }

        let mut names = IndexMap::new();
        for &file in files {
            let candidate = if self.options.preserve_directory_structure {
                let relative = file.strip_prefix(root).map_err(|_| {
                    WdlError::bundle(format!("{} is outside {}", file.display(), root.display()))
                })?;
                fs_utils::to_slash_path(relative)
            } else {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| WdlError::bundle(format!("{} has no file name", file.display())))?
            };

            let mut name = candidate.clone();
            let mut n = 2;
            while taken.contains(&name) {
                name = numbered(&candidate, n);
                n += 1;
            }
            if name != candidate {
                warn!("{} stored as {} to avoid a name clash", file.display(), name);
            }
            taken.insert(name.clone());
            names.insert(file.to_path_buf(), name);
        }
        Ok(names)
    }

    /// Point each import of `file` at the archive path of its target,
    /// relative to the importer's own archive directory
    fn flatten(
        &self,
        graph: &DependencyGraph,
        file: &Path,
        bytes: &[u8],
        names: &IndexMap<PathBuf, String>,
    ) -> Result<Vec<u8>, WdlError> {
        let node = graph
            .node(file)
            .ok_or_else(|| WdlError::bundle(format!("{} is not in the dependency graph", file.display())))?;
        let own_name = names
            .get(file)
            .ok_or_else(|| WdlError::bundle(format!("{} has no archive path", file.display())))?;
        let own_dir = Path::new(own_name).parent().unwrap_or_else(|| Path::new(""));

        let mut edits = Vec::with_capacity(node.direct_deps.len());
        for (import, dep) in node.document.imports.iter().zip(&node.direct_deps) {
            let target = names
                .get(dep)
                .ok_or_else(|| WdlError::bundle(format!("{} has no archive path", dep.display())))?;
            let uri = fs_utils::to_slash_path(&fs_utils::relative_path(own_dir, Path::new(target)));
            edits.push((import.uri_span.clone(), uri));
        }

        let rewritten = rewrite::replace_import_uris(bytes, &edits)?;
        let text = std::str::from_utf8(&rewritten)
            .map_err(|e| WdlError::bundle(format!("{}: {}", own_name, e)))?;
        parse_document(text, own_name)?;
        Ok(rewritten)
    }

    /// Analyze `main_path` and collect everything the archive will hold
    pub fn build<P: AsRef<Path>>(&self, main_path: P) -> Result<Bundle, WdlError> {
        let graph = analyze_dependencies_from_file(main_path)?;

        let ordered: Vec<&Path> = std::iter::once(graph.root.as_path())
            .chain(graph.imports.iter().map(PathBuf::as_path))
            .collect();
        let root = self.archive_root(&graph, &ordered)?;
        let names = self.assign_names(&ordered, &root)?;

        let mut files = IndexMap::with_capacity(ordered.len());
        for &path in &ordered {
            let mut bytes = fs_utils::read_file_to_bytes(path)?;
            if self.options.flatten_imports {
                bytes = self.flatten(&graph, path, &bytes, &names)?;
            }
            if let Some(name) = names.get(path) {
                files.insert(name.clone(), bytes);
            }
        }

        let main_workflow = names.get(graph.root.as_path()).cloned().unwrap_or_default();
        let metadata = if self.options.include_metadata {
            let dependencies = graph
                .imports
                .iter()
                .filter_map(|p| names.get(p).cloned())
                .collect();
            let wdl_version = graph
                .root_node()
                .map(|node| node.document.version.clone())
                .unwrap_or_default();
            Some(BundleMetadata::new(
                main_workflow.clone(),
                wdl_version,
                dependencies,
                files.len(),
            ))
        } else {
            None
        };

        info!(
            "bundled {} ({} files, archive root {})",
            main_workflow,
            files.len(),
            root.display()
        );

        Ok(Bundle {
            main_workflow,
            files,
            metadata,
            graph,
        })
    }
}

/// Build a bundle for `main_path` without writing it
pub fn build_bundle<P: AsRef<Path>>(main_path: P, options: BundleOptions) -> Result<Bundle, WdlError> {
    Bundler::new(options).build(main_path)
}

/// Build a bundle for `main_path` and write it to `output_path`
pub fn create_bundle<P: AsRef<Path>, Q: AsRef<Path>>(
    main_path: P,
    output_path: Q,
    options: BundleOptions,
) -> Result<Bundle, WdlError> {
    let bundle = build_bundle(main_path, options)?;
    bundle.write_to_path(output_path)?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_numbered() {
        assert_eq!(numbered("util.wdl", 2), "util-2.wdl");
        assert_eq!(numbered("a/util.wdl", 3), "a/util-3.wdl");
        assert_eq!(numbered("Makefile", 2), "Makefile-2");
        assert_eq!(numbered(".hidden", 2), ".hidden-2");
        assert_eq!(numbered("manifest.json", 2), "manifest-2.json");
    }

    #[test]
    fn test_options_from_json_keys() {
        let options: BundleOptions =
            serde_json::from_str(r#"{"flattenImports": true, "include_metadata": false}"#).unwrap();
        assert!(options.flatten_imports);
        assert!(!options.include_metadata);
        assert!(options.preserve_directory_structure);
        assert!(serde_json::from_str::<BundleOptions>(r#"{"compress": true}"#).is_err());
    }

    #[test]
    fn test_import_outside_main_dir_widens_root() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "shared/util.wdl", "version 1.0\n");
        let main = write(
            temp.path(),
            "wf/main.wdl",
            "version 1.0\nimport \"../shared/util.wdl\"\nworkflow w {}\n",
        );

        let bundle = build_bundle(&main, BundleOptions::default()).unwrap();
        assert_eq!(bundle.main_workflow, "wf/main.wdl");
        assert_eq!(
            bundle.files.keys().collect::<Vec<_>>(),
            vec!["wf/main.wdl", "shared/util.wdl"]
        );
        assert!(bundle.files.keys().all(|k| !k.contains("..")));
    }

    #[test]
    fn test_manifest_name_is_reserved() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/manifest.json", "version 1.0\n");
        let main = write(
            temp.path(),
            "main.wdl",
            "version 1.0\nimport \"lib/manifest.json\" as m\n",
        );
        let options = BundleOptions {
            preserve_directory_structure: false,
            ..BundleOptions::default()
        };
        let bundle = build_bundle(&main, options).unwrap();
        assert!(bundle.files.contains_key("manifest-2.json"));
        assert!(!bundle.files.contains_key(MANIFEST_NAME));
    }

    #[test]
    fn test_flatten_imports_rewrites_uris() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/util.wdl", "version 1.0\ntask ua { command {} }\n");
        write(temp.path(), "b/util.wdl", "version 1.0\ntask ub { command {} }\n");
        let main = write(
            temp.path(),
            "main.wdl",
            "version 1.0\nimport \"a/util.wdl\" as ua\nimport \"b/util.wdl\" as ub\n",
        );
        let options = BundleOptions {
            preserve_directory_structure: false,
            flatten_imports: true,
            include_metadata: false,
        };

        let bundle = build_bundle(&main, options).unwrap();
        assert!(bundle.metadata.is_none());
        let main_text = String::from_utf8(bundle.files["main.wdl"].clone()).unwrap();
        assert_eq!(
            main_text,
            "version 1.0\nimport \"util.wdl\" as ua\nimport \"util-2.wdl\" as ub\n"
        );
    }

    #[test]
    fn test_write_to_path_creates_parents() {
        let temp = TempDir::new().unwrap();
        let main = write(temp.path(), "main.wdl", "version 1.0\nworkflow w {}\n");
        let out = temp.path().join("dist/nested/main.zip");
        let bundle = create_bundle(&main, &out, BundleOptions::default()).unwrap();
        assert!(out.is_file());
        assert_eq!(bundle.metadata.unwrap().total_files, 1);
        assert_eq!(
            list_entries(&out).unwrap(),
            vec!["main.wdl".to_string(), MANIFEST_NAME.to_string()]
        );
    }
}
