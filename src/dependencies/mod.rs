//! Import dependency analysis.
//!
//! Starting from a parsed document, every `import` is resolved to a file on
//! disk, parsed, and followed recursively. The result is a
//! [`DependencyGraph`] keyed by canonical path, plus a dependency-first
//! ordering of everything the root document pulls in.

mod toposort;

use crate::error::WdlError;
use crate::parser;
use crate::tree::{Document, Import};
use indexmap::IndexMap;
use path_clean::PathClean;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

pub use toposort::toposort;

/// A single WDL file in the dependency graph
#[derive(Debug, Clone, Serialize)]
pub struct DependencyNode {
    /// Canonical path of the file
    pub path: PathBuf,
    pub document: Document,
    /// Canonical paths of the files this one imports, parallel to
    /// `document.imports`
    pub direct_deps: Vec<PathBuf>,
    /// Files that import this one, once per import statement
    pub imported_by: Vec<PathBuf>,
    /// Namespaces this file was imported under
    pub aliases: Vec<String>,
    /// Import URI that first led to this file (empty for the root)
    pub resolved_from: String,
}

impl DependencyNode {
    fn new(path: PathBuf, document: Document, resolved_from: String) -> Self {
        Self {
            path,
            document,
            direct_deps: Vec::new(),
            imported_by: Vec::new(),
            aliases: Vec::new(),
            resolved_from,
        }
    }
}

/// Every file reachable from a root document through imports
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    /// Canonical path of the root document
    pub root: PathBuf,
    /// All files including the root, in discovery order
    pub dependencies: IndexMap<PathBuf, DependencyNode>,
    /// Imported files, dependencies before dependents; never contains the
    /// root
    pub imports: Vec<PathBuf>,
}

impl DependencyGraph {
    pub fn node(&self, path: &Path) -> Option<&DependencyNode> {
        self.dependencies.get(path)
    }

    pub fn root_node(&self) -> Option<&DependencyNode> {
        self.dependencies.get(&self.root)
    }

    /// Number of files in the graph, root included
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Files that import `path` directly
    pub fn dependents_of(&self, path: &Path) -> Vec<&Path> {
        self.dependencies
            .values()
            .filter(|node| node.direct_deps.iter().any(|dep| dep == path))
            .map(|node| node.path.as_path())
            .collect()
    }
}

/// Resolve an import URI written in `importer` to a canonical path
fn resolve_import(importer: &Path, import: &Import) -> Result<PathBuf, WdlError> {
    let uri = import.uri.as_str();
    let fail = |message: &str| WdlError::import_error(import.pos.clone(), uri, Some(message.to_string()));

    let candidate = match Url::parse(uri) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            return Err(fail("remote imports are not supported"));
        }
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| fail("not a valid file URI"))?,
        // Single letters are Windows drive prefixes, not schemes
        Ok(url) if url.scheme().len() > 1 => {
            return Err(fail(&format!("unsupported URI scheme '{}'", url.scheme())));
        }
        _ => PathBuf::from(uri),
    };

    let joined = if candidate.is_absolute() {
        candidate
    } else {
        let base = importer.parent().unwrap_or_else(|| Path::new(""));
        base.join(candidate)
    };
    let cleaned = joined.clean();

    if !cleaned.exists() {
        return Err(fail(&format!("file not found: {}", cleaned.display())));
    }
    cleaned.canonicalize().map_err(|e| WdlError::Import {
        pos: import.pos.clone(),
        uri: uri.to_string(),
        message: format!("Failed to import {}, cannot resolve {}", uri, cleaned.display()),
        cause: Some(Box::new(e)),
    })
}

/// Parse an imported file; read failures become import errors, syntax
/// errors propagate unchanged
fn load_import(path: &Path, import: &Import) -> Result<Document, WdlError> {
    match parser::parse(path) {
        Err(WdlError::Io { source, .. }) => Err(WdlError::Import {
            pos: import.pos.clone(),
            uri: import.uri.clone(),
            message: format!("Failed to import {}, cannot read {}", import.uri, path.display()),
            cause: Some(Box::new(source)),
        }),
        other => other,
    }
}

/// Traversal state for one `analyze` call
struct Traversal {
    nodes: IndexMap<PathBuf, DependencyNode>,
    /// Files currently being descended into, outermost first
    stack: Vec<PathBuf>,
}

impl Traversal {
    /// Resolve and follow `imports` of the file at `path`, returning its
    /// direct dependencies
    fn descend(&mut self, path: &Path, imports: &[Import]) -> Result<Vec<PathBuf>, WdlError> {
        self.stack.push(path.to_path_buf());
        let mut direct = Vec::with_capacity(imports.len());

        for import in imports {
            let resolved = resolve_import(path, import)?;
            debug!("{}: import \"{}\" -> {}", path.display(), import.uri, resolved.display());

            if let Some(start) = self.stack.iter().position(|p| *p == resolved) {
                let mut chain = self.stack[start..].to_vec();
                chain.push(resolved);
                return Err(WdlError::CircularDependency { chain });
            }

            direct.push(resolved.clone());
            let namespace = import.effective_namespace();

            if let Some(existing) = self.nodes.get_mut(&resolved) {
                debug!("{} already analyzed, reusing", resolved.display());
                existing.imported_by.push(path.to_path_buf());
                if !existing.aliases.contains(&namespace) {
                    existing.aliases.push(namespace);
                }
                continue;
            }

            let document = load_import(&resolved, import)?;
            let nested = document.imports.clone();
            let mut node = DependencyNode::new(resolved.clone(), document, import.uri.clone());
            node.imported_by.push(path.to_path_buf());
            node.aliases.push(namespace);
            self.nodes.insert(resolved.clone(), node);

            let deps = self.descend(&resolved, &nested)?;
            if let Some(node) = self.nodes.get_mut(&resolved) {
                node.direct_deps = deps;
            }
        }

        self.stack.pop();
        Ok(direct)
    }
}

/// Build the dependency graph of `document`, which was read from
/// `source_path`
pub fn analyze<P: AsRef<Path>>(document: Document, source_path: P) -> Result<DependencyGraph, WdlError> {
    let source_path = source_path.as_ref();
    let root = source_path
        .canonicalize()
        .map_err(|e| WdlError::io(source_path, e))?;

    let imports = document.imports.clone();
    let mut traversal = Traversal {
        nodes: IndexMap::new(),
        stack: Vec::new(),
    };
    traversal
        .nodes
        .insert(root.clone(), DependencyNode::new(root.clone(), document, String::new()));

    let direct = traversal.descend(&root, &imports)?;
    if let Some(node) = traversal.nodes.get_mut(&root) {
        node.direct_deps = direct;
    }

    let imports = toposort(&root, &traversal.nodes)?;
    debug!("{} imports resolved for {}", imports.len(), root.display());

    Ok(DependencyGraph {
        root,
        dependencies: traversal.nodes,
        imports,
    })
}

/// Parse the file at `path` and build its dependency graph
pub fn analyze_dependencies_from_file<P: AsRef<Path>>(path: P) -> Result<DependencyGraph, WdlError> {
    let path = path.as_ref();
    let document = parser::parse(path)?;
    analyze(document, path)
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
    fn test_no_imports() {
        let temp = TempDir::new().unwrap();
        let main = write(temp.path(), "main.wdl", "version 1.0\nworkflow w {}\n");
        let graph = analyze_dependencies_from_file(&main).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.imports.is_empty());
        assert_eq!(graph.root_node().unwrap().resolved_from, "");
    }

    #[test]
    fn test_file_uri_and_aliases() {
        let temp = TempDir::new().unwrap();
        let lib = write(temp.path(), "lib/tools.wdl", "version 1.0\n");
        let lib_uri = Url::from_file_path(lib.canonicalize().unwrap()).unwrap();
        let main = write(
            temp.path(),
            "main.wdl",
            &format!(
                "version 1.0\nimport \"{}\" as t1\nimport \"lib/tools.wdl\" as t2\n",
                lib_uri
            ),
        );

        let graph = analyze_dependencies_from_file(&main).unwrap();
        let lib = lib.canonicalize().unwrap();
        assert_eq!(graph.imports, vec![lib.clone()]);

        let node = graph.node(&lib).unwrap();
        assert_eq!(node.aliases, vec!["t1", "t2"]);
        assert_eq!(node.imported_by.len(), 2);
        assert_eq!(node.resolved_from, lib_uri.as_str());

        let root = graph.root_node().unwrap();
        assert_eq!(root.direct_deps, vec![lib.clone(), lib.clone()]);
        assert_eq!(graph.dependents_of(&lib), vec![graph.root.as_path()]);
    }

    #[test]
    fn test_unsupported_schemes() {
        let temp = TempDir::new().unwrap();
        for uri in ["https://example.com/x.wdl", "s3://bucket/x.wdl"] {
            let main = write(
                temp.path(),
                "main.wdl",
                &format!("version 1.0\nimport \"{}\"\n", uri),
            );
            match analyze_dependencies_from_file(&main) {
                Err(WdlError::Import { uri: failed, pos, .. }) => {
                    assert_eq!(failed, uri);
                    assert_eq!(pos.line, 2);
                }
                other => panic!("Expected import error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_import() {
        let temp = TempDir::new().unwrap();
        let main = write(temp.path(), "main.wdl", "version 1.0\nimport \"nope.wdl\"\n");
        let err = analyze_dependencies_from_file(&main).unwrap_err();
        assert!(matches!(err, WdlError::Import { .. }));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_syntax_error_in_import_propagates() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "bad.wdl", "version 1.0\ntask {\n");
        let main = write(temp.path(), "main.wdl", "version 1.0\nimport \"bad.wdl\"\n");
        let err = analyze_dependencies_from_file(&main).unwrap_err();
        assert!(matches!(err, WdlError::Syntax { .. }));
    }

    #[test]
    fn test_self_import_is_a_cycle() {
        let temp = TempDir::new().unwrap();
        let main = write(temp.path(), "main.wdl", "version 1.0\nimport \"main.wdl\"\n");
        match analyze_dependencies_from_file(&main) {
            Err(WdlError::CircularDependency { chain }) => {
                let main = main.canonicalize().unwrap();
                assert_eq!(chain, vec![main.clone(), main]);
            }
            other => panic!("Expected circular dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_parent_relative_import() {
        let temp = TempDir::new().unwrap();
        let util = write(temp.path(), "common/util.wdl", "version 1.0\n");
        let main = write(
            temp.path(),
            "wf/main.wdl",
            "version 1.0\nimport \"../common/./util.wdl\"\n",
        );
        let graph = analyze_dependencies_from_file(&main).unwrap();
        assert_eq!(graph.imports, vec![util.canonicalize().unwrap()]);
    }
}
