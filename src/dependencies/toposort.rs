//! Depth-first topological ordering of the import graph

use super::DependencyNode;
use crate::error::WdlError;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

struct Sorter<'a> {
    nodes: &'a IndexMap<PathBuf, DependencyNode>,
    /// Files on the current DFS path
    temporary: HashSet<&'a Path>,
    done: HashSet<&'a Path>,
    path: Vec<&'a Path>,
    order: Vec<PathBuf>,
}

impl<'a> Sorter<'a> {
    fn visit(&mut self, node: &'a Path) -> Result<(), WdlError> {
        if self.done.contains(node) {
            return Ok(());
        }
        if self.temporary.contains(node) {
            let start = self.path.iter().position(|p| *p == node).unwrap_or(0);
            let mut chain: Vec<PathBuf> = self.path[start..].iter().map(|p| p.to_path_buf()).collect();
            chain.push(node.to_path_buf());
            return Err(WdlError::CircularDependency { chain });
        }

        self.temporary.insert(node);
        self.path.push(node);
        if let Some(entry) = self.nodes.get(node) {
            for dep in &entry.direct_deps {
                self.visit(dep)?;
            }
        }
        self.path.pop();
        self.temporary.remove(node);
        self.done.insert(node);
        self.order.push(node.to_path_buf());
        Ok(())
    }
}

/// Order every file reachable from `root` so that each appears after all of
/// its imports. The root itself is left out.
pub fn toposort(
    root: &Path,
    nodes: &IndexMap<PathBuf, DependencyNode>,
) -> Result<Vec<PathBuf>, WdlError> {
    let mut sorter = Sorter {
        nodes,
        temporary: HashSet::new(),
        done: HashSet::new(),
        path: Vec::new(),
        order: Vec::new(),
    };

    match nodes.get_key_value(root) {
        Some((root, _)) => sorter.visit(root)?,
        None => return Ok(Vec::new()),
    }
    for path in nodes.keys() {
        sorter.visit(path)?;
    }

    sorter.order.retain(|p| p != root);
    Ok(sorter.order)
}
