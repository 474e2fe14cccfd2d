use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wdl_bundler::{analyze, analyze_dependencies_from_file, parse, WdlError};

fn write(dir: &Path, name: &str, content: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(path.canonicalize()?)
}

fn position(order: &[PathBuf], path: &Path) -> usize {
    order
        .iter()
        .position(|p| p == path)
        .unwrap_or_else(|| panic!("{} missing from {:?}", path.display(), order))
}

#[test]
fn three_level_chain_is_dependency_first() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    let util = write(
        temp.path(),
        "common/util.wdl",
        "version 1.0\ntask echo { command <<< echo >>> }\n",
    )?;
    let a = write(
        temp.path(),
        "tasks/a.wdl",
        "version 1.0\nimport \"../common/util.wdl\" as util\ntask a { command { true } }\n",
    )?;
    let main = write(
        temp.path(),
        "main.wdl",
        r#"version 1.0
import "tasks/a.wdl" as a

workflow main {
  call a.a
}
"#,
    )?;

    let doc = parse(&main)?;
    let graph = analyze(doc, &main)?;

    assert_eq!(graph.root, main);
    assert_eq!(graph.imports, vec![util.clone(), a.clone()]);
    assert_eq!(graph.len(), 3);

    let a_node = graph.node(&a).expect("a.wdl in graph");
    assert_eq!(a_node.direct_deps, vec![util.clone()]);
    assert_eq!(a_node.imported_by, vec![main.clone()]);
    assert_eq!(a_node.aliases, vec!["a"]);
    assert_eq!(a_node.resolved_from, "tasks/a.wdl");
    assert_eq!(graph.node(&util).expect("util in graph").resolved_from, "../common/util.wdl");
    Ok(())
}

#[test]
fn diamond_dependency_appears_once() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    let d = write(temp.path(), "d.wdl", "version 1.0\nstruct Shared { Int n }\n")?;
    let b = write(temp.path(), "b.wdl", "version 1.0\nimport \"d.wdl\" as d\n")?;
    let c = write(temp.path(), "c.wdl", "version 1.0\nimport \"./d.wdl\" as shared\n")?;
    let main = write(
        temp.path(),
        "main.wdl",
        "version 1.0\nimport \"b.wdl\"\nimport \"c.wdl\"\n",
    )?;

    let graph = analyze_dependencies_from_file(&main)?;

    assert_eq!(graph.imports.iter().filter(|p| **p == d).count(), 1);
    assert!(position(&graph.imports, &d) < position(&graph.imports, &b));
    assert!(position(&graph.imports, &d) < position(&graph.imports, &c));
    assert!(!graph.imports.contains(&main));

    let d_node = graph.node(&d).expect("d.wdl in graph");
    assert_eq!(d_node.imported_by, vec![b.clone(), c.clone()]);
    assert_eq!(d_node.aliases, vec!["d", "shared"]);
    assert_eq!(graph.dependents_of(&d), vec![b.as_path(), c.as_path()]);
    Ok(())
}

#[test]
fn every_edge_points_backwards_in_order() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    write(temp.path(), "x/leaf.wdl", "version 1.0\n")?;
    write(temp.path(), "x/mid1.wdl", "version 1.0\nimport \"leaf.wdl\"\n")?;
    write(
        temp.path(),
        "y/mid2.wdl",
        "version 1.0\nimport \"../x/leaf.wdl\"\nimport \"../x/mid1.wdl\"\n",
    )?;
    let main = write(
        temp.path(),
        "main.wdl",
        "version 1.0\nimport \"y/mid2.wdl\"\nimport \"x/mid1.wdl\"\n",
    )?;

    let graph = analyze_dependencies_from_file(&main)?;
    assert_eq!(graph.imports.len(), 3);
    for node in graph.dependencies.values() {
        for dep in &node.direct_deps {
            if node.path != graph.root {
                assert!(position(&graph.imports, dep) < position(&graph.imports, &node.path));
            }
        }
    }
    Ok(())
}

#[test]
fn two_file_cycle_is_reported() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    let a = write(temp.path(), "a.wdl", "version 1.0\nimport \"b.wdl\"\n")?;
    let b = write(temp.path(), "b.wdl", "version 1.0\nimport \"a.wdl\"\n")?;

    match analyze_dependencies_from_file(&a) {
        Err(WdlError::CircularDependency { chain }) => {
            assert_eq!(chain, vec![a.clone(), b.clone(), a.clone()]);
        }
        other => panic!("Expected circular dependency, got {:?}", other),
    }

    let err = analyze_dependencies_from_file(&a).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("a.wdl -> "));
    assert!(message.contains("b.wdl"));
    Ok(())
}

#[test]
fn remote_imports_are_rejected() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    let main = write(
        temp.path(),
        "main.wdl",
        "version 1.0\nimport \"http://example.com/x.wdl\" as x\n",
    )?;

    match analyze_dependencies_from_file(&main) {
        Err(WdlError::Import { uri, message, .. }) => {
            assert_eq!(uri, "http://example.com/x.wdl");
            assert!(message.contains("not supported"));
        }
        other => panic!("Expected import error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn absolute_import_path() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    let lib = write(temp.path(), "lib/lib.wdl", "version 1.0\n")?;
    let main = write(
        temp.path(),
        "wf/main.wdl",
        &format!("version 1.0\nimport \"{}\"\n", lib.display()),
    )?;

    let graph = analyze_dependencies_from_file(&main)?;
    assert_eq!(graph.imports, vec![lib]);
    Ok(())
}
