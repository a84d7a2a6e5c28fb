#![allow(dead_code)]

use codegraph_api::{GraphId, NodeLabel, Relation};
use codegraph_core::{AnalysisConfig, AnalyzerRegistry, MemoryGraph};
use codegraph_csharp::CSharpAnalyzer;
use codegraph_java::JavaAnalyzer;
use codegraph_javascript::JavaScriptAnalyzer;
use codegraph_kotlin::KotlinAnalyzer;
use codegraph_python::PythonAnalyzer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub fn registry() -> AnalyzerRegistry {
    AnalyzerRegistry::new()
        .with(Arc::new(JavaAnalyzer::new().unwrap()))
        .with(Arc::new(PythonAnalyzer::new().unwrap()))
        .with(Arc::new(CSharpAnalyzer::new()))
        .with(Arc::new(KotlinAnalyzer::new()))
        .with(Arc::new(JavaScriptAnalyzer::new().unwrap()))
}

pub fn config() -> AnalysisConfig {
    AnalysisConfig::default()
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Writes `files` (relative path, contents) under a fresh temp dir.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
    dir
}

/// Id of the only node with this label and name.
pub fn node(graph: &MemoryGraph, label: NodeLabel, name: &str) -> GraphId {
    let found = graph.find(label, name);
    assert_eq!(found.len(), 1, "expected one {:?} named {}", label, name);
    found[0].id
}

pub fn targets(graph: &MemoryGraph, from: GraphId, relation: Relation) -> Vec<String> {
    let mut names: Vec<String> = graph
        .outgoing(from, relation)
        .into_iter()
        .map(|n| n.name.clone())
        .collect();
    names.sort();
    names
}

pub fn file_node(graph: &MemoryGraph, path: &Path) -> GraphId {
    let canonical = path.canonicalize().unwrap();
    graph.file(&canonical).unwrap().id
}
