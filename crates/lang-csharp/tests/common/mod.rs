#![allow(dead_code)]

use codegraph_api::{GraphId, NodeLabel, Relation};
use codegraph_core::testing::DeclarationIndexFactory;
use codegraph_core::{AnalysisConfig, AnalysisPipeline, AnalysisReport, AnalyzerRegistry, MemoryGraph};
use codegraph_csharp::CSharpAnalyzer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub fn pipeline(config: AnalysisConfig) -> AnalysisPipeline {
    let registry = AnalyzerRegistry::new().with(Arc::new(CSharpAnalyzer::new()));
    AnalysisPipeline::new(registry, config)
}

/// Both passes with name-based definition lookup.
pub fn analyze(root: &Path) -> (AnalysisPipeline, MemoryGraph, AnalysisReport) {
    let mut pipeline = pipeline(AnalysisConfig::default());
    let mut graph = MemoryGraph::new();
    let report = pipeline
        .analyze(root, &[], &DeclarationIndexFactory, &mut graph)
        .unwrap();
    (pipeline, graph, report)
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

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
