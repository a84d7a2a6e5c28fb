mod common;

use codegraph_api::{NodeLabel, Relation};
use codegraph_core::testing::DeclarationIndexFactory;
use codegraph_core::{AnalysisConfig, MemoryGraph};
use common::{analyze, fixture, node, pipeline, project, targets};

#[test]
fn imports_heritage_and_calls() {
    let root = fixture("app");
    let (_, graph, _) = analyze(&root);

    let app_file = root.join("app.js").canonicalize().unwrap();
    let file = graph.file(&app_file).unwrap().id;
    assert_eq!(targets(&graph, file, Relation::Imports), vec!["Base", "helper"]);

    let app = node(&graph, NodeLabel::Class, "App");
    assert_eq!(targets(&graph, app, Relation::Extends), vec!["Base"]);
    assert_eq!(
        graph.find(NodeLabel::Class, "App")[0].doc.as_deref(),
        Some("Entry point of the app.")
    );

    let run = node(&graph, NodeLabel::Method, "run");
    assert_eq!(targets(&graph, run, Relation::Calls), vec!["greet", "helper"]);
}

#[test]
fn installed_modules_are_only_targets() {
    let dir = project(&[
        ("package.json", r#"{"dependencies": {"left-pad": "^1.3.0"}}"#),
        (
            "index.js",
            "import { leftPad } from 'left-pad';\n\nfunction label(text) {\n    return leftPad(text, 8);\n}\n",
        ),
        (
            "node_modules/left-pad/index.js",
            "export function leftPad(text, width) {\n    return pad(text, width);\n}\n\nfunction pad(text, width) {\n    return text;\n}\n",
        ),
    ]);
    let mut config = AnalysisConfig::default();
    config.fetch_dependencies = true;
    let mut graph = MemoryGraph::new();
    let report = pipeline(config)
        .analyze(
            dir.path(),
            &["node_modules".to_string()],
            &DeclarationIndexFactory,
            &mut graph,
        )
        .unwrap();

    assert_eq!(report.first.files, 2);
    assert_eq!(report.first.dependencies, 1);

    let label = node(&graph, NodeLabel::Function, "label");
    assert_eq!(targets(&graph, label, Relation::Calls), vec!["leftPad"]);
    let left_pad = node(&graph, NodeLabel::Function, "leftPad");
    assert!(targets(&graph, left_pad, Relation::Calls).is_empty());
}

#[test]
fn missing_node_modules_is_not_fatal() {
    let dir = project(&[
        ("package.json", r#"{"devDependencies": {"left-pad": "1.3.0"}}"#),
        ("index.js", "function label(text) {\n    return text;\n}\n"),
    ]);
    let mut config = AnalysisConfig::default();
    config.fetch_dependencies = true;
    let mut graph = MemoryGraph::new();
    let report = pipeline(config)
        .analyze(dir.path(), &[], &DeclarationIndexFactory, &mut graph)
        .unwrap();

    assert_eq!(report.first.files, 1);
    assert_eq!(report.first.dependencies, 0);
}
