pub mod queries;

use codegraph_api::{EntityKind, Language, SymbolKind};
use codegraph_plugin::utils::{self, clean_comment, last_leaf_of, node_text, owned_captures};
use codegraph_plugin::{Entity, LanguageAnalyzer, ResolutionPolicy, Result, Symbol};
use std::sync::Arc;
use tree_sitter::{Node, Query};

use crate::queries::java_imports::{ImportIndices, JAVA_IMPORTS_SCM};
use crate::queries::java_symbols::{JAVA_SYMBOLS_SCM, SymbolIndices};

const ENTITY_TYPES: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "method_declaration",
    "constructor_declaration",
];

pub struct JavaAnalyzer {
    language: tree_sitter::Language,
    symbol_query: Arc<Query>,
    symbol_indices: SymbolIndices,
    import_query: Arc<Query>,
    import_indices: ImportIndices,
}

impl JavaAnalyzer {
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();

        let symbol_query = utils::load_query(&language, JAVA_SYMBOLS_SCM)?;
        let symbol_indices = SymbolIndices::new(&symbol_query)?;

        let import_query = utils::load_query(&language, JAVA_IMPORTS_SCM)?;
        let import_indices = ImportIndices::new(&import_query)?;

        Ok(Self {
            language,
            symbol_query: Arc::new(symbol_query),
            symbol_indices,
            import_query: Arc::new(import_query),
            import_indices,
        })
    }

    fn symbol_kind(&self, capture: u32) -> Option<SymbolKind> {
        let idx = &self.symbol_indices;
        match capture {
            c if c == idx.base_class => Some(SymbolKind::BaseClass),
            c if c == idx.implement_interface => Some(SymbolKind::ImplementInterface),
            c if c == idx.extend_interface => Some(SymbolKind::ExtendInterface),
            c if c == idx.call => Some(SymbolKind::Call),
            c if c == idx.parameter => Some(SymbolKind::Parameters),
            c if c == idx.return_type => Some(SymbolKind::ReturnType),
            _ => None,
        }
    }
}

impl LanguageAnalyzer for JavaAnalyzer {
    fn language(&self) -> Language {
        Language::JAVA
    }

    fn extensions(&self) -> &[&'static str] {
        &["java"]
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn entity_types(&self) -> &[&'static str] {
        ENTITY_TYPES
    }

    fn entity_label(&self, node: &Node<'_>) -> Result<EntityKind> {
        match node.kind() {
            "class_declaration" | "record_declaration" => Ok(EntityKind::Class),
            "interface_declaration" => Ok(EntityKind::Interface),
            "enum_declaration" => Ok(EntityKind::Enum),
            "method_declaration" => Ok(EntityKind::Method),
            "constructor_declaration" => Ok(EntityKind::Constructor),
            _ => Err(self.unrecognized(node)),
        }
    }

    fn entity_name(&self, node: &Node<'_>, source: &str) -> Result<String> {
        if !self.is_entity_node(node) {
            return Err(self.unrecognized(node));
        }
        node.child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string())
            .ok_or_else(|| self.missing_name(node))
    }

    fn entity_doc_comment(&self, node: &Node<'_>, source: &str) -> Result<Option<String>> {
        if !self.is_entity_node(node) {
            return Err(self.unrecognized(node));
        }
        // Javadoc is the block comment right above the declaration.
        Ok(utils::preceding_comments(*node, &["block_comment", "line_comment"])
            .into_iter()
            .map(|c| node_text(&c, source))
            .find(|text| text.starts_with("/**"))
            .map(clean_comment))
    }

    fn add_symbols(&self, entity: &mut Entity, node: Node<'_>, source: &str) -> Result<()> {
        for (capture, captured) in owned_captures(&self.symbol_query, node, source, ENTITY_TYPES) {
            let Some(kind) = self.symbol_kind(capture) else {
                continue;
            };
            if captured.kind() == "void_type" || self.lookup_anchor(kind, captured).is_none() {
                continue;
            }
            entity.add_symbol(kind, &captured);
        }
        Ok(())
    }

    fn add_imports(&self, root: Node<'_>, source: &str) -> Result<Vec<Symbol>> {
        Ok(utils::all_captures(&self.import_query, root, source)
            .into_iter()
            .filter(|(capture, _)| *capture == self.import_indices.import)
            .map(|(_, node)| Symbol::new(&node))
            .collect())
    }

    fn resolution_policy(&self, kind: SymbolKind) -> Result<ResolutionPolicy> {
        match kind {
            SymbolKind::BaseClass
            | SymbolKind::ImplementInterface
            | SymbolKind::ExtendInterface
            | SymbolKind::Parameters
            | SymbolKind::ReturnType => Ok(ResolutionPolicy::TYPES),
            SymbolKind::Call => Ok(ResolutionPolicy::CALLABLES),
            SymbolKind::Import => Ok(ResolutionPolicy::ANY),
        }
    }

    fn lookup_anchor<'t>(&self, kind: SymbolKind, node: Node<'t>) -> Option<Node<'t>> {
        match kind {
            SymbolKind::Call | SymbolKind::Import => Some(node),
            _ => last_leaf_of(node, &["type_identifier"], &["type_arguments"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_plugin::extract_source;

    fn names(parsed: &codegraph_plugin::ParsedFile) -> Vec<(EntityKind, String)> {
        parsed
            .entities
            .iter()
            .map(|e| (e.kind, e.name.clone()))
            .collect()
    }

    #[test]
    fn test_entities_and_labels() {
        let analyzer = JavaAnalyzer::new().expect("Failed to create JavaAnalyzer");
        let source = r#"
package com.example;

/** A runnable unit. */
public interface Task extends Runnable, Comparable<Task> {
    void execute();
}

public enum State { IDLE, RUNNING }

public record Point(int x, int y) {}

public class Worker extends Base implements Task {
    public Worker(String name) {}
    public Task execute(Task other, int count) { helper(); return other; }
}
"#;
        let parsed = extract_source(&analyzer, source).expect("extract");
        assert_eq!(
            names(&parsed),
            vec![
                (EntityKind::Interface, "Task".to_string()),
                (EntityKind::Method, "execute".to_string()),
                (EntityKind::Enum, "State".to_string()),
                (EntityKind::Class, "Point".to_string()),
                (EntityKind::Class, "Worker".to_string()),
                (EntityKind::Constructor, "Worker".to_string()),
                (EntityKind::Method, "execute".to_string()),
            ]
        );
        assert_eq!(parsed.roots.len(), 4);
        assert_eq!(parsed.entities[0].doc.as_deref(), Some("A runnable unit."));
    }

    #[test]
    fn test_symbols_are_owned_by_their_entity() {
        let analyzer = JavaAnalyzer::new().expect("Failed to create JavaAnalyzer");
        let source = r#"
public class Worker extends Base implements Task, Named {
    public Task execute(Task other, int count) { helper(); return other; }
    public void idle() {}
}
"#;
        let parsed = extract_source(&analyzer, source).expect("extract");
        let class = &parsed.entities[0];
        assert_eq!(class.symbols_of(SymbolKind::BaseClass).len(), 1);
        assert_eq!(class.symbols_of(SymbolKind::ImplementInterface).len(), 2);
        assert!(class.symbols_of(SymbolKind::Call).is_empty());

        let execute = &parsed.entities[1];
        assert_eq!(execute.symbols_of(SymbolKind::Call).len(), 1);
        // `int` has no type identifier to look up
        assert_eq!(execute.symbols_of(SymbolKind::Parameters).len(), 1);
        assert_eq!(execute.symbols_of(SymbolKind::ReturnType).len(), 1);

        let idle = &parsed.entities[2];
        assert!(idle.symbols_of(SymbolKind::ReturnType).is_empty());
    }

    #[test]
    fn test_interface_extends() {
        let analyzer = JavaAnalyzer::new().expect("Failed to create JavaAnalyzer");
        let parsed = extract_source(&analyzer, "interface A extends B, C {}").expect("extract");
        assert_eq!(parsed.entities[0].symbols_of(SymbolKind::ExtendInterface).len(), 2);
        assert!(parsed.entities[0].symbols_of(SymbolKind::BaseClass).is_empty());
    }

    #[test]
    fn test_imports() {
        let analyzer = JavaAnalyzer::new().expect("Failed to create JavaAnalyzer");
        let source = "import com.example.Task;\nimport com.example.util.Logger;\nclass A {}\n";
        let parsed = extract_source(&analyzer, source).expect("extract");
        let anchors: Vec<&str> = parsed
            .imports
            .iter()
            .map(|s| &source[s.key.start_byte..s.key.end_byte])
            .collect();
        assert_eq!(anchors, vec!["Task", "Logger"]);
    }

    #[test]
    fn test_unrecognized_node_is_an_error() {
        let analyzer = JavaAnalyzer::new().expect("Failed to create JavaAnalyzer");
        let parsed = extract_source(&analyzer, "class A {}").expect("extract");
        let root = parsed.tree.root_node();
        assert!(analyzer.entity_label(&root).is_err());
        assert!(analyzer.entity_name(&root, "class A {}").is_err());
    }

    #[test]
    fn test_unsupported_symbol_never_happens_for_java() {
        let analyzer = JavaAnalyzer::new().expect("Failed to create JavaAnalyzer");
        for kind in SymbolKind::ALL {
            assert!(analyzer.resolution_policy(kind).is_ok());
        }
    }
}
