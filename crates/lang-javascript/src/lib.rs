pub mod queries;

use codegraph_api::{EntityKind, Language, SymbolKind};
use codegraph_plugin::utils::{self, clean_comment, node_text, owned_captures};
use codegraph_plugin::{
    AnalyzerError, Entity, FileSet, LanguageAnalyzer, ResolutionPolicy, Result, Symbol,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tree_sitter::{Node, Query};
use walkdir::WalkDir;

use crate::queries::javascript_imports::{ImportIndices, JAVASCRIPT_IMPORTS_SCM};
use crate::queries::javascript_symbols::{JAVASCRIPT_SYMBOLS_SCM, SymbolIndices};

const ENTITY_TYPES: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "class_declaration",
    "method_definition",
];

const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx"];

pub struct JavaScriptAnalyzer {
    language: tree_sitter::Language,
    symbol_query: Arc<Query>,
    symbol_indices: SymbolIndices,
    import_query: Arc<Query>,
    import_indices: ImportIndices,
}

/// Package names listed under `dependencies` and `devDependencies`.
fn read_package_json(root: &Path) -> Result<BTreeSet<String>> {
    let path = root.join("package.json");
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Ok(BTreeSet::new());
    };
    let manifest: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| AnalyzerError::Dependency(format!("{}: {}", path.display(), e)))?;

    let mut names = BTreeSet::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = manifest.get(section).and_then(|v| v.as_object()) {
            names.extend(deps.keys().cloned());
        }
    }
    Ok(names)
}

impl JavaScriptAnalyzer {
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();

        let symbol_query = utils::load_query(&language, JAVASCRIPT_SYMBOLS_SCM)?;
        let symbol_indices = SymbolIndices::new(&symbol_query)?;

        let import_query = utils::load_query(&language, JAVASCRIPT_IMPORTS_SCM)?;
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
        match capture {
            c if c == self.symbol_indices.base_class => Some(SymbolKind::BaseClass),
            c if c == self.symbol_indices.call => Some(SymbolKind::Call),
            _ => None,
        }
    }
}

impl LanguageAnalyzer for JavaScriptAnalyzer {
    fn language(&self) -> Language {
        Language::JAVASCRIPT
    }

    fn extensions(&self) -> &[&'static str] {
        SOURCE_EXTENSIONS
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn entity_types(&self) -> &[&'static str] {
        ENTITY_TYPES
    }

    fn entity_label(&self, node: &Node<'_>) -> Result<EntityKind> {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => Ok(EntityKind::Function),
            "class_declaration" => Ok(EntityKind::Class),
            "method_definition" => Ok(EntityKind::Method),
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
        // `export function f` keeps its comment above the export statement.
        let anchor = match node.parent() {
            Some(parent) if parent.kind() == "export_statement" => parent,
            _ => *node,
        };
        Ok(utils::preceding_comments(anchor, &["comment"])
            .first()
            .map(|c| clean_comment(node_text(c, source))))
    }

    fn add_symbols(&self, entity: &mut Entity, node: Node<'_>, source: &str) -> Result<()> {
        for (capture, captured) in owned_captures(&self.symbol_query, node, source, ENTITY_TYPES) {
            if let Some(kind) = self.symbol_kind(capture) {
                entity.add_symbol(kind, &captured);
            }
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
            SymbolKind::BaseClass => Ok(ResolutionPolicy::TYPES),
            SymbolKind::Call => Ok(ResolutionPolicy::CALLABLES),
            SymbolKind::Import => Ok(ResolutionPolicy::ANY),
            _ => Err(self.unsupported(kind)),
        }
    }

    fn is_dependency_source(&self, relative: &Path) -> bool {
        relative.components().any(|c| c.as_os_str() == "node_modules")
    }

    /// Collects sources of the packages declared in `package.json` from an
    /// already installed `node_modules`.
    fn fetch_dependencies(&self, root: &Path, files: &FileSet) -> Result<Vec<PathBuf>> {
        let wanted = read_package_json(root)?;
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let modules = root.join("node_modules");
        if !modules.is_dir() {
            return Err(AnalyzerError::Dependency(format!(
                "no node_modules under {}",
                root.display()
            )));
        }

        let mut extra = Vec::new();
        for name in &wanted {
            let package = modules.join(name);
            if !package.is_dir() {
                debug!("Package {} is not installed", name);
                continue;
            }
            extra.extend(
                WalkDir::new(&package)
                    .into_iter()
                    .filter_entry(|e| e.depth() == 0 || e.file_name() != "node_modules")
                    .filter_map(|e| e.ok())
                    .map(|e| e.into_path())
                    .filter(|p| {
                        p.extension()
                            .is_some_and(|ext| SOURCE_EXTENSIONS.iter().any(|s| ext == *s))
                    })
                    .filter(|p| files.by_path(p).is_none()),
            );
        }
        info!("Found {} javascript dependency sources", extra.len());
        Ok(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_plugin::{ParsedFile, extract_source};

    const SOURCE: &str = r#"function log(msg) {
    console.log(msg);
}

class Task {
    constructor(name, duration) {
        this.name = name;
        this.duration = duration;
        console.log(`name: ${name}, duration: ${duration}`);
    }

    abort(delay) {
        log(`Task ${this.name} aborted`);
        return this;
    }
}
"#;

    fn analyzer() -> JavaScriptAnalyzer {
        JavaScriptAnalyzer::new().expect("Failed to create JavaScriptAnalyzer")
    }

    fn parsed() -> ParsedFile {
        extract_source(&analyzer(), SOURCE).expect("extract")
    }

    #[test]
    fn test_entities_and_ranges() {
        let parsed = parsed();
        let entities: Vec<(EntityKind, &str, usize, usize)> = parsed
            .entities
            .iter()
            .map(|e| (e.kind, e.name.as_str(), e.range.start_line, e.range.end_line))
            .collect();
        assert_eq!(
            entities,
            vec![
                (EntityKind::Function, "log", 0, 2),
                (EntityKind::Class, "Task", 4, 15),
                (EntityKind::Method, "constructor", 5, 9),
                (EntityKind::Method, "abort", 11, 14),
            ]
        );
        assert_eq!(parsed.roots, vec![0, 1]);
    }

    #[test]
    fn test_calls_and_untyped_parameters() {
        let parsed = parsed();
        for entity in &parsed.entities {
            assert!(entity.symbols_of(SymbolKind::Parameters).is_empty());
        }
        assert_eq!(parsed.entities[0].symbols_of(SymbolKind::Call).len(), 1);
        // Calls inside methods are not the class's own.
        assert!(parsed.entities[1].symbols_of(SymbolKind::Call).is_empty());
        assert_eq!(parsed.entities[2].symbols_of(SymbolKind::Call).len(), 1);
        assert_eq!(parsed.entities[3].symbols_of(SymbolKind::Call).len(), 1);
    }

    #[test]
    fn test_call_anchor_is_the_property_name() {
        let parsed = parsed();
        let call = &parsed.entities[0].symbols_of(SymbolKind::Call)[0];
        assert_eq!(&SOURCE[call.key.start_byte..call.key.end_byte], "log");
        assert!(SOURCE[..call.key.start_byte].ends_with("console."));
    }

    #[test]
    fn test_heritage_and_imports() {
        let source = "import { Base, helper as h } from './base.js';\n\
                      // A worker.\n\
                      export class Worker extends Base {}\n";
        let parsed = extract_source(&analyzer(), source).expect("extract");
        let worker = &parsed.entities[0];
        assert_eq!(worker.symbols_of(SymbolKind::BaseClass).len(), 1);
        assert_eq!(worker.doc.as_deref(), Some("A worker."));

        let imports: Vec<&str> = parsed
            .imports
            .iter()
            .map(|s| &source[s.key.start_byte..s.key.end_byte])
            .collect();
        assert_eq!(imports, vec!["Base", "helper"]);
    }

    #[test]
    fn test_typed_symbol_kinds_are_unsupported() {
        let analyzer = analyzer();
        assert!(analyzer.resolution_policy(SymbolKind::Call).is_ok());
        assert!(analyzer.resolution_policy(SymbolKind::ReturnType).is_err());
        assert!(analyzer.resolution_policy(SymbolKind::ImplementInterface).is_err());
    }

    #[test]
    fn test_node_modules_are_dependencies() {
        let analyzer = analyzer();
        assert!(analyzer.is_dependency_source(Path::new("node_modules/lodash/index.js")));
        assert!(!analyzer.is_dependency_source(Path::new("src/index.js")));
    }
}
