pub mod queries;

use codegraph_api::{EntityKind, Language, SymbolKind};
use codegraph_plugin::utils::{self, node_text, owned_captures};
use codegraph_plugin::{
    AnalyzerError, Entity, FileSet, LanguageAnalyzer, ResolutionPolicy, Result, Symbol,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tree_sitter::{Node, Query};
use walkdir::WalkDir;

use crate::queries::python_symbols::{PYTHON_SYMBOLS_SCM, SymbolIndices};

const ENTITY_TYPES: &[&str] = &["class_definition", "function_definition"];

/// Directory names that hold installed third-party packages.
const DEPENDENCY_DIRS: &[&str] = &["site-packages", ".venv", "venv"];

pub struct PythonAnalyzer {
    language: tree_sitter::Language,
    query: Arc<Query>,
    indices: SymbolIndices,
}

impl PythonAnalyzer {
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        let query = utils::load_query(&language, PYTHON_SYMBOLS_SCM)?;
        let indices = SymbolIndices::new(&query)?;
        Ok(Self {
            language,
            query: Arc::new(query),
            indices,
        })
    }

    fn symbol_kind(&self, capture: u32) -> Option<SymbolKind> {
        let idx = &self.indices;
        match capture {
            c if c == idx.base_class => Some(SymbolKind::BaseClass),
            c if c == idx.call => Some(SymbolKind::Call),
            c if c == idx.parameter => Some(SymbolKind::Parameters),
            c if c == idx.return_type => Some(SymbolKind::ReturnType),
            _ => None,
        }
    }
}

/// Identifier that names the thing an expression refers to: `a` for `a`,
/// `b` for `a.b`, `List` for `List[int]`.
fn name_anchor(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "identifier" => Some(node),
        "attribute" => node.child_by_field_name("attribute"),
        "type" | "generic_type" => node.named_child(0).and_then(name_anchor),
        "subscript" => node.child_by_field_name("value").and_then(name_anchor),
        "aliased_import" => node.child_by_field_name("name").and_then(name_anchor),
        "dotted_name" | "member_type" => {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .filter(|c| c.kind() == "identifier")
                .last()
        }
        _ => None,
    }
}

/// Normalized distribution name, as pip compares them.
fn normalize_package(name: &str) -> String {
    name.trim().to_lowercase().replace(['-', '.'], "_")
}

/// Package names listed in `requirements.txt`, version pins dropped.
fn read_requirements(root: &Path) -> BTreeSet<String> {
    let Ok(text) = std::fs::read_to_string(root.join("requirements.txt")) else {
        return BTreeSet::new();
    };
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter_map(|line| {
            line.split(|c: char| "<>=!~[; ".contains(c))
                .next()
                .map(normalize_package)
        })
        .filter(|name| !name.is_empty())
        .collect()
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::PYTHON
    }

    fn extensions(&self) -> &[&'static str] {
        &["py"]
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn entity_types(&self) -> &[&'static str] {
        ENTITY_TYPES
    }

    fn entity_label(&self, node: &Node<'_>) -> Result<EntityKind> {
        match node.kind() {
            "class_definition" => Ok(EntityKind::Class),
            "function_definition" => {
                let in_class = utils::owner_of(*node, ENTITY_TYPES)
                    .is_some_and(|owner| owner.kind() == "class_definition");
                Ok(if in_class {
                    EntityKind::Method
                } else {
                    EntityKind::Function
                })
            }
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
        let Some(body) = node.child_by_field_name("body") else {
            return Ok(None);
        };
        let Some(first) = body.named_child(0) else {
            return Ok(None);
        };
        if first.kind() != "expression_statement" {
            return Ok(None);
        }
        Ok(first
            .named_child(0)
            .filter(|n| n.kind() == "string")
            .map(|n| {
                node_text(&n, source)
                    .trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B'])
                    .trim_matches(|c: char| c == '"' || c == '\'')
                    .trim()
                    .to_string()
            }))
    }

    fn add_symbols(&self, entity: &mut Entity, node: Node<'_>, source: &str) -> Result<()> {
        for (capture, captured) in owned_captures(&self.query, node, source, ENTITY_TYPES) {
            let Some(kind) = self.symbol_kind(capture) else {
                continue;
            };
            // `metaclass=...` and friends are not base classes
            if kind == SymbolKind::BaseClass && captured.kind() == "keyword_argument" {
                continue;
            }
            if self.lookup_anchor(kind, captured).is_some() {
                entity.add_symbol(kind, &captured);
            }
        }
        Ok(())
    }

    fn add_imports(&self, root: Node<'_>, source: &str) -> Result<Vec<Symbol>> {
        Ok(utils::all_captures(&self.query, root, source)
            .into_iter()
            .filter(|(capture, _)| *capture == self.indices.import)
            .filter(|(_, node)| name_anchor(*node).is_some())
            .map(|(_, node)| Symbol::new(&node))
            .collect())
    }

    fn resolution_policy(&self, kind: SymbolKind) -> Result<ResolutionPolicy> {
        match kind {
            SymbolKind::BaseClass | SymbolKind::Parameters | SymbolKind::ReturnType => {
                Ok(ResolutionPolicy::TYPES)
            }
            SymbolKind::Call => Ok(ResolutionPolicy::CALLABLES),
            SymbolKind::Import => Ok(ResolutionPolicy::ANY),
            SymbolKind::ImplementInterface | SymbolKind::ExtendInterface => {
                Err(self.unsupported(kind))
            }
        }
    }

    fn lookup_anchor<'t>(&self, _kind: SymbolKind, node: Node<'t>) -> Option<Node<'t>> {
        name_anchor(node)
    }

    fn is_dependency_source(&self, relative: &Path) -> bool {
        relative.components().any(|c| {
            let part = c.as_os_str().to_string_lossy();
            DEPENDENCY_DIRS.contains(&part.as_ref())
        })
    }

    /// Pulls the sources of packages named in `requirements.txt` out of a
    /// project-local virtual environment.
    fn fetch_dependencies(&self, root: &Path, files: &FileSet) -> Result<Vec<PathBuf>> {
        let wanted = read_requirements(root);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let site_packages: Vec<PathBuf> = [".venv", "venv"]
            .iter()
            .map(|dir| root.join(dir))
            .filter(|dir| dir.is_dir())
            .flat_map(|venv| {
                WalkDir::new(venv)
                    .max_depth(4)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_dir() && e.file_name() == "site-packages")
                    .map(|e| e.into_path())
                    .collect::<Vec<_>>()
            })
            .collect();
        if site_packages.is_empty() {
            return Err(AnalyzerError::Dependency(format!(
                "no virtual environment under {}",
                root.display()
            )));
        }

        let mut extra = Vec::new();
        for dir in &site_packages {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let name = normalize_package(&entry.file_name().to_string_lossy());
                if !wanted.contains(&name) || !entry.path().is_dir() {
                    continue;
                }
                debug!("Collecting dependency sources from {}", entry.path().display());
                extra.extend(
                    WalkDir::new(entry.path())
                        .into_iter()
                        .filter_map(|e| e.ok())
                        .map(|e| e.into_path())
                        .filter(|p| p.extension().is_some_and(|ext| ext == "py"))
                        .filter(|p| files.by_path(p).is_none()),
                );
            }
        }
        info!("Found {} python dependency sources", extra.len());
        Ok(extra)
    }
}
