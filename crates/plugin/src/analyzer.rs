use codegraph_api::{EntityKind, Language, SymbolKind};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

use crate::error::{AnalyzerError, Result};
use crate::locate::{Locate, Located};
use crate::model::{Entity, EntityId, FileSet, NodeKey, Symbol};
use crate::utils;

/// Which registered entity kinds a symbol of some kind may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPolicy {
    pub accept: &'static [EntityKind],
}

impl ResolutionPolicy {
    pub const TYPES: ResolutionPolicy = ResolutionPolicy {
        accept: &[
            EntityKind::Class,
            EntityKind::Interface,
            EntityKind::Enum,
            EntityKind::Struct,
        ],
    };

    pub const CALLABLES: ResolutionPolicy = ResolutionPolicy {
        accept: &[
            EntityKind::Function,
            EntityKind::Method,
            EntityKind::Constructor,
        ],
    };

    pub const ANY: ResolutionPolicy = ResolutionPolicy {
        accept: &[
            EntityKind::Class,
            EntityKind::Interface,
            EntityKind::Enum,
            EntityKind::Struct,
            EntityKind::Function,
            EntityKind::Method,
            EntityKind::Constructor,
        ],
    };

    pub fn accepts(&self, kind: EntityKind) -> bool {
        self.accept.contains(&kind)
    }
}

/// Result of resolving one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The lookup answered. Targets may still be empty when every candidate
    /// was filtered out.
    Targets(Vec<EntityId>),
    NoCandidates,
    Unavailable(String),
}

impl Resolution {
    pub fn targets(&self) -> &[EntityId] {
        match self {
            Resolution::Targets(targets) => targets,
            _ => &[],
        }
    }
}

/// Per-language knowledge of how syntax maps onto entities and symbols.
///
/// The pipeline is written against this trait only; nothing above it knows
/// which grammar it is looking at.
pub trait LanguageAnalyzer: Send + Sync {
    fn language(&self) -> Language;

    /// File extensions without the leading dot.
    fn extensions(&self) -> &[&'static str];

    fn grammar(&self) -> tree_sitter::Language;

    /// Grammar node kinds that define entities.
    fn entity_types(&self) -> &[&'static str];

    fn is_entity_node(&self, node: &Node<'_>) -> bool {
        self.entity_types().contains(&node.kind())
    }

    fn entity_label(&self, node: &Node<'_>) -> Result<EntityKind>;

    fn entity_name(&self, node: &Node<'_>, source: &str) -> Result<String>;

    fn entity_doc_comment(&self, node: &Node<'_>, source: &str) -> Result<Option<String>>;

    /// Records the entity's own references. References inside nested
    /// entities belong to those entities and must be left alone.
    fn add_symbols(&self, entity: &mut Entity, node: Node<'_>, source: &str) -> Result<()>;

    /// Nested declarations that become children of the entity at `node`.
    fn add_children<'t>(&self, node: Node<'t>) -> Result<Vec<Node<'t>>> {
        Ok(utils::nested_entities(node, self.entity_types()))
    }

    /// File-level import references.
    fn add_imports(&self, _root: Node<'_>, _source: &str) -> Result<Vec<Symbol>> {
        Ok(Vec::new())
    }

    /// Fails for symbol kinds this analyzer never records.
    fn resolution_policy(&self, kind: SymbolKind) -> Result<ResolutionPolicy>;

    /// Sub-node whose start position is sent to the definition lookup.
    /// `None` means the reference cannot be looked up at all.
    fn lookup_anchor<'t>(&self, _kind: SymbolKind, node: Node<'t>) -> Option<Node<'t>> {
        Some(node)
    }

    /// Resolves a recorded symbol to registered entities.
    ///
    /// Every candidate location is climbed to its nearest enclosing entity
    /// node, kept only when the registered entity's kind is accepted by the
    /// policy for `kind`, and deduplicated.
    fn resolve_symbol(
        &self,
        files: &FileSet,
        locator: &mut dyn Locate,
        path: &Path,
        kind: SymbolKind,
        node: Node<'_>,
    ) -> Result<Resolution> {
        let policy = self.resolution_policy(kind)?;
        let Some(anchor) = self.lookup_anchor(kind, node) else {
            return Ok(Resolution::NoCandidates);
        };

        let candidates = match locator.locate(files, path, anchor) {
            Located::Candidates(candidates) => candidates,
            Located::NoCandidates => return Ok(Resolution::NoCandidates),
            Located::Unavailable(reason) => return Ok(Resolution::Unavailable(reason)),
        };

        let mut targets = BTreeSet::new();
        for candidate in candidates {
            let file = files.file(candidate.file);
            let Some(found) = file.node(candidate.key) else {
                continue;
            };
            let Some(declaration) = utils::enclosing_entity(found, self.entity_types()) else {
                continue;
            };
            let Some(id) = file.entity_at(NodeKey::of(&declaration)) else {
                continue;
            };
            if policy.accepts(files.entity(id).kind) {
                targets.insert(id);
            }
        }
        Ok(Resolution::Targets(targets.into_iter().collect()))
    }

    /// Whether a file is third-party source. `relative` is the path below
    /// the analysis root, so directories above the project never count.
    fn is_dependency_source(&self, _relative: &Path) -> bool {
        false
    }

    /// Best-effort bootstrap of third-party sources. Returns extra files to
    /// analyze; they are registered but their own symbols are not resolved.
    fn fetch_dependencies(&self, _root: &Path, _files: &FileSet) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn unrecognized(&self, node: &Node<'_>) -> AnalyzerError {
        AnalyzerError::UnrecognizedNode {
            language: self.language(),
            kind: node.kind().to_string(),
        }
    }

    fn unsupported(&self, kind: SymbolKind) -> AnalyzerError {
        AnalyzerError::UnsupportedSymbol {
            language: self.language(),
            kind: kind.as_str().to_string(),
        }
    }

    fn missing_name(&self, node: &Node<'_>) -> AnalyzerError {
        AnalyzerError::MissingName {
            language: self.language(),
            kind: node.kind().to_string(),
        }
    }
}
