use codegraph_api::Language;
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

use crate::analyzer::LanguageAnalyzer;
use crate::error::{AnalyzerError, Result};
use crate::model::{Entity, EntityId, NodeKey, Symbol};
use crate::utils::{nested_entities, range_from_ts};

/// A file after the first-pass walk, not yet part of a `FileSet`.
///
/// Entity ids in `entities`, `roots` and the parent/child links are local
/// indices into `entities`; `FileSet::insert` rebases them.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub language: Language,
    pub source: String,
    pub tree: Tree,
    pub entities: Vec<Entity>,
    pub roots: Vec<usize>,
    pub imports: Vec<Symbol>,
    /// Set by the pipeline, which knows the analysis root.
    pub dependency: bool,
}

/// Parses `source` and runs the analyzer's hierarchy walk over it.
pub fn extract_file(
    analyzer: &dyn LanguageAnalyzer,
    path: &Path,
    source: String,
) -> Result<ParsedFile> {
    let tree = parse(analyzer, path, &source)?;
    let (entities, roots) = extract_entities(analyzer, &tree, &source)?;
    let imports = analyzer.add_imports(tree.root_node(), &source)?;
    debug!(
        "Extracted {} entities and {} imports from {}",
        entities.len(),
        imports.len(),
        path.display()
    );

    Ok(ParsedFile {
        path: path.to_path_buf(),
        language: analyzer.language(),
        dependency: false,
        source,
        tree,
        entities,
        roots,
        imports,
    })
}

/// Convenience for tests and tools working on in-memory snippets.
pub fn extract_source(analyzer: &dyn LanguageAnalyzer, source: &str) -> Result<ParsedFile> {
    extract_file(analyzer, Path::new("<memory>"), source.to_string())
}

fn parse(analyzer: &dyn LanguageAnalyzer, path: &Path, source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&analyzer.grammar())
        .map_err(|e| AnalyzerError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    parser
        .parse(source, None)
        .ok_or_else(|| AnalyzerError::Parse {
            path: path.display().to_string(),
            reason: "parser returned no tree".to_string(),
        })
}

/// Depth-first walk in document order. Each entity gets its symbols from
/// `add_symbols` and its children from `add_children`, exactly once.
fn extract_entities(
    analyzer: &dyn LanguageAnalyzer,
    tree: &Tree,
    source: &str,
) -> Result<(Vec<Entity>, Vec<usize>)> {
    let mut entities: Vec<Entity> = Vec::new();
    let mut roots = Vec::new();

    let mut stack: Vec<(Node<'_>, Option<usize>)> =
        nested_entities(tree.root_node(), analyzer.entity_types())
            .into_iter()
            .rev()
            .map(|n| (n, None))
            .collect();

    while let Some((node, parent)) = stack.pop() {
        let mut entity = Entity::new(
            NodeKey::of(&node),
            analyzer.entity_label(&node)?,
            analyzer.entity_name(&node, source)?,
            analyzer.entity_doc_comment(&node, source)?,
            range_from_ts(&node),
        );
        entity.parent = parent.map(EntityId);
        analyzer.add_symbols(&mut entity, node, source)?;

        let index = entities.len();
        let key = entity.key;
        entities.push(entity);
        match parent {
            Some(p) => {
                entities[p].children.insert(key, EntityId(index));
            }
            None => roots.push(index),
        }

        for child in analyzer.add_children(node)?.into_iter().rev() {
            stack.push((child, Some(index)));
        }
    }

    Ok((entities, roots))
}
