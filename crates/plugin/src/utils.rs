use crate::error::{AnalyzerError, Result};
use codegraph_api::Range;
use tree_sitter::{Language, Node, Query, QueryCursor, StreamingIterator};

/// Converts a tree-sitter node span to our internal Range model.
pub fn range_from_ts(node: &Node<'_>) -> Range {
    let range = node.range();
    Range {
        start_line: range.start_point.row,
        start_col: range.start_point.column,
        end_line: range.end_point.row,
        end_col: range.end_point.column,
    }
}

/// Loads a Tree-sitter query from an SCM string.
pub fn load_query(language: &Language, scm: &str) -> Result<Query> {
    Query::new(language, scm).map_err(|e| AnalyzerError::Query(format!("{:?}", e)))
}

/// Gets the index of a capture name in a query.
pub fn get_capture_index(query: &Query, name: &str) -> Result<u32> {
    query
        .capture_index_for_name(name)
        .ok_or_else(|| AnalyzerError::Query(format!("Capture name '{}' not found in SCM", name)))
}

pub fn node_text<'s>(node: &Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

/// Nearest strict ancestor whose kind is an entity type.
pub fn owner_of<'t>(node: Node<'t>, entity_types: &[&str]) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if entity_types.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Like [`owner_of`] but a node that is itself an entity counts.
pub fn enclosing_entity<'t>(node: Node<'t>, entity_types: &[&str]) -> Option<Node<'t>> {
    if entity_types.contains(&node.kind()) {
        return Some(node);
    }
    owner_of(node, entity_types)
}

/// Entity nodes below `node` that are not nested inside another entity.
pub fn nested_entities<'t>(node: Node<'t>, entity_types: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack: Vec<Node<'t>> = {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    };
    stack.reverse();
    while let Some(current) = stack.pop() {
        if entity_types.contains(&current.kind()) {
            out.push(current);
            continue;
        }
        let mut cursor = current.walk();
        let children: Vec<Node<'t>> = current.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

/// Named descendants of an entity that belong to it, stopping at nested
/// entities. Document order.
pub fn owned_descendants<'t>(node: Node<'t>, entity_types: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack: Vec<Node<'t>> = {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    };
    stack.reverse();
    while let Some(current) = stack.pop() {
        if entity_types.contains(&current.kind()) {
            continue;
        }
        out.push(current);
        let mut cursor = current.walk();
        let children: Vec<Node<'t>> = current.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

/// Runs `query` over an entity node and keeps the captures owned by that
/// entity, sorted by position.
pub fn owned_captures<'t>(
    query: &Query,
    entity: Node<'t>,
    source: &str,
    entity_types: &[&str],
) -> Vec<(u32, Node<'t>)> {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, entity, source.as_bytes());
    let mut out = Vec::new();
    while let Some(mat) = matches.next() {
        for cap in mat.captures {
            let owner = owner_of(cap.node, entity_types);
            if owner.map(|o| o.id()) == Some(entity.id()) {
                out.push((cap.index, cap.node));
            }
        }
    }
    out.sort_by_key(|(index, node)| (node.start_byte(), node.end_byte(), *index));
    out.dedup_by_key(|(index, node)| (node.id(), *index));
    out
}

/// Captures of `query` anywhere under `node`, sorted by position.
pub fn all_captures<'t>(query: &Query, node: Node<'t>, source: &str) -> Vec<(u32, Node<'t>)> {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, node, source.as_bytes());
    let mut out = Vec::new();
    while let Some(mat) = matches.next() {
        for cap in mat.captures {
            out.push((cap.index, cap.node));
        }
    }
    out.sort_by_key(|(index, node)| (node.start_byte(), node.end_byte(), *index));
    out.dedup_by_key(|(index, node)| (node.id(), *index));
    out
}

pub fn find_child<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

pub fn has_child(node: Node<'_>, kind: &str) -> bool {
    find_child(node, kind).is_some()
}

/// Last descendant of one of `kinds` in document order, without entering
/// subtrees of the `skip` kinds. Used to pick the name segment out of a
/// qualified or generic type.
pub fn last_leaf_of<'t>(node: Node<'t>, kinds: &[&str], skip: &[&str]) -> Option<Node<'t>> {
    if kinds.contains(&node.kind()) {
        return Some(node);
    }
    let mut found = None;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if skip.contains(&child.kind()) {
            continue;
        }
        if let Some(n) = last_leaf_of(child, kinds, skip) {
            found = Some(n);
        }
    }
    found
}

/// Walks back over preceding siblings collecting comments, nearest first.
pub fn preceding_comments<'t>(node: Node<'t>, comment_kinds: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        if !comment_kinds.contains(&sibling.kind()) {
            break;
        }
        out.push(sibling);
        prev = sibling.prev_sibling();
    }
    out
}

/// Strips `/** */`, `/* */`, `///` and `//` markers and leading asterisks.
pub fn clean_comment(raw: &str) -> String {
    let body = raw
        .trim()
        .strip_prefix("/**")
        .or_else(|| raw.trim().strip_prefix("/*"))
        .map(|s| s.strip_suffix("*/").unwrap_or(s))
        .unwrap_or(raw);

    let mut lines: Vec<&str> = body
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line
                .strip_prefix("///")
                .or_else(|| line.strip_prefix("//"))
                .unwrap_or(line);
            let line = line.trim_start();
            match line.strip_prefix('*') {
                Some(rest) => rest.trim(),
                None => line.trim(),
            }
        })
        .collect();

    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Macro to define a struct for capture indices and a `new` method to initialize it from a query.
#[macro_export]
macro_rules! decl_indices {
    ($name:ident, { $($field:ident => $capture:expr),+ $(,)? }) => {
        #[derive(Clone)]
        pub struct $name {
            $(pub $field: u32,)+
        }

        impl $name {
            pub fn new(query: &tree_sitter::Query) -> $crate::error::Result<Self> {
                Ok(Self {
                    $($field: $crate::utils::get_capture_index(query, $capture)?,)+
                })
            }
        }
    };
}
