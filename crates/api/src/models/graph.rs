use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Declaration kinds an analyzer can extract.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
pub enum EntityKind {
    Class,
    Interface,
    Enum,
    Struct,
    Function,
    Method,
    Constructor,
}

impl EntityKind {
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            EntityKind::Class | EntityKind::Interface | EntityKind::Enum | EntityKind::Struct
        )
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            EntityKind::Function | EntityKind::Method | EntityKind::Constructor
        )
    }
}

/// Node labels written to the graph store.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
pub enum NodeLabel {
    File,
    Class,
    Interface,
    Enum,
    Struct,
    Function,
    Method,
    Constructor,
}

impl From<EntityKind> for NodeLabel {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Class => NodeLabel::Class,
            EntityKind::Interface => NodeLabel::Interface,
            EntityKind::Enum => NodeLabel::Enum,
            EntityKind::Struct => NodeLabel::Struct,
            EntityKind::Function => NodeLabel::Function,
            EntityKind::Method => NodeLabel::Method,
            EntityKind::Constructor => NodeLabel::Constructor,
        }
    }
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::File => "File",
            NodeLabel::Class => "Class",
            NodeLabel::Interface => "Interface",
            NodeLabel::Enum => "Enum",
            NodeLabel::Struct => "Struct",
            NodeLabel::Function => "Function",
            NodeLabel::Method => "Method",
            NodeLabel::Constructor => "Constructor",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(NodeLabel::from(*self).as_str())
    }
}

/// Edge labels written to the graph store.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relation {
    Defines,
    Extends,
    Implements,
    Calls,
    Returns,
    Parameters,
    Imports,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Defines => "DEFINES",
            Relation::Extends => "EXTENDS",
            Relation::Implements => "IMPLEMENTS",
            Relation::Calls => "CALLS",
            Relation::Returns => "RETURNS",
            Relation::Parameters => "PARAMETERS",
            Relation::Imports => "IMPORTS",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier handed out by a graph sink.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
#[serde(transparent)]
pub struct GraphId(pub u64);

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, JsonSchema)]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    pub ext: String,
}

impl FileRecord {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self { path, name, ext }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, JsonSchema)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub name: String,
    pub doc: Option<String>,
    pub path: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

/// A node as stored by a sink, flattened for display and export.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct GraphNode {
    pub id: GraphId,
    pub label: NodeLabel,
    pub name: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
}

impl GraphNode {
    pub fn from_file(id: GraphId, file: &FileRecord) -> Self {
        Self {
            id,
            label: NodeLabel::File,
            name: file.name.clone(),
            path: file.path.clone(),
            doc: None,
            start_line: None,
            end_line: None,
        }
    }

    pub fn from_entity(id: GraphId, entity: &EntityRecord) -> Self {
        Self {
            id,
            label: entity.kind.into(),
            name: entity.name.clone(),
            path: entity.path.clone(),
            doc: entity.doc.clone(),
            start_line: Some(entity.start_line),
            end_line: Some(entity.end_line),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
pub struct GraphEdge {
    pub from: GraphId,
    pub relation: Relation,
    pub to: GraphId,
}

/// Serializable dump of a whole graph, nodes and edges sorted by id.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_vocabulary() {
        let labels: Vec<&str> = [
            NodeLabel::File,
            NodeLabel::Class,
            NodeLabel::Interface,
            NodeLabel::Enum,
            NodeLabel::Struct,
            NodeLabel::Function,
            NodeLabel::Method,
            NodeLabel::Constructor,
        ]
        .iter()
        .map(|l| l.as_str())
        .collect();
        assert_eq!(
            labels,
            vec![
                "File",
                "Class",
                "Interface",
                "Enum",
                "Struct",
                "Function",
                "Method",
                "Constructor"
            ]
        );
    }

    #[test]
    fn test_relation_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&Relation::Implements).unwrap(),
            "\"IMPLEMENTS\""
        );
        assert_eq!(Relation::Parameters.to_string(), "PARAMETERS");
    }

    #[test]
    fn test_file_record_from_path() {
        let record = FileRecord::from_path("/src/pkg/module_a.py");
        assert_eq!(record.name, "module_a.py");
        assert_eq!(record.ext, ".py");
    }
}
