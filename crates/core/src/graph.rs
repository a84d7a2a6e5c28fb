//! In-memory graph store.
//!
//! Nodes live in a petgraph `StableDiGraph`; identity maps make every write
//! an upsert so that repeated analysis runs converge on the same graph.

use codegraph_api::{
    EntityKind, EntityRecord, FileRecord, GraphEdge, GraphId, GraphNode, GraphSink, GraphSnapshot,
    GraphStats, NodeLabel, Relation, SinkError, SinkResult,
};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Identity of an entity node across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityIdentity {
    path: PathBuf,
    kind: EntityKind,
    name: String,
    start_line: usize,
    end_line: usize,
}

impl From<&EntityRecord> for EntityIdentity {
    fn from(record: &EntityRecord) -> Self {
        Self {
            path: record.path.clone(),
            kind: record.kind,
            name: record.name.clone(),
            start_line: record.start_line,
            end_line: record.end_line,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    topology: StableDiGraph<GraphNode, Relation>,
    files: HashMap<PathBuf, NodeIndex>,
    entities: HashMap<EntityIdentity, NodeIndex>,
    edges: HashSet<(NodeIndex, Relation, NodeIndex)>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, id: GraphId) -> SinkResult<NodeIndex> {
        let index = NodeIndex::new(id.0 as usize);
        if self.topology.contains_node(index) {
            Ok(index)
        } else {
            Err(SinkError::UnknownNode(id.0))
        }
    }

    fn id(index: NodeIndex) -> GraphId {
        GraphId(index.index() as u64)
    }

    pub fn node(&self, id: GraphId) -> Option<&GraphNode> {
        self.topology.node_weight(NodeIndex::new(id.0 as usize))
    }

    pub fn file(&self, path: &Path) -> Option<&GraphNode> {
        self.files.get(path).and_then(|&i| self.topology.node_weight(i))
    }

    /// Nodes with the given label and name, ordered by id.
    pub fn find(&self, label: NodeLabel, name: &str) -> Vec<&GraphNode> {
        let mut found: Vec<&GraphNode> = self
            .topology
            .node_weights()
            .filter(|n| n.label == label && n.name == name)
            .collect();
        found.sort_by_key(|n| n.id);
        found
    }

    fn neighbors(&self, id: GraphId, relation: Relation, direction: Direction) -> Vec<&GraphNode> {
        let index = NodeIndex::new(id.0 as usize);
        if !self.topology.contains_node(index) {
            return Vec::new();
        }
        let mut found: Vec<&GraphNode> = self
            .topology
            .edges_directed(index, direction)
            .filter(|e| *e.weight() == relation)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.topology.node_weight(other)
            })
            .collect();
        found.sort_by_key(|n| n.id);
        found
    }

    pub fn outgoing(&self, id: GraphId, relation: Relation) -> Vec<&GraphNode> {
        self.neighbors(id, relation, Direction::Outgoing)
    }

    pub fn incoming(&self, id: GraphId, relation: Relation) -> Vec<&GraphNode> {
        self.neighbors(id, relation, Direction::Incoming)
    }

    pub fn edge_count(&self, relation: Relation) -> usize {
        self.edges.iter().filter(|(_, r, _)| *r == relation).count()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.topology.node_count(),
            edge_count: self.topology.edge_count(),
        }
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<GraphNode> = self.topology.node_weights().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        let mut edges: Vec<GraphEdge> = self
            .edges
            .iter()
            .map(|&(from, relation, to)| GraphEdge {
                from: Self::id(from),
                relation,
                to: Self::id(to),
            })
            .collect();
        edges.sort();
        GraphSnapshot { nodes, edges }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &self.snapshot())?;
        Ok(())
    }
}

impl GraphSink for MemoryGraph {
    fn add_file(&mut self, file: &FileRecord) -> SinkResult<GraphId> {
        if let Some(&index) = self.files.get(&file.path) {
            return Ok(Self::id(index));
        }
        let index = self.topology.add_node(GraphNode::from_file(GraphId(0), file));
        self.topology[index].id = Self::id(index);
        self.files.insert(file.path.clone(), index);
        Ok(Self::id(index))
    }

    fn add_entity(&mut self, entity: &EntityRecord) -> SinkResult<GraphId> {
        let identity = EntityIdentity::from(entity);
        if let Some(&index) = self.entities.get(&identity) {
            // Docs may change without moving the declaration.
            self.topology[index].doc = entity.doc.clone();
            return Ok(Self::id(index));
        }
        let index = self
            .topology
            .add_node(GraphNode::from_entity(GraphId(0), entity));
        self.topology[index].id = Self::id(index);
        self.entities.insert(identity, index);
        Ok(Self::id(index))
    }

    fn connect_entities(
        &mut self,
        relation: Relation,
        from: GraphId,
        to: GraphId,
    ) -> SinkResult<()> {
        let from = self.index(from)?;
        let to = self.index(to)?;
        if self.edges.insert((from, relation, to)) {
            self.topology.add_edge(from, to, relation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, start: usize) -> EntityRecord {
        EntityRecord {
            kind: EntityKind::Class,
            name: name.to_string(),
            doc: None,
            path: PathBuf::from("/src/a.py"),
            start_line: start,
            end_line: start + 3,
        }
    }

    #[test]
    fn test_upserts_do_not_duplicate() {
        let mut graph = MemoryGraph::new();
        let file = graph.add_file(&FileRecord::from_path("/src/a.py")).unwrap();
        let again = graph.add_file(&FileRecord::from_path("/src/a.py")).unwrap();
        assert_eq!(file, again);

        let a = graph.add_entity(&record("A", 0)).unwrap();
        assert_eq!(graph.add_entity(&record("A", 0)).unwrap(), a);
        let other_a = graph.add_entity(&record("A", 10)).unwrap();
        assert_ne!(a, other_a);

        graph.connect_entities(Relation::Defines, file, a).unwrap();
        graph.connect_entities(Relation::Defines, file, a).unwrap();
        graph.connect_entities(Relation::Imports, file, a).unwrap();

        assert_eq!(graph.stats(), GraphStats { node_count: 3, edge_count: 2 });
        assert_eq!(graph.edge_count(Relation::Defines), 1);
        assert_eq!(graph.find(NodeLabel::Class, "A").len(), 2);
        assert_eq!(graph.outgoing(file, Relation::Defines)[0].id, a);
        assert_eq!(graph.incoming(a, Relation::Imports)[0].label, NodeLabel::File);
    }

    #[test]
    fn test_unknown_nodes_are_rejected() {
        let mut graph = MemoryGraph::new();
        let file = graph.add_file(&FileRecord::from_path("/src/a.py")).unwrap();
        let err = graph
            .connect_entities(Relation::Calls, file, GraphId(42))
            .unwrap_err();
        assert!(matches!(err, SinkError::UnknownNode(42)));
    }

    #[test]
    fn test_snapshot_is_sorted_and_serializable() {
        let mut graph = MemoryGraph::new();
        let file = graph.add_file(&FileRecord::from_path("/src/a.py")).unwrap();
        let b = graph.add_entity(&record("B", 5)).unwrap();
        let a = graph.add_entity(&record("A", 0)).unwrap();
        graph.connect_entities(Relation::Extends, b, a).unwrap();
        graph.connect_entities(Relation::Defines, file, b).unwrap();

        let snapshot = graph.snapshot();
        let ids: Vec<GraphId> = snapshot.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![file, b, a]);
        assert_eq!(snapshot.edges[0].from, file);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("graph.json");
        graph.write_json(&out).unwrap();
        let back: GraphSnapshot =
            serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(back, snapshot);
    }
}
