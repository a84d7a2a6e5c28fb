use crate::error::SinkResult;
use crate::models::{EntityRecord, FileRecord, GraphId, Relation};

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
}

/// Write side of the graph store.
///
/// Writes are additive. Implementations are expected to upsert: registering
/// the same file, entity or edge twice must hand back the same id and must
/// not create a duplicate.
pub trait GraphSink {
    fn add_file(&mut self, file: &FileRecord) -> SinkResult<GraphId>;

    fn add_entity(&mut self, entity: &EntityRecord) -> SinkResult<GraphId>;

    fn connect_entities(&mut self, relation: Relation, from: GraphId, to: GraphId)
    -> SinkResult<()>;
}

impl<S: GraphSink + ?Sized> GraphSink for &mut S {
    fn add_file(&mut self, file: &FileRecord) -> SinkResult<GraphId> {
        (**self).add_file(file)
    }

    fn add_entity(&mut self, entity: &EntityRecord) -> SinkResult<GraphId> {
        (**self).add_entity(entity)
    }

    fn connect_entities(
        &mut self,
        relation: Relation,
        from: GraphId,
        to: GraphId,
    ) -> SinkResult<()> {
        (**self).connect_entities(relation, from, to)
    }
}
