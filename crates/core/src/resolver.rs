use codegraph_plugin::{Candidate, FileSet, Locate, Located, NodeKey};
use serde::Serialize;
use std::path::Path;
use tracing::debug;
use tree_sitter::Node;

use crate::lookup::position::{byte_at, position_at};
use crate::lookup::{DefinitionLocation, DefinitionLookup};

/// Outcome counters of one resolver session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub requests: usize,
    pub candidates: usize,
    /// Answers outside the file set or not mappable onto its trees.
    pub dropped: usize,
    pub failures: usize,
}

/// Adapts a position-based [`DefinitionLookup`] to node-based [`Locate`].
pub struct DefinitionResolver<'l> {
    lookup: &'l mut dyn DefinitionLookup,
    stats: ResolverStats,
}

impl<'l> DefinitionResolver<'l> {
    pub fn new(lookup: &'l mut dyn DefinitionLookup) -> Self {
        Self {
            lookup,
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    fn map_location(files: &FileSet, location: &DefinitionLocation) -> Option<Candidate> {
        let id = files.by_path(&location.path).or_else(|| {
            let canonical = location.path.canonicalize().ok()?;
            files.by_path(&canonical)
        })?;
        let file = files.file(id);
        let start = byte_at(&file.source, location.range.start)?;
        let end = byte_at(&file.source, location.range.end)?.max(start);
        let node = file
            .tree
            .root_node()
            .descendant_for_byte_range(start, end)?;
        Some(Candidate {
            file: id,
            key: NodeKey::of(&node),
        })
    }
}

impl Locate for DefinitionResolver<'_> {
    fn locate(&mut self, files: &FileSet, path: &Path, node: Node<'_>) -> Located {
        self.stats.requests += 1;
        let Some(id) = files.by_path(path) else {
            self.stats.failures += 1;
            return Located::Unavailable(format!("{} is not in the file set", path.display()));
        };
        let position = position_at(&files.file(id).source, node.start_byte());

        let locations = match self.lookup.request_definition(path, position) {
            Ok(locations) => locations,
            Err(e) => {
                self.stats.failures += 1;
                debug!(
                    "Lookup failed at {}:{}:{}: {}",
                    path.display(),
                    position.line,
                    position.character,
                    e
                );
                return Located::Unavailable(e.to_string());
            }
        };

        let mut candidates = Vec::with_capacity(locations.len());
        for location in &locations {
            match Self::map_location(files, location) {
                Some(candidate) => candidates.push(candidate),
                None => self.stats.dropped += 1,
            }
        }
        candidates.sort();
        candidates.dedup();
        self.stats.candidates += candidates.len();

        if candidates.is_empty() {
            Located::NoCandidates
        } else {
            Located::Candidates(candidates)
        }
    }
}
