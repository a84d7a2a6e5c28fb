use std::path::Path;
use tree_sitter::Node;

use crate::model::{FileId, FileSet, NodeKey};

/// A definition site mapped back onto an already-parsed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    pub file: FileId,
    /// Smallest node covering the reported definition range.
    pub key: NodeKey,
}

/// Outcome of one definition lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Candidates(Vec<Candidate>),
    /// The service answered, and nothing it returned is inside the file set.
    NoCandidates,
    /// The service failed or timed out.
    Unavailable(String),
}

/// Go-to-definition seam used by `LanguageAnalyzer::resolve_symbol`.
pub trait Locate {
    fn locate(&mut self, files: &FileSet, path: &Path, node: Node<'_>) -> Located;
}
