//! Language analyzer contract and the in-memory entity/symbol model shared by
//! every language crate and by the analysis pipeline.

pub mod analyzer;
pub mod error;
pub mod extract;
pub mod locate;
pub mod model;
pub mod utils;

pub use analyzer::{LanguageAnalyzer, Resolution, ResolutionPolicy};
pub use error::{AnalyzerError, Result};
pub use extract::{ParsedFile, extract_file, extract_source};
pub use locate::{Candidate, Locate, Located};
pub use model::{Entity, EntityId, File, FileId, FileSet, NodeKey, Phase, Symbol};
