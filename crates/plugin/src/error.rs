use codegraph_api::Language;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// An entity-description function was handed a node outside the
    /// analyzer's entity types. Always a traversal bug.
    #[error("{language}: unrecognized entity node kind '{kind}'")]
    UnrecognizedNode { language: Language, kind: String },
    /// A symbol kind reached `resolve_symbol` that the analyzer never records.
    #[error("{language}: unsupported symbol kind '{kind}'")]
    UnsupportedSymbol { language: Language, kind: String },
    #[error("{language}: entity node '{kind}' has no name")]
    MissingName { language: Language, kind: String },
    #[error("Invalid query: {0}")]
    Query(String),
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("Dependency bootstrap failed: {0}")]
    Dependency(String),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
