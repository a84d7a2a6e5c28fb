use codegraph_api::SinkError;
use codegraph_plugin::AnalyzerError;
use thiserror::Error;

use crate::lookup::LookupError;

#[derive(Error, Debug)]
pub enum CodegraphError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),
    #[error("Graph sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Definition lookup error: {0}")]
    Lookup(#[from] LookupError),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CodegraphError>;
