//! Go-to-definition services consulted during the second pass.
//!
//! A [`DefinitionLookup`] is one session per language. The resolver adapter
//! translates between syntax nodes and the positions these sessions speak,
//! so nothing here knows about entities.

pub mod factory;
pub mod lsp;
pub mod null;
pub mod position;

use codegraph_plugin::FileSet;
use lsp_types::{Position, Range};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use factory::{LookupFactory, LspLookupFactory, NullLookupFactory};
pub use lsp::LspLookup;
pub use null::NullLookup;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("failed to start '{command}': {reason}")]
    Spawn { command: String, reason: String },
    #[error("request '{method}' timed out after {timeout_ms}ms")]
    Timeout { method: String, timeout_ms: u64 },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("language server closed the connection")]
    Closed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One answer of a definition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLocation {
    pub path: PathBuf,
    pub range: Range,
}

pub trait DefinitionLookup: Send {
    /// Warm-up barrier: must return before the first `request_definition`.
    fn start(&mut self, _root: &Path, _files: &FileSet) -> Result<(), LookupError> {
        Ok(())
    }

    /// `position` is zero-based with a UTF-16 character offset.
    fn request_definition(
        &mut self,
        path: &Path,
        position: Position,
    ) -> Result<Vec<DefinitionLocation>, LookupError>;

    fn shutdown(&mut self) {}
}
