#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Unknown graph node: {0}")]
    UnknownNode(u64),
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;
