pub mod error;
pub mod graph;
pub mod models;

// Re-export commonly used types
pub use error::{SinkError, SinkResult};
pub use graph::{GraphSink, GraphStats};
pub use models::*;
