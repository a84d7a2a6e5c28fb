pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod lookup;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod scanner;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::AnalysisConfig;
pub use error::{CodegraphError, Result};
pub use graph::MemoryGraph;
pub use pipeline::{AnalysisPipeline, AnalysisReport, FirstPassReport, SecondPassReport};
pub use registry::AnalyzerRegistry;
