pub mod graph;
pub mod language;
pub mod symbol;

pub use graph::*;
pub use language::*;
pub use symbol::*;
