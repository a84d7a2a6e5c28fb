pub mod javascript_imports;
pub mod javascript_symbols;
