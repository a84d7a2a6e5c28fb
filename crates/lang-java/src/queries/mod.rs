pub mod java_imports;
pub mod java_symbols;
