pub mod python_symbols;
