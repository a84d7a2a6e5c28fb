codegraph_plugin::decl_indices!(SymbolIndices, {
    base_class => "base_class",
    call => "call",
    parameter => "parameter",
    return_type => "return_type",
    import => "import",
});

pub const PYTHON_SYMBOLS_SCM: &str = include_str!("python_symbols.scm");
