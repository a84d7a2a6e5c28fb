codegraph_plugin::decl_indices!(SymbolIndices, {
    base_class => "base_class",
    call => "call",
});

pub const JAVASCRIPT_SYMBOLS_SCM: &str = include_str!("javascript_symbols.scm");
