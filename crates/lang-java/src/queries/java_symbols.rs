codegraph_plugin::decl_indices!(SymbolIndices, {
    base_class => "base_class",
    implement_interface => "implement_interface",
    extend_interface => "extend_interface",
    call => "call",
    parameter => "parameter",
    return_type => "return_type",
});

pub const JAVA_SYMBOLS_SCM: &str = include_str!("java_symbols.scm");
