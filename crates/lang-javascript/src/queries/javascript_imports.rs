codegraph_plugin::decl_indices!(ImportIndices, {
    import => "import",
});

pub const JAVASCRIPT_IMPORTS_SCM: &str = include_str!("javascript_imports.scm");
