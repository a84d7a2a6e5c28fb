codegraph_plugin::decl_indices!(ImportIndices, {
    import => "import",
});

pub const JAVA_IMPORTS_SCM: &str = include_str!("java_imports.scm");
