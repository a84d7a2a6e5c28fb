use codegraph_core::lookup::LspLookupFactory;
use codegraph_core::{AnalysisConfig, AnalyzerRegistry};
use std::sync::Arc;

/// Registry with every bundled language analyzer.
///
/// An analyzer whose queries fail to compile is logged and left out, so the
/// remaining languages can still be analyzed.
pub fn build_default_registry() -> AnalyzerRegistry {
    let mut registry = AnalyzerRegistry::new();

    match codegraph_java::JavaAnalyzer::new() {
        Ok(analyzer) => registry.register(Arc::new(analyzer)),
        Err(e) => tracing::error!("Failed to load Java analyzer: {}", e),
    }
    match codegraph_python::PythonAnalyzer::new() {
        Ok(analyzer) => registry.register(Arc::new(analyzer)),
        Err(e) => tracing::error!("Failed to load Python analyzer: {}", e),
    }
    match codegraph_javascript::JavaScriptAnalyzer::new() {
        Ok(analyzer) => registry.register(Arc::new(analyzer)),
        Err(e) => tracing::error!("Failed to load JavaScript analyzer: {}", e),
    }
    registry.register(Arc::new(codegraph_csharp::CSharpAnalyzer::new()));
    registry.register(Arc::new(codegraph_kotlin::KotlinAnalyzer::new()));

    registry
}

/// Language-server backed lookups as configured for the project.
pub fn build_default_lookup_factory(config: &AnalysisConfig) -> LspLookupFactory {
    LspLookupFactory::from_config(config)
}

/// Initializes the logging system for a specific component.
/// The returned guard flushes the log file when dropped.
pub fn init_logging(component: &str, to_stderr: bool) -> impl Drop {
    codegraph_core::logging::init_logging(component, to_stderr)
}
