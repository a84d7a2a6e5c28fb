use codegraph_api::Language;
use codegraph_plugin::LanguageAnalyzer;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Extension → analyzer bindings for one analysis run.
#[derive(Default, Clone)]
pub struct AnalyzerRegistry {
    analyzers: Vec<Arc<dyn LanguageAnalyzer>>,
    by_extension: HashMap<String, usize>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later registrations win for extensions claimed twice.
    pub fn register(&mut self, analyzer: Arc<dyn LanguageAnalyzer>) {
        let index = self.analyzers.len();
        for ext in analyzer.extensions() {
            if let Some(previous) = self.by_extension.insert(ext.to_string(), index) {
                warn!(
                    "Extension .{} moves from {} to {}",
                    ext,
                    self.analyzers[previous].language(),
                    analyzer.language()
                );
            }
        }
        self.analyzers.push(analyzer);
    }

    pub fn with(mut self, analyzer: Arc<dyn LanguageAnalyzer>) -> Self {
        self.register(analyzer);
        self
    }

    pub fn for_extension(&self, ext: &str) -> Option<&Arc<dyn LanguageAnalyzer>> {
        self.by_extension
            .get(ext.trim_start_matches('.'))
            .map(|&i| &self.analyzers[i])
    }

    pub fn for_path(&self, path: &Path) -> Option<&Arc<dyn LanguageAnalyzer>> {
        let ext = path.extension()?.to_str()?;
        self.for_extension(ext)
    }

    pub fn for_language(&self, language: &Language) -> Option<&Arc<dyn LanguageAnalyzer>> {
        self.analyzers.iter().find(|a| &a.language() == language)
    }

    pub fn analyzers(&self) -> impl Iterator<Item = &Arc<dyn LanguageAnalyzer>> {
        self.analyzers.iter()
    }

    /// Extensions per analyzer language, sorted.
    pub fn supported_extensions(&self) -> BTreeMap<Language, Vec<String>> {
        let mut out: BTreeMap<Language, Vec<String>> = BTreeMap::new();
        for (ext, &index) in &self.by_extension {
            out.entry(self.analyzers[index].language())
                .or_default()
                .push(ext.clone());
        }
        for exts in out.values_mut() {
            exts.sort();
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_python::PythonAnalyzer;

    #[test]
    fn test_lookup_by_extension_and_path() {
        let registry =
            AnalyzerRegistry::new().with(Arc::new(PythonAnalyzer::new().unwrap()));
        assert!(registry.for_extension("py").is_some());
        assert!(registry.for_extension(".py").is_some());
        assert!(registry.for_path(Path::new("src/a.py")).is_some());
        assert!(registry.for_path(Path::new("README.md")).is_none());
        assert!(registry.for_path(Path::new("Makefile")).is_none());
        assert!(registry.for_language(&Language::PYTHON).is_some());
        assert!(registry.for_language(&Language::JAVA).is_none());
    }

    #[test]
    fn test_supported_extensions() {
        let registry =
            AnalyzerRegistry::new().with(Arc::new(PythonAnalyzer::new().unwrap()));
        let exts = registry.supported_extensions();
        assert_eq!(exts.get(&Language::PYTHON), Some(&vec!["py".to_string()]));
    }
}
