use codegraph_api::Language;
use codegraph_plugin::FileSet;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use super::{DefinitionLookup, LspLookup, NullLookup};
use crate::config::{AnalysisConfig, ServerCommand};

/// Picks the lookup session used to resolve one language's symbols.
pub trait LookupFactory {
    fn create(&self, language: &Language, root: &Path, files: &FileSet)
    -> Box<dyn DefinitionLookup>;
}

/// Resolution disabled: every symbol ends up without candidates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLookupFactory;

impl LookupFactory for NullLookupFactory {
    fn create(&self, _: &Language, _: &Path, _: &FileSet) -> Box<dyn DefinitionLookup> {
        Box::new(NullLookup)
    }
}

/// Whether the set holds project (non-dependency) sources of `language`.
pub fn has_sources(language: &Language, files: &FileSet) -> bool {
    files
        .files()
        .any(|(_, f)| &f.language == language && !f.dependency)
}

/// Spawns the configured language server per language. Anything that
/// prevents a server from running degrades to [`NullLookup`].
#[derive(Debug, Clone)]
pub struct LspLookupFactory {
    servers: BTreeMap<String, ServerCommand>,
    timeout: Duration,
}

impl LspLookupFactory {
    pub fn new(servers: BTreeMap<String, ServerCommand>, timeout: Duration) -> Self {
        Self { servers, timeout }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.language_servers.clone(), config.lookup_timeout())
    }
}

impl LookupFactory for LspLookupFactory {
    fn create(
        &self,
        language: &Language,
        root: &Path,
        files: &FileSet,
    ) -> Box<dyn DefinitionLookup> {
        if !has_sources(language, files) {
            return Box::new(NullLookup);
        }
        let Some(server) = self.servers.get(language.as_str()) else {
            warn!("No language server configured for {}", language);
            return Box::new(NullLookup);
        };
        match LspLookup::spawn(language.clone(), server, root, self.timeout) {
            Ok(lookup) => Box::new(lookup),
            Err(e) => {
                warn!("{} symbols will stay unresolved: {}", language, e);
                Box::new(NullLookup)
            }
        }
    }
}
