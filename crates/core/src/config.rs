use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{CodegraphError, Result};

pub const CONFIG_FILE: &str = "codegraph.json";

/// How to launch a language server over stdio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ServerCommand {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Substring patterns; a path containing any of them is skipped.
    pub ignore: Vec<String>,
    /// Parse files on the rayon pool during the first pass.
    pub parallel: bool,
    pub fetch_dependencies: bool,
    pub lookup_timeout_ms: u64,
    /// Keyed by analyzer language name.
    pub language_servers: BTreeMap<String, ServerCommand>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let language_servers = [
            ("python", ServerCommand::new("pyright-langserver", &["--stdio"])),
            ("java", ServerCommand::new("jdtls", &[])),
            ("csharp", ServerCommand::new("csharp-ls", &[])),
            ("kotlin", ServerCommand::new("kotlin-language-server", &[])),
            (
                "javascript",
                ServerCommand::new("typescript-language-server", &["--stdio"]),
            ),
        ]
        .into_iter()
        .map(|(name, cmd)| (name.to_string(), cmd))
        .collect();

        Self {
            ignore: Vec::new(),
            parallel: true,
            fetch_dependencies: false,
            lookup_timeout_ms: 30_000,
            language_servers,
        }
    }
}

impl AnalysisConfig {
    /// Reads `<root>/codegraph.json`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| CodegraphError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn server_for(&self, language: &str) -> Option<&ServerCommand> {
        self.language_servers.get(language)
    }
}
