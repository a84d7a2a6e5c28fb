//! Deterministic lookups for tests. No language server is involved.

use codegraph_api::Language;
use codegraph_plugin::FileSet;
use codegraph_plugin::utils::node_text;
use lsp_types::{Position, Range};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

use crate::lookup::position::{byte_at, position_at, word_at};
use crate::lookup::{DefinitionLocation, DefinitionLookup, LookupError, LookupFactory};

fn name_leaf<'t>(node: Node<'t>, name: &str, source: &str) -> Option<Node<'t>> {
    if node.child_count() == 0 {
        return (node_text(&node, source) == name).then_some(node);
    }
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find_map(|child| name_leaf(child, name, source))
}

/// Answers a definition request with every declaration whose name equals
/// the identifier under the cursor. Scope and overloads are ignored.
#[derive(Debug, Default)]
pub struct DeclarationIndexLookup {
    sources: HashMap<PathBuf, String>,
    declarations: HashMap<String, Vec<DefinitionLocation>>,
}

impl DeclarationIndexLookup {
    pub fn new(language: &Language, files: &FileSet) -> Self {
        let mut lookup = Self::default();
        for (id, file) in files.files() {
            if &file.language != language {
                continue;
            }
            for entity_id in files.walk(id) {
                let entity = files.entity(entity_id);
                let Some(node) = file.node(entity.key) else {
                    continue;
                };
                let site = name_leaf(node, &entity.name, &file.source).unwrap_or(node);
                lookup
                    .declarations
                    .entry(entity.name.clone())
                    .or_default()
                    .push(DefinitionLocation {
                        path: file.path.clone(),
                        range: Range::new(
                            position_at(&file.source, site.start_byte()),
                            position_at(&file.source, site.end_byte()),
                        ),
                    });
            }
            lookup.sources.insert(file.path.clone(), file.source.clone());
        }
        lookup
    }
}

impl DefinitionLookup for DeclarationIndexLookup {
    fn request_definition(
        &mut self,
        path: &Path,
        position: Position,
    ) -> Result<Vec<DefinitionLocation>, LookupError> {
        let source = self
            .sources
            .get(path)
            .ok_or_else(|| LookupError::Protocol(format!("unknown document {}", path.display())))?;
        let found = byte_at(source, position)
            .and_then(|byte| word_at(source, byte))
            .and_then(|word| self.declarations.get(word))
            .cloned()
            .unwrap_or_default();
        Ok(found)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeclarationIndexFactory;

impl LookupFactory for DeclarationIndexFactory {
    fn create(&self, language: &Language, _: &Path, files: &FileSet) -> Box<dyn DefinitionLookup> {
        Box::new(DeclarationIndexLookup::new(language, files))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    Answer(Vec<DefinitionLocation>),
    Fail(String),
}

/// Plays back canned answers in order; the last one repeats forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLookup {
    script: Vec<Script>,
    next: usize,
    start_error: Option<String>,
    pub requests: Vec<(PathBuf, Position)>,
}

impl ScriptedLookup {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }
}

impl DefinitionLookup for ScriptedLookup {
    fn start(&mut self, _root: &Path, _files: &FileSet) -> Result<(), LookupError> {
        match &self.start_error {
            Some(reason) => Err(LookupError::Spawn {
                command: "scripted".to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn request_definition(
        &mut self,
        path: &Path,
        position: Position,
    ) -> Result<Vec<DefinitionLocation>, LookupError> {
        self.requests.push((path.to_path_buf(), position));
        let Some(step) = self.script.get(self.next).or_else(|| self.script.last()) else {
            return Ok(Vec::new());
        };
        self.next += 1;
        match step {
            Script::Answer(locations) => Ok(locations.clone()),
            Script::Fail(reason) => Err(LookupError::Protocol(reason.clone())),
        }
    }
}

/// Hands every language the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    script: Vec<Script>,
    start_error: Option<String>,
}

impl ScriptedFactory {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script,
            start_error: None,
        }
    }

    /// Makes every session fail its warm-up.
    pub fn failing_start(mut self, reason: &str) -> Self {
        self.start_error = Some(reason.to_string());
        self
    }
}

impl LookupFactory for ScriptedFactory {
    fn create(&self, _: &Language, _: &Path, _: &FileSet) -> Box<dyn DefinitionLookup> {
        Box::new(ScriptedLookup {
            start_error: self.start_error.clone(),
            ..ScriptedLookup::new(self.script.clone())
        })
    }
}
