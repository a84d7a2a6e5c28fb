use codegraph_api::{EntityKind, GraphId, Language, Range, SymbolKind};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Tree};

use crate::extract::ParsedFile;

/// Stable identity of a syntax node: its byte span plus grammar kind.
///
/// Unlike `Node::id`, a key stays meaningful after the node borrow ends and
/// can be mapped back onto the owning tree with [`NodeKey::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub start_byte: usize,
    pub end_byte: usize,
    pub kind_id: u16,
}

impl NodeKey {
    pub fn of(node: &Node<'_>) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            kind_id: node.kind_id(),
        }
    }

    /// Finds the node this key was taken from.
    ///
    /// The smallest node spanning the range is located first, then ancestors
    /// with the identical span are climbed until the kind matches.
    pub fn find<'t>(&self, tree: &'t Tree) -> Option<Node<'t>> {
        let mut current = tree
            .root_node()
            .descendant_for_byte_range(self.start_byte, self.end_byte)?;
        loop {
            if current.start_byte() != self.start_byte || current.end_byte() != self.end_byte {
                return None;
            }
            if current.kind_id() == self.kind_id {
                return Some(current);
            }
            current = current.parent()?;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Per-entity lifecycle. Entities only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Extracted,
    Resolved,
}

/// One syntactic reference, plus the entities it was resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub key: NodeKey,
    pub resolved: BTreeSet<EntityId>,
}

impl Symbol {
    pub fn new(node: &Node<'_>) -> Self {
        Self {
            key: NodeKey::of(node),
            resolved: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub key: NodeKey,
    pub kind: EntityKind,
    pub name: String,
    pub doc: Option<String>,
    pub range: Range,
    pub symbols: BTreeMap<SymbolKind, Vec<Symbol>>,
    pub children: IndexMap<NodeKey, EntityId>,
    pub parent: Option<EntityId>,
    pub file: FileId,
    pub graph_id: Option<GraphId>,
    pub phase: Phase,
}

impl Entity {
    pub fn new(
        key: NodeKey,
        kind: EntityKind,
        name: String,
        doc: Option<String>,
        range: Range,
    ) -> Self {
        Self {
            key,
            kind,
            name,
            doc,
            range,
            symbols: BTreeMap::new(),
            children: IndexMap::new(),
            parent: None,
            file: FileId(0),
            graph_id: None,
            phase: Phase::Extracted,
        }
    }

    /// Records a reference under `kind`. The same node is recorded once.
    pub fn add_symbol(&mut self, kind: SymbolKind, node: &Node<'_>) {
        let symbols = self.symbols.entry(kind).or_default();
        let key = NodeKey::of(node);
        if !symbols.iter().any(|s| s.key == key) {
            symbols.push(Symbol::new(node));
        }
    }

    pub fn symbols_of(&self, kind: SymbolKind) -> &[Symbol] {
        self.symbols.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Union of resolved targets over every symbol of `kind`.
    pub fn resolved(&self, kind: SymbolKind) -> BTreeSet<EntityId> {
        self.symbols_of(kind)
            .iter()
            .flat_map(|s| s.resolved.iter().copied())
            .collect()
    }
}

/// One parsed source unit. Owns its syntax tree for the whole run.
#[derive(Debug)]
pub struct File {
    pub path: PathBuf,
    pub language: Language,
    pub source: String,
    pub tree: Tree,
    /// Top-level entities in document order.
    pub entities: IndexMap<NodeKey, EntityId>,
    /// Every entity of the file, nested ones included.
    pub index: HashMap<NodeKey, EntityId>,
    pub imports: Vec<Symbol>,
    pub graph_id: Option<GraphId>,
    pub dependency: bool,
}

impl File {
    pub fn node(&self, key: NodeKey) -> Option<Node<'_>> {
        key.find(&self.tree)
    }

    pub fn entity_at(&self, key: NodeKey) -> Option<EntityId> {
        self.index.get(&key).copied()
    }

    pub fn resolved_imports(&self) -> BTreeSet<EntityId> {
        self.imports
            .iter()
            .flat_map(|s| s.resolved.iter().copied())
            .collect()
    }
}

/// Arena of every file and entity of one analysis run.
#[derive(Debug, Default)]
pub struct FileSet {
    files: Vec<File>,
    entities: Vec<Entity>,
    by_path: HashMap<PathBuf, FileId>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a parsed file into the set, rebasing its local entity ids.
    ///
    /// Returns the id of the file and whether it was newly inserted. A path
    /// that is already present is left untouched.
    pub fn insert(&mut self, parsed: ParsedFile) -> (FileId, bool) {
        if let Some(existing) = self.by_path.get(&parsed.path) {
            return (*existing, false);
        }

        let file_id = FileId(self.files.len());
        let offset = self.entities.len();
        let rebase = |id: EntityId| EntityId(id.0 + offset);

        let mut index = HashMap::with_capacity(parsed.entities.len());
        for (local, mut entity) in parsed.entities.into_iter().enumerate() {
            entity.file = file_id;
            entity.parent = entity.parent.map(rebase);
            for child in entity.children.values_mut() {
                *child = rebase(*child);
            }
            index.insert(entity.key, EntityId(local + offset));
            self.entities.push(entity);
        }

        let entities = parsed
            .roots
            .into_iter()
            .map(|local| {
                let id = EntityId(local + offset);
                (self.entities[id.0].key, id)
            })
            .collect();

        self.by_path.insert(parsed.path.clone(), file_id);
        self.files.push(File {
            path: parsed.path,
            language: parsed.language,
            source: parsed.source,
            tree: parsed.tree,
            entities,
            index,
            imports: parsed.imports,
            graph_id: None,
            dependency: parsed.dependency,
        });
        (file_id, true)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.0]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut File {
        &mut self.files[id.0]
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn by_path(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &File)> {
        self.files.iter().enumerate().map(|(i, f)| (FileId(i), f))
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i), e))
    }

    /// Entities of a file in pre-order: each parent before its children.
    pub fn walk(&self, id: FileId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack: Vec<EntityId> = self.file(id).entities.values().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.entity(current).children.values().rev().copied());
        }
        out
    }

    /// Owning file of an entity.
    pub fn file_of(&self, id: EntityId) -> &File {
        self.file(self.entity(id).file)
    }
}
