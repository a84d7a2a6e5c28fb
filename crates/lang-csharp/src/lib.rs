use codegraph_api::{EntityKind, Language, SymbolKind};
use codegraph_plugin::utils::{self, clean_comment, last_leaf_of, node_text, owned_descendants};
use codegraph_plugin::{AnalyzerError, Entity, FileSet, LanguageAnalyzer, ResolutionPolicy, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;
use tree_sitter::Node;
use walkdir::WalkDir;

const ENTITY_TYPES: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "struct_declaration",
    "record_declaration",
    "method_declaration",
    "constructor_declaration",
];

/// Path segments under which restored or vendored packages live.
const DEPENDENCY_SEGMENTS: &[&str] = &["temp_deps_cs", "obj", ".nuget"];

pub struct CSharpAnalyzer {
    language: tree_sitter::Language,
}

impl Default for CSharpAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CSharpAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_c_sharp::LANGUAGE.into(),
        }
    }

    /// Types listed after `:` in a declaration, in source order.
    fn base_types<'t>(node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        let Some(base_list) = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "base_list")
        else {
            return Vec::new();
        };
        let mut cursor = base_list.walk();
        base_list
            .named_children(&mut cursor)
            .filter(|c| c.kind() != "argument_list")
            .filter_map(|c| match c.kind() {
                "primary_constructor_base_type" => c
                    .child_by_field_name("type")
                    .or_else(|| c.named_child(0)),
                _ => Some(c),
            })
            .collect()
    }

    fn add_base_symbols(&self, entity: &mut Entity, node: Node<'_>) {
        let bases = Self::base_types(node);
        match node.kind() {
            // The grammar cannot tell a superclass from an interface here.
            // The first entry is taken as the base class and the rest as
            // interfaces, so `class A : IFoo` yields a `base_class` symbol.
            "class_declaration" | "record_declaration" => {
                let mut iter = bases.into_iter();
                if let Some(first) = iter.next() {
                    self.push_type(entity, SymbolKind::BaseClass, first);
                }
                for rest in iter {
                    self.push_type(entity, SymbolKind::ImplementInterface, rest);
                }
            }
            "interface_declaration" => {
                for base in bases {
                    self.push_type(entity, SymbolKind::ExtendInterface, base);
                }
            }
            "struct_declaration" | "enum_declaration" => {
                for base in bases {
                    self.push_type(entity, SymbolKind::ImplementInterface, base);
                }
            }
            _ => {}
        }
    }

    fn add_signature_symbols(&self, entity: &mut Entity, node: Node<'_>) {
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                if param.kind() != "parameter" {
                    continue;
                }
                if let Some(ty) = param.child_by_field_name("type") {
                    self.push_type(entity, SymbolKind::Parameters, ty);
                }
            }
        }
        if node.kind() == "method_declaration" {
            let returns = node
                .child_by_field_name("returns")
                .or_else(|| node.child_by_field_name("type"));
            if let Some(ty) = returns {
                self.push_type(entity, SymbolKind::ReturnType, ty);
            }
        }
    }

    fn push_type(&self, entity: &mut Entity, kind: SymbolKind, node: Node<'_>) {
        if self.lookup_anchor(kind, node).is_some() {
            entity.add_symbol(kind, &node);
        }
    }
}

impl LanguageAnalyzer for CSharpAnalyzer {
    fn language(&self) -> Language {
        Language::CSHARP
    }

    fn extensions(&self) -> &[&'static str] {
        &["cs"]
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn entity_types(&self) -> &[&'static str] {
        ENTITY_TYPES
    }

    fn entity_label(&self, node: &Node<'_>) -> Result<EntityKind> {
        match node.kind() {
            "class_declaration" | "record_declaration" => Ok(EntityKind::Class),
            "interface_declaration" => Ok(EntityKind::Interface),
            "enum_declaration" => Ok(EntityKind::Enum),
            "struct_declaration" => Ok(EntityKind::Struct),
            "method_declaration" => Ok(EntityKind::Method),
            "constructor_declaration" => Ok(EntityKind::Constructor),
            _ => Err(self.unrecognized(node)),
        }
    }

    fn entity_name(&self, node: &Node<'_>, source: &str) -> Result<String> {
        if !self.is_entity_node(node) {
            return Err(self.unrecognized(node));
        }
        node.child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string())
            .ok_or_else(|| self.missing_name(node))
    }

    fn entity_doc_comment(&self, node: &Node<'_>, source: &str) -> Result<Option<String>> {
        if !self.is_entity_node(node) {
            return Err(self.unrecognized(node));
        }
        let mut comments: Vec<&str> = utils::preceding_comments(*node, &["comment"])
            .into_iter()
            .map(|c| node_text(&c, source))
            .collect();
        if comments.is_empty() {
            return Ok(None);
        }
        comments.reverse();
        Ok(Some(clean_comment(&comments.join("\n"))))
    }

    fn add_symbols(&self, entity: &mut Entity, node: Node<'_>, _source: &str) -> Result<()> {
        match node.kind() {
            "method_declaration" | "constructor_declaration" => {
                self.add_signature_symbols(entity, node);
                for owned in owned_descendants(node, ENTITY_TYPES) {
                    if owned.kind() != "invocation_expression" {
                        continue;
                    }
                    if let Some(function) = owned.child_by_field_name("function") {
                        if self.lookup_anchor(SymbolKind::Call, function).is_some() {
                            entity.add_symbol(SymbolKind::Call, &function);
                        }
                    }
                }
            }
            _ => self.add_base_symbols(entity, node),
        }
        Ok(())
    }

    fn resolution_policy(&self, kind: SymbolKind) -> Result<ResolutionPolicy> {
        match kind {
            SymbolKind::BaseClass
            | SymbolKind::ImplementInterface
            | SymbolKind::ExtendInterface
            | SymbolKind::Parameters
            | SymbolKind::ReturnType => Ok(ResolutionPolicy::TYPES),
            SymbolKind::Call => Ok(ResolutionPolicy::CALLABLES),
            SymbolKind::Import => Err(self.unsupported(kind)),
        }
    }

    fn lookup_anchor<'t>(&self, kind: SymbolKind, node: Node<'t>) -> Option<Node<'t>> {
        match kind {
            SymbolKind::Call => match node.kind() {
                "identifier" => Some(node),
                "member_access_expression" => node
                    .child_by_field_name("name")
                    .and_then(|n| last_leaf_of(n, &["identifier"], &["type_argument_list"])),
                "generic_name" => last_leaf_of(node, &["identifier"], &["type_argument_list"]),
                _ => None,
            },
            _ => last_leaf_of(node, &["identifier"], &["type_argument_list"]),
        }
    }

    fn is_dependency_source(&self, relative: &Path) -> bool {
        relative.components().any(|c| {
            let part = c.as_os_str().to_string_lossy();
            DEPENDENCY_SEGMENTS.contains(&part.as_ref())
        })
    }

    /// Runs `dotnet restore` when the root holds a project or solution.
    fn fetch_dependencies(&self, root: &Path, _files: &FileSet) -> Result<Vec<PathBuf>> {
        let has_project = WalkDir::new(root)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
            .any(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == "csproj" || ext == "sln")
            });
        if !has_project {
            return Ok(Vec::new());
        }

        info!("Restoring .NET dependencies in {}", root.display());
        let status = Command::new("dotnet")
            .arg("restore")
            .current_dir(root)
            .status()
            .map_err(|e| AnalyzerError::Dependency(format!("dotnet restore: {}", e)))?;
        if !status.success() {
            return Err(AnalyzerError::Dependency(format!(
                "dotnet restore exited with {}",
                status
            )));
        }
        Ok(Vec::new())
    }
}
