use codegraph_api::{EntityKind, Language, SymbolKind};
use codegraph_plugin::utils::{
    self, clean_comment, has_child, last_leaf_of, node_text, owned_descendants,
};
use codegraph_plugin::{Entity, LanguageAnalyzer, ResolutionPolicy, Result};
use std::path::Path;
use tree_sitter::Node;

const ENTITY_TYPES: &[&str] = &[
    "class_declaration",
    "object_declaration",
    "function_declaration",
];

const TYPE_KINDS: &[&str] = &["user_type", "nullable_type"];
const NAME_KINDS: &[&str] = &["identifier", "type_identifier", "simple_identifier"];
const BODY_KINDS: &[&str] = &["class_body", "enum_class_body"];

/// Gradle build output and caches.
const DEPENDENCY_SEGMENTS: &[&str] = &["build", ".gradle"];

pub struct KotlinAnalyzer {
    language: tree_sitter::Language,
}

impl Default for KotlinAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// First descendant of `kind` in document order, `node` included.
fn first_descendant<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    if node.kind() == kind {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    children.into_iter().find_map(|c| first_descendant(c, kind))
}

/// Name segment of a type reference: `C` for `a.b.C<T>?`.
fn type_anchor(node: Node<'_>) -> Option<Node<'_>> {
    let user_type = first_descendant(node, "user_type")?;
    last_leaf_of(user_type, NAME_KINDS, &["type_arguments"])
}

/// Supertype entries of a class or object header, outside its body.
fn delegation_specifiers(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        let mut cursor = current.walk();
        let children: Vec<Node<'_>> = current.named_children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            if BODY_KINDS.contains(&child.kind()) || ENTITY_TYPES.contains(&child.kind()) {
                continue;
            }
            if child.kind() == "delegation_specifier" {
                out.push(child);
            } else {
                stack.push(child);
            }
        }
    }
    out.sort_by_key(|n| n.start_byte());
    out
}

impl KotlinAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_kotlin_ng::LANGUAGE.into(),
        }
    }

    fn is_interface(node: &Node<'_>) -> bool {
        node.kind() == "class_declaration" && has_child(*node, "interface")
    }

    fn add_supertypes(&self, entity: &mut Entity, node: Node<'_>) {
        let interface = Self::is_interface(&node);
        for specifier in delegation_specifiers(node) {
            if type_anchor(specifier).is_none() {
                continue;
            }
            // Only a superclass is invoked with a constructor call.
            let kind = if interface {
                SymbolKind::ExtendInterface
            } else if first_descendant(specifier, "constructor_invocation").is_some() {
                SymbolKind::BaseClass
            } else {
                SymbolKind::ImplementInterface
            };
            entity.add_symbol(kind, &specifier);
        }
    }

    fn add_function_symbols(&self, entity: &mut Entity, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();

        let mut after_params = false;
        for child in children {
            match child.kind() {
                "function_value_parameters" => {
                    after_params = true;
                    let mut cursor = child.walk();
                    for param in child.named_children(&mut cursor) {
                        if param.kind() == "parameter" && type_anchor(param).is_some() {
                            entity.add_symbol(SymbolKind::Parameters, &param);
                        }
                    }
                }
                kind if after_params && TYPE_KINDS.contains(&kind) => {
                    if type_anchor(child).is_some() {
                        entity.add_symbol(SymbolKind::ReturnType, &child);
                    }
                    after_params = false;
                }
                "function_body" => break,
                _ => {}
            }
        }

        for owned in owned_descendants(node, ENTITY_TYPES) {
            if owned.kind() != "call_expression" {
                continue;
            }
            if let Some(callee) = owned.named_child(0) {
                if self.lookup_anchor(SymbolKind::Call, callee).is_some() {
                    entity.add_symbol(SymbolKind::Call, &callee);
                }
            }
        }
    }
}

impl LanguageAnalyzer for KotlinAnalyzer {
    fn language(&self) -> Language {
        Language::KOTLIN
    }

    fn extensions(&self) -> &[&'static str] {
        &["kt", "kts"]
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn entity_types(&self) -> &[&'static str] {
        ENTITY_TYPES
    }

    fn entity_label(&self, node: &Node<'_>) -> Result<EntityKind> {
        match node.kind() {
            "class_declaration" if Self::is_interface(node) => Ok(EntityKind::Interface),
            "class_declaration" if has_child(*node, "enum_class_body") => Ok(EntityKind::Enum),
            "class_declaration" | "object_declaration" => Ok(EntityKind::Class),
            "function_declaration" => {
                let member = utils::owner_of(*node, ENTITY_TYPES)
                    .is_some_and(|owner| owner.kind() != "function_declaration");
                Ok(if member {
                    EntityKind::Method
                } else {
                    EntityKind::Function
                })
            }
            _ => Err(self.unrecognized(node)),
        }
    }

    fn entity_name(&self, node: &Node<'_>, source: &str) -> Result<String> {
        if !self.is_entity_node(node) {
            return Err(self.unrecognized(node));
        }
        let name = node.child_by_field_name("name").or_else(|| {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .find(|c| NAME_KINDS.contains(&c.kind()))
        });
        name.map(|n| node_text(&n, source).to_string())
            .ok_or_else(|| self.missing_name(node))
    }

    fn entity_doc_comment(&self, node: &Node<'_>, source: &str) -> Result<Option<String>> {
        if !self.is_entity_node(node) {
            return Err(self.unrecognized(node));
        }
        // KDoc, possibly separated from the declaration by line comments.
        Ok(utils::preceding_comments(
            *node,
            &["multiline_comment", "block_comment", "line_comment"],
        )
        .into_iter()
        .map(|c| node_text(&c, source))
        .take_while(|text| text.starts_with("//") || text.starts_with("/**"))
        .find(|text| text.starts_with("/**"))
        .map(clean_comment))
    }

    fn add_symbols(&self, entity: &mut Entity, node: Node<'_>, _source: &str) -> Result<()> {
        match node.kind() {
            "function_declaration" => self.add_function_symbols(entity, node),
            _ => self.add_supertypes(entity, node),
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
            SymbolKind::Call => last_leaf_of(
                node,
                NAME_KINDS,
                &["value_arguments", "call_suffix", "type_arguments", "annotated_lambda"],
            ),
            _ => type_anchor(node),
        }
    }

    /// Only directories above `src` count; below it they are packages.
    fn is_dependency_source(&self, relative: &Path) -> bool {
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .take_while(|part| *part != "src")
            .any(|part| DEPENDENCY_SEGMENTS.contains(&part.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_plugin::{ParsedFile, extract_source};

    const SOURCE: &str = r#"// Test Kotlin file for analyzer
fun log(msg: String) {
    println(msg)
}

interface Task {
    fun execute()
}

class WorkerTask(val name: String, var duration: Int) : Task {
    override fun execute() {
        log("Executing task: $name")
    }

    fun abort(delay: Float): WorkerTask {
        log("Aborting task")
        return this
    }
}

object TaskManager {
    fun createTask(name: String): WorkerTask {
        return WorkerTask(name, 0)
    }
}

fun main() {
    val task = TaskManager.createTask("Test")
    task.execute()
}
"#;

    fn parsed() -> ParsedFile {
        extract_source(&KotlinAnalyzer::new(), SOURCE).expect("extract")
    }

    fn find<'a>(parsed: &'a ParsedFile, name: &str) -> &'a Entity {
        parsed
            .entities
            .iter()
            .find(|e| e.name == name)
            .unwrap_or_else(|| panic!("missing {}", name))
    }

    #[test]
    fn test_entities_and_labels() {
        let parsed = parsed();
        let entities: Vec<(EntityKind, &str)> = parsed
            .entities
            .iter()
            .map(|e| (e.kind, e.name.as_str()))
            .collect();
        assert_eq!(
            entities,
            vec![
                (EntityKind::Function, "log"),
                (EntityKind::Interface, "Task"),
                (EntityKind::Method, "execute"),
                (EntityKind::Class, "WorkerTask"),
                (EntityKind::Method, "execute"),
                (EntityKind::Method, "abort"),
                (EntityKind::Class, "TaskManager"),
                (EntityKind::Method, "createTask"),
                (EntityKind::Function, "main"),
            ]
        );
    }

    #[test]
    fn test_supertype_without_constructor_call_is_an_interface() {
        let parsed = parsed();
        let worker = find(&parsed, "WorkerTask");
        assert_eq!(worker.symbols_of(SymbolKind::ImplementInterface).len(), 1);
        assert!(worker.symbols_of(SymbolKind::BaseClass).is_empty());

        let source = "open class Base\nclass Child : Base(), Runnable\ninterface A : B\n";
        let parsed = extract_source(&KotlinAnalyzer::new(), source).expect("extract");
        let child = find(&parsed, "Child");
        assert_eq!(child.symbols_of(SymbolKind::BaseClass).len(), 1);
        assert_eq!(child.symbols_of(SymbolKind::ImplementInterface).len(), 1);
        assert_eq!(find(&parsed, "A").symbols_of(SymbolKind::ExtendInterface).len(), 1);
    }

    #[test]
    fn test_function_symbols() {
        let parsed = parsed();
        let abort = find(&parsed, "abort");
        assert_eq!(abort.symbols_of(SymbolKind::Parameters).len(), 1);
        assert_eq!(abort.symbols_of(SymbolKind::ReturnType).len(), 1);
        assert_eq!(abort.symbols_of(SymbolKind::Call).len(), 1);

        let main = find(&parsed, "main");
        assert_eq!(main.symbols_of(SymbolKind::Call).len(), 2);
        assert!(main.symbols_of(SymbolKind::ReturnType).is_empty());
    }

    #[test]
    fn test_kdoc() {
        let source = "/**\n * Schedules work.\n */\nclass Scheduler\n\n// plain\nclass Other\n";
        let parsed = extract_source(&KotlinAnalyzer::new(), source).expect("extract");
        assert_eq!(find(&parsed, "Scheduler").doc.as_deref(), Some("Schedules work."));
        assert!(find(&parsed, "Other").doc.is_none());
    }

    #[test]
    fn test_dependency_sources_sit_above_src() {
        let analyzer = KotlinAnalyzer::new();
        assert!(analyzer.is_dependency_source(Path::new("build/generated/Api.kt")));
        assert!(analyzer.is_dependency_source(Path::new("app/.gradle/caches/Lib.kt")));
        assert!(!analyzer.is_dependency_source(Path::new("src/main/kotlin/build/Steps.kt")));
        assert!(!analyzer.is_dependency_source(Path::new("src/cache/Store.kt")));
        assert!(!analyzer.is_dependency_source(Path::new("Circle.kt")));
    }
}
