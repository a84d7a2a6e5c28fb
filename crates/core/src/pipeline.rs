//! Two-pass analysis driver.
//!
//! The first pass parses every supported file, extracts entities and their
//! symbols, registers both with the graph sink and links them with
//! `DEFINES`. The second pass resolves each symbol through a per-language
//! definition lookup and emits the typed relationships.

use codegraph_api::{EntityRecord, FileRecord, GraphId, GraphSink, Language, Relation, SymbolKind};
use codegraph_plugin::{
    EntityId, FileId, FileSet, LanguageAnalyzer, Locate, NodeKey, ParsedFile, Phase,
    Resolution, extract_file,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::error::{CodegraphError, Result};
use crate::lookup::factory::has_sources;
use crate::lookup::{DefinitionLookup, LookupFactory, NullLookup};
use crate::registry::AnalyzerRegistry;
use crate::resolver::DefinitionResolver;
use crate::scanner;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FirstPassReport {
    pub files: usize,
    pub entities: usize,
    /// Files that could not be read as UTF-8 text.
    pub skipped: usize,
    /// Registered files that came from dependency bootstrap.
    pub dependencies: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SecondPassReport {
    pub symbols: usize,
    pub resolved_symbols: usize,
    pub unresolved_symbols: usize,
    pub lookup_failures: usize,
    pub edges: usize,
}

impl SecondPassReport {
    fn record(&mut self, resolution: &Resolution) {
        self.symbols += 1;
        match resolution {
            Resolution::Targets(targets) if !targets.is_empty() => self.resolved_symbols += 1,
            Resolution::Targets(_) | Resolution::NoCandidates => self.unresolved_symbols += 1,
            Resolution::Unavailable(_) => self.lookup_failures += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub first: FirstPassReport,
    pub second: SecondPassReport,
}

/// Targets found for one file, applied once the file set is writable again.
#[derive(Default)]
struct FileResolution {
    symbols: Vec<(EntityId, SymbolKind, usize, Vec<EntityId>)>,
    imports: Vec<(usize, Vec<EntityId>)>,
}

/// Whether `path` is third-party source, judged on its part below `root`.
fn is_dependency(registry: &AnalyzerRegistry, root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    registry
        .for_path(path)
        .is_some_and(|analyzer| analyzer.is_dependency_source(relative))
}

fn parse_one(
    registry: &AnalyzerRegistry,
    path: &Path,
    dependency: bool,
) -> Result<Option<ParsedFile>> {
    let Some(analyzer) = registry.for_path(path) else {
        return Ok(None);
    };
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            info!("Skipping {}: {}", path.display(), e);
            return Ok(None);
        }
    };
    let mut parsed = extract_file(analyzer.as_ref(), path, source)?;
    parsed.dependency = dependency;
    Ok(Some(parsed))
}

/// Parses `paths` in order. Extraction errors are fatal for project sources;
/// for dependency sources, bootstrapped or found under `root`, they only drop
/// the file.
fn parse_all(
    registry: &AnalyzerRegistry,
    root: &Path,
    paths: &[PathBuf],
    bootstrapped: bool,
    parallel: bool,
) -> Result<(Vec<ParsedFile>, usize)> {
    let sources: Vec<(&PathBuf, bool)> = paths
        .iter()
        .map(|path| (path, bootstrapped || is_dependency(registry, root, path)))
        .collect();
    let parse = |&(path, dependency): &(&PathBuf, bool)| parse_one(registry, path, dependency);
    let results: Vec<Result<Option<ParsedFile>>> = if parallel {
        sources.par_iter().map(parse).collect()
    } else {
        sources.iter().map(parse).collect()
    };

    let mut parsed = Vec::with_capacity(results.len());
    let mut skipped = 0;
    for ((path, dependency), result) in sources.into_iter().zip(results) {
        match result {
            Ok(Some(file)) => parsed.push(file),
            Ok(None) => skipped += 1,
            Err(e) if dependency => {
                warn!("Dropping dependency source {}: {}", path.display(), e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok((parsed, skipped))
}

fn resolve_file(
    files: &FileSet,
    analyzer: &dyn LanguageAnalyzer,
    locator: &mut dyn Locate,
    id: FileId,
    report: &mut SecondPassReport,
) -> Result<FileResolution> {
    let file = files.file(id);
    let mut resolution = FileResolution::default();
    let vanished = |key: NodeKey| {
        CodegraphError::Internal(format!("{:?} not found in {}", key, file.path.display()))
    };

    for entity_id in files.walk(id) {
        let entity = files.entity(entity_id);
        for (&kind, symbols) in &entity.symbols {
            for (index, symbol) in symbols.iter().enumerate() {
                let node = file.node(symbol.key).ok_or_else(|| vanished(symbol.key))?;
                let outcome = analyzer.resolve_symbol(files, locator, &file.path, kind, node)?;
                report.record(&outcome);
                resolution
                    .symbols
                    .push((entity_id, kind, index, outcome.targets().to_vec()));
            }
        }
    }

    for (index, symbol) in file.imports.iter().enumerate() {
        let node = file.node(symbol.key).ok_or_else(|| vanished(symbol.key))?;
        let outcome =
            analyzer.resolve_symbol(files, locator, &file.path, SymbolKind::Import, node)?;
        report.record(&outcome);
        resolution.imports.push((index, outcome.targets().to_vec()));
    }
    Ok(resolution)
}

/// Owns the file set of one analysis run.
pub struct AnalysisPipeline {
    registry: AnalyzerRegistry,
    config: AnalysisConfig,
    root: PathBuf,
    files: FileSet,
}

impl AnalysisPipeline {
    pub fn new(registry: AnalyzerRegistry, config: AnalysisConfig) -> Self {
        Self {
            registry,
            config,
            root: PathBuf::new(),
            files: FileSet::new(),
        }
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    /// Runs both passes over `root`.
    pub fn analyze(
        &mut self,
        root: &Path,
        ignore: &[String],
        factory: &dyn LookupFactory,
        sink: &mut dyn GraphSink,
    ) -> Result<AnalysisReport> {
        let first = self.first_pass(root, ignore, sink)?;
        let second = self.second_pass(factory, sink)?;
        Ok(AnalysisReport { first, second })
    }

    /// Starts a fresh file set for `root` and fills it.
    pub fn first_pass(
        &mut self,
        root: &Path,
        ignore: &[String],
        sink: &mut dyn GraphSink,
    ) -> Result<FirstPassReport> {
        self.root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        self.files = FileSet::new();

        let mut patterns = self.config.ignore.clone();
        patterns.extend(ignore.iter().cloned());
        let paths = scanner::collect_sources(&self.root, &self.registry, &patterns);
        info!(
            "First pass over {} source files under {}",
            paths.len(),
            self.root.display()
        );

        let (parsed, skipped) = parse_all(
            &self.registry,
            &self.root,
            &paths,
            false,
            self.config.parallel,
        )?;
        let mut report = FirstPassReport {
            skipped,
            ..Default::default()
        };
        for file in parsed {
            self.register(file, sink, &mut report)?;
        }

        if self.config.fetch_dependencies {
            self.add_dependencies(sink, &mut report)?;
        }

        info!(
            "First pass done: {} files, {} entities, {} skipped",
            report.files, report.entities, report.skipped
        );
        Ok(report)
    }

    fn add_dependencies(
        &mut self,
        sink: &mut dyn GraphSink,
        report: &mut FirstPassReport,
    ) -> Result<()> {
        let analyzers: Vec<Arc<dyn LanguageAnalyzer>> = self.registry.analyzers().cloned().collect();
        for analyzer in analyzers {
            if !has_sources(&analyzer.language(), &self.files) {
                continue;
            }
            let extra = match analyzer.fetch_dependencies(&self.root, &self.files) {
                Ok(extra) => extra,
                Err(e) => {
                    warn!("{} dependency bootstrap failed: {}", analyzer.language(), e);
                    continue;
                }
            };
            let (parsed, skipped) =
                parse_all(&self.registry, &self.root, &extra, true, self.config.parallel)?;
            report.skipped += skipped;
            for file in parsed {
                self.register(file, sink, report)?;
            }
        }
        Ok(())
    }

    /// Inserts a parsed file and writes it, its entities and the `DEFINES`
    /// edges to the sink. Parents are registered before their children.
    fn register(
        &mut self,
        parsed: ParsedFile,
        sink: &mut dyn GraphSink,
        report: &mut FirstPassReport,
    ) -> Result<()> {
        let (id, inserted) = self.files.insert(parsed);
        if !inserted {
            debug!("{} is already registered", self.files.file(id).path.display());
            return Ok(());
        }

        let path = self.files.file(id).path.clone();
        let file_graph_id = sink.add_file(&FileRecord::from_path(&path))?;
        self.files.file_mut(id).graph_id = Some(file_graph_id);

        for entity_id in self.files.walk(id) {
            let entity = self.files.entity(entity_id);
            let owner = match entity.parent {
                Some(parent) => self.graph_id(parent)?,
                None => file_graph_id,
            };
            let record = EntityRecord {
                kind: entity.kind,
                name: entity.name.clone(),
                doc: entity.doc.clone(),
                path: path.clone(),
                start_line: entity.range.start_line,
                end_line: entity.range.end_line,
            };
            let graph_id = sink.add_entity(&record)?;
            sink.connect_entities(Relation::Defines, owner, graph_id)?;
            self.files.entity_mut(entity_id).graph_id = Some(graph_id);
            report.entities += 1;
        }

        report.files += 1;
        if self.files.file(id).dependency {
            report.dependencies += 1;
        }
        debug!("Registered {}", path.display());
        Ok(())
    }

    fn graph_id(&self, id: EntityId) -> Result<GraphId> {
        self.files.entity(id).graph_id.ok_or_else(|| {
            CodegraphError::Internal(format!("entity {} was never registered", id))
        })
    }

    /// Resolves every symbol of the project sources and emits the typed
    /// relationships. Dependency files are only resolution targets.
    pub fn second_pass(
        &mut self,
        factory: &dyn LookupFactory,
        sink: &mut dyn GraphSink,
    ) -> Result<SecondPassReport> {
        let mut report = SecondPassReport::default();
        let languages: BTreeSet<Language> = self
            .files
            .files()
            .filter(|(_, f)| !f.dependency)
            .map(|(_, f)| f.language.clone())
            .collect();

        for language in languages {
            let analyzer = self.registry.for_language(&language).cloned().ok_or_else(|| {
                CodegraphError::Internal(format!("no analyzer registered for {}", language))
            })?;

            let mut lookup = factory.create(&language, &self.root, &self.files);
            if let Err(e) = lookup.start(&self.root, &self.files) {
                warn!("{} lookup failed to start, continuing without it: {}", language, e);
                lookup.shutdown();
                lookup = Box::new(NullLookup);
            }
            let outcome = self.resolve_language(analyzer.as_ref(), lookup.as_mut(), &mut report);
            lookup.shutdown();
            outcome?;
        }

        report.edges = self.emit(sink)?;
        info!(
            "Second pass done: {} symbols, {} resolved, {} unresolved, {} lookup failures, {} edges",
            report.symbols,
            report.resolved_symbols,
            report.unresolved_symbols,
            report.lookup_failures,
            report.edges
        );
        Ok(report)
    }

    fn resolve_language(
        &mut self,
        analyzer: &dyn LanguageAnalyzer,
        lookup: &mut dyn DefinitionLookup,
        report: &mut SecondPassReport,
    ) -> Result<()> {
        let language = analyzer.language();
        let file_ids: Vec<FileId> = self
            .files
            .files()
            .filter(|(_, f)| f.language == language && !f.dependency)
            .map(|(id, _)| id)
            .collect();

        let mut resolver = DefinitionResolver::new(lookup);
        for id in file_ids {
            let resolution = resolve_file(&self.files, analyzer, &mut resolver, id, report)?;
            self.apply(id, resolution);
        }
        debug!("{} resolver: {:?}", language, resolver.stats());
        Ok(())
    }

    /// Merges targets into the symbols. Sets make repeated runs converge.
    fn apply(&mut self, id: FileId, resolution: FileResolution) {
        for (entity_id, kind, index, targets) in resolution.symbols {
            if let Some(symbol) = self
                .files
                .entity_mut(entity_id)
                .symbols
                .get_mut(&kind)
                .and_then(|symbols| symbols.get_mut(index))
            {
                symbol.resolved.extend(targets);
            }
        }
        let file = self.files.file_mut(id);
        for (index, targets) in resolution.imports {
            if let Some(symbol) = file.imports.get_mut(index) {
                symbol.resolved.extend(targets);
            }
        }
        for entity_id in self.files.walk(id) {
            self.files.entity_mut(entity_id).phase = Phase::Resolved;
        }
    }

    /// Writes one edge per distinct (relation, target) of each entity, plus
    /// the file-level imports.
    fn emit(&self, sink: &mut dyn GraphSink) -> Result<usize> {
        let mut emitted = 0;
        for (id, file) in self.files.files() {
            if file.dependency {
                continue;
            }
            for entity_id in self.files.walk(id) {
                let entity = self.files.entity(entity_id);
                let from = self.graph_id(entity_id)?;
                let pairs: BTreeSet<(Relation, EntityId)> = entity
                    .symbols
                    .iter()
                    .flat_map(|(kind, symbols)| {
                        symbols
                            .iter()
                            .flat_map(move |s| s.resolved.iter().map(move |&t| (kind.relation(), t)))
                    })
                    .collect();
                for (relation, target) in pairs {
                    sink.connect_entities(relation, from, self.graph_id(target)?)?;
                    emitted += 1;
                }
            }

            let imports = file.resolved_imports();
            if imports.is_empty() {
                continue;
            }
            let from = file.graph_id.ok_or_else(|| {
                CodegraphError::Internal(format!("{} was never registered", file.path.display()))
            })?;
            for target in imports {
                sink.connect_entities(Relation::Imports, from, self.graph_id(target)?)?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }
}
