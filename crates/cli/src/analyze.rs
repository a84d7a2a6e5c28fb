use codegraph_core::lookup::{LookupFactory, NullLookupFactory};
use codegraph_core::{AnalysisConfig, AnalysisPipeline, CodegraphError, MemoryGraph};
use std::path::PathBuf;
use tracing::info;

pub struct Options {
    pub path: PathBuf,
    pub ignore: Vec<String>,
    pub output: Option<PathBuf>,
    pub no_lookup: bool,
    pub dependencies: bool,
    pub config: Option<PathBuf>,
}

pub fn run(options: Options) -> Result<(), Box<dyn std::error::Error>> {
    if !options.path.is_dir() {
        return Err(Box::new(CodegraphError::Config(format!(
            "{} is not a directory",
            options.path.display()
        ))));
    }

    let mut config = match &options.config {
        Some(file) => AnalysisConfig::load_from(file)?,
        None => AnalysisConfig::load(&options.path)?,
    };
    config.fetch_dependencies |= options.dependencies;

    let registry = codegraph_runtime::build_default_registry();
    if registry.is_empty() {
        return Err(Box::new(CodegraphError::Config(
            "no language analyzer could be loaded".to_string(),
        )));
    }

    let factory: Box<dyn LookupFactory> = if options.no_lookup {
        Box::new(NullLookupFactory)
    } else {
        Box::new(codegraph_runtime::build_default_lookup_factory(&config))
    };

    info!("Analyzing project at: {}...", options.path.display());
    let mut graph = MemoryGraph::new();
    let mut pipeline = AnalysisPipeline::new(registry, config);
    let report = pipeline.analyze(&options.path, &options.ignore, factory.as_ref(), &mut graph)?;

    let stats = graph.stats();
    info!(
        "Files: {} ({} skipped, {} dependencies), entities: {}",
        report.first.files, report.first.skipped, report.first.dependencies, report.first.entities
    );
    info!(
        "Symbols: {} resolved, {} unresolved, {} lookup failures",
        report.second.resolved_symbols,
        report.second.unresolved_symbols,
        report.second.lookup_failures
    );
    info!("Nodes: {}, edges: {}", stats.node_count, stats.edge_count);

    match &options.output {
        Some(output) => {
            info!("Exporting graph to: {}...", output.display());
            graph.write_json(output)?;
        }
        None => println!("{}", serde_json::to_string_pretty(&graph.snapshot())?),
    }
    Ok(())
}
