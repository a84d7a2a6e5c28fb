mod analyze;
mod languages;
mod schema;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "codegraph",
    version,
    about = "Builds a code graph of declarations and their relationships",
    long_about = "Codegraph parses a source tree, extracts classes, interfaces, functions and methods, \
                  and resolves their references through language servers into a graph of \
                  DEFINES, EXTENDS, IMPLEMENTS, CALLS, RETURNS, PARAMETERS and IMPORTS edges."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a project directory into a code graph
    #[command(
        long_about = "Runs both analysis passes over the project. Settings are read from \
                            codegraph.json in the project root unless --config is given."
    )]
    Analyze {
        /// Path to the project root directory to analyze
        #[arg(value_name = "PROJECT_PATH")]
        path: PathBuf,

        /// Skip paths containing this pattern (repeatable)
        #[arg(long, value_name = "PATTERN")]
        ignore: Vec<String>,

        /// Write the graph as JSON to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Do not start language servers; only DEFINES edges are produced
        #[arg(long)]
        no_lookup: bool,

        /// Also register third-party sources found in the project
        #[arg(long)]
        dependencies: bool,

        /// Read settings from this file instead of the project's codegraph.json
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// List supported languages and their file extensions
    Languages,
    /// Print the JSON schema of the graph output
    Schema,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = codegraph_runtime::init_logging("cli", true);

    match cli.command {
        Commands::Analyze {
            path,
            ignore,
            output,
            no_lookup,
            dependencies,
            config,
        } => analyze::run(analyze::Options {
            path,
            ignore,
            output,
            no_lookup,
            dependencies,
            config,
        }),
        Commands::Languages => languages::run(),
        Commands::Schema => schema::run(),
    }
}
