//! OpenAPI to Effect CLI
//!
//! Generates `@effect/schema` modules from an OpenAPI 3.1 document and
//! inspects its definition graph.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use openapi_to_effect::graph::search_definitions;
use openapi_to_effect::pointer::reference_to_definition_id;
use openapi_to_effect::{
    dependency_tree, topological_order, Compiler, FsWriter, GenerationSpec, GeneratorConfig, OpenApiDocument,
    ReferenceGraph,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openapi-to-effect")]
#[command(about = "Generate @effect/schema modules from OpenAPI 3.1 schema definitions")]
struct Cli {
    /// Only log errors
    #[arg(long, global = true)]
    silent: bool,

    /// Configuration file, layered over the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate modules into an output directory
    Gen {
        /// Generation spec (JSON or TOML)
        #[arg(short, long)]
        spec: Option<PathBuf>,

        /// OpenAPI 3.1 document (JSON)
        document: PathBuf,

        /// Output directory
        output: PathBuf,
    },

    /// Inspect the definition graph
    Analyze {
        #[command(subcommand)]
        command: AnalyzeCommands,
    },
}

#[derive(Subcommand)]
enum AnalyzeCommands {
    /// Print the deep dependency tree of one definition as JSON
    DependencyTree {
        document: PathBuf,

        /// Definition id or `#/components/schemas/<id>` reference
        root: String,
    },

    /// Print definitions in topological order
    Order { document: PathBuf },

    /// Export the reference graph as GraphViz DOT
    Graph {
        document: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.as_deref().and_then(Path::to_str);
    let config = match GeneratorConfig::load_from(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let filter = if cli.silent {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(e) = run(cli, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: &GeneratorConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Gen { spec, document, output } => {
            let doc = load_document(&document)?;
            let spec = match spec {
                Some(path) => GenerationSpec::from_path(&path)
                    .with_context(|| format!("failed to load generation spec {}", path.display()))?,
                None => GenerationSpec::default(),
            };

            let formatter = config.formatter();
            let mut writer = FsWriter::new(&output);
            let report = Compiler::new()
                .with_bundle_header(config.output.bundle_header)
                .run(&doc, &spec, formatter.as_ref(), &mut writer)?;

            if !cli.silent {
                println!(
                    "Generated {} module(s) in {} ({} failed)",
                    report.written.len(),
                    output.display(),
                    report.failed.len()
                );
                for failure in &report.failed {
                    println!("  {}: {}", failure.module, failure.error);
                }
            }
        }

        Commands::Analyze { command } => match command {
            AnalyzeCommands::DependencyTree { document, root } => {
                let doc = load_document(&document)?;
                let root_id = if root.starts_with('#') { reference_to_definition_id(&root)? } else { root };

                if !doc.definitions.contains_key(&root_id) {
                    let suggestions = search_definitions(&doc.definitions, &root_id, 5);
                    if suggestions.is_empty() {
                        bail!("No definition named '{}'", root_id);
                    }
                    let names: Vec<&str> = suggestions.iter().map(|s| s.as_str()).collect();
                    bail!("No definition named '{}'. Did you mean: {}?", root_id, names.join(", "));
                }

                let tree = dependency_tree(&doc.definitions, &root_id)?;
                println!("{}", serde_json::to_string_pretty(&tree)?);
            }

            AnalyzeCommands::Order { document } => {
                let doc = load_document(&document)?;
                let order = topological_order(&doc.definitions)?;
                for entry in order.entries() {
                    if entry.circular {
                        println!("{} (circular)", entry.id);
                    } else {
                        println!("{}", entry.id);
                    }
                }
            }

            AnalyzeCommands::Graph { document, output } => {
                let doc = load_document(&document)?;
                let graph = ReferenceGraph::from_table(&doc.definitions)?;
                tracing::info!(
                    "Graph loaded: {} definitions, {} edges, {} cycle group(s)",
                    graph.definition_count(),
                    graph.edge_count(),
                    graph.cycle_groups().len()
                );

                let dot = graph.to_dot();
                match output {
                    Some(path) => {
                        std::fs::write(&path, &dot).with_context(|| format!("failed to write {}", path.display()))?;
                        if !cli.silent {
                            println!("Exported DOT to {}", path.display());
                        }
                    }
                    None => print!("{}", dot),
                }
            }
        },
    }

    Ok(())
}

fn load_document(path: &Path) -> anyhow::Result<OpenApiDocument> {
    OpenApiDocument::from_path(path).with_context(|| format!("failed to load document {}", path.display()))
}
