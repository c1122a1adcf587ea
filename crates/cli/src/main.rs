use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use coderag_graph::{publish, CodeGraph, CypherSink, Definition, GraphSink, JsonSink};
use coderag_indexer::{BuildConfig, GraphAssembler};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "coderag")]
#[command(about = "Build a definition graph of a Python code base", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Build configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph and export it
    Build(BuildArgs),

    /// List the source files that would be analyzed
    Files(FilesArgs),

    /// Show callers, callees, bases and neighbours of one definition
    Query(QueryArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Project root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = ExportFormat::Json)]
    format: ExportFormat,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Worker threads (default: all cores)
    #[arg(long, short = 'j')]
    threads: Option<usize>,
}

#[derive(Args)]
struct FilesArgs {
    /// Project root
    #[arg(default_value = ".")]
    root: PathBuf,
}

#[derive(Args)]
struct QueryArgs {
    /// Project root
    root: PathBuf,

    /// Definition id (e.g. "pkg.module.Class.method")
    id: String,

    /// Neighbourhood depth
    #[arg(long, short = 'd', default_value_t = 1)]
    depth: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    /// Nodes and edges as one JSON document
    Json,
    /// Cypher script that recreates the graph
    Cypher,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build(args) => run_build(args, config),
        Commands::Files(args) => run_files(&args, config),
        Commands::Query(args) => run_query(&args, config),
    }
}

fn load_config(path: Option<&Path>) -> Result<BuildConfig> {
    let config = match path {
        Some(path) => BuildConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BuildConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn build_graph(root: &Path, config: BuildConfig) -> Result<CodeGraph> {
    let assembler = GraphAssembler::new(root, config).context("Invalid project path")?;
    let built = assembler.build().context("Graph build failed")?;
    Ok(built.graph)
}

fn run_build(args: BuildArgs, mut config: BuildConfig) -> Result<()> {
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    let graph = build_graph(&args.root, config)?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let mut sink: Box<dyn GraphSink> = match args.format {
        ExportFormat::Json => Box::new(JsonSink::new(writer)),
        ExportFormat::Cypher => Box::new(CypherSink::new(writer)),
    };
    publish(&graph, sink.as_mut()).context("Failed to export graph")?;

    if let Some(path) = &args.output {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_files(args: &FilesArgs, config: BuildConfig) -> Result<()> {
    let assembler = GraphAssembler::new(&args.root, config).context("Invalid project path")?;
    let mut out = io::stdout().lock();
    for path in assembler.scanner().files() {
        let relative = path.strip_prefix(assembler.root()).unwrap_or(&path);
        writeln!(out, "{}", relative.display())?;
    }
    Ok(())
}

fn run_query(args: &QueryArgs, config: BuildConfig) -> Result<()> {
    let graph = build_graph(&args.root, config)?;
    let node = graph
        .node(&args.id)
        .with_context(|| format!("Definition not found: {}", args.id))?;

    let ids = |definitions: Vec<&Definition>| -> Vec<String> {
        definitions.into_iter().map(|d| d.id.clone()).collect()
    };
    let neighbors: Vec<_> = graph
        .neighbors(&args.id, args.depth)?
        .into_iter()
        .map(|n| {
            json!({
                "id": n.definition.id,
                "distance": n.distance,
                "relation": n.relation,
            })
        })
        .collect();

    let report = json!({
        "node": node,
        "callers": ids(graph.callers(&args.id)),
        "callees": ids(graph.callees(&args.id)),
        "bases": ids(graph.bases(&args.id)),
        "subclasses": ids(graph.subclasses(&args.id)),
        "children": ids(graph.children(&args.id)),
        "neighbors": neighbors,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
