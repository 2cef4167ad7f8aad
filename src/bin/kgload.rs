//! kgload - convert knowledge-graph exports and bulk load them into Kuzu or Memgraph
//!
//! Usage:
//!   kgload kuzu-csv <convert|lookups|bin|tables|import|all> --data-dir D
//!   kgload kuzu-json --data-dir D --node-infile N --edge-infile E --outfile DB
//!   kgload memgraph <node|edge|merge|chunked> --data-dir D --outfile O
//!
//! Logging: `--log-level` / `KGLOAD_LOG` (an EnvFilter directive, default
//! `info`), `--log-file` / `KGLOAD_LOG_FILE` to write to a file instead of stderr.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use kgload::{
    KuzuCsvPipeline, KuzuJsonPipeline, MemgraphMode, MemgraphPipeline, PartitionRange,
    PipelineConfig, ScriptSink, ShellSink, SinkMode, Stage, StatementSink,
};

#[derive(Parser)]
#[command(name = "kgload", version, about = "Knowledge-graph export converter and bulk loader")]
struct Cli {
    /// Log filter (`info`, `debug`, `kgload=trace`, ...)
    #[arg(long, env = "KGLOAD_LOG", default_value = "info", global = true)]
    log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, env = "KGLOAD_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// JSON pipeline configuration; defaults are used for absent fields
    #[arg(long, env = "KGLOAD_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Partitioned CSV export → per-class Kuzu tables
    KuzuCsv(KuzuCsvArgs),
    /// JSONL export → Kuzu `Node`/`Edge` tables
    KuzuJson(KuzuJsonArgs),
    /// JSONL export → Memgraph `import_util.json` files
    Memgraph(MemgraphArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum SinkKind {
    /// Write statements to `<data-dir>/<outfile>.cypher`
    Script,
    /// Pipe statements into the database shell
    Shell,
    /// Run statements in-process (needs the `kuzu` feature)
    Embedded,
}

#[derive(Clone, Copy, ValueEnum)]
enum LoadKind {
    Script,
    Shell,
    None,
}

#[derive(Clone, Copy, ValueEnum)]
enum MemgraphKind {
    Node,
    Edge,
    Merge,
    Chunked,
}

#[derive(Args)]
struct KuzuCsvArgs {
    /// Pipeline stage to run
    stage: Stage,

    #[arg(long)]
    data_dir: PathBuf,

    #[arg(long, default_value = "rk-nodes-pt")]
    node_prefix: String,

    #[arg(long, default_value = "rk-edges-pt")]
    edge_prefix: String,

    /// Database name, relative to the data dir
    #[arg(long, default_value = "rk-kuzu-db")]
    outfile: String,

    /// Node partitions as `first-last` (e.g. `1-20`)
    #[arg(long, value_parser = parse_range)]
    node_partitions: Option<PartitionRange>,

    /// Edge partitions as `first-last` (e.g. `1-23`)
    #[arg(long, value_parser = parse_range)]
    edge_partitions: Option<PartitionRange>,

    #[arg(long, value_enum, default_value = "script")]
    sink: SinkKind,
}

#[derive(Args)]
struct KuzuJsonArgs {
    #[arg(long)]
    data_dir: PathBuf,

    #[arg(long)]
    node_infile: String,

    #[arg(long)]
    edge_infile: String,

    #[arg(long)]
    outfile: String,

    /// Reuse the JSON files from a previous run
    #[arg(long)]
    load_db_only: bool,

    #[arg(long, value_enum, default_value = "script")]
    sink: SinkKind,
}

#[derive(Args)]
struct MemgraphArgs {
    mode: MemgraphKind,

    #[arg(long)]
    data_dir: PathBuf,

    #[arg(long)]
    node_infile: Option<String>,

    #[arg(long)]
    edge_infile: Option<String>,

    #[arg(long)]
    outfile: String,

    /// Record cap for `node` / `edge` mode
    #[arg(long)]
    max_items: Option<u64>,

    /// Edges per chunked file; -1 puts everything in one file
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    lines_per_file: i64,

    /// Stop after this many chunked files; 0 means no limit
    #[arg(long, default_value_t = 0)]
    output_file_count: usize,

    /// Directory the Memgraph server sees the output files in
    #[arg(long)]
    import_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "none")]
    load: LoadKind,
}

fn parse_range(s: &str) -> std::result::Result<PartitionRange, String> {
    let (first, last) = s
        .split_once('-')
        .ok_or_else(|| format!("expected first-last, got {:?}", s))?;
    let first = first.trim().parse().map_err(|e| format!("bad first partition: {}", e))?;
    let last = last.trim().parse().map_err(|e| format!("bad last partition: {}", e))?;
    Ok(PartitionRange::new(first, last))
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log filter {:?}", cli.log_level))?;

    match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
        }
    }
    Ok(())
}

fn script_path(data_dir: &Path, outfile: &str) -> PathBuf {
    data_dir.join(format!("{}.cypher", outfile))
}

/// `single_session` keeps every statement of the run in one shell process
fn open_kuzu_sink(
    kind: SinkKind,
    mode: SinkMode,
    single_session: bool,
    config: &PipelineConfig,
    database: &Path,
    script: &Path,
) -> kgload::Result<Box<dyn StatementSink>> {
    match kind {
        SinkKind::Script => Ok(Box::new(ScriptSink::open(script, mode)?)),
        SinkKind::Shell => {
            let shell = ShellSink::kuzu(&config.kuzu_shell, database);
            Ok(Box::new(if single_session { shell.single_session() } else { shell }))
        }
        #[cfg(feature = "kuzu")]
        SinkKind::Embedded => Ok(Box::new(kgload::KuzuSink::open(database, config.max_db_size)?)),
        #[cfg(not(feature = "kuzu"))]
        SinkKind::Embedded => Err(kgload::LoadError::Database(
            "built without the `kuzu` feature; use --sink script or --sink shell".to_string(),
        )),
    }
}

fn run_kuzu_csv(mut config: PipelineConfig, args: KuzuCsvArgs) -> Result<()> {
    if let Some(range) = args.node_partitions {
        config.node_partitions = range;
    }
    if let Some(range) = args.edge_partitions {
        config.edge_partitions = range;
    }

    let pipeline = KuzuCsvPipeline::new(
        &config,
        &args.data_dir,
        &args.node_prefix,
        &args.edge_prefix,
        &args.outfile,
    );
    let script = script_path(&args.data_dir, &args.outfile);
    let database = pipeline.database().to_path_buf();

    pipeline
        .run(args.stage, &mut |mode| {
            open_kuzu_sink(args.sink, mode, false, &config, &database, &script)
        })
        .with_context(|| format!("{} stage failed", args.stage))
}

fn run_kuzu_json(config: PipelineConfig, args: KuzuJsonArgs) -> Result<()> {
    let pipeline = KuzuJsonPipeline::new(&args.data_dir, &args.node_infile, &args.edge_infile, &args.outfile)
        .load_db_only(args.load_db_only);
    let script = script_path(&args.data_dir, &args.outfile);
    let database = pipeline.database();

    let report = pipeline
        .run(&mut |mode| open_kuzu_sink(args.sink, mode, true, &config, &database, &script))
        .context("Kuzu JSON load failed")?;
    tracing::info!("{} node(s), {} edge(s) processed", report.nodes, report.edges);
    Ok(())
}

fn run_memgraph(config: PipelineConfig, args: MemgraphArgs) -> Result<()> {
    let mode = match args.mode {
        MemgraphKind::Node => MemgraphMode::Node,
        MemgraphKind::Edge => MemgraphMode::Edge,
        MemgraphKind::Merge => MemgraphMode::Merge,
        MemgraphKind::Chunked => MemgraphMode::Chunked {
            lines_per_file: args.lines_per_file,
            output_file_count: args.output_file_count,
        },
    };

    let mut pipeline = MemgraphPipeline::new(&args.data_dir, &args.outfile).max_items(args.max_items);
    if let Some(name) = &args.node_infile {
        pipeline = pipeline.node_infile(name);
    }
    if let Some(name) = &args.edge_infile {
        pipeline = pipeline.edge_infile(name);
    }

    let report = pipeline.convert(mode).context("Memgraph conversion failed")?;

    let mut sink: Box<dyn StatementSink> = match args.load {
        LoadKind::None => return Ok(()),
        LoadKind::Script => Box::new(ScriptSink::create_fresh(script_path(&args.data_dir, &args.outfile))?),
        LoadKind::Shell => Box::new(ShellSink::new(&config.memgraph_shell, config.memgraph_args.clone())),
    };
    pipeline
        .load(&report, args.import_dir.as_deref(), sink.as_mut())
        .context("Memgraph import failed")
}

fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig::load(cli.config.as_deref())
        .with_context(|| format!("cannot load configuration {:?}", cli.config))?;

    match cli.command {
        Command::KuzuCsv(args) => run_kuzu_csv(config, args),
        Command::KuzuJson(args) => run_kuzu_json(config, args),
        Command::Memgraph(args) => run_memgraph(config, args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
