use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use world_history_timeline::cache::FsEntityCache;
use world_history_timeline::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use world_history_timeline::domain::EntityId;
use world_history_timeline::error::TimelineError;
use world_history_timeline::input::parse_id_list;
use world_history_timeline::output::{JsonOutput, OutputMode, render_summary};
use world_history_timeline::pipeline::{Pipeline, PipelineOptions, TracingProgress, http_fetcher};
use world_history_timeline::sink::{JsonDirSink, MemorySink};

#[derive(Parser)]
#[command(name = "wht")]
#[command(about = "Resolve historical-event coordinates from Wikidata and store normalized records")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve every id in a list and upsert the records")]
    Run(RunArgs),
    #[command(about = "Resolve a single entity and print its record")]
    Resolve(ResolveArgs),
    #[command(about = "Manage the entity cache")]
    Cache(CacheArgs),
}

#[derive(Args, Clone)]
struct CommonArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    cache_dir: Option<String>,

    #[arg(long)]
    retries: Option<u32>,

    #[arg(long)]
    max_hops: Option<usize>,

    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Args)]
struct RunArgs {
    /// Id list: one id per line, or a SPARQL JSON result. `-` reads stdin.
    #[arg(long, default_value = "-")]
    ids: String,

    /// SPARQL binding variable holding the entity URI.
    #[arg(long)]
    var: Option<String>,

    /// Directory receiving one JSON record per id.
    #[arg(long, default_value = "records")]
    out: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct ResolveArgs {
    id: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    #[command(about = "Delete every persisted entity document")]
    Clear(CommonArgs),
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<TimelineError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TimelineError) -> u8 {
    match error {
        TimelineError::NotFound(_)
        | TimelineError::InvalidEntityId(_)
        | TimelineError::InvalidInput(_)
        | TimelineError::ConfigRead(_)
        | TimelineError::ConfigParse(_)
        | TimelineError::InvalidConfig(_) => 2,
        TimelineError::Transient(_) | TimelineError::UpstreamStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    match cli.command {
        Commands::Run(args) => run_pipeline(args, output_mode),
        Commands::Resolve(args) => run_resolve(args),
        Commands::Cache(CacheArgs {
            command: CacheCommand::Clear(common),
        }) => run_cache_clear(common, output_mode),
    }
}

fn load_config(common: &CommonArgs) -> Result<ResolvedConfig, TimelineError> {
    let overrides = ConfigOverrides {
        cache_directory: common.cache_dir.clone(),
        max_fallback_hops: common.max_hops,
        retry_count: common.retries,
        run_timeout_secs: common.timeout_secs,
    };
    ConfigLoader::resolve(common.config.as_deref(), overrides)
}

fn read_ids(source: &str, variable: Option<&str>) -> Result<Vec<EntityId>, TimelineError> {
    let content = if source == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| TimelineError::InvalidInput(err.to_string()))?;
        buffer
    } else {
        fs::read_to_string(source)
            .map_err(|err| TimelineError::InvalidInput(format!("{source}: {err}")))?
    };
    parse_id_list(&content, variable)
}

fn run_pipeline(args: RunArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = load_config(&args.common)?;
    let ids = read_ids(&args.ids, args.var.as_deref())?;
    let fetcher = http_fetcher(&config)?;
    let sink = JsonDirSink::new(Utf8PathBuf::from(args.out));
    let pipeline = Pipeline::new(fetcher, sink, PipelineOptions::from(&config));

    match output_mode {
        OutputMode::Json => {
            let summary = pipeline.run(&ids, &JsonOutput);
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
        OutputMode::Text => {
            let summary = pipeline.run(&ids, &TracingProgress);
            print!("{}", render_summary(&summary));
        }
    }
    Ok(())
}

fn run_resolve(args: ResolveArgs) -> miette::Result<()> {
    let config = load_config(&args.common)?;
    let id: EntityId = args.id.parse()?;
    let fetcher = http_fetcher(&config)?;
    let pipeline = Pipeline::new(fetcher, MemorySink::new(), PipelineOptions::from(&config));
    let record = pipeline.resolve_one(&id)?;
    JsonOutput::print_record(&record).into_diagnostic()?;
    Ok(())
}

fn run_cache_clear(common: CommonArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = load_config(&common)?;
    let cache = FsEntityCache::new(config.cache_directory.clone());
    cache.clear()?;
    match output_mode {
        OutputMode::Json => println!(
            "{}",
            serde_json::json!({"cleared": true, "cache_directory": cache.root().as_str()})
        ),
        OutputMode::Text => println!("cleared {}", cache.entity_dir()),
    }
    Ok(())
}
