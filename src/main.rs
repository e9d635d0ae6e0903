use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pokemon_etl::app::ports::TableSink;
use pokemon_etl::config::{load_env_file, Config, SinkKind};
use pokemon_etl::constants::DEFAULT_RECORD_COUNT;
use pokemon_etl::infra::http_client::ReqwestHttp;
use pokemon_etl::infra::rate_limiter::FixedDelayLimiter;
use pokemon_etl::infra::run_log::TracingRunLog;
use pokemon_etl::observability::init_logging;
use pokemon_etl::pipeline::ingestion::{read_source, SourceFormat};
use pokemon_etl::pipeline::processing::{clean, SpriteEnricher};
use pokemon_etl::pipeline::storage::{InMemorySink, SqliteSink};
use pokemon_etl::pipeline::{EnrichStage, EtlPipeline, ReadStage, RetryPolicy, RunParams, SinkStage};
use pokemon_etl::types::{EnrichedTable, RecordLimit};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pokemon_etl")]
#[command(about = "Load the Pokemon dataset, attach PokeAPI sprites, and store the cleaned table")]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dotenv file with LIBSQL_URL / LIBSQL_AUTH_TOKEN (defaults to ./.env)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read, enrich, clean and store the first N records
    Run {
        /// Number of records to process
        #[arg(long, default_value_t = DEFAULT_RECORD_COUNT, conflicts_with = "all")]
        count: usize,
        /// Process every record in the source file
        #[arg(long)]
        all: bool,
        /// Source file, overriding the config
        #[arg(long)]
        source: Option<PathBuf>,
        /// Destination table name (defaults to <prefix>_first_<N>)
        #[arg(long)]
        table: Option<String>,
        /// Destination store, overriding the config
        #[arg(long, value_enum)]
        sink: Option<SinkKind>,
        /// Pause between sprite lookups in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Print the run summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Read and clean the source without lookups or writes, then print its shape
    Inspect {
        #[arg(long)]
        source: Option<PathBuf>,
    },
}

async fn build_sink(config: &Config, kind: SinkKind) -> Result<Arc<dyn TableSink>> {
    match kind {
        SinkKind::Sqlite => Ok(Arc::new(SqliteSink::new(&config.sink.sqlite_path))),
        SinkKind::Memory => Ok(Arc::new(InMemorySink::new())),
        SinkKind::Libsql => connect_libsql(config).await,
    }
}

#[cfg(feature = "db")]
async fn connect_libsql(config: &Config) -> Result<Arc<dyn TableSink>> {
    use pokemon_etl::pipeline::storage::LibsqlSink;

    let creds = config.credentials();
    let url = creds
        .libsql_url
        .context("LIBSQL_URL must be set to use the libsql sink")?;
    let token = creds.libsql_auth_token.unwrap_or_default();
    Ok(Arc::new(LibsqlSink::connect(&url, &token).await?))
}

#[cfg(not(feature = "db"))]
async fn connect_libsql(_config: &Config) -> Result<Arc<dyn TableSink>> {
    anyhow::bail!("the libsql sink requires building with `--features db`")
}

#[allow(clippy::too_many_arguments)]
async fn run(
    config: Config,
    count: usize,
    all: bool,
    source: Option<PathBuf>,
    table: Option<String>,
    sink: Option<SinkKind>,
    delay_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    let limit = if all {
        RecordLimit::All
    } else {
        RecordLimit::First(count)
    };
    let mut params = RunParams::new(limit, &config.sink.table_prefix);
    if let Some(name) = table {
        params = params.with_table_name(name);
    }

    let format = SourceFormat::from_labels(&config.source.encoding, config.source.delimiter)?;
    let read = ReadStage {
        path: source.unwrap_or_else(|| config.source.path.clone()),
        format,
    };

    let http = Arc::new(ReqwestHttp::new(
        config.enrichment.timeout(),
        &config.enrichment.user_agent,
    )?);
    let delay = delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.enrichment.delay());
    let limiter = Arc::new(FixedDelayLimiter::new(delay));
    info!("Spacing sprite lookups {:?} apart", limiter.delay());
    let enrich = EnrichStage {
        enricher: SpriteEnricher::new(http, limiter, config.enrichment.base_url.clone()),
    };

    let sink_kind = sink.unwrap_or(config.sink.kind);
    let sink = SinkStage {
        sink: build_sink(&config, sink_kind).await?,
    };
    info!("Destination: {}", sink.sink.describe());

    let retry = RetryPolicy {
        retries: config.retry.retries,
        delay: Duration::from_secs(config.retry.delay_seconds),
    };

    let pipeline = EtlPipeline::new(read, enrich, sink, retry, Arc::new(TracingRunLog));
    let summary = pipeline.run(&params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("\n📊 Pipeline results for '{}':", summary.table_name);
    println!("   Rows read: {}", summary.rows_read);
    println!("   Rows selected: {}", summary.rows_selected);
    println!("   Sprites resolved: {}", summary.sprites_resolved);
    println!(
        "   Lookups missing sprite / not found / failed: {} / {} / {}",
        summary.lookups_without_sprite, summary.lookups_not_found, summary.lookups_failed
    );
    println!("   Rows written: {}", summary.rows_written);
    println!("   Duration: {:.1}s", summary.duration_secs);
    Ok(())
}

fn inspect(config: Config, source: Option<PathBuf>) -> Result<()> {
    let path = source.unwrap_or_else(|| config.source.path.clone());
    let format = SourceFormat::from_labels(&config.source.encoding, config.source.delimiter)?;
    let log = TracingRunLog;

    let table = read_source(&path, &format, &log)
        .with_context(|| format!("reading {}", path.display()))?;
    let rows_read = table.len();
    let Some(cleaned) = clean(Some(EnrichedTable::unenriched(table)), &log) else {
        println!("⚠️  {} has no rows", path.display());
        return Ok(());
    };

    println!("\n🔎 {} ({})", path.display(), format.describe());
    println!("   Rows: {}", rows_read);
    println!("   Columns:");
    for column in &cleaned.columns {
        println!("     {:<20} {}", column.name, column.kind().sql_type());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    if load_env_file(cli.env_file.as_deref()) {
        info!("Loaded environment file");
    }
    let config = Config::load(cli.config.as_deref())?;

    let outcome = match cli.command {
        Commands::Run {
            count,
            all,
            source,
            table,
            sink,
            delay_ms,
            json,
        } => {
            if !json {
                println!("🚀 Running pokemon ETL pipeline...");
            }
            run(config, count, all, source, table, sink, delay_ms, json).await
        }
        Commands::Inspect { source } => inspect(config, source),
    };

    if let Err(e) = &outcome {
        error!("Run failed: {:#}", e);
        println!("❌ Run failed: {:#}", e);
    }
    outcome
}
