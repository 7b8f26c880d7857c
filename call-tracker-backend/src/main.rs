use crate::api::AppState;
use crate::call_tracking::QueryService;
use crate::database::postgres::PgRecordStore;
use crate::database::{CollectionName, RecordStore, StoreUnavailableError};
use crate::ingestion::{read_trace_file, DirectoryIngestionError, IngestionError, IngestionService};
use crate::output::OutputWriter;
use backtraced_error::{error_chain_to_pretty_formatted, SerdeJsonError, SqlxError};
use clap::Parser;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::fmt::{Debug, Formatter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, info_span, instrument, Instrument};
use tracing_config_helper::{LogFormat, TracerConfig};

mod api;
mod call_tracking;
mod database;
mod ingestion;
mod otel_trace_processing;
mod output;

#[tokio::main]
async fn main() {
    // load env vars so clap can use it when parsing a config
    println!("Loading env vars");
    dotenv::dotenv().ok();
    let config = LaunchConfig::parse();
    let tracer_guard = tracing_config_helper::setup_tracing_or_panic(TracerConfig {
        service_name: env!("CARGO_BIN_NAME").to_string(),
        log_format: config.log_format,
        otlp_collector_url: config.otlp_collector_url.clone(),
    });
    if let Err(e) = run(config).await {
        error!("{}", error_chain_to_pretty_formatted(e));
        drop(tracer_guard);
        std::process::exit(1);
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("Failed to connect to the DB")]
    Connection(#[from] SqlxError),
    #[error(transparent)]
    Store(#[from] StoreUnavailableError),
    #[error(transparent)]
    DirectoryIngestion(#[from] DirectoryIngestionError),
    #[error(transparent)]
    TraceFile(#[from] IngestionError),
    #[error("Failed to print result")]
    Print(#[from] SerdeJsonError),
    #[error("API task failed")]
    Api(#[from] tokio::task::JoinError),
}

async fn run(config: LaunchConfig) -> Result<(), RunError> {
    info!("Using config: {:#?}", config);
    match config.command.clone().unwrap_or(Command::Serve) {
        Command::Print { file } => {
            let record = read_trace_file(&config.data_path.join(file)).await?;
            print_pretty(&record)?;
        }
        Command::Ingest { file: Some(file) } => {
            let store = connect_to_store(&config.db).await?;
            let ingestion = IngestionService::new(store, &config.data_path);
            let outcome = ingestion.ingest_one(&config.data_path.join(file)).await?;
            print_pretty(&outcome)?;
        }
        Command::Ingest { file: None } => {
            let store = connect_to_store(&config.db).await?;
            let ingestion = IngestionService::new(store, &config.data_path);
            let report = ingestion.ingest_directory(ingestion.data_path()).await?;
            print_pretty(&report)?;
        }
        Command::Serve => {
            let api_handle = start_api(&config).await?;
            api_handle.await?;
        }
    }
    Ok(())
}

// This should not run forever, otherwise we lose the trace of starting up
#[instrument(level = "error", skip_all)]
async fn start_api(config: &LaunchConfig) -> Result<tokio::task::JoinHandle<()>, RunError> {
    let store = connect_to_store(&config.db).await?;
    let app_state = AppState {
        ingestion: Arc::new(IngestionService::new(store.clone(), &config.data_path)),
        queries: Arc::new(QueryService::new(store, OutputWriter::new(&config.out_dir))),
    };
    Ok(api::start(
        app_state,
        SocketAddr::new(config.host, config.port),
    ))
}

fn print_pretty<T: serde::Serialize>(value: &T) -> Result<(), SerdeJsonError> {
    let pretty = serde_json::to_string_pretty(value)
        .map_err(|e| SerdeJsonError::from_serde_json_error(e, "printing result", String::new()))?;
    println!("{pretty}");
    Ok(())
}

#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Ingest one trace file of the data path, or all of them, and print the outcome
    Ingest { file: Option<PathBuf> },
    /// Parse a trace file of the data path and print the record, without storing it
    Print { file: PathBuf },
}

#[derive(Debug, clap::Parser)]
pub struct LaunchConfig {
    #[clap(subcommand)]
    pub command: Option<Command>,
    #[clap(flatten)]
    pub db: DbConfig,
    /// Directory holding the trace export files
    #[clap(long, env)]
    pub data_path: PathBuf,
    /// Where query results are written
    #[clap(long, env, default_value = "out")]
    pub out_dir: PathBuf,
    #[clap(long, env, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
    #[clap(long, env, default_value_t = 2000)]
    pub port: u16,
    #[clap(long, env, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
    #[clap(long, env)]
    pub otlp_collector_url: Option<String>,
}

#[derive(clap::Parser)]
pub struct DbConfig {
    #[clap(long, env = "DATABASE_URL")]
    pub url: String,
    /// Overrides the database of the url
    #[clap(long, env)]
    pub database_name: Option<String>,
    #[clap(long, env = "COLLECTION_NAME", default_value = "query_traces")]
    pub collection: CollectionName,
    #[clap(long, env, default_value_t = 10)]
    pub max_db_connections: u16,
}

impl Debug for DbConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("max_db_connections", &self.max_db_connections)
            .field("database_name", &self.database_name)
            .field("collection", &self.collection)
            .field(
                "url",
                &self
                    .url
                    .chars()
                    .rev()
                    .take(15)
                    .collect::<String>()
                    .chars()
                    .rev()
                    .collect::<String>(),
            )
            .finish()
    }
}

async fn connect_to_db(config: &DbConfig) -> Result<PgPool, SqlxError> {
    let mut options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| SqlxError::from_sqlx_error(e, "parsing the DB url"))?;
    if let Some(database_name) = &config.database_name {
        options = options.database(database_name);
    }
    let con = PgPoolOptions::new()
        .max_connections(u32::from(config.max_db_connections))
        .connect_with(options)
        .instrument(info_span!("Connecting to the DB"))
        .await
        .map_err(|e| SqlxError::from_sqlx_error(e, "connecting to the DB"))?;
    Ok(con)
}

async fn connect_to_store(config: &DbConfig) -> Result<Arc<dyn RecordStore>, RunError> {
    let con = connect_to_db(config).await?;
    let store = PgRecordStore::new(con, config.collection.clone());
    store.ensure_collection().await?;
    Ok(Arc::new(store))
}
