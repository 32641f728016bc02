//! routecheck: the API server and its route consistency check.
//!
//! This is the application entry point. It loads the env file, reads the
//! TOML configuration, initializes tracing, then either serves the API or
//! compares the registered routes with the OpenAPI document.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routecheck::config::{
    AppConfig, LoggingConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_ENV_FILE,
    DEFAULT_LOG_FILTER,
};
use routecheck::handlers::ApiHandlers;
use routecheck::http::start_server;
use routecheck::openapi::check_registry_against_spec;
use routecheck::routes::{api_routes, create_router};
use routecheck::state::AppState;
use routecheck::StartupError;

/// routecheck: an HTTP API checked against its OpenAPI document
#[derive(Parser, Debug)]
#[command(name = "routecheck", version, about)]
struct Args {
    /// Env file loaded before anything else
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Path to configuration file (overrides CONFIG_PATH)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "routecheck=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the API (default)
    Serve,
    /// Compare registered routes with the OpenAPI document and exit
    CheckRoutes {
        /// OpenAPI document to check against, instead of the configured one
        #[arg(long)]
        spec: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<(), StartupError> {
    dotenvy::from_path(&args.env_file).map_err(|source| StartupError::EnvFile {
        path: args.env_file.display().to_string(),
        source,
    })?;

    let config = load_config(args.config)?;

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    init_tracing(&log_filter, &config.logging);

    tracing::info!(
        variant = ?config.api.variant,
        host = %config.http.host,
        port = config.http.port,
        "Loaded configuration"
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::CheckRoutes { spec } => {
            let spec_path = spec.unwrap_or_else(|| config.spec_path());
            check_routes(&config, &spec_path)
        }
    }
}

/// Config file priority: CLI > CONFIG_PATH > default.
///
/// Only the default location may be missing, in which case built-in
/// defaults apply.
fn load_config(cli_path: Option<PathBuf>) -> Result<AppConfig, StartupError> {
    let explicit = cli_path.or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
    let config = match explicit {
        Some(path) => AppConfig::load(&path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => AppConfig::load(DEFAULT_CONFIG_PATH)?,
        None => AppConfig::default(),
    };
    Ok(config)
}

fn init_tracing(filter: &str, logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));
    if logging.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config: AppConfig) -> Result<(), StartupError> {
    let spec_path = config.spec_path();
    let report = check_registry_against_spec(&spec_path, &api_routes(config.api.variant))?;
    if report.is_consistent() {
        tracing::info!(spec = %spec_path.display(), "Routes match OpenAPI document");
    } else {
        tracing::warn!(
            spec = %spec_path.display(),
            discrepancies = report.len(),
            "Routes do not match OpenAPI document"
        );
    }

    let state = AppState::new(config.clone(), ApiHandlers::default());
    let app = create_router(state);

    start_server(app, &config).await?;
    Ok(())
}

fn check_routes(config: &AppConfig, spec_path: &Path) -> Result<(), StartupError> {
    let registry = api_routes(config.api.variant);
    let report = check_registry_against_spec(spec_path, &registry)?;

    if !report.is_consistent() {
        return Err(StartupError::RouteDiscrepancies(report));
    }

    tracing::info!(
        spec = %spec_path.display(),
        routes = registry.routes().len(),
        "Routes match OpenAPI document"
    );
    println!(
        "{} routes match {}",
        registry.routes().len(),
        spec_path.display()
    );
    Ok(())
}
