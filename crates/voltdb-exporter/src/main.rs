mod access_log;
mod config;
mod handlers;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use voltdb_exporter_core::client::http::HttpClient;
use voltdb_exporter_core::{
    ExporterConfig, GatherCoordinator, MetricRegistry, ScrapeGate, Scraper,
};

use access_log::AccessLogLayer;
use handlers::AppState;

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(
    name = "voltdb-exporter",
    about = "Prometheus exporter for VoltDB statistics",
    version = voltdb_exporter_core::VERSION
)]
pub(crate) struct Args {
    /// Comma-separated VoltDB servers (`host` or `host:port`).
    #[arg(long, default_value = "localhost", env = "VOLTDB_SERVERS", value_delimiter = ',')]
    servers: Vec<String>,

    /// VoltDB HTTP port, used for servers given without one.
    #[arg(long, default_value_t = voltdb_exporter_core::config::DEFAULT_VOLTDB_PORT)]
    port: u16,

    /// Listen address for the metrics endpoint.
    #[arg(long, default_value = "0.0.0.0:1234", env = "VOLTDB_EXPORTER_LISTEN")]
    listen: String,

    /// VoltDB username.
    #[arg(long, env = "VOLTDB_USERNAME")]
    user: Option<String>,

    /// VoltDB password.
    #[arg(long, env = "VOLTDB_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Properties file with `username=` and `password=` entries.
    #[arg(long, value_name = "FILE")]
    credentials: Option<PathBuf>,

    /// Comma-separated statistics to poll (default: all).
    #[arg(long, value_delimiter = ',')]
    stats: Vec<String>,

    /// Comma-separated statistics to leave out.
    #[arg(long, value_delimiter = ',')]
    skipstats: Vec<String>,

    /// Report values since the previous poll instead of since startup.
    #[arg(long)]
    delta: bool,

    /// Connect over HTTPS.
    #[arg(long)]
    ssl: bool,

    /// PEM bundle of trusted CA certificates (implies --ssl).
    #[arg(long, value_name = "PEM")]
    ssl_ca: Option<PathBuf>,

    /// Minimum milliseconds between two gather cycles.
    #[arg(long, default_value_t = 1500)]
    min_gather_interval_ms: u64,

    /// Seconds one gather cycle may wait for responses (0 = unbounded).
    #[arg(long, default_value_t = 30)]
    cycle_timeout: u64,

    /// Per-request HTTP timeout in seconds (0 = use the cycle timeout).
    #[arg(long, default_value_t = 0)]
    request_timeout: u64,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = match config::build(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };
    let addr: SocketAddr = match args.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(1);
        }
    };
    log_startup(&config);

    let registry = Arc::new(MetricRegistry::new());
    let coordinator = match GatherCoordinator::new(HttpClient::new(), &config, registry) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            error!(error = %e, "failed to register metrics");
            process::exit(1);
        }
    };
    let scraper: Arc<dyn Scraper> =
        Arc::new(ScrapeGate::new(coordinator, config.min_gather_interval));
    let state = AppState {
        scraper,
        banner: Arc::from(format!(
            "VoltDB Prometheus exporter for {} port {}",
            config.connection.server_list(),
            config.connection.port
        )),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };
    runtime.block_on(serve(addr, state));
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::from_default_env(), level))
        .with_target(false)
        .init();
}

/// RUST_LOG covers other targets; -v/-q still set the exporter's own.
fn log_filter(mut filter: EnvFilter, level: Level) -> EnvFilter {
    for target in ["voltdb_exporter", "voltdb_exporter_core"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }
    filter
}

fn log_startup(config: &ExporterConfig) {
    let categories: Vec<&str> = config.categories.iter().map(|c| c.selector()).collect();
    info!(
        version = voltdb_exporter_core::VERSION,
        servers = %config.connection.server_list(),
        port = config.connection.port,
        tls = config.connection.tls.enabled,
        user = config.connection.credentials.as_ref().map(|c| c.username.as_str()).unwrap_or("-"),
        delta = config.interval,
        "starting VoltDB exporter"
    );
    info!(categories = %categories.join(","), "polling statistics");
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_root))
        .route("/metrics", get(handlers::handle_metrics))
        .with_state(state)
        .layer(AccessLogLayer)
        .layer(CompressionLayer::new())
}

async fn serve(addr: SocketAddr, state: AppState) {
    let scraper = Arc::clone(&state.scraper);
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
    }

    // Closing the connection blocks on in-flight calls.
    if let Err(e) = tokio::task::spawn_blocking(move || scraper.shutdown()).await {
        error!(error = %e, "shutdown failed");
    }
    info!("stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
