//! airwatch - air-quality dashboard and threshold alarms
//!
//! Serves a JSON dashboard of PM2.5-based AQI readings for tracked cities
//! and rings alarms when a metric crosses a threshold at a chosen time.
//!
//! # Usage
//!
//! ```bash
//! # Run the service (reads ./airwatch.toml if present)
//! airwatch
//!
//! # Convert a PM2.5 concentration
//! airwatch aqi 35.5 --standard CN
//!
//! # Current AQI for a city
//! airwatch lookup Paris
//! ```
//!
//! # Environment Variables
//!
//! - `AIRWATCH_CONFIG`: path to the TOML config file
//! - `AIRWATCH_SERVER_ADDR`: bind address override
//! - `AIRWATCH_CORS_ORIGINS`: comma-separated allowed origins
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use airwatch::alarm::{AlarmSink, LogSink};
use airwatch::api::{create_app, DashboardState};
use airwatch::aqi::{self, Reading, Standard};
use airwatch::config::{self, AppConfig};
use airwatch::provider::{self, DataProvider, OpenMeteoClient};
use airwatch::service::{self, SharedSession};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "airwatch")]
#[command(about = "Air-quality dashboard with threshold alarms")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long, env = "AIRWATCH_SERVER_ADDR")]
    addr: Option<String>,

    /// Config file to load instead of the standard search order
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Convert a PM2.5 concentration (µg/m³) to an AQI reading
    Aqi {
        concentration: f64,
        /// US, CN, UK or IN
        #[arg(long, default_value = "US")]
        standard: Standard,
    },

    /// Geocode a city and print its current AQI
    Lookup {
        city: String,
        #[arg(long)]
        standard: Option<Standard>,
    },
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    AlarmTicker,
    LocationRefresh,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::AlarmTicker => write!(f, "AlarmTicker"),
            TaskName::LocationRefresh => write!(f, "LocationRefresh"),
        }
    }
}

// ============================================================================
// Task Spawning
// ============================================================================

fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

fn spawn_alarm_ticker(
    task_set: &mut JoinSet<Result<TaskName>>,
    session: SharedSession,
    sink: Arc<dyn AlarmSink>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[AlarmTicker] Task starting with period {:?}", period);
        service::run_alarm_loop(session, sink, period, cancel_token).await;
        Ok(TaskName::AlarmTicker)
    });
}

fn spawn_location_refresh(
    task_set: &mut JoinSet<Result<TaskName>>,
    session: SharedSession,
    provider: Arc<dyn DataProvider>,
    config: &AppConfig,
    cancel_token: CancellationToken,
) {
    let interval_secs = config.dashboard.refresh_interval_secs;
    let jitter_secs = config.dashboard.refresh_jitter_secs;
    task_set.spawn(async move {
        info!("[LocationRefresh] Task starting, every {}s (+{}s jitter)", interval_secs, jitter_secs);
        service::run_refresh_loop(session, provider, interval_secs, jitter_secs, cancel_token).await;
        Ok(TaskName::LocationRefresh)
    });
}

// ============================================================================
// Supervisor
// ============================================================================

/// Wait on every task; the first failure cancels the rest.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let the remaining tasks observe cancellation and exit
    while let Some(result) = task_set.join_next().await {
        if let Ok(Ok(task_name)) = result {
            info!("Supervisor: task {} stopped", task_name);
        }
    }

    Ok(())
}

// ============================================================================
// Subcommands
// ============================================================================

fn print_reading(label: &str, reading: &Reading) {
    println!(
        "{label}: {} {} ({}, {})",
        reading.standard, reading.index, reading.status, reading.color
    );
}

async fn run_lookup(config: &AppConfig, city: &str, standard: Standard) -> Result<()> {
    let client = OpenMeteoClient::new(&config.providers).context("Failed to build HTTP client")?;
    let location = provider::fetch_location(&client, city, false, standard, Utc::now())
        .await
        .with_context(|| format!("Lookup failed for '{city}'"))?;

    let name = match &location.country {
        Some(country) => format!("{}, {}", location.name, country),
        None => location.name.clone(),
    };
    match &location.aqi {
        Some(reading) => print_reading(&name, reading),
        None => println!("{name}: no PM2.5 data"),
    }
    if let Some(pm) = location.current.pm2_5 {
        println!("  PM2.5 {pm:.1} µg/m³ (local time {})", location.local_time(Utc::now()).format("%H:%M"));
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    aqi::validate_tables().context("AQI breakpoint tables are inconsistent")?;

    let app_config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load(),
    };
    config::init(app_config);
    let app_config = config::get();

    match args.command {
        Some(SubCommand::Aqi {
            concentration,
            standard,
        }) => {
            let reading = Reading::from_concentration(concentration, standard);
            print_reading(&format!("PM2.5 {concentration} µg/m³"), &reading);
            return Ok(());
        }
        Some(SubCommand::Lookup { city, standard }) => {
            let standard = standard.unwrap_or(app_config.dashboard.standard);
            return run_lookup(app_config, &city, standard).await;
        }
        None => {}
    }

    let server_addr = args
        .addr
        .unwrap_or_else(|| app_config.server.addr.clone());

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  airwatch v{}", env!("CARGO_PKG_VERSION"));
    info!("  Air-quality dashboard and alarms");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        standard = %app_config.dashboard.standard,
        default_city = %app_config.dashboard.default_city,
        "Dashboard defaults"
    );

    let provider: Arc<dyn DataProvider> = Arc::new(
        OpenMeteoClient::new(&app_config.providers).context("Failed to build HTTP client")?,
    );
    let session = service::new_session(app_config);
    service::bootstrap(&session, provider.as_ref(), &app_config.dashboard.default_city).await;

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind {server_addr}"))?;
    info!("Dashboard API listening on http://{}", server_addr);

    let state = DashboardState::new(
        Arc::clone(&session),
        Arc::clone(&provider),
        app_config.dashboard.forecast_hours,
    );
    let sink: Arc<dyn AlarmSink> = Arc::new(LogSink);

    let mut task_set = JoinSet::new();
    spawn_http_server(&mut task_set, listener, create_app(state), cancel_token.clone());
    spawn_alarm_ticker(
        &mut task_set,
        Arc::clone(&session),
        sink,
        Duration::from_millis(app_config.alarms.tick_millis),
        cancel_token.clone(),
    );
    spawn_location_refresh(
        &mut task_set,
        session,
        provider,
        app_config,
        cancel_token.clone(),
    );

    run_supervisor(&mut task_set, cancel_token).await?;
    info!("airwatch stopped");
    Ok(())
}
