use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use govwire_storage::{RecordStore, SqliteRecordStore};
use govwire_sync::{build_services, next_trigger_time, Maintenance, SyncConfig};
use govwire_web::AppState;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "govwire")]
#[command(about = "Government press release wire: scheduled ingestion and JSON API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API with the ingestion scheduler.
    Serve {
        #[arg(long, env = "GOVWIRE_HOST", default_value = "0.0.0.0")]
        host: IpAddr,
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
        /// Serve the API without scheduled or boot-time runs.
        #[arg(long)]
        no_scheduler: bool,
    },
    /// Run one ingestion pass and print the result.
    Sync,
    /// Deactivate records older than the retention window.
    Cleanup {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Create the database schema.
    Migrate,
    /// Print the trigger schedule and store statistics.
    Status,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();
    let config = SyncConfig::from_env().context("loading configuration")?;

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Serve {
            host,
            port,
            no_scheduler,
        } => {
            let services = build_services(config).await?;
            if no_scheduler {
                info!("scheduler disabled by flag");
            } else {
                services.scheduler.start().context("starting scheduler")?;
            }
            let state = AppState::new(services.store.clone(), services.scheduler.clone());
            govwire_web::serve(state, SocketAddr::new(host, port), shutdown_signal()).await?;
            services.scheduler.stop();
            services.store.close().await;
        }
        Commands::Sync => {
            let services = build_services(config).await?;
            let result = services.pipeline.run_once().await.context("ingestion run")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            services.store.close().await;
        }
        Commands::Cleanup { days } => {
            let store = std::sync::Arc::new(SqliteRecordStore::connect(&config.database_url).await?);
            let maintenance = Maintenance::new(store.clone(), days.unwrap_or(config.retention_days));
            let changed = maintenance.cleanup(Utc::now()).await?;
            println!(
                "cleanup complete: deactivated={changed} retention_days={}",
                maintenance.retention_days()
            );
            store.close().await;
        }
        Commands::Migrate => {
            let store = SqliteRecordStore::connect(&config.database_url).await?;
            store.migrate().await?;
            println!("schema ready: {}", config.database_url);
            store.close().await;
        }
        Commands::Status => {
            let now = Utc::now();
            let store = SqliteRecordStore::connect(&config.database_url).await?;
            let stats = store.stats(now, config.timezone).await?;
            let next = next_trigger_time(&config.triggers, now)?;
            let triggers = config
                .triggers
                .iter()
                .map(|t| serde_json::json!({ "name": t.name, "pattern": t.pattern }))
                .collect::<Vec<_>>();
            let report = serde_json::json!({
                "adapter_mode": config.adapter_mode,
                "timezone": config.timezone.to_string(),
                "next_trigger_time": next,
                "triggers": triggers,
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            store.close().await;
        }
    }

    Ok(())
}
