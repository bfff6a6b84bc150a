//! Dashboard CLI: loads every collection once through the configured backend and prints
//! the dashboard summary (or one enriched collection) as JSON.
//!
//! Run from repo root: `cargo run -p dashboard_cli -- stats`

use busnet_admin::{AppContext, ClientConfig, RecordId};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Override BUSNET_API_URL
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable
    Health,
    /// Refresh everything and print the dashboard summary (default)
    Stats,
    /// Refresh everything and print one enriched collection
    List {
        /// Entity name, e.g. bus_lines or busLines
        entity: String,
    },
    /// Delete one record and print the refreshed collection size
    Delete {
        entity: String,
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("busnet_admin=info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "dashboard cli failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    let ctx = AppContext::build(config).await?;

    let outcome = execute(&ctx, cli.command.unwrap_or(Commands::Stats)).await;
    ctx.shutdown().await;
    outcome
}

async fn execute(ctx: &AppContext, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let health = ctx.backend.health().await;
    if !health.healthy {
        return Err(health.error.unwrap_or_else(|| "backend unhealthy".into()).into());
    }

    match command {
        Commands::Health => println!("{}", serde_json::to_string_pretty(&health)?),
        Commands::Stats => {
            ctx.store.mount().await;
            for entity in &ctx.model.entities {
                tracing::info!(entity = %entity.name, records = ctx.store.collection(&entity.name).len(), "loaded");
            }
            let stats = ctx.store.dashboard_stats().unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::List { entity } => {
            ctx.store.mount().await;
            let records = ctx.store.collection(&entity);
            println!("{}", serde_json::to_string_pretty(&*records)?);
        }
        Commands::Delete { entity, id } => {
            ctx.store.mount().await;
            ctx.store.delete(&entity, &RecordId::from(id)).await?;
            println!("{} {}", entity, ctx.store.collection(&entity).len());
        }
    }
    Ok(())
}
