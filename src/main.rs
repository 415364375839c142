use anyhow::{Context, Result};
use clap::Parser;
use shopvault::storage::retail;
use shopvault::{BackupConfig, BackupService, InMemoryStore, web};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shopvault")]
#[command(about = "Backup and restore service for a retail point-of-sale store")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
    /// Largest accepted restore payload, in MiB
    #[arg(long, default_value_t = 10)]
    max_restore_mib: usize,
    #[arg(long, default_value = "shopvault")]
    source_label: String,
    /// Seed settings and a small demo catalogue on startup
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let store = InMemoryStore::with_tables(retail::full_schema())
        .await
        .context("failed to create store")?;
    if cli.seed_demo {
        retail::seed_settings(&store).await.context("failed to seed settings")?;
        retail::seed_demo(&store).await.context("failed to seed demo data")?;
        info!("demo data seeded");
    }

    let config = BackupConfig::new()
        .max_restore_mib(cli.max_restore_mib)
        .source_label(&cli.source_label);
    let service = Arc::new(BackupService::new(Arc::new(store), config));
    let app = web::router(service);

    let listener = tokio::net::TcpListener::bind(cli.addr)
        .await
        .with_context(|| format!("failed to bind {}", cli.addr))?;
    info!(addr = %cli.addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shopvault=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
