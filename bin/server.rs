// Zello - Web Server
// REST API with Axum over a single SQLite connection

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use zello::api::{router, AppState};
use zello::{open_database, Config, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🌐 Zello {} - Web Server", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = open_database(&config.database_path)
        .with_context(|| format!("failed to open database at {:?}", config.database_path))?;
    println!("✓ Database opened: {:?}", config.database_path);

    let app = router(AppState::new(conn));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "listening");
    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/health", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
