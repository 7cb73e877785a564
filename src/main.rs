//! flagchat server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use flagchat::{AppState, Config, init_tracing, router};

#[derive(Parser)]
#[command(name = "flagchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on (overrides config and FLAGCHAT_BIND).
    #[arg(short, long)]
    bind: Option<String>,

    /// Config file (defaults to <config dir>/flagchat/settings.conf).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("flagchat=info");

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path, |name| std::env::var(name).ok()),
        None => Config::load(),
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    if !config.llm.is_configured() {
        warn!("GROQ_API_KEY is not set; /api/ask will answer 500 until it is");
    }

    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        addr = %listener.local_addr()?,
        model = %config.llm.groq_model,
        "flagchat listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
