use anyhow::{Context, Result};
use clap::Parser;
use encore_app::pipeline::Pipeline;
use encore_app::{AppState, router};
use encore_common::observability::init_logging;
use encore_config::{EncoreConfig, EncoreConfigLoader};
use encore_drivers::BrowserRenderer;
use encore_llm::{LlmEventExtractor, build_llm_client};
use encore_store::SqliteEventRepository;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

const DEFAULT_CONFIG_FILE: &str = "encore.yaml";

/// Render event pages, extract their details with a language model, and serve them over HTTP.
#[derive(Debug, Parser)]
#[command(name = "encore", version, about)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON). `ENCORE__*` variables override it.
    #[arg(long, short, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Env wins over the file.
    let loader = match &cli.config {
        Some(path) => EncoreConfigLoader::new().with_file(path),
        None => EncoreConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let cfg: EncoreConfig = loader.load().context("loading configuration")?;

    let log_file = init_logging(cfg.logging.to_log_config())?;
    info!(log_file = %log_file.display(), "encore.starting");

    let pool = encore_store::connect(&cfg.database)
        .await
        .with_context(|| format!("opening database {}", cfg.database.url))?;

    let llm = build_llm_client(&cfg.llm)?;
    match llm.health_check().await {
        Ok(true) => info!(model = llm.model_name(), "encore.llm_reachable"),
        Ok(false) | Err(_) => warn!(model = llm.model_name(), "encore.llm_unreachable"),
    }

    let pipeline = Pipeline::new(
        Arc::new(BrowserRenderer::new(cfg.browser.clone())),
        Arc::new(LlmEventExtractor::new(llm, cfg.llm.max_tokens)),
        Arc::new(SqliteEventRepository::new(pool.clone())),
        cfg.browser.render_timeout(),
    );

    let addr = cfg.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "encore.listening");

    axum::serve(listener, router(AppState::new(pipeline)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("encore.stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "encore.signal_handler_failed");
        std::future::pending::<()>().await;
    }
    info!("encore.shutdown_requested");
}
