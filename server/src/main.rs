use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use llm_core::LlmClient;
use tokio::net::TcpListener;
use tracing::info;

use server::{build_router, config::ServerConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting post generation server...");

    let config = ServerConfig::from_env();

    let llm = LlmClient::from_env().context("Failed to configure the upstream LLM client")?;
    info!(
        "Upstream: provider={:?}, model={}",
        llm.provider(),
        llm.model()
    );
    info!(
        "Server configuration loaded: port={}, request_timeout={}s, stream_timeout={}s, language={}",
        config.port, config.request_timeout_secs, config.stream_timeout_secs, config.post_language
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let app = build_router(AppState::new(Arc::new(llm), config));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
