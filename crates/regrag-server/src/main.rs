mod cache;
mod compare;
mod config;
mod error;
mod model;
mod report;
mod scoring;
mod server;
mod synthesizer;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::{KEY_NAMESPACE, ResponseCache};
use config::Config;
use server::RegragServer;
use synthesizer::Synthesizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr (stdout is reserved for MCP JSON-RPC)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting regrag MCP server");

    // 1. Load config from environment
    let config = Config::from_env()?;
    info!(
        catalog = config
            .catalog_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "embedded".to_string()),
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    // 2. Load the reference catalog
    let catalog = Arc::new(config.load_catalog()?);
    info!(
        version = catalog.version(),
        jurisdictions = catalog.jurisdictions().len(),
        topics = catalog.topics().len(),
        conflicts = catalog.conflicts().len(),
        "reference catalog ready"
    );

    // 3. Build the synthesizer
    let synthesizer = Arc::new(Synthesizer::new(
        config.synthesis_config(&catalog),
        Arc::clone(&catalog),
    )?);
    let settings = synthesizer.config();
    info!(
        jurisdictions = ?settings.jurisdictions,
        excerpt_max_chars = settings.excerpt_max_chars,
        summary_top_n = settings.summary_top_n,
        "synthesizer configured"
    );

    // 4. Connect to Redis (optional — graceful degradation if unavailable)
    let redis_cache =
        regrag_common::redis::RedisCache::new(config.redis_url.as_deref(), KEY_NAMESPACE);
    if redis_cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }
    // Cache keys include a digest of the synthesis settings
    let cache = Arc::new(ResponseCache::new(redis_cache, settings));
    cache.sync_catalog_version(catalog.version()).await;

    // 5. Build MCP server and serve on stdio
    let server = RegragServer::new(synthesizer, cache);

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
