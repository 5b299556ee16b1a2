// SPDX-License-Identifier: GPL-3.0-only
mod api;
mod cache;
mod catalog;
mod config;
mod index;
mod logging;
mod remote;
mod sync;
mod validation;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use api::HttpServer;
use cache::{SnapshotCache, SqliteCache};
use config::Config;
use logging::setup_logging;
use sync::SyncEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    setup_logging(&config.log_level)?;

    info!("Starting catalog-syncd v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the local snapshot cache
    let cache: Arc<dyn SnapshotCache> = Arc::new(SqliteCache::new(&config.cache_db_path).await?);
    info!("Snapshot cache initialized at {}", config.cache_db_path.display());

    let engine = Arc::new(SyncEngine::new(&config, Arc::clone(&cache))?);

    // Warm the snapshot cache so the editor's first read is answered locally
    let warm_engine = Arc::clone(&engine);
    tokio::spawn(async move {
        let doc = warm_engine.get_products().await;
        info!(products = doc.products.len(), "Initial document loaded");
    });

    // Start HTTP server
    let http_addr = config.local_api_bind;
    let http_server = HttpServer::new(Arc::clone(&engine), http_addr);
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.serve().await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("All services started. Waiting for shutdown signal...");

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal (Ctrl+C)");
        }
        Err(err) => {
            error!(error = %err, "Unable to listen for shutdown signal");
        }
    }

    // Graceful shutdown
    info!("Initiating graceful shutdown...");

    http_task.abort();

    if engine.is_dirty().await {
        warn!("Uncommitted local edits remain in the snapshot cache");
    }

    info!("Shutdown complete");
    Ok(())
}
