// SPDX-License-Identifier: GPL-3.0-only
use axum::{
    Json, Router,
    body::Bytes,
    http::{StatusCode, header},
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::api::handlers::{ApiHandlers, ApiResponse, CommitRequest};
use crate::catalog::ProductDocument;
use crate::sync::{CommitOutcome, ConnectionStatus, EngineStatus, SyncEngine};

pub struct HttpServer {
    handlers: ApiHandlers,
    addr: SocketAddr,
}

impl HttpServer {
    pub fn new(engine: Arc<SyncEngine>, addr: SocketAddr) -> Self {
        Self {
            handlers: ApiHandlers::new(engine),
            addr,
        }
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        let handlers = Arc::new(self.handlers);

        let app = Router::new()
            .route("/api/health", get(health_handler))
            .route(
                "/api/products",
                get(get_products_handler).put(save_products_handler),
            )
            .route("/api/products/commit", post(commit_products_handler))
            .route("/api/products/export", get(export_products_handler))
            .route("/api/products/import", post(import_products_handler))
            .route("/api/products/local", delete(clear_local_handler))
            .route("/api/status", get(status_handler))
            .route("/api/connection/test", post(test_connection_handler))
            .with_state(handlers.clone());

        info!(addr = %self.addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn health_handler() -> Json<ApiResponse<&'static str>> {
    ApiHandlers::health().await
}

async fn get_products_handler(
    axum::extract::State(handlers): axum::extract::State<Arc<ApiHandlers>>,
) -> Json<ApiResponse<ProductDocument>> {
    handlers.get_products().await
}

async fn save_products_handler(
    axum::extract::State(handlers): axum::extract::State<Arc<ApiHandlers>>,
    Json(doc): Json<ProductDocument>,
) -> Json<ApiResponse<()>> {
    handlers.save_products(Json(doc)).await
}

async fn commit_products_handler(
    axum::extract::State(handlers): axum::extract::State<Arc<ApiHandlers>>,
    Json(request): Json<CommitRequest>,
) -> Json<CommitOutcome> {
    handlers.commit_products(Json(request)).await
}

async fn export_products_handler(
    axum::extract::State(handlers): axum::extract::State<Arc<ApiHandlers>>,
) -> Result<([(header::HeaderName, &'static str); 2], String), StatusCode> {
    handlers.export_products().await
}

async fn import_products_handler(
    axum::extract::State(handlers): axum::extract::State<Arc<ApiHandlers>>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse<ProductDocument>>) {
    handlers.import_products(body).await
}

async fn clear_local_handler(
    axum::extract::State(handlers): axum::extract::State<Arc<ApiHandlers>>,
) -> Result<Json<ApiResponse<()>>, StatusCode> {
    handlers.clear_local().await
}

async fn status_handler(
    axum::extract::State(handlers): axum::extract::State<Arc<ApiHandlers>>,
) -> Json<ApiResponse<EngineStatus>> {
    handlers.status().await
}

async fn test_connection_handler(
    axum::extract::State(handlers): axum::extract::State<Arc<ApiHandlers>>,
) -> Json<ConnectionStatus> {
    handlers.test_connection().await
}
