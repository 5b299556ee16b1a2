// SPDX-License-Identifier: GPL-3.0-only
use axum::Json;
use axum::body::Bytes;
use axum::http::{StatusCode, header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::ProductDocument;
use crate::sync::{CommitOutcome, ConnectionStatus, EngineStatus, SyncEngine};

/// Commit request as the editor sends it: the document fields at the top
/// level plus an optional commit message.
#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    #[serde(flatten)]
    pub document: ProductDocument,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

pub struct ApiHandlers {
    engine: Arc<SyncEngine>,
}

impl ApiHandlers {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }
}

impl ApiHandlers {
    pub async fn health() -> Json<ApiResponse<&'static str>> {
        Json(ApiResponse::success("ok"))
    }

    /// The engine never fails a read, so neither does this handler.
    pub async fn get_products(&self) -> Json<ApiResponse<ProductDocument>> {
        let doc = self.engine.get_products().await;
        Json(ApiResponse::success(doc))
    }

    /// Record the editor's working copy locally. Storage problems stay on
    /// the server side, so the editor always gets an acknowledgement.
    pub async fn save_products(&self, Json(doc): Json<ProductDocument>) -> Json<ApiResponse<()>> {
        info!(products = doc.products.len(), "Save request received");
        self.engine.save_locally(&doc).await;
        Json(ApiResponse::success(()))
    }

    /// The outcome object is the protocol: a failed commit is still an
    /// HTTP 200 with `success: false` inside.
    pub async fn commit_products(&self, Json(request): Json<CommitRequest>) -> Json<CommitOutcome> {
        info!(
            products = request.document.products.len(),
            "Commit request received"
        );
        let outcome = self
            .engine
            .commit_to_remote(&request.document, request.message)
            .await;
        Json(outcome)
    }

    pub async fn export_products(
        &self,
    ) -> Result<([(header::HeaderName, &'static str); 2], String), StatusCode> {
        match self.engine.export_document().await {
            Ok(text) => Ok((
                [
                    (header::CONTENT_TYPE, "application/json"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"products.json\"",
                    ),
                ],
                text,
            )),
            Err(e) => {
                error!(error = %e, "Failed to export document");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Parse an uploaded document and adopt it as the working copy. The
    /// parse error message goes back to the editor for display.
    pub async fn import_products(
        &self,
        body: Bytes,
    ) -> (StatusCode, Json<ApiResponse<ProductDocument>>) {
        match self.engine.import_document(&body).await {
            Ok(doc) => (StatusCode::OK, Json(ApiResponse::success(doc))),
            Err(e) => {
                error!(error = %e, "Import failed");
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(e.to_string())),
                )
            }
        }
    }

    pub async fn clear_local(&self) -> Result<Json<ApiResponse<()>>, StatusCode> {
        match self.engine.clear_local().await {
            Ok(()) => Ok(Json(ApiResponse::success(()))),
            Err(e) => {
                error!(error = %e, "Failed to clear local state");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub async fn status(&self) -> Json<ApiResponse<EngineStatus>> {
        Json(ApiResponse::success(self.engine.status().await))
    }

    pub async fn test_connection(&self) -> Json<ConnectionStatus> {
        Json(self.engine.test_connection().await)
    }
}
