// SPDX-License-Identifier: GPL-3.0-only
//! Orchestrates the local snapshot cache, the remote versioned store and
//! the derived checkout index behind one interface.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::SnapshotCache;
use crate::catalog::{ProductDocument, decode_document, encode_document};
use crate::config::Config;
use crate::index::{encode_index, generate_index};
use crate::remote::{ContentsClient, PublicReader, StoreError, WriteResult};
use crate::validation::{ImagePolicy, sanitize_document, validate_products};

/// Last version observed or produced per remote resource. In-memory only:
/// a fresh process re-reads before its first write.
#[derive(Debug, Default)]
struct VersionSlots {
    primary: Option<String>,
    index: Option<String>,
}

/// Structured result of a commit attempt, serialized to the editor as-is.
#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    pub product_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the catalog committed but the checkout index write failed;
    /// the index stays stale until the next successful commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
}

impl CommitOutcome {
    fn failed(product_count: usize, error: String) -> Self {
        Self {
            success: false,
            commit_id: None,
            product_count,
            remote_url: None,
            error: Some(error),
            index_error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Configuration and cache summary for the editor's settings view.
/// Deliberately excludes the access token.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub dirty: bool,
    pub cached_products: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
}

pub struct SyncEngine {
    cache: Arc<dyn SnapshotCache>,
    remote: Option<ContentsClient>,
    fallback: Option<(String, PublicReader)>,
    images: ImagePolicy,
    index_url: String,
    versions: Mutex<VersionSlots>,
}

impl SyncEngine {
    pub fn new(config: &Config, cache: Arc<dyn SnapshotCache>) -> anyhow::Result<Self> {
        let remote = match config.active_remote() {
            Some(remote_config) => Some(ContentsClient::new(remote_config.clone())?),
            None => {
                info!("No remote store configured, running local-only");
                None
            }
        };

        let fallback = match &config.fallback_url {
            Some(url) => Some((url.clone(), PublicReader::new()?)),
            None => None,
        };

        Ok(Self {
            cache,
            remote,
            fallback,
            images: ImagePolicy::from_config(&config.images),
            index_url: config.index_public_url.clone(),
            versions: Mutex::new(VersionSlots::default()),
        })
    }

    /// Current document for the editor. Never fails: cache first, then the
    /// remote store, then the published fallback copy, then an empty
    /// document.
    pub async fn get_products(&self) -> ProductDocument {
        if let Some(doc) = self.cache.read_document().await {
            debug!(products = doc.products.len(), "Serving document from cache");
            return sanitize_document(doc);
        }

        if let Some(remote) = &self.remote {
            match remote.read_file(&remote.remote().product_path).await {
                Ok(Some(handle)) => match decode_document(&handle.content) {
                    Ok(doc) => {
                        info!(
                            version = %handle.version,
                            products = doc.products.len(),
                            "Loaded document from remote store"
                        );
                        self.versions.lock().await.primary = Some(handle.version);
                        let doc = sanitize_document(doc);
                        self.store_snapshot(&doc).await;
                        return doc;
                    }
                    Err(e) => warn!(error = %e, "Remote document is unparseable, falling back"),
                },
                Ok(None) => debug!("Remote document absent, falling back"),
                Err(e) => warn!(error = %e, "Remote read failed, falling back"),
            }
        }

        if let Some((url, reader)) = &self.fallback {
            match reader.fetch(url).await {
                Ok(doc) => {
                    info!(products = doc.products.len(), "Loaded document from published fallback");
                    let doc = sanitize_document(doc);
                    self.store_snapshot(&doc).await;
                    return doc;
                }
                Err(e) => warn!(error = %e, "Published fallback fetch failed"),
            }
        }

        debug!("No document available anywhere, serving empty document");
        ProductDocument::empty()
    }

    /// Record edits locally and flag them as uncommitted. Storage problems
    /// are logged, never surfaced: the editor keeps its in-memory copy
    /// either way.
    pub async fn save_locally(&self, doc: &ProductDocument) {
        if let Err(e) = self.cache.write_document(doc).await {
            error!(error = %e, "Failed to store local snapshot");
        }
        if let Err(e) = self.cache.mark_dirty(true).await {
            error!(error = %e, "Failed to set dirty flag");
        }
        debug!(products = doc.products.len(), "Saved document locally");
    }

    pub async fn is_dirty(&self) -> bool {
        self.cache.is_dirty().await
    }

    /// Validate and publish the document, then regenerate the checkout
    /// index. Commits on one engine run one at a time; overlapping callers
    /// wait their turn.
    pub async fn commit_to_remote(
        &self,
        doc: &ProductDocument,
        message: Option<String>,
    ) -> CommitOutcome {
        let product_count = doc.products.len();

        let Some(client) = &self.remote else {
            warn!("Commit requested but no remote store is configured");
            return CommitOutcome::failed(product_count, "remote store not configured".to_string());
        };

        let errors = validate_products(&doc.products, &self.images);
        if !errors.is_empty() {
            warn!(count = errors.len(), "Validation failed, nothing written");
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return CommitOutcome::failed(product_count, joined);
        }

        let payload = match encode_document(doc) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to encode document");
                return CommitOutcome::failed(product_count, format!("failed to encode document: {e}"));
            }
        };

        let message = message
            .unwrap_or_else(|| format!("Update products ({product_count} items) via catalog editor"));
        let commit_ref = Uuid::new_v4();

        // Holding the slot lock across the whole commit serializes writers
        // on this engine instance
        let mut versions = self.versions.lock().await;

        info!(commit_ref = %commit_ref, products = product_count, "Committing document to remote store");

        let primary = match Self::write_with_conflict_retry(
            client,
            &client.remote().product_path,
            payload.as_bytes(),
            &message,
            &mut versions.primary,
        )
        .await
        {
            Ok(result) => result,
            Err(e) => {
                let reason = match &e {
                    StoreError::VersionConflict { .. } => "conflict".to_string(),
                    other => other.to_string(),
                };
                error!(commit_ref = %commit_ref, error = %e, "Document commit failed");
                return CommitOutcome::failed(product_count, reason);
            }
        };

        info!(commit_ref = %commit_ref, commit = %primary.commit_id, "Document committed");

        // The committed document is now the confirmed baseline
        self.store_snapshot(doc).await;
        if let Err(e) = self.cache.mark_dirty(false).await {
            warn!(error = %e, "Failed to clear dirty flag");
        }

        // The index is a separate resource with its own version; a failure
        // here leaves the catalog commit in place and is reported, not
        // rolled back
        let entries = generate_index(&doc.products, &self.index_url);
        let index_error = match encode_index(&entries) {
            Ok(index_payload) => {
                let index_message =
                    format!("Regenerate checkout price index ({} entries)", entries.len());
                match Self::write_with_conflict_retry(
                    client,
                    &client.remote().index_path,
                    index_payload.as_bytes(),
                    &index_message,
                    &mut versions.index,
                )
                .await
                {
                    Ok(result) => {
                        info!(
                            commit_ref = %commit_ref,
                            commit = %result.commit_id,
                            entries = entries.len(),
                            "Checkout index updated"
                        );
                        None
                    }
                    Err(e) => {
                        error!(commit_ref = %commit_ref, error = %e, "Checkout index write failed, catalog commit stands");
                        Some(e.to_string())
                    }
                }
            }
            Err(e) => {
                error!(commit_ref = %commit_ref, error = %e, "Failed to encode checkout index");
                Some(format!("failed to encode index: {e}"))
            }
        };

        CommitOutcome {
            success: true,
            commit_id: Some(short_commit(&primary.commit_id)),
            product_count,
            remote_url: primary.remote_url,
            error: None,
            index_error,
        }
    }

    /// One compare-and-swap write under the shared retry policy: present
    /// the version in `slot`, reading it first when the slot is empty (an
    /// absent file means create), and on a conflict re-read and retry
    /// exactly once. A second conflict is final.
    async fn write_with_conflict_retry(
        client: &ContentsClient,
        path: &str,
        content: &[u8],
        message: &str,
        slot: &mut Option<String>,
    ) -> Result<WriteResult, StoreError> {
        if slot.is_none() {
            *slot = client.read_file(path).await?.map(|handle| handle.version);
        }

        match client.write_file(path, content, slot.as_deref(), message).await {
            Ok(result) => {
                *slot = Some(result.new_version.clone());
                Ok(result)
            }
            Err(StoreError::VersionConflict { .. }) => {
                info!(path = %path, "Version conflict, re-reading and retrying once");
                *slot = None;
                let fresh = client.read_file(path).await?.map(|handle| handle.version);
                let result = client
                    .write_file(path, content, fresh.as_deref(), message)
                    .await?;
                *slot = Some(result.new_version.clone());
                Ok(result)
            }
            Err(e) => Err(e),
        }
    }

    /// Drop all local state; the next read falls through to the remote.
    pub async fn clear_local(&self) -> anyhow::Result<()> {
        self.cache.clear().await?;
        let mut versions = self.versions.lock().await;
        versions.primary = None;
        versions.index = None;
        info!("Local snapshot state cleared");
        Ok(())
    }

    /// Parse an exported document and adopt it as the local working copy.
    pub async fn import_document(&self, raw: &[u8]) -> anyhow::Result<ProductDocument> {
        let doc = decode_document(raw)?;
        let doc = sanitize_document(doc);
        info!(products = doc.products.len(), "Imported document");
        self.save_locally(&doc).await;
        Ok(doc)
    }

    /// Canonical encoding of the current document, for file export.
    pub async fn export_document(&self) -> anyhow::Result<String> {
        let doc = self.get_products().await;
        encode_document(&doc)
    }

    pub async fn test_connection(&self) -> ConnectionStatus {
        let Some(client) = &self.remote else {
            return ConnectionStatus {
                success: false,
                repo: None,
                private: None,
                error: Some("remote store not configured".to_string()),
            };
        };

        match client.repo_info().await {
            Ok(info) => {
                info!(repo = %info.full_name, "Remote store reachable");
                ConnectionStatus {
                    success: true,
                    repo: Some(info.full_name),
                    private: Some(info.private),
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Remote store connection test failed");
                ConnectionStatus {
                    success: false,
                    repo: None,
                    private: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn status(&self) -> EngineStatus {
        let cached_products = self.cache.read_document().await.map(|doc| doc.products.len());

        let mut status = EngineStatus {
            configured: self.remote.is_some(),
            owner: None,
            repo: None,
            branch: None,
            dirty: self.cache.is_dirty().await,
            cached_products,
            fallback_url: self.fallback.as_ref().map(|(url, _)| url.clone()),
        };

        if let Some(client) = &self.remote {
            let remote = client.remote();
            status.owner = Some(remote.owner.clone());
            status.repo = Some(remote.repo.clone());
            status.branch = Some(remote.branch.clone());
        }

        status
    }

    async fn store_snapshot(&self, doc: &ProductDocument) {
        if let Err(e) = self.cache.write_document(doc).await {
            warn!(error = %e, "Failed to cache document");
        }
    }
}

fn short_commit(commit_id: &str) -> String {
    commit_id.chars().take(7).collect()
}
