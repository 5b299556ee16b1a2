// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use crate::catalog::ProductDocument;

/// Durable local snapshot of the catalog between sessions.
///
/// Reads are infallible by contract: a missing, corrupt, or unreadable
/// snapshot is reported as absent (and logged), never as an error, so
/// callers can always fall through to the remote store.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Last saved document, or None when absent or unreadable
    async fn read_document(&self) -> Option<ProductDocument>;

    /// Replace the stored document
    async fn write_document(&self, doc: &ProductDocument) -> anyhow::Result<()>;

    /// Whether local edits exist that have not been confirmed remotely.
    /// Absent flag reads as false.
    async fn is_dirty(&self) -> bool;

    async fn mark_dirty(&self, dirty: bool) -> anyhow::Result<()>;

    /// Drop the stored document and the dirty flag
    async fn clear(&self) -> anyhow::Result<()>;
}
