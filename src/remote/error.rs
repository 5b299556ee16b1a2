// SPDX-License-Identifier: GPL-3.0-only
use thiserror::Error;

/// Failures surfaced by the remote versioned store.
///
/// Absence of a file is not a failure and is reported as `Ok(None)` by
/// reads; a compare-and-swap mismatch is `VersionConflict` so callers can
/// re-read and retry deliberately.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("remote store rejected the credentials (status {status})")]
    Auth { status: u16 },

    #[error("version conflict writing {path}")]
    VersionConflict { path: String },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode {context}: {message}")]
    Decode { context: String, message: String },
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}
