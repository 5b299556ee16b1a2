// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::cache::{SnapshotCache, SqliteCache};
use crate::catalog::{ProductDocument, decode_document};
use crate::config::{Config, RemoteConfig};

/// Create a snapshot cache backed by a temporary database file. Keep the
/// returned file handle alive for the duration of the test.
pub async fn setup_test_cache() -> (Arc<dyn SnapshotCache>, NamedTempFile) {
    let db_file = NamedTempFile::new().expect("Failed to create temp database file");
    let cache = SqliteCache::new(db_file.path())
        .await
        .expect("Failed to open test cache");
    (Arc::new(cache), db_file)
}

/// Remote store settings pointed at a mock server
pub fn test_remote_config(base_url: &str) -> RemoteConfig {
    RemoteConfig {
        token: "test-token".to_string(),
        owner: "acme".to_string(),
        repo: "shop-content".to_string(),
        api_base_url: base_url.to_string(),
        ..RemoteConfig::default()
    }
}

/// Create a test configuration with the remote store pointed at a mock server
pub fn create_test_config(base_url: &str) -> Config {
    Config {
        remote: Some(test_remote_config(base_url)),
        log_level: "error".to_string(), // Reduce log noise in tests
        ..Config::default()
    }
}

/// A minimal one-product document used across tests
pub fn sample_document() -> ProductDocument {
    decode_document(
        br#"{"products": [{"id": 1, "slug": "a", "sku": "A1", "title": "Product A", "price": "10.00"}]}"#,
    )
    .expect("sample document must parse")
}
