// SPDX-License-Identifier: GPL-3.0-only
use reqwest::Client;
use tracing::info;

use crate::catalog::{ProductDocument, decode_document};

/// Anonymous reader for the published copy of the document, used when no
/// remote store is configured or an authenticated read fails. Sends no
/// credentials.
pub struct PublicReader {
    client: Client,
}

impl PublicReader {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("catalog-syncd/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> anyhow::Result<ProductDocument> {
        info!(url = %url, "Fetching published document anonymously");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "fallback fetch failed with status {}",
                response.status()
            ));
        }

        let bytes = response.bytes().await?;
        let doc = decode_document(&bytes)?;

        Ok(doc)
    }
}
