// SPDX-License-Identifier: GPL-3.0-only
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RemoteConfig;
use crate::remote::error::StoreError;

const ACCEPT_HEADER: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// A file read from the store together with the opaque version token that
/// a later compare-and-swap write must present.
#[derive(Debug, Clone)]
pub struct RemoteFileHandle {
    pub path: String,
    pub content: Vec<u8>,
    pub version: String,
}

/// Result of a successful write: the file's next version token plus the
/// commit that recorded it.
#[derive(Debug, Clone)]
pub struct WriteResult {
    pub new_version: String,
    pub commit_id: String,
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub full_name: String,
    pub private: bool,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Serialize)]
struct WritePayload<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct WriteResponse {
    content: WriteContent,
    commit: WriteCommit,
}

#[derive(Deserialize)]
struct WriteContent {
    sha: String,
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct WriteCommit {
    sha: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Client for one branch of a contents-API repository. Transfers opaque
/// bytes and version tokens only; product semantics stay with the caller.
pub struct ContentsClient {
    client: Client,
    remote: RemoteConfig,
}

impl ContentsClient {
    pub fn new(remote: RemoteConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("catalog-syncd/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, remote })
    }

    pub fn remote(&self) -> &RemoteConfig {
        &self.remote
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.remote.api_base_url.trim_end_matches('/'),
            self.remote.owner,
            self.remote.repo,
            path
        )
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.remote.token))
            .header("Accept", ACCEPT_HEADER)
            .header(API_VERSION_HEADER, API_VERSION)
    }

    fn error_message(text: &str) -> String {
        match serde_json::from_str::<ApiErrorBody>(text) {
            Ok(body) => body.message,
            Err(_) => text.trim().chars().take(200).collect(),
        }
    }

    /// Fetch a file with its current version token. Absent files are
    /// `Ok(None)`.
    pub async fn read_file(&self, path: &str) -> Result<Option<RemoteFileHandle>, StoreError> {
        let url = self.contents_url(path);
        debug!(path = %path, "Reading remote file");

        let response = self
            .authed(self.client.get(&url))
            .query(&[("ref", self.remote.branch.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(path = %path, "Remote file absent");
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Auth {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let message = Self::error_message(&response.text().await.unwrap_or_default());
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ContentsResponse = response.json().await?;
        if body.encoding != "base64" {
            return Err(StoreError::Decode {
                context: path.to_string(),
                message: format!("unsupported content encoding '{}'", body.encoding),
            });
        }

        // The API wraps base64 payloads with embedded newlines
        let compact: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
        let content = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| StoreError::Decode {
                context: path.to_string(),
                message: e.to_string(),
            })?;

        Ok(Some(RemoteFileHandle {
            path: path.to_string(),
            content,
            version: body.sha,
        }))
    }

    /// Compare-and-swap write. `expected_version` of None means the file
    /// is assumed absent and the write creates it; a stale or wrongly
    /// absent version yields `VersionConflict`.
    pub async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        expected_version: Option<&str>,
        message: &str,
    ) -> Result<WriteResult, StoreError> {
        let url = self.contents_url(path);
        let payload = WritePayload {
            message,
            content: STANDARD.encode(content),
            branch: &self.remote.branch,
            sha: expected_version,
        };

        debug!(path = %path, expected_version = ?expected_version, "Writing remote file");

        let response = self.authed(self.client.put(&url)).json(&payload).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Auth {
                status: status.as_u16(),
            });
        }
        // The API reports compare-and-swap mismatches as 409 or 422
        // depending on how the stale version was detected
        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            warn!(path = %path, status = %status, "Remote write rejected: version conflict");
            return Err(StoreError::VersionConflict {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            let message = Self::error_message(&response.text().await.unwrap_or_default());
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: WriteResponse = response.json().await?;
        info!(path = %path, commit = %body.commit.sha, "Remote file written");

        Ok(WriteResult {
            new_version: body.content.sha,
            commit_id: body.commit.sha,
            remote_url: body.content.html_url,
        })
    }

    /// Probe the repository itself; used by the connection test.
    pub async fn repo_info(&self) -> Result<RepoInfo, StoreError> {
        let url = format!(
            "{}/repos/{}/{}",
            self.remote.api_base_url.trim_end_matches('/'),
            self.remote.owner,
            self.remote.repo
        );

        let response = self.authed(self.client.get(&url)).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Auth {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let message = Self::error_message(&response.text().await.unwrap_or_default());
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let info: RepoInfo = response.json().await?;
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, ServerGuard};

    fn test_remote(base_url: &str) -> RemoteConfig {
        RemoteConfig {
            token: "test-token".to_string(),
            owner: "acme".to_string(),
            repo: "shop-content".to_string(),
            api_base_url: base_url.to_string(),
            ..RemoteConfig::default()
        }
    }

    async fn setup_client() -> (ServerGuard, ContentsClient) {
        let server = mockito::Server::new_async().await;
        let client = ContentsClient::new(test_remote(&server.url())).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_read_file_decodes_wrapped_base64() {
        let (mut server, client) = setup_client().await;

        // The API wraps long payloads; embedded newlines must not break decoding
        let encoded = STANDARD.encode(r#"{"products": []}"#);
        let (head, tail) = encoded.split_at(8);
        let wrapped = format!("{}\n{}\n", head, tail);

        let mock = server
            .mock(
                "GET",
                "/repos/acme/shop-content/contents/data/products.json?ref=main",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "sha": "abc123",
                    "content": wrapped,
                    "encoding": "base64"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let handle = client
            .read_file("data/products.json")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(handle.path, "data/products.json");
        assert_eq!(handle.version, "abc123");
        assert_eq!(
            String::from_utf8(handle.content).unwrap(),
            r#"{"products": []}"#
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_file_absent_returns_none() {
        let (mut server, client) = setup_client().await;

        let mock = server
            .mock(
                "GET",
                "/repos/acme/shop-content/contents/data/products.json?ref=main",
            )
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let result = client.read_file("data/products.json").await.unwrap();
        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_file_auth_failure() {
        let (mut server, client) = setup_client().await;

        let _mock = server
            .mock(
                "GET",
                "/repos/acme/shop-content/contents/data/products.json?ref=main",
            )
            .with_status(401)
            .with_body(r#"{"message": "Bad credentials"}"#)
            .create_async()
            .await;

        let err = client.read_file("data/products.json").await.unwrap_err();
        assert!(matches!(err, StoreError::Auth { status: 401 }));
    }

    #[tokio::test]
    async fn test_read_file_server_error_maps_to_api() {
        let (mut server, client) = setup_client().await;

        let _mock = server
            .mock(
                "GET",
                "/repos/acme/shop-content/contents/data/products.json?ref=main",
            )
            .with_status(500)
            .with_body(r#"{"message": "boom"}"#)
            .create_async()
            .await;

        let err = client.read_file("data/products.json").await.unwrap_err();
        match err {
            StoreError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_file_sends_expected_version() {
        let (mut server, client) = setup_client().await;

        let mock = server
            .mock("PUT", "/repos/acme/shop-content/contents/data/products.json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "branch": "main",
                "sha": "oldsha"
            })))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "content": {
                        "sha": "newsha",
                        "html_url": "https://github.com/acme/shop-content/blob/main/data/products.json"
                    },
                    "commit": {"sha": "deadbeef0123456"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = client
            .write_file(
                "data/products.json",
                br#"{"products": []}"#,
                Some("oldsha"),
                "Update products",
            )
            .await
            .unwrap();

        assert_eq!(result.new_version, "newsha");
        assert_eq!(result.commit_id, "deadbeef0123456");
        assert_eq!(
            result.remote_url.as_deref(),
            Some("https://github.com/acme/shop-content/blob/main/data/products.json")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_write_file_create_omits_version_field() {
        let (mut server, client) = setup_client().await;
        let content = br#"{"products": []}"#;

        // Exact body match: a create request must not carry a sha key
        let mock = server
            .mock("PUT", "/repos/acme/shop-content/contents/data/products.json")
            .match_body(Matcher::Json(serde_json::json!({
                "message": "Create products",
                "content": STANDARD.encode(content),
                "branch": "main"
            })))
            .with_status(201)
            .with_body(
                serde_json::json!({
                    "content": {"sha": "firstsha", "html_url": null},
                    "commit": {"sha": "c0ffee1234567"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = client
            .write_file("data/products.json", content, None, "Create products")
            .await
            .unwrap();

        assert_eq!(result.new_version, "firstsha");
        assert_eq!(result.remote_url, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_write_file_conflict_on_409() {
        let (mut server, client) = setup_client().await;

        let _mock = server
            .mock("PUT", "/repos/acme/shop-content/contents/data/products.json")
            .with_status(409)
            .with_body(r#"{"message": "is at deadbeef but expected cafebabe"}"#)
            .create_async()
            .await;

        let err = client
            .write_file("data/products.json", b"{}", Some("cafebabe"), "Update")
            .await
            .unwrap_err();

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_write_file_conflict_on_422() {
        let (mut server, client) = setup_client().await;

        let _mock = server
            .mock("PUT", "/repos/acme/shop-content/contents/data/products.json")
            .with_status(422)
            .with_body(r#"{"message": "sha does not match"}"#)
            .create_async()
            .await;

        let err = client
            .write_file("data/products.json", b"{}", None, "Update")
            .await
            .unwrap_err();

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_repo_info() {
        let (mut server, client) = setup_client().await;

        let mock = server
            .mock("GET", "/repos/acme/shop-content")
            .with_status(200)
            .with_body(r#"{"full_name": "acme/shop-content", "private": true}"#)
            .create_async()
            .await;

        let info = client.repo_info().await.unwrap();
        assert_eq!(info.full_name, "acme/shop-content");
        assert!(info.private);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_repo_info_auth_failure() {
        let (mut server, client) = setup_client().await;

        let _mock = server
            .mock("GET", "/repos/acme/shop-content")
            .with_status(403)
            .with_body(r#"{"message": "Forbidden"}"#)
            .create_async()
            .await;

        let err = client.repo_info().await.unwrap_err();
        assert!(matches!(err, StoreError::Auth { status: 403 }));
    }
}
