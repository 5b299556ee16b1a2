// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote versioned store; when absent or incomplete the engine runs
    /// in local-only mode and commits fail fast as not configured
    pub remote: Option<RemoteConfig>,

    /// Public URL of the published document, fetched anonymously when no
    /// usable remote read is available
    pub fallback_url: Option<String>,

    /// SQLite database path for the local snapshot cache
    pub cache_db_path: PathBuf,

    /// Local API bind address (e.g., "127.0.0.1:8080")
    pub local_api_bind: SocketAddr,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Image source policy for outbound validation
    pub images: ImageConfig,

    /// URL recorded in every generated checkout index entry
    pub index_public_url: String,
}

/// Fields missing from the file fall back to defaults; a section missing
/// token, owner or repo parses fine but counts as not configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Bearer token; treated as opaque and never logged
    pub token: String,

    pub owner: String,

    pub repo: String,

    pub branch: String,

    /// Repository path of the catalog document
    pub product_path: String,

    /// Repository path of the derived checkout index
    pub index_path: String,

    pub api_base_url: String,
}

impl RemoteConfig {
    /// A remote is usable only once token, owner and repo are all set.
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.owner.is_empty() && !self.repo.is_empty()
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            product_path: default_product_path(),
            index_path: default_index_path(),
            api_base_url: default_api_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Remote URL prefixes product images may use; relative paths and
    /// data URLs are always allowed
    pub allowed_prefixes: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            allowed_prefixes: default_allowed_prefixes(),
        }
    }
}

fn default_branch() -> String {
    String::from("main")
}

fn default_product_path() -> String {
    String::from("data/products.json")
}

fn default_index_path() -> String {
    String::from("data/snipcart-products.json")
}

fn default_api_base_url() -> String {
    String::from("https://api.github.com")
}

fn default_allowed_prefixes() -> Vec<String> {
    vec![
        String::from("https://res.cloudinary.com/"),
        String::from("https://images.unsplash.com/"),
    ]
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            std::env::var("CATSYNC_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut config: Config = if std::path::Path::new(&config_path).exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents)?
        } else {
            // Use default configuration
            Config::default()
        };

        // Apply environment variable overrides. Remote fields may arrive
        // entirely via the environment, so the section is created on demand.
        let env_token = std::env::var("CATSYNC_REMOTE_TOKEN").ok();
        let env_owner = std::env::var("CATSYNC_REMOTE_OWNER").ok();
        let env_repo = std::env::var("CATSYNC_REMOTE_REPO").ok();
        let env_branch = std::env::var("CATSYNC_REMOTE_BRANCH").ok();
        if env_token.is_some() || env_owner.is_some() || env_repo.is_some() || env_branch.is_some()
        {
            let mut remote = config.remote.take().unwrap_or_default();
            if let Some(val) = env_token {
                remote.token = val;
            }
            if let Some(val) = env_owner {
                remote.owner = val;
            }
            if let Some(val) = env_repo {
                remote.repo = val;
            }
            if let Some(val) = env_branch {
                remote.branch = val;
            }
            config.remote = Some(remote);
        }

        if let Ok(val) = std::env::var("CATSYNC_FALLBACK_URL") {
            config.fallback_url = Some(val);
        }
        if let Ok(val) = std::env::var("CATSYNC_CACHE_DB_PATH") {
            config.cache_db_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CATSYNC_LOCAL_API_BIND") {
            config.local_api_bind = SocketAddr::from_str(&val)?;
        }
        if let Ok(val) = std::env::var("CATSYNC_LOG_LEVEL") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// The remote store configuration, only when usable.
    pub fn active_remote(&self) -> Option<&RemoteConfig> {
        self.remote.as_ref().filter(|r| r.is_complete())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: None,
            fallback_url: None,
            cache_db_path: PathBuf::from("catalog-cache.db"),
            local_api_bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: String::from("info"),
            images: ImageConfig::default(),
            index_public_url: String::from("/snipcart-products.json"),
        }
    }
}
