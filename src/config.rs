//! Configuration for catalog-relay
//!
//! Reads from .catalog-relay/config.toml, then applies environment
//! overrides. The upstream credential only ever comes from the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable holding the upstream credential
pub const CREDENTIAL_ENV: &str = "CATALOG_API_KEY";

/// Older name for the credential variable, still honoured
pub const LEGACY_CREDENTIAL_ENV: &str = "API_KEY";

const DEFAULT_BASE_URL: &str = "https://nationalcatalog.kz/gwp/portal/api/v1/dictionaries/oktru";

/// Configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Listening socket and worker count
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound credential and allowlist
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Upstream catalog endpoints
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Resolved from the environment, never serialized
    #[serde(skip)]
    pub credential: Option<Secret>,
}

/// HTTP server settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Interface to bind. Default: 127.0.0.1
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind. Default: 3000
    #[serde(default = "default_port")]
    pub port: u16,

    /// Threads pulling requests off the listener. Default: 4
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Credential header and outbound request settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProxyConfig {
    /// Header the credential is sent under.
    /// Default: "x-api-key". Bearer-style upstreams use "authorization".
    #[serde(default = "default_header_name")]
    pub header_name: String,

    /// Text placed before the credential in the header value, e.g. "Bearer ".
    /// Default: empty
    #[serde(default)]
    pub header_prefix: String,

    /// URL prefixes the proxy will forward to.
    /// Empty means the catalog base URL only.
    #[serde(default)]
    pub allowed_prefixes: Vec<String>,

    /// Outbound request timeout in seconds. Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Upstream catalog layout
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    /// Base URL of the dictionary API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the roots listing, relative to `base_url`
    #[serde(default = "default_roots_path")]
    pub roots_path: String,

    /// Path of the children listing; `{id}` is replaced by the parent id
    #[serde(default = "default_children_path")]
    pub children_path: String,

    /// Key inside `properties` used for the display name
    #[serde(default = "default_name_field")]
    pub name_field: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_workers() -> usize {
    4
}

fn default_header_name() -> String {
    "x-api-key".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_roots_path() -> String {
    "roots".to_string()
}

fn default_children_path() -> String {
    "children/{id}".to_string()
}

fn default_name_field() -> String {
    "nameRu".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            header_name: default_header_name(),
            header_prefix: String::new(),
            allowed_prefixes: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            roots_path: default_roots_path(),
            children_path: default_children_path(),
            name_field: default_name_field(),
        }
    }
}

/// A credential value that never prints itself
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for building the outbound header only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Problems reading an explicitly named config file
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    /// Load config from .catalog-relay/config.toml plus the environment.
    /// Returns defaults if no file is found or the file is unreadable.
    pub fn load() -> Self {
        let mut config = Self::find_config_path()
            .and_then(|path| match Self::from_file(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("{}; using defaults", e);
                    None
                }
            })
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load an explicit config file plus the environment
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file without looking at the environment
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find config.toml by walking up directory tree
    fn find_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(".catalog-relay").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT") {
            match port.trim().parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT value {:?}", port),
            }
        }
        if let Some(header) = non_empty("CATALOG_API_HEADER") {
            self.proxy.header_name = header;
        }
        if let Some(prefix) = lookup("CATALOG_API_HEADER_PREFIX") {
            self.proxy.header_prefix = prefix;
        }
        if let Some(base) = non_empty("CATALOG_BASE_URL") {
            self.catalog.base_url = base;
        }
        self.credential = non_empty(CREDENTIAL_ENV)
            .or_else(|| non_empty(LEGACY_CREDENTIAL_ENV))
            .map(Secret::new);
    }

    /// Prefixes the proxy may forward to; falls back to the catalog base
    pub fn allowed_prefixes(&self) -> Vec<String> {
        if self.proxy.allowed_prefixes.is_empty() {
            vec![self.catalog.base_url.clone()]
        } else {
            self.proxy.allowed_prefixes.clone()
        }
    }

    /// Address string for binding the server
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}
