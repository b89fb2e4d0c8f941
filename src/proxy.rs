//! Credentialed relay to the upstream catalog
//!
//! `Relay::relay(url)` → checks the allowlist, attaches the credential
//! header, GETs the upstream and hands back its JSON body untouched.
//! The relay keeps no state between calls.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use reqwest::redirect::Policy;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{Config, Secret};
use crate::error::{RelayError, Result};

/// Upstream answer: status plus parsed JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Relayed {
    pub status: u16,
    pub body: Value,
}

impl Relayed {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Stateless relay holding the outbound client and the credential
pub struct Relay {
    client: Client,
    header_name: HeaderName,
    header_value: Option<HeaderValue>,
    secret: Option<Secret>,
    allowlist: Vec<Url>,
    timeout_secs: u64,
}

impl Relay {
    /// Build a relay from resolved configuration
    pub fn new(config: &Config) -> Result<Self> {
        let header_name = HeaderName::from_bytes(config.proxy.header_name.trim().as_bytes())
            .map_err(|_| {
                RelayError::Setup(format!(
                    "invalid credential header name {:?}",
                    config.proxy.header_name
                ))
            })?;

        let header_value = match &config.credential {
            Some(secret) => {
                let raw = format!("{}{}", config.proxy.header_prefix, secret.expose());
                let mut value = HeaderValue::from_str(&raw).map_err(|_| {
                    RelayError::Setup("credential contains characters not allowed in a header".into())
                })?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        let allowlist = config
            .allowed_prefixes()
            .iter()
            .filter_map(|prefix| match Url::parse(prefix) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Ignoring invalid allowlist entry {:?}: {}", prefix, e);
                    None
                }
            })
            .collect::<Vec<_>>();

        if allowlist.is_empty() {
            warn!("Proxy allowlist is empty; every request will be rejected");
        }

        let timeout_secs = config.proxy.timeout_secs.max(1);
        // Every hop would carry the credential, so redirects are never followed
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(Policy::none())
            .build()
            .map_err(|e| RelayError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            header_name,
            header_value,
            secret: config.credential.clone(),
            allowlist,
            timeout_secs,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.header_value.is_some()
    }

    /// Relay a GET to `target` with the credential attached
    pub fn relay(&self, target: &str) -> Result<Relayed> {
        let url = self.check_target(target)?;
        let credential = self
            .header_value
            .as_ref()
            .ok_or(RelayError::MissingCredential)?;

        info!(url = %url, "Proxy request");

        let response = self
            .client
            .get(url)
            .header(self.header_name.clone(), credential.clone())
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        info!(status, "Upstream status");

        if response.status().is_redirection() {
            warn!(status, "Upstream redirect refused");
            return Err(RelayError::Redirected { status });
        }

        let bytes = response.bytes().map_err(|e| self.classify(e))?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|e| {
            debug!("Upstream body is not JSON: {}", e);
            RelayError::InvalidBody { status }
        })?;

        Ok(Relayed { status, body })
    }

    /// Parse `target` and make sure it falls under an allowed prefix
    pub fn check_target(&self, target: &str) -> Result<Url> {
        let url = Url::parse(target.trim())
            .map_err(|e| RelayError::InvalidTarget(format!("{}: {}", target, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RelayError::InvalidTarget(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }

        if !self.allowlist.iter().any(|prefix| url_has_prefix(&url, prefix)) {
            warn!(url = %url, "Rejected target outside allowlist");
            return Err(RelayError::Forbidden(url.to_string()));
        }

        Ok(url)
    }

    fn classify(&self, e: reqwest::Error) -> RelayError {
        if e.is_timeout() {
            return RelayError::Timeout {
                secs: self.timeout_secs,
            };
        }
        let message = self.scrub(&e.to_string());
        warn!("Proxy error: {}", message);
        RelayError::Transport(message)
    }

    /// Remove the credential from text headed for a caller or a log
    fn scrub(&self, text: &str) -> String {
        match &self.secret {
            Some(secret) if !secret.expose().is_empty() => text.replace(secret.expose(), "***"),
            _ => text.to_string(),
        }
    }
}

/// Same origin, and the path continues the prefix at a segment boundary
fn url_has_prefix(url: &Url, prefix: &Url) -> bool {
    if !url.username().is_empty() || url.password().is_some() {
        return false;
    }
    if url.scheme() != prefix.scheme()
        || url.host_str() != prefix.host_str()
        || url.port_or_known_default() != prefix.port_or_known_default()
    {
        return false;
    }

    let base = prefix.path().trim_end_matches('/');
    let path = url.path();
    match path.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
