//! HTTP server for the catalog relay
//!
//! `catalog-relay serve` → binds, prints the viewer URL, relays `POST /proxy`

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use colored::Colorize;
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{error, info, warn};

use crate::catalog::{CatalogEndpoints, ID_PLACEHOLDER};
use crate::config::Config;
use crate::error::RelayError;
use crate::proxy::Relay;

// Single-page viewer; placeholders are filled in once at startup
const VIEWER_HTML: &str = include_str!("viewer.html");

const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct Health {
    ok: bool,
    credential: bool,
}

#[derive(Deserialize)]
struct ProxyRequest {
    url: String,
}

/// What a route produced, before it is written to the socket
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn error(status: u16, message: String) -> Self {
        let body = serde_json::to_string(&ErrorBody { error: message })
            .unwrap_or_else(|_| "{\"error\":\"internal error\"}".to_string());
        Self::json(status, body)
    }

    fn from_relay_error(e: &RelayError) -> Self {
        Self::error(e.status_code(), e.to_string())
    }
}

/// Everything a worker needs; shared read-only between workers
pub struct AppState {
    relay: Relay,
    page: String,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, RelayError> {
        let endpoints = CatalogEndpoints::new(&config.catalog)
            .map_err(|e| RelayError::Setup(format!("invalid catalog base URL: {}", e)))?;
        Ok(Self {
            relay: Relay::new(config)?,
            page: render_viewer(&endpoints, &config.catalog.name_field),
        })
    }

    /// Route one request given its method, path and body
    pub fn route(&self, method: &Method, path: &str, body: &str) -> Reply {
        match (method, path) {
            (&Method::Get, "/") | (&Method::Get, "/index.html") => Reply {
                status: 200,
                content_type: "text/html; charset=utf-8",
                body: self.page.clone(),
            },

            (&Method::Get, "/health") => {
                let health = Health {
                    ok: true,
                    credential: self.relay.has_credential(),
                };
                match serde_json::to_string(&health) {
                    Ok(json) => Reply::json(200, json),
                    Err(e) => Reply::error(500, e.to_string()),
                }
            }

            (&Method::Post, "/proxy") => self.proxy(body),

            (_, "/proxy") => Reply::error(405, "Use POST /proxy".to_string()),

            _ => Reply {
                status: 404,
                content_type: "text/plain; charset=utf-8",
                body: "Not found".to_string(),
            },
        }
    }

    fn proxy(&self, body: &str) -> Reply {
        let req: ProxyRequest = match serde_json::from_str(body) {
            Ok(r) => r,
            Err(e) => {
                return Reply::from_relay_error(&RelayError::InvalidRequest(format!(
                    "expected {{\"url\": \"...\"}}: {}",
                    e
                )))
            }
        };

        match self.relay.relay(&req.url) {
            Ok(relayed) => {
                if !relayed.is_success() {
                    warn!(status = relayed.status, "Relaying upstream error status");
                }
                match serde_json::to_string(&relayed.body) {
                    Ok(json) => Reply::json(relayed.status, json),
                    Err(e) => Reply::error(500, e.to_string()),
                }
            }
            Err(e) => {
                warn!("Proxy error: {}", e);
                Reply::from_relay_error(&e)
            }
        }
    }
}

fn render_viewer(endpoints: &CatalogEndpoints, name_field: &str) -> String {
    let js = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
    VIEWER_HTML
        .replace("{{ROOTS_URL}}", &js(&endpoints.roots_url()))
        .replace("{{CHILDREN_URL}}", &js(&endpoints.children_url_template()))
        .replace("{{ID_PLACEHOLDER}}", &js(ID_PLACEHOLDER))
        .replace("{{NAME_FIELD}}", &js(name_field))
}

/// Bound listener plus the state its workers share
pub struct RelayServer {
    server: Arc<Server>,
    state: Arc<AppState>,
    workers: usize,
}

impl RelayServer {
    /// Bind the configured address
    pub fn bind(config: &Config) -> std::io::Result<Self> {
        Self::bind_addr(config, &config.bind_addr())
    }

    /// Bind an explicit address (use port 0 for an ephemeral port)
    pub fn bind_addr(config: &Config, addr: &str) -> std::io::Result<Self> {
        let state = AppState::new(config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        let server = Server::http(addr).map_err(|e| std::io::Error::other(e.to_string()))?;

        Ok(Self {
            server: Arc::new(server),
            state: Arc::new(state),
            workers: config.server.workers.max(1),
        })
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve until the listener fails; each worker handles requests independently
    pub fn run(self) -> std::io::Result<()> {
        let mut handles = Vec::with_capacity(self.workers);
        for i in 0..self.workers {
            let server = Arc::clone(&self.server);
            let state = Arc::clone(&self.state);
            let handle = thread::Builder::new()
                .name(format!("relay-worker-{}", i))
                .spawn(move || worker_loop(&server, &state))?;
            handles.push(handle);
        }

        for handle in handles {
            if handle.join().is_err() {
                error!("Worker thread panicked");
            }
        }
        Ok(())
    }
}

fn worker_loop(server: &Server, state: &AppState) {
    loop {
        match server.recv() {
            Ok(request) => {
                if let Err(e) = handle_request(state, request) {
                    warn!("Failed to write response: {}", e);
                }
            }
            Err(e) => {
                error!("Listener failed: {}", e);
                break;
            }
        }
    }
}

fn handle_request(state: &AppState, mut request: Request) -> std::io::Result<()> {
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("/").to_string();
    let method = request.method().clone();

    let mut body = String::new();
    if method == Method::Post {
        let read = request
            .as_reader()
            .take(MAX_BODY_BYTES)
            .read_to_string(&mut body);
        if let Err(e) = read {
            let reply = Reply::from_relay_error(&RelayError::InvalidRequest(format!(
                "Failed to read body: {}",
                e
            )));
            return respond(request, reply);
        }
    }

    let reply = state.route(&method, &path, &body);
    respond(request, reply)
}

fn respond(request: Request, reply: Reply) -> std::io::Result<()> {
    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    request.respond(response)
}

/// Start the relay server and block
pub fn start_relay_server(config: &Config) -> std::io::Result<()> {
    if config.has_credential() {
        info!("Upstream credential loaded");
    } else {
        warn!(
            "No upstream credential set ({} is empty); proxy calls will fail",
            crate::config::CREDENTIAL_ENV
        );
    }

    let server = RelayServer::bind(config)?;
    let url = match server.addr() {
        Some(addr) => format!("http://{}", addr),
        None => format!("http://{}", config.bind_addr()),
    };

    eprintln!("\n{}", "🌲 Catalog Relay".green().bold());
    eprintln!("   Viewer: {}", url);
    eprintln!("   Upstream: {}", config.catalog.base_url);
    eprintln!("   Press Ctrl+C to stop\n");

    server.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    fn state() -> AppState {
        let mut config = Config::default();
        config.catalog.base_url = "http://127.0.0.1:9/api".to_string();
        config.credential = Some(Secret::new("k"));
        AppState::new(&config).unwrap()
    }

    // === Routing Tests ===

    #[test]
    fn test_viewer_is_served() {
        let reply = state().route(&Method::Get, "/", "");
        assert_eq!(reply.status, 200);
        assert!(reply.content_type.starts_with("text/html"));
        assert!(reply.body.contains("<!DOCTYPE html>"));
        assert!(reply.body.contains("</html>"));
    }

    #[test]
    fn test_viewer_has_endpoints_filled_in() {
        let reply = state().route(&Method::Get, "/index.html", "");
        assert!(reply.body.contains("\"http://127.0.0.1:9/api/roots\""));
        assert!(reply.body.contains("\"http://127.0.0.1:9/api/children/__ID__\""));
        assert!(!reply.body.contains("{{ROOTS_URL}}"));
        assert!(!reply.body.contains("{{NAME_FIELD}}"));
    }

    #[test]
    fn test_viewer_clears_error_after_successful_fetch() {
        let body = state().route(&Method::Get, "/", "").body;
        assert!(body.contains("setError(result.error, key);"));
        assert!(body.contains("if (errorOwner === key) setError(\"\");"));
        assert_eq!(body.matches("setError(\"\");").count(), 3);
    }

    #[test]
    fn test_viewer_never_contains_credential() {
        let mut config = Config::default();
        config.credential = Some(Secret::new("page-secret-value"));
        let state = AppState::new(&config).unwrap();
        let reply = state.route(&Method::Get, "/", "");
        assert!(!reply.body.contains("page-secret-value"));
    }

    #[test]
    fn test_health_reports_credential_presence_only() {
        let reply = state().route(&Method::Get, "/health", "");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, "{\"ok\":true,\"credential\":true}");
    }

    #[test]
    fn test_unknown_path_is_404() {
        let reply = state().route(&Method::Get, "/nope", "");
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn test_proxy_requires_post() {
        let reply = state().route(&Method::Get, "/proxy", "");
        assert_eq!(reply.status, 405);
    }

    // === Proxy Body Tests ===

    #[test]
    fn test_proxy_rejects_malformed_body() {
        let reply = state().route(&Method::Post, "/proxy", "not json");
        assert_eq!(reply.status, 400);
        let body: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("Invalid request"));
    }

    #[test]
    fn test_proxy_rejects_foreign_target() {
        let reply = state().route(
            &Method::Post,
            "/proxy",
            r#"{"url": "http://169.254.169.254/latest/meta-data"}"#,
        );
        assert_eq!(reply.status, 403);
        assert_eq!(reply.content_type, "application/json");
    }

    #[test]
    fn test_proxy_without_credential_is_structured_error() {
        let mut config = Config::default();
        config.catalog.base_url = "http://127.0.0.1:9/api".to_string();
        let state = AppState::new(&config).unwrap();
        let reply = state.route(
            &Method::Post,
            "/proxy",
            r#"{"url": "http://127.0.0.1:9/api/roots"}"#,
        );
        assert_eq!(reply.status, 502);
        let body: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(body["error"], "Upstream credential is not configured");
    }

    #[test]
    fn test_error_reply_shape() {
        let reply = Reply::error(500, "boom".to_string());
        assert_eq!(reply.body, "{\"error\":\"boom\"}");
        assert_eq!(reply.content_type, "application/json");
    }
}
