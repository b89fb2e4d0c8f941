//! Catalog Relay - credentialed proxy and lazy tree browser for code catalogs
//!
//! Keeps the catalog API key on the server, loads the tree one level at a time.
//!
//! # Overview
//!
//! A remote catalog exposes a forest of coded entries through two listings:
//! the roots, and the children of one entry. The catalog wants an API key
//! that must never reach a browser. This crate provides:
//!
//! | Piece | Purpose |
//! |-------|---------|
//! | [`proxy`] | `POST /proxy` relay that adds the key and forwards JSON |
//! | [`serve`] | HTTP server hosting the relay and a single-page viewer |
//! | [`tree`] | Incremental tree client: lazy expansion, selection, detail |
//! | [`tui`] | Terminal browser built on the tree client |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use catalog_relay::{CatalogEndpoints, Config};
//! use catalog_relay::tree::{render_text, ProxyFetcher, Session};
//!
//! let config = Config::load();
//! let endpoints = CatalogEndpoints::new(&config.catalog).unwrap();
//! let fetcher = ProxyFetcher::new("http://127.0.0.1:3000/proxy", Duration::from_secs(30)).unwrap();
//!
//! let mut session = Session::new(fetcher, endpoints, &config.catalog.name_field);
//! session.load_roots();
//! session.expand_to_depth(2);
//! println!("{}", render_text(session.model()));
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod proxy;
pub mod serve;
pub mod tree;
pub mod tui;

pub use catalog::{CatalogEndpoints, CatalogNode, NodeId, ID_PLACEHOLDER};
pub use config::{Config, Secret};
pub use error::{FetchError, RelayError};
pub use proxy::{Relay, Relayed};
pub use serve::{start_relay_server, RelayServer};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify core types are re-exported from crate root
        let _ = ID_PLACEHOLDER;
        let _ = Config::default();
        let _ = NodeId::from(1);
    }
}
