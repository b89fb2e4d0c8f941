//! Tree client runtime: runs the commands `update` asks for
//!
//! `Session::dispatch` is the synchronous shell (tests, the `print`
//! command). `Session::dispatch_deferred` hands fetches back to the caller
//! as `FetchJob`s so a UI can run them off the event loop and feed the
//! resulting message back in later.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::catalog::{decode_nodes, CatalogEndpoints, CatalogNode};
use crate::error::FetchError;

use super::model::{Model, NodeKey, NodeState};
use super::msg::{Listing, Msg};
use super::update::{update, Cmd};

/// Something that can fetch a catalog listing by URL
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<CatalogNode>, FetchError>;
}

impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    fn fetch(&self, url: &str) -> Result<Vec<CatalogNode>, FetchError> {
        (**self).fetch(url)
    }
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn fetch(&self, url: &str) -> Result<Vec<CatalogNode>, FetchError> {
        (**self).fetch(url)
    }
}

/// Fetches listings through the relay's `POST /proxy` endpoint
#[derive(Clone)]
pub struct ProxyFetcher {
    client: Client,
    proxy_url: String,
}

impl ProxyFetcher {
    pub fn new(proxy_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            proxy_url: proxy_url.into(),
        })
    }
}

impl Fetcher for ProxyFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<CatalogNode>, FetchError> {
        debug!(url, "Fetching through proxy");
        let response = self
            .client
            .post(&self.proxy_url)
            .json(&json!({ "url": url }))
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = body
                .as_ref()
                .and_then(|b| b.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| body.as_ref().map(Value::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        match body {
            Some(body) => decode_nodes(body),
            None => Err(FetchError::Decode("response is not JSON".to_string())),
        }
    }
}

/// Which listing a job fetches
#[derive(Debug, Clone, PartialEq)]
pub enum FetchTarget {
    Roots,
    Children(NodeKey),
}

/// A fetch requested by `update`, ready to run anywhere
#[derive(Debug, Clone, PartialEq)]
pub struct FetchJob {
    pub target: FetchTarget,
    pub url: String,
}

impl FetchJob {
    /// Run the fetch and wrap the outcome as the message `update` expects
    pub fn run<F: Fetcher + ?Sized>(&self, fetcher: &F) -> Msg {
        let result: Listing = fetcher.fetch(&self.url);
        match self.target {
            FetchTarget::Roots => Msg::RootsLoaded(result),
            FetchTarget::Children(key) => Msg::ChildrenLoaded(key, result),
        }
    }
}

/// One client session: model, endpoints and the fetcher behind them
pub struct Session<F: Fetcher> {
    model: Model,
    endpoints: CatalogEndpoints,
    fetcher: F,
}

impl<F: Fetcher> Session<F> {
    pub fn new(fetcher: F, endpoints: CatalogEndpoints, name_field: &str) -> Self {
        Self {
            model: Model::with_name_field(name_field),
            endpoints,
            fetcher,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Apply `msg` and run every resulting fetch to completion.
    /// Returns false once the client asked to quit.
    pub fn dispatch(&mut self, msg: Msg) -> bool {
        let mut queue = vec![msg];
        let mut running = true;
        while let Some(msg) = queue.pop() {
            let (jobs, quit) = self.dispatch_deferred(msg);
            running &= !quit;
            // Results go back in order
            for job in jobs.into_iter().rev() {
                queue.push(job.run(&self.fetcher));
            }
        }
        running
    }

    /// Apply `msg` and return the fetches it requested without running them
    pub fn dispatch_deferred(&mut self, msg: Msg) -> (Vec<FetchJob>, bool) {
        let model = std::mem::take(&mut self.model);
        let (model, cmd) = update(msg, model);
        self.model = model;

        let quit = cmd.is_quit();
        let jobs = cmd
            .flatten()
            .into_iter()
            .filter_map(|cmd| self.job_for(cmd))
            .collect();
        (jobs, quit)
    }

    fn job_for(&self, cmd: Cmd) -> Option<FetchJob> {
        match cmd {
            Cmd::FetchRoots => Some(FetchJob {
                target: FetchTarget::Roots,
                url: self.endpoints.roots_url(),
            }),
            Cmd::FetchChildren { key, id } => Some(FetchJob {
                target: FetchTarget::Children(key),
                url: self.endpoints.children_url(&id),
            }),
            Cmd::None | Cmd::Quit | Cmd::Batch(_) => None,
        }
    }

    // === Client operations ===

    /// Fetch and install the root listing
    pub fn load_roots(&mut self) {
        self.dispatch(Msg::LoadRoots);
    }

    /// Expand `key` (or toggle it when its children are cached)
    pub fn expand(&mut self, key: NodeKey) {
        self.dispatch(Msg::Expand(key));
    }

    pub fn collapse(&mut self, key: NodeKey) {
        self.dispatch(Msg::Collapse(key));
    }

    /// Publish `key`'s record to the detail view
    pub fn select(&mut self, key: NodeKey) {
        self.dispatch(Msg::Select(key));
    }

    /// Expand every expandable node down to `depth` levels (roots are level 1)
    pub fn expand_to_depth(&mut self, depth: usize) {
        let mut frontier: Vec<NodeKey> = self.model.roots.clone();
        for _ in 1..depth {
            let mut next = Vec::new();
            for key in frontier {
                let (expandable, shown) = match self.model.node(key) {
                    Some(n) => (n.has_child(), n.open && n.state == NodeState::Expanded),
                    None => (false, false),
                };
                if !expandable {
                    continue;
                }
                if !shown {
                    self.expand(key);
                }
                if let Some(node) = self.model.node(key) {
                    next.extend(node.children.iter().copied());
                }
            }
            frontier = next;
        }
    }
}
