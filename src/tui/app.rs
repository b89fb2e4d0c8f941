//! Application state for the terminal browser
//!
//! Wraps a tree `Session` and runs its fetches on background threads.
//! Results come back over a channel and are applied on the UI thread, so
//! the model is only ever touched from one place.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::catalog::CatalogEndpoints;
use crate::tree::{FetchJob, Fetcher, Model, Msg, Session};

/// Fetcher shared with worker threads
pub type SharedFetcher = Arc<dyn Fetcher + Send + Sync>;

pub struct App {
    session: Session<SharedFetcher>,
    results_tx: Sender<Msg>,
    results_rx: Receiver<Msg>,
    in_flight: usize,
    pub show_help: bool,
    /// Where listings are fetched from, for the header
    pub source: String,
}

impl App {
    pub fn new(
        fetcher: SharedFetcher,
        endpoints: CatalogEndpoints,
        name_field: &str,
        source: impl Into<String>,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            session: Session::new(fetcher, endpoints, name_field),
            results_tx,
            results_rx,
            in_flight: 0,
            show_help: false,
            source: source.into(),
        }
    }

    pub fn model(&self) -> &Model {
        self.session.model()
    }

    /// Requests started but not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply a message; fetches it triggers start in the background.
    /// Returns true if the app should quit.
    pub fn dispatch(&mut self, msg: Msg) -> bool {
        if msg.is_fetch_result() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        let (jobs, quit) = self.session.dispatch_deferred(msg);
        for job in jobs {
            self.spawn(job);
        }
        quit
    }

    fn spawn(&mut self, job: FetchJob) {
        let fetcher = Arc::clone(self.session.fetcher());
        let tx = self.results_tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let msg = job.run(&fetcher);
            // Receiver gone means the UI has exited
            let _ = tx.send(msg);
        });
    }

    /// Apply every finished fetch without blocking
    pub fn poll_results(&mut self) {
        while let Ok(msg) = self.results_rx.try_recv() {
            self.dispatch(msg);
        }
    }

    /// Block until one fetch finishes and apply it
    #[cfg(test)]
    fn wait_for_result(&mut self) -> bool {
        match self.results_rx.recv() {
            Ok(msg) => {
                self.dispatch(msg);
                true
            }
            Err(_) => false,
        }
    }
}
