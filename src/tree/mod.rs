//! Incremental tree client
//!
//! Loads a catalog forest one level at a time through the relay.
//! Structured after The Elm Architecture:
//! - `msg`: what happened (gestures, fetch results)
//! - `update`: pure state transitions, returns `Cmd`s for side effects
//! - `session`: the shell that turns `Cmd`s into proxy calls
//! - `render`: pure projections for whatever draws the tree
//!
//! Gestures are kept apart: selecting a node never expands it and
//! expanding never changes the selection.

pub mod model;
pub mod msg;
pub mod render;
pub mod session;
pub mod update;

pub use model::{Model, NodeKey, NodeState, RootsState, TreeNode};
pub use msg::{Listing, Msg};
pub use render::{detail_fields, render_text, visible_rows, Affordance, DetailField, Row};
pub use session::{FetchJob, FetchTarget, Fetcher, ProxyFetcher, Session};
pub use update::{update, Cmd};
