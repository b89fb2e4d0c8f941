//! Messages for the tree client
//!
//! Every user gesture and every fetch completion is a `Msg`. Messages
//! describe what happened; `update` decides what it means.

use crate::catalog::CatalogNode;
use crate::error::FetchError;

use super::model::NodeKey;

/// Outcome of a listing request
pub type Listing = Result<Vec<CatalogNode>, FetchError>;

/// All possible messages for the tree client
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    // === Lifecycle ===
    /// Fetch the root listing (again)
    LoadRoots,
    /// Root listing arrived
    RootsLoaded(Listing),
    /// Leave the client
    Quit,
    /// Nothing happened
    Noop,

    // === Tree ===
    /// Expand a node, or toggle it if its children are already cached
    Expand(NodeKey),
    /// Children listing for a node arrived
    ChildrenLoaded(NodeKey, Listing),
    /// Hide a node's children; the cache stays
    Collapse(NodeKey),

    // === Selection ===
    /// Publish a node's record to the detail view
    Select(NodeKey),
    ClearSelection,

    // === Cursor ===
    MoveUp,
    MoveDown,
    JumpToTop,
    JumpToBottom,
    /// `Expand` on the highlighted row
    ExpandAtCursor,
    /// `Collapse` on the highlighted row, or move to its parent if closed
    CollapseAtCursor,
    /// `Select` on the highlighted row
    SelectAtCursor,

    /// Clear the error surface
    DismissError,
}

impl Msg {
    /// Check if this message was produced by a finished fetch
    pub fn is_fetch_result(&self) -> bool {
        matches!(self, Msg::RootsLoaded(_) | Msg::ChildrenLoaded(_, _))
    }
}
