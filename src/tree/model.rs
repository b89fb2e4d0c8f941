//! Tree model: an arena of catalog nodes with per-node expansion state
//!
//! Nodes are addressed by `NodeKey`. Keys keep counting across reloads and
//! are never reused within a session, so a late fetch result can only ever
//! land on the node that asked for it, or on nothing.

use serde_json::{Map, Value};

use crate::catalog::CatalogNode;

/// Session-wide node number; the arena holds the current tree's slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub usize);

/// Expansion lifecycle of a single node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    /// Children unknown, never requested
    Unexpanded,
    /// Children request in flight
    Loading,
    /// Children fetched and cached for the node's lifetime
    Expanded,
    /// Last request failed; expanding again retries
    Failed(String),
}

/// State of the root listing
#[derive(Debug, Clone, PartialEq)]
pub enum RootsState {
    NotLoaded,
    Loading,
    Loaded,
    /// Upstream answered with an empty list
    Empty,
    /// The call itself failed
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub record: CatalogNode,
    pub state: NodeState,
    /// Display toggle, independent of the cached children
    pub open: bool,
    pub children: Vec<NodeKey>,
    pub parent: Option<NodeKey>,
    pub depth: usize,
}

impl TreeNode {
    fn new(record: CatalogNode, parent: Option<NodeKey>, depth: usize) -> Self {
        Self {
            record,
            state: NodeState::Unexpanded,
            open: false,
            children: Vec::new(),
            parent,
            depth,
        }
    }

    pub fn has_child(&self) -> bool {
        self.record.has_child
    }

    pub fn is_loading(&self) -> bool {
        self.state == NodeState::Loading
    }
}

/// Whole client state; owned by one session
#[derive(Debug, Clone)]
pub struct Model {
    pub nodes: Vec<TreeNode>,
    pub roots: Vec<NodeKey>,
    pub roots_state: RootsState,

    /// Node whose record the detail view shows
    pub selected: Option<NodeKey>,
    /// Highlighted row for keyboard navigation
    pub cursor: Option<NodeKey>,

    /// Key inside `properties` used for labels
    pub name_field: String,

    /// Latest failure, shown until dismissed or superseded
    pub error: Option<String>,

    /// Key of `nodes[0]`
    pub(crate) key_base: usize,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            roots_state: RootsState::NotLoaded,
            selected: None,
            cursor: None,
            name_field: "nameRu".to_string(),
            error: None,
            key_base: 0,
        }
    }
}

impl Model {
    pub fn with_name_field(name_field: impl Into<String>) -> Self {
        Self {
            name_field: name_field.into(),
            ..Default::default()
        }
    }

    pub fn node(&self, key: NodeKey) -> Option<&TreeNode> {
        key.0
            .checked_sub(self.key_base)
            .and_then(|index| self.nodes.get(index))
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut TreeNode> {
        key.0
            .checked_sub(self.key_base)
            .and_then(|index| self.nodes.get_mut(index))
    }

    /// Drop every node; keys handed out so far stay dead
    pub fn clear_nodes(&mut self) {
        self.key_base += self.nodes.len();
        self.nodes.clear();
    }

    /// Append records to the arena and return their keys
    pub fn insert_all(
        &mut self,
        records: Vec<CatalogNode>,
        parent: Option<NodeKey>,
        depth: usize,
    ) -> Vec<NodeKey> {
        records
            .into_iter()
            .map(|record| {
                let key = NodeKey(self.key_base + self.nodes.len());
                self.nodes.push(TreeNode::new(record, parent, depth));
                key
            })
            .collect()
    }

    pub fn label(&self, key: NodeKey) -> String {
        self.node(key)
            .map(|n| n.record.label(&self.name_field))
            .unwrap_or_default()
    }

    /// Full record of the selected node
    pub fn selected_record(&self) -> Option<Map<String, Value>> {
        self.selected
            .and_then(|key| self.node(key))
            .map(|n| n.record.to_record())
    }

    /// True if `key` sits somewhere below `ancestor`
    pub fn is_descendant(&self, key: NodeKey, ancestor: NodeKey) -> bool {
        let mut current = self.node(key).and_then(|n| n.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).and_then(|n| n.parent);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: i64, code: &str, has_child: bool) -> CatalogNode {
        serde_json::from_value(json!({
            "id": id, "code": code, "hasChild": has_child,
            "properties": {"nameRu": format!("name {}", code)}
        }))
        .unwrap()
    }

    #[test]
    fn test_insert_assigns_sequential_keys() {
        let mut model = Model::default();
        let keys = model.insert_all(vec![record(1, "A", true), record(2, "B", false)], None, 0);
        assert_eq!(keys, vec![NodeKey(0), NodeKey(1)]);

        let more = model.insert_all(vec![record(3, "A.1", false)], Some(NodeKey(0)), 1);
        assert_eq!(more, vec![NodeKey(2)]);
        assert_eq!(model.node(NodeKey(2)).unwrap().depth, 1);
        assert_eq!(model.node(NodeKey(2)).unwrap().state, NodeState::Unexpanded);
        assert!(!model.node(NodeKey(2)).unwrap().open);
    }

    #[test]
    fn test_is_descendant() {
        let mut model = Model::default();
        let roots = model.insert_all(vec![record(1, "A", true)], None, 0);
        let kids = model.insert_all(vec![record(2, "A.1", true)], Some(roots[0]), 1);
        let grandkids = model.insert_all(vec![record(3, "A.1.1", false)], Some(kids[0]), 2);

        assert!(model.is_descendant(grandkids[0], roots[0]));
        assert!(model.is_descendant(kids[0], roots[0]));
        assert!(!model.is_descendant(roots[0], kids[0]));
        assert!(!model.is_descendant(roots[0], roots[0]));
    }

    #[test]
    fn test_label_uses_name_field() {
        let mut model = Model::with_name_field("nameRu");
        let keys = model.insert_all(vec![record(1, "A", true)], None, 0);
        assert_eq!(model.label(keys[0]), "A — name A");
        assert_eq!(model.label(NodeKey(99)), "");
    }

    #[test]
    fn test_selected_record() {
        let mut model = Model::default();
        assert!(model.selected_record().is_none());
        let keys = model.insert_all(vec![record(1, "A", true)], None, 0);
        model.selected = Some(keys[0]);
        let rec = model.selected_record().unwrap();
        assert_eq!(rec["code"], json!("A"));
    }

    #[test]
    fn test_cleared_keys_stay_dead() {
        let mut model = Model::default();
        let old = model.insert_all(vec![record(1, "A", true), record(2, "B", false)], None, 0);
        model.clear_nodes();
        assert!(model.nodes.is_empty());
        assert!(model.node(old[0]).is_none());
        assert!(model.node(old[1]).is_none());

        let fresh = model.insert_all(vec![record(1, "A", true)], None, 0);
        assert_eq!(fresh, vec![NodeKey(2)]);
        assert!(!old.contains(&fresh[0]));
        assert_eq!(model.node(fresh[0]).unwrap().record.code, "A");
    }
}
