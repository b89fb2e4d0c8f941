//! Tree client update function
//!
//! ```text
//! update : Msg -> Model -> (Model, Cmd)
//! ```
//!
//! The update function is pure: it never fetches anything. A fetch is
//! requested by returning a `Cmd`, which the session runs and answers with
//! a `RootsLoaded` / `ChildrenLoaded` message.
//!
//! Per-node guarantees enforced here:
//! - children are fetched at most once successfully
//! - at most one children request is in flight (`Loading` swallows `Expand`)
//! - a failed request never leaves the node in `Loading`

use crate::catalog::NodeId;

use super::model::{Model, NodeKey, NodeState, RootsState};
use super::msg::Msg;
use super::render::{row_index, visible_rows};

/// Side effects for the runtime to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// No command
    None,
    /// Multiple commands to execute
    Batch(Vec<Cmd>),
    /// Quit the client
    Quit,
    /// Request the root listing
    FetchRoots,
    /// Request the children listing of `key`
    FetchChildren { key: NodeKey, id: NodeId },
}

impl Cmd {
    /// Create a batch of commands
    pub fn batch(cmds: Vec<Cmd>) -> Cmd {
        let mut cmds: Vec<Cmd> = cmds
            .into_iter()
            .filter(|c| !matches!(c, Cmd::None))
            .collect();
        match cmds.len() {
            0 => Cmd::None,
            1 => cmds.pop().unwrap_or(Cmd::None),
            _ => Cmd::Batch(cmds),
        }
    }

    /// Check if this is a quit command
    pub fn is_quit(&self) -> bool {
        match self {
            Cmd::Quit => true,
            Cmd::Batch(cmds) => cmds.iter().any(Cmd::is_quit),
            _ => false,
        }
    }

    /// Flatten batches into a list of leaf commands
    pub fn flatten(self) -> Vec<Cmd> {
        match self {
            Cmd::None => Vec::new(),
            Cmd::Batch(cmds) => cmds.into_iter().flat_map(Cmd::flatten).collect(),
            other => vec![other],
        }
    }
}

/// Process a message and return new state + commands
pub fn update(msg: Msg, model: Model) -> (Model, Cmd) {
    match msg {
        // === Lifecycle ===
        Msg::Quit => (model, Cmd::Quit),

        Msg::Noop => (model, Cmd::None),

        Msg::LoadRoots => {
            if model.roots_state == RootsState::Loading {
                return (model, Cmd::None);
            }
            // Old keys resolve to nothing, so late results for them are dropped
            let mut model = model;
            model.clear_nodes();
            (
                Model {
                    roots: Vec::new(),
                    roots_state: RootsState::Loading,
                    selected: None,
                    cursor: None,
                    error: None,
                    ..model
                },
                Cmd::FetchRoots,
            )
        }

        Msg::RootsLoaded(result) => {
            if model.roots_state != RootsState::Loading {
                return (model, Cmd::None);
            }
            let mut model = model;
            match result {
                Ok(records) if records.is_empty() => {
                    model.roots_state = RootsState::Empty;
                }
                Ok(records) => {
                    model.roots = model.insert_all(records, None, 0);
                    model.roots_state = RootsState::Loaded;
                    model.cursor = model.roots.first().copied();
                }
                Err(e) => {
                    let message = e.to_string();
                    model.error = Some(message.clone());
                    model.roots_state = RootsState::Failed(message);
                }
            }
            (model, Cmd::None)
        }

        // === Tree ===
        Msg::Expand(key) => expand(key, model),

        Msg::ChildrenLoaded(key, result) => {
            let pending = model
                .node(key)
                .filter(|node| node.is_loading())
                .map(|node| (node.depth + 1, node.record.label(&model.name_field)));
            let Some((depth, label)) = pending else {
                return (model, Cmd::None);
            };
            let mut model = model;

            match result {
                Ok(records) => {
                    let children = model.insert_all(records, Some(key), depth);
                    if let Some(node) = model.node_mut(key) {
                        node.children = children;
                        node.state = NodeState::Expanded;
                    }
                    // A retry that worked retires this node's old failure
                    let own_error = format!("{}: ", label);
                    if model.error.as_ref().is_some_and(|e| e.starts_with(&own_error)) {
                        model.error = None;
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    if let Some(node) = model.node_mut(key) {
                        node.state = NodeState::Failed(message.clone());
                        node.open = false;
                    }
                    model.error = Some(format!("{}: {}", label, message));
                }
            }
            (model, Cmd::None)
        }

        Msg::Collapse(key) => {
            let mut model = model;
            if let Some(node) = model.node_mut(key) {
                node.open = false;
            }
            if let Some(cursor) = model.cursor {
                if model.is_descendant(cursor, key) {
                    model.cursor = Some(key);
                }
            }
            (model, Cmd::None)
        }

        // === Selection ===
        Msg::Select(key) => {
            if model.node(key).is_none() {
                return (model, Cmd::None);
            }
            (
                Model {
                    selected: Some(key),
                    cursor: Some(key),
                    ..model
                },
                Cmd::None,
            )
        }

        Msg::ClearSelection => (
            Model {
                selected: None,
                ..model
            },
            Cmd::None,
        ),

        // === Cursor ===
        Msg::MoveUp => move_cursor(model, |pos, _| pos.saturating_sub(1)),

        Msg::MoveDown => move_cursor(model, |pos, len| (pos + 1).min(len - 1)),

        Msg::JumpToTop => move_cursor(model, |_, _| 0),

        Msg::JumpToBottom => move_cursor(model, |_, len| len - 1),

        Msg::ExpandAtCursor => match model.cursor {
            Some(key) => update(Msg::Expand(key), model),
            None => (model, Cmd::None),
        },

        Msg::SelectAtCursor => match model.cursor {
            Some(key) => update(Msg::Select(key), model),
            None => (model, Cmd::None),
        },

        Msg::CollapseAtCursor => {
            let Some(key) = model.cursor else {
                return (model, Cmd::None);
            };
            let Some((open, parent)) = model.node(key).map(|node| (node.open, node.parent)) else {
                return (model, Cmd::None);
            };
            if open {
                update(Msg::Collapse(key), model)
            } else {
                (
                    Model {
                        cursor: parent.or(Some(key)),
                        ..model
                    },
                    Cmd::None,
                )
            }
        }

        Msg::DismissError => (Model { error: None, ..model }, Cmd::None),
    }
}

fn expand(key: NodeKey, model: Model) -> (Model, Cmd) {
    let mut model = model;
    let Some(node) = model.node_mut(key) else {
        return (model, Cmd::None);
    };
    if !node.has_child() {
        return (model, Cmd::None);
    }

    match node.state {
        // Already in flight: a second request would double-fetch
        NodeState::Loading => (model, Cmd::None),
        NodeState::Expanded => {
            node.open = !node.open;
            (model, Cmd::None)
        }
        NodeState::Unexpanded | NodeState::Failed(_) => {
            node.state = NodeState::Loading;
            node.open = true;
            let id = node.record.id.clone();
            (model, Cmd::FetchChildren { key, id })
        }
    }
}

/// Move the cursor along the visible rows; `step(pos, len)` with len >= 1
fn move_cursor<F>(model: Model, step: F) -> (Model, Cmd)
where
    F: Fn(usize, usize) -> usize,
{
    let rows = visible_rows(&model);
    if rows.is_empty() {
        return (model, Cmd::None);
    }
    let pos = model
        .cursor
        .and_then(|key| row_index(&rows, key))
        .unwrap_or(0);
    let next = step(pos, rows.len()).min(rows.len() - 1);
    (
        Model {
            cursor: Some(rows[next].key),
            ..model
        },
        Cmd::None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogNode;
    use crate::error::FetchError;
    use serde_json::json;

    fn record(id: i64, code: &str, has_child: bool) -> CatalogNode {
        serde_json::from_value(json!({
            "id": id, "code": code, "hasChild": has_child,
            "properties": {"nameRu": code}
        }))
        .unwrap()
    }

    fn loaded(records: Vec<CatalogNode>) -> Model {
        let (model, _) = update(Msg::LoadRoots, Model::default());
        let (model, _) = update(Msg::RootsLoaded(Ok(records)), model);
        model
    }

    fn count_fetches(cmds: &[Cmd]) -> usize {
        cmds.iter()
            .flat_map(|c| c.clone().flatten())
            .filter(|c| matches!(c, Cmd::FetchChildren { .. }))
            .count()
    }

    // === Roots Tests ===

    #[test]
    fn test_load_roots_requests_fetch() {
        let (model, cmd) = update(Msg::LoadRoots, Model::default());
        assert_eq!(model.roots_state, RootsState::Loading);
        assert_eq!(cmd, Cmd::FetchRoots);

        // Second request while loading is swallowed
        let (_, cmd) = update(Msg::LoadRoots, model);
        assert_eq!(cmd, Cmd::None);
    }

    #[test]
    fn test_roots_loaded() {
        let model = loaded(vec![record(1, "A", true), record(2, "B", false)]);
        assert_eq!(model.roots_state, RootsState::Loaded);
        assert_eq!(model.roots.len(), 2);
        assert_eq!(model.cursor, Some(model.roots[0]));
        for key in &model.roots {
            let node = model.node(*key).unwrap();
            assert_eq!(node.state, NodeState::Unexpanded);
            assert!(!node.open);
        }
    }

    #[test]
    fn test_roots_empty_is_not_an_error() {
        let model = loaded(vec![]);
        assert_eq!(model.roots_state, RootsState::Empty);
        assert!(model.error.is_none());
    }

    #[test]
    fn test_roots_failure() {
        let (model, _) = update(Msg::LoadRoots, Model::default());
        let err = FetchError::Status {
            status: 502,
            message: "Upstream request failed".into(),
        };
        let (model, _) = update(Msg::RootsLoaded(Err(err)), model);
        assert!(matches!(model.roots_state, RootsState::Failed(ref m) if m.contains("502")));
        assert!(model.error.is_some());
    }

    #[test]
    fn test_unrequested_roots_result_is_ignored() {
        let (model, _) = update(Msg::RootsLoaded(Ok(vec![record(1, "A", true)])), Model::default());
        assert_eq!(model.roots_state, RootsState::NotLoaded);
        assert!(model.nodes.is_empty());
    }

    // === Expansion Tests ===

    #[test]
    fn test_expand_fetches_once() {
        let model = loaded(vec![record(1, "A", true)]);
        let key = model.roots[0];

        let (model, cmd) = update(Msg::Expand(key), model);
        assert_eq!(
            cmd,
            Cmd::FetchChildren {
                key,
                id: NodeId::from(1)
            }
        );
        assert_eq!(model.node(key).unwrap().state, NodeState::Loading);
        assert!(model.node(key).unwrap().open);

        // Rapid second expand while loading: no second fetch
        let (model, cmd) = update(Msg::Expand(key), model);
        assert_eq!(cmd, Cmd::None);
        assert_eq!(model.node(key).unwrap().state, NodeState::Loading);
    }

    #[test]
    fn test_children_loaded() {
        let model = loaded(vec![record(1, "A", true)]);
        let key = model.roots[0];
        let (model, _) = update(Msg::Expand(key), model);
        let (model, _) = update(
            Msg::ChildrenLoaded(key, Ok(vec![record(2, "A.1", false), record(3, "A.2", true)])),
            model,
        );

        let node = model.node(key).unwrap();
        assert_eq!(node.state, NodeState::Expanded);
        assert!(node.open);
        assert_eq!(node.children.len(), 2);

        let child = model.node(node.children[1]).unwrap();
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent, Some(key));
        assert_eq!(child.state, NodeState::Unexpanded);
        assert!(!child.open);
    }

    #[test]
    fn test_expanded_node_toggles_without_fetch() {
        let model = loaded(vec![record(1, "A", true)]);
        let key = model.roots[0];
        let (model, _) = update(Msg::Expand(key), model);
        let (model, _) = update(Msg::ChildrenLoaded(key, Ok(vec![record(2, "A.1", false)])), model);
        let children = model.node(key).unwrap().children.clone();

        let mut model = model;
        let mut cmds = Vec::new();
        for _ in 0..5 {
            let (m, cmd) = update(Msg::Expand(key), model);
            cmds.push(cmd);
            model = m;
        }
        assert_eq!(count_fetches(&cmds), 0);
        // Five toggles from open: ends closed
        assert!(!model.node(key).unwrap().open);
        assert_eq!(model.node(key).unwrap().children, children);

        let (model, cmd) = update(Msg::Expand(key), model);
        assert_eq!(cmd, Cmd::None);
        assert!(model.node(key).unwrap().open);
    }

    #[test]
    fn test_expand_leaf_is_noop() {
        let model = loaded(vec![record(1, "A", false)]);
        let key = model.roots[0];
        let (model, cmd) = update(Msg::Expand(key), model);
        assert_eq!(cmd, Cmd::None);
        assert_eq!(model.node(key).unwrap().state, NodeState::Unexpanded);
    }

    #[test]
    fn test_expand_unknown_key_is_noop() {
        let model = loaded(vec![record(1, "A", true)]);
        let (_, cmd) = update(Msg::Expand(NodeKey(42)), model);
        assert_eq!(cmd, Cmd::None);
    }

    #[test]
    fn test_failed_expand_is_retryable() {
        let model = loaded(vec![record(1, "A", true)]);
        let key = model.roots[0];
        let (model, _) = update(Msg::Expand(key), model);
        let (model, _) = update(
            Msg::ChildrenLoaded(key, Err(FetchError::Transport("connection refused".into()))),
            model,
        );

        let node = model.node(key).unwrap();
        assert!(matches!(node.state, NodeState::Failed(_)));
        assert!(!node.open);
        assert!(model.error.as_ref().unwrap().starts_with("A — A: "));

        let (model, cmd) = update(Msg::Expand(key), model);
        assert!(matches!(cmd, Cmd::FetchChildren { .. }));
        assert_eq!(model.node(key).unwrap().state, NodeState::Loading);
    }

    #[test]
    fn test_successful_retry_clears_its_error() {
        let model = loaded(vec![record(1, "A", true), record(2, "B", true)]);
        let (a, b) = (model.roots[0], model.roots[1]);
        let refused = || Err(FetchError::Transport("connection refused".into()));

        let (model, _) = update(Msg::Expand(a), model);
        let (model, _) = update(Msg::ChildrenLoaded(a, refused()), model);
        let (model, _) = update(Msg::Expand(a), model);
        let (model, _) = update(Msg::ChildrenLoaded(a, Ok(vec![])), model);
        assert!(model.error.is_none());

        // Someone else's failure stays up
        let (model, _) = update(Msg::Expand(b), model);
        let (model, _) = update(Msg::ChildrenLoaded(b, refused()), model);
        let (model, _) = update(Msg::Collapse(a), model);
        let (model, _) = update(Msg::Expand(a), model);
        assert!(model.error.as_ref().unwrap().starts_with("B — B: "));
    }

    #[test]
    fn test_late_result_for_settled_node_is_ignored() {
        let model = loaded(vec![record(1, "A", true)]);
        let key = model.roots[0];
        let (model, _) = update(Msg::Expand(key), model);
        let (model, _) = update(Msg::ChildrenLoaded(key, Ok(vec![record(2, "A.1", false)])), model);
        let (model, _) = update(
            Msg::ChildrenLoaded(key, Ok(vec![record(9, "X", false), record(10, "Y", false)])),
            model,
        );
        assert_eq!(model.node(key).unwrap().children.len(), 1);
    }

    #[test]
    fn test_reload_drops_results_for_previous_tree() {
        let model = loaded(vec![record(1, "A", true)]);
        let stale = model.roots[0];
        let (model, _) = update(Msg::Expand(stale), model);

        let (model, _) = update(Msg::LoadRoots, model);
        assert!(model.nodes.is_empty());
        let (model, _) = update(Msg::RootsLoaded(Ok(vec![record(1, "A", true)])), model);
        let fresh = model.roots[0];
        assert_ne!(fresh, stale);

        let (model, _) = update(
            Msg::ChildrenLoaded(stale, Ok(vec![record(2, "A.1", false)])),
            model,
        );
        assert_eq!(model.nodes.len(), 1);
        assert!(model.node(stale).is_none());
        assert_eq!(model.node(fresh).unwrap().state, NodeState::Unexpanded);
        assert!(!model.nodes.iter().any(|n| n.is_loading()));
    }

    #[test]
    fn test_collapse_keeps_children_and_moves_cursor_up() {
        let model = loaded(vec![record(1, "A", true)]);
        let key = model.roots[0];
        let (model, _) = update(Msg::Expand(key), model);
        let (model, _) = update(Msg::ChildrenLoaded(key, Ok(vec![record(2, "A.1", false)])), model);
        let (model, _) = update(Msg::MoveDown, model);
        let child = model.node(key).unwrap().children[0];
        assert_eq!(model.cursor, Some(child));

        let (model, _) = update(Msg::Collapse(key), model);
        assert!(!model.node(key).unwrap().open);
        assert_eq!(model.node(key).unwrap().children.len(), 1);
        assert_eq!(model.cursor, Some(key));
    }

    // === Selection Tests ===

    #[test]
    fn test_select_replaces_previous_selection() {
        let model = loaded(vec![record(1, "A", true), record(2, "B", false)]);
        let (a, b) = (model.roots[0], model.roots[1]);

        let (model, _) = update(Msg::Select(a), model);
        assert_eq!(model.selected, Some(a));
        let (model, _) = update(Msg::Select(b), model);
        assert_eq!(model.selected, Some(b));
        assert_eq!(model.selected_record().unwrap()["code"], json!("B"));

        let (model, _) = update(Msg::ClearSelection, model);
        assert!(model.selected.is_none());
    }

    #[test]
    fn test_select_does_not_expand() {
        let model = loaded(vec![record(1, "A", true)]);
        let key = model.roots[0];
        let (model, cmd) = update(Msg::Select(key), model);
        assert_eq!(cmd, Cmd::None);
        assert_eq!(model.node(key).unwrap().state, NodeState::Unexpanded);
    }

    // === Cursor Tests ===

    #[test]
    fn test_cursor_movement() {
        let model = loaded(vec![record(1, "A", false), record(2, "B", false), record(3, "C", false)]);
        let keys = model.roots.clone();

        let (model, _) = update(Msg::MoveUp, model);
        assert_eq!(model.cursor, Some(keys[0]));
        let (model, _) = update(Msg::MoveDown, model);
        assert_eq!(model.cursor, Some(keys[1]));
        let (model, _) = update(Msg::JumpToBottom, model);
        assert_eq!(model.cursor, Some(keys[2]));
        let (model, _) = update(Msg::MoveDown, model);
        assert_eq!(model.cursor, Some(keys[2]));
        let (model, _) = update(Msg::JumpToTop, model);
        assert_eq!(model.cursor, Some(keys[0]));
    }

    #[test]
    fn test_cursor_actions() {
        let model = loaded(vec![record(1, "A", true)]);
        let key = model.roots[0];

        let (model, cmd) = update(Msg::ExpandAtCursor, model);
        assert!(matches!(cmd, Cmd::FetchChildren { key: k, .. } if k == key));

        let (model, _) = update(Msg::SelectAtCursor, model);
        assert_eq!(model.selected, Some(key));

        let (model, _) = update(Msg::CollapseAtCursor, model);
        assert!(!model.node(key).unwrap().open);
    }

    #[test]
    fn test_cursor_on_empty_tree() {
        let (model, cmd) = update(Msg::MoveDown, Model::default());
        assert_eq!(cmd, Cmd::None);
        assert!(model.cursor.is_none());
        let (_, cmd) = update(Msg::ExpandAtCursor, model);
        assert_eq!(cmd, Cmd::None);
    }

    // === Command Tests ===

    #[test]
    fn test_quit_command() {
        let (_, cmd) = update(Msg::Quit, Model::default());
        assert!(cmd.is_quit());
    }

    #[test]
    fn test_dismiss_error() {
        let model = Model {
            error: Some("boom".into()),
            ..Default::default()
        };
        let (model, _) = update(Msg::DismissError, model);
        assert!(model.error.is_none());
    }

    #[test]
    fn test_cmd_batch_empty() {
        assert_eq!(Cmd::batch(vec![]), Cmd::None);
    }

    #[test]
    fn test_cmd_batch_single() {
        assert_eq!(Cmd::batch(vec![Cmd::Quit]), Cmd::Quit);
    }

    #[test]
    fn test_cmd_batch_filters_none() {
        let result = Cmd::batch(vec![Cmd::None, Cmd::FetchRoots, Cmd::None]);
        assert_eq!(result, Cmd::FetchRoots);
    }

    #[test]
    fn test_cmd_flatten() {
        let cmd = Cmd::Batch(vec![
            Cmd::FetchRoots,
            Cmd::Batch(vec![Cmd::Quit, Cmd::None]),
        ]);
        assert!(cmd.is_quit());
        assert_eq!(cmd.flatten(), vec![Cmd::FetchRoots, Cmd::Quit]);
    }
}
