//! Pure projections of the model for presentation layers
//!
//! Nothing here does I/O. The TUI, the plain-text printer and the tests all
//! read the tree through these functions.

use serde_json::{Map, Value};

use super::model::{Model, NodeKey, NodeState, RootsState};

/// What a row offers the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// No children to fetch
    Leaf,
    /// Can be expanded (first time or re-opened)
    Collapsed,
    /// Children shown
    Open,
    /// Request in flight
    Loading,
    /// Last request failed, can be retried
    Failed,
}

impl Affordance {
    pub fn marker(&self) -> &'static str {
        match self {
            Affordance::Leaf => "·",
            Affordance::Collapsed => "▸",
            Affordance::Open => "▾",
            Affordance::Loading => "…",
            Affordance::Failed => "!",
        }
    }
}

/// One visible line of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: NodeKey,
    pub depth: usize,
    pub label: String,
    pub affordance: Affordance,
    pub selected: bool,
}

/// One label/value line of the detail view
#[derive(Debug, Clone, PartialEq)]
pub struct DetailField {
    pub label: String,
    pub value: String,
    /// Value is a pretty-printed object or array
    pub structured: bool,
}

const CORE_FIELDS: &[&str] = &["id", "code", "hasChild", "properties"];

pub fn affordance(model: &Model, key: NodeKey) -> Affordance {
    let Some(node) = model.node(key) else {
        return Affordance::Leaf;
    };
    if !node.has_child() {
        return Affordance::Leaf;
    }
    match node.state {
        NodeState::Loading => Affordance::Loading,
        NodeState::Failed(_) => Affordance::Failed,
        NodeState::Expanded if node.open => Affordance::Open,
        _ => Affordance::Collapsed,
    }
}

/// Flatten the open part of the forest, depth-first
pub fn visible_rows(model: &Model) -> Vec<Row> {
    let mut rows = Vec::new();
    if model.roots_state != RootsState::Loaded {
        return rows;
    }
    for &root in &model.roots {
        push_rows(model, root, &mut rows);
    }
    rows
}

fn push_rows(model: &Model, key: NodeKey, rows: &mut Vec<Row>) {
    let Some(node) = model.node(key) else {
        return;
    };
    rows.push(Row {
        key,
        depth: node.depth,
        label: node.record.label(&model.name_field),
        affordance: affordance(model, key),
        selected: model.selected == Some(key),
    });
    if node.open && node.state == NodeState::Expanded {
        for &child in &node.children {
            push_rows(model, child, rows);
        }
    }
}

/// Message to show in place of the tree, if there is no tree to show
pub fn roots_message(model: &Model) -> Option<String> {
    match &model.roots_state {
        RootsState::NotLoaded => Some("Not loaded".to_string()),
        RootsState::Loading => Some("Loading root data...".to_string()),
        RootsState::Empty => Some("No data: the catalog returned an empty list.".to_string()),
        RootsState::Failed(e) => Some(format!("Request failed: {}", e)),
        RootsState::Loaded => None,
    }
}

/// Every top-level field of a record; nested values stay structured
pub fn detail_fields(record: &Map<String, Value>) -> Vec<DetailField> {
    let core = CORE_FIELDS
        .iter()
        .filter_map(|&name| record.get(name).map(|value| (name.to_string(), value)));
    let rest = record
        .iter()
        .filter(|(name, _)| !CORE_FIELDS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value));

    core.chain(rest)
        .map(|(label, value)| {
            let (value, structured) = format_value(value);
            DetailField {
                label,
                value,
                structured,
            }
        })
        .collect()
}

fn format_value(value: &Value) -> (String, bool) {
    match value {
        Value::String(s) => (s.clone(), false),
        Value::Object(_) | Value::Array(_) => (
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            true,
        ),
        other => (other.to_string(), false),
    }
}

/// Detail view for the current selection
pub fn selected_detail(model: &Model) -> Option<Vec<DetailField>> {
    model.selected_record().map(|record| detail_fields(&record))
}

/// Plain-text rendering: one indented line per visible row
pub fn render_text(model: &Model) -> String {
    if let Some(message) = roots_message(model) {
        return message;
    }
    visible_rows(model)
        .iter()
        .map(|row| {
            let mut line = format!(
                "{}{} {}",
                "  ".repeat(row.depth),
                row.affordance.marker(),
                row.label
            );
            if let Some(NodeState::Failed(e)) = model.node(row.key).map(|n| &n.state) {
                line.push_str(&format!("  [{}]", e));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Position of `key` among the visible rows
pub fn row_index(rows: &[Row], key: NodeKey) -> Option<usize> {
    rows.iter().position(|r| r.key == key)
}
