//! Catalog records and upstream endpoint layout
//!
//! A `CatalogNode` has a small typed core (`id`, `code`, `hasChild`) and
//! keeps everything else as untyped JSON. Unknown fields survive a
//! round-trip so the detail view can show them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

use crate::config::CatalogConfig;
use crate::error::FetchError;

/// Stand-in for the parent id in the children URL template handed to the viewer
pub const ID_PLACEHOLDER: &str = "__ID__";

/// Upstream identifier, numeric or textual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Number(n) => write!(f, "{}", n),
            NodeId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for NodeId {
    fn from(n: i64) -> Self {
        NodeId::Number(n.into())
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::Text(s.to_string())
    }
}

/// One entry of the catalog tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogNode {
    pub id: NodeId,

    #[serde(default, deserialize_with = "code_from_any")]
    pub code: String,

    /// Whether children may exist and must be fetched
    #[serde(rename = "hasChild", default, deserialize_with = "null_as_default")]
    pub has_child: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Map<String, Value>,

    /// Every other top-level field, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn code_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl CatalogNode {
    /// Display name from `properties`, if present and textual
    pub fn name(&self, field: &str) -> Option<&str> {
        self.properties.get(field).and_then(Value::as_str)
    }

    /// Tree label: "<code> — <name>"
    pub fn label(&self, name_field: &str) -> String {
        format!("{} — {}", self.code, self.name(name_field).unwrap_or(""))
    }

    /// The full record as JSON, unknown fields included
    pub fn to_record(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Decode a proxy response body into catalog records
pub fn decode_nodes(body: Value) -> Result<Vec<CatalogNode>, FetchError> {
    match body {
        Value::Array(_) => {
            serde_json::from_value(body).map_err(|e| FetchError::Decode(e.to_string()))
        }
        Value::Object(ref map) if map.contains_key("error") => Err(FetchError::Decode(
            map.get("error")
                .and_then(Value::as_str)
                .unwrap_or("error")
                .to_string(),
        )),
        other => Err(FetchError::Decode(format!(
            "expected a list of records, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Absolute URLs of the roots and children listings
#[derive(Debug, Clone)]
pub struct CatalogEndpoints {
    base: Url,
    roots_path: String,
    children_path: String,
}

impl CatalogEndpoints {
    pub fn new(config: &CatalogConfig) -> Result<Self, url::ParseError> {
        let base = Url::parse(&config.base_url)?;
        if base.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        Ok(Self {
            base,
            roots_path: config.roots_path.clone(),
            children_path: config.children_path.clone(),
        })
    }

    pub fn roots_url(&self) -> String {
        self.join(&self.roots_path, None)
    }

    /// Children listing for `id`; the id is percent-encoded as a path segment
    pub fn children_url(&self, id: &NodeId) -> String {
        self.join(&self.children_path, Some(&id.to_string()))
    }

    /// Children URL with `ID_PLACEHOLDER` where the parent id goes
    pub fn children_url_template(&self) -> String {
        self.join(&self.children_path, Some(ID_PLACEHOLDER))
    }

    fn join(&self, template: &str, id: Option<&str>) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for part in template.split('/').filter(|p| !p.is_empty()) {
                match (part, id) {
                    ("{id}", Some(id)) => segments.push(id),
                    _ => segments.push(part),
                };
            }
        }
        url.to_string()
    }
}
