//! Data attributes
//!
//! Per-key block data stored in prefixed attributes (`data-nb-<key>`).
//! Values shaped like arrays or objects are parsed as JSON; everything else
//! is returned as a string.

use serde_json::{Map, Value};

use crate::{DomError, DomTree, NodeId};

/// Parse a raw attribute value
///
/// Only values starting with `[` or `{` are parsed, and only as strict JSON.
/// A value that fails to parse is kept verbatim.
pub fn parse_data_value(raw: &str) -> Value {
    match raw.chars().next() {
        Some('[' | '{') => serde_json::from_str(raw).unwrap_or_else(|err| {
            tracing::debug!("data value is not valid JSON ({}), keeping string: {}", err, raw);
            Value::String(raw.to_string())
        }),
        _ => Value::String(raw.to_string()),
    }
}

/// Serialize a value for storage in an attribute
fn encode_data_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl DomTree {
    /// Read one data attribute
    pub fn data(&self, node: NodeId, prefix: &str, key: &str) -> Option<Value> {
        self.get_attribute(node, &format!("{prefix}{key}"))
            .map(parse_data_value)
    }

    /// Write one data attribute
    pub fn set_data(&mut self, node: NodeId, prefix: &str, key: &str, value: &Value) -> Result<(), DomError> {
        self.set_attribute(node, &format!("{prefix}{key}"), &encode_data_value(value))
    }

    /// All data attributes of a node, keyed without the prefix
    pub fn all_data(&self, node: NodeId, prefix: &str) -> Map<String, Value> {
        let mut data = Map::new();
        if let Some(element) = self.element(node) {
            for attr in element.attrs.iter() {
                if let Some(key) = attr.name.strip_prefix(prefix).filter(|k| !k.is_empty()) {
                    data.insert(key.to_string(), parse_data_value(&attr.value));
                }
            }
        }
        data
    }
}
