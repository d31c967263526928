//! Modifiers
//!
//! A modifier is a class token shaped `name` (flag) or `name_value`. For
//! `popup_to`, the token `popup_to_left` carries the value `left` and the
//! bare `popup_to` means the flag is on.

use crate::{DomError, DomTree, NodeId};

/// Modifier state read from or written to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModValue {
    /// Not set
    Off,
    /// Set without a value
    On,
    /// Set with a value
    Value(String),
}

impl ModValue {
    pub fn is_off(&self) -> bool {
        matches!(self, Self::Off)
    }

    /// Value part, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v),
            Self::Off | Self::On => None,
        }
    }
}

impl From<bool> for ModValue {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl From<&str> for ModValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Off
        } else {
            Self::Value(value.to_string())
        }
    }
}

impl From<String> for ModValue {
    fn from(value: String) -> Self {
        if value.is_empty() { Self::Off } else { Self::Value(value) }
    }
}

fn is_value_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Parse one class token against a modifier name
fn token_mod(token: &str, name: &str) -> Option<ModValue> {
    let rest = token.strip_prefix(name)?;
    if rest.is_empty() {
        return Some(ModValue::On);
    }
    let value = rest.strip_prefix('_')?;
    (!value.is_empty() && value.chars().all(is_value_char)).then(|| ModValue::Value(value.to_string()))
}

impl DomTree {
    /// Read a modifier from the node's class list
    pub fn get_mod(&self, node: NodeId, name: &str) -> ModValue {
        self.get_attribute(node, "class")
            .and_then(|class| class.split_whitespace().find_map(|t| token_mod(t, name)))
            .unwrap_or(ModValue::Off)
    }

    /// Replace a modifier; `Off` only removes it
    pub fn set_mod(&mut self, node: NodeId, name: &str, value: impl Into<ModValue>) -> Result<(), DomError> {
        let value = value.into();
        self.update_class_list(node, |list| {
            list.retain(|t| token_mod(t, name).is_none());
            match &value {
                ModValue::Off => {}
                ModValue::On => list.add(name),
                ModValue::Value(v) => list.add(&format!("{name}_{v}")),
            }
        })
    }

    /// Remove a modifier
    pub fn del_mod(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.set_mod(node, name, ModValue::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let n = tree.append_element(tree.document_element(), "div", &[("class", "popup popup_to_left")]);
        (tree, n)
    }

    #[test]
    fn test_get_mod() {
        let (tree, n) = node();
        assert_eq!(tree.get_mod(n, "popup_to"), ModValue::Value("left".into()));
        assert_eq!(tree.get_mod(n, "popup"), ModValue::On);
        assert_eq!(tree.get_mod(n, "popup_size"), ModValue::Off);
    }

    #[test]
    fn test_set_mod_replaces_value() {
        let (mut tree, n) = node();
        tree.set_mod(n, "popup_to", "right").unwrap();
        assert_eq!(tree.get_attribute(n, "class"), Some("popup popup_to_right"));

        tree.set_mod(n, "popup_to", true).unwrap();
        assert_eq!(tree.get_mod(n, "popup_to"), ModValue::On);
        assert!(!tree.has_class(n, "popup_to_right"));
    }

    #[test]
    fn test_set_mod_false_or_empty_removes() {
        let (mut tree, n) = node();
        tree.set_mod(n, "popup_to", false).unwrap();
        assert_eq!(tree.get_mod(n, "popup_to"), ModValue::Off);

        tree.set_mod(n, "popup_to", "up").unwrap();
        tree.set_mod(n, "popup_to", "").unwrap();
        assert_eq!(tree.get_mod(n, "popup_to"), ModValue::Off);

        tree.set_mod(n, "popup_to", "0").unwrap();
        assert_eq!(tree.get_mod(n, "popup_to").as_str(), Some("0"));

        tree.del_mod(n, "popup_to").unwrap();
        assert!(tree.get_mod(n, "popup_to").is_off());
    }

    #[test]
    fn test_token_mod_requires_separator() {
        assert_eq!(token_mod("popups", "popup"), None);
        assert_eq!(token_mod("popup_", "popup"), None);
        assert_eq!(token_mod("popup_a.b", "popup"), None);
        assert_eq!(token_mod("popup_to-left", "popup"), Some(ModValue::Value("to-left".into())));
    }
}
