//! Engine Configuration

use serde::{Deserialize, Serialize};

/// Engine configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attribute holding the space-separated block type names of a node
    pub type_attribute: String,

    /// Prefix of per-key data attributes
    pub data_prefix: String,

    /// Prefix for generated node IDs and anonymous type names
    pub id_prefix: String,

    /// Class marking nodes for eager activation by `init_all`
    pub init_class: String,

    /// Class toggled by `show`/`hide`
    pub hidden_class: String,

    /// Create the global channel instance on the document element
    pub global_channel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            type_attribute: "data-nb".to_string(),
            data_prefix: "data-nb-".to_string(),
            id_prefix: "gen-".to_string(),
            init_class: "_init".to_string(),
            hidden_class: "nb-is-hidden".to_string(),
            global_channel: true,
        }
    }
}

impl Config {
    /// Defaults without the global channel instance
    pub fn without_global_channel() -> Self {
        Self {
            global_channel: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"id_prefix": "w-"}"#).unwrap();
        assert_eq!(config.id_prefix, "w-");
        assert_eq!(config.type_attribute, "data-nb");
        assert!(config.global_channel);
    }
}
