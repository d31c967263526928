//! nb DOM - element tree for nb blocks
//!
//! Arena-based element tree with the attribute-level operations blocks rely on:
//! type annotations, `data-nb-*` values, class modifiers and selector matching,
//! plus the platform event model delivered to the block engine.

mod attributes;
mod classlist;
mod dataset;
mod events;
mod mods;
mod node;
mod selector;
mod tree;

pub use attributes::{Attr, NamedNodeMap};
pub use classlist::TokenList;
pub use dataset::parse_data_value;
pub use events::{Event, EventKind};
pub use mods::ModValue;
pub use node::{ElementData, Node, NodeData};
pub use selector::{Combinator, SelectorList, SimpleSelector};
pub use tree::DomTree;

use std::fmt;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this ID points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#none")
        }
    }
}

/// DOM errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },
}
