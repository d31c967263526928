//! Node-level listeners
//!
//! Listeners bound with `Block::on("kind [selector]")` sit on the block's own
//! node, not on the root dispatcher. `Engine::emit` runs them while bubbling
//! an event from its target upwards; a selector turns the listener into a
//! delegated one that fires for matching nodes below the bound node.

use nb_dom::{EventKind, NodeId, SelectorList};

use crate::handler::Handler;
use crate::Block;

#[derive(Debug, Clone)]
pub(crate) struct NodeListener {
    pub(crate) node: NodeId,
    pub(crate) kind: EventKind,
    pub(crate) selector: Option<SelectorList>,
    pub(crate) handler: Handler,
    /// Instance the handler runs against
    pub(crate) block: Block,
}

#[derive(Debug, Default)]
pub(crate) struct ListenerTable {
    listeners: Vec<NodeListener>,
}

impl ListenerTable {
    pub(crate) fn add(&mut self, listener: NodeListener) {
        self.listeners.push(listener);
    }

    /// Remove listeners of `owner` for a kind
    ///
    /// An empty selector matches any selector; without a handler every
    /// listener that matches is removed. Returns the number removed.
    pub(crate) fn remove(&mut self, owner: &Block, kind: EventKind, selector: &str, handler: Option<&Handler>) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| {
            let hit = l.block.ptr_eq(owner)
                && l.kind == kind
                && (selector.is_empty() || l.selector.as_ref().is_some_and(|s| s.as_str() == selector))
                && handler.is_none_or(|h| l.handler.ptr_eq(h));
            !hit
        });
        before - self.listeners.len()
    }

    /// Remove everything bound by `owner`
    pub(crate) fn remove_owned(&mut self, owner: &Block) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| !l.block.ptr_eq(owner));
        before - self.listeners.len()
    }

    /// Snapshot of the listeners bound on `node` for `kind`, in binding order
    pub(crate) fn for_node(&self, node: NodeId, kind: EventKind) -> Vec<NodeListener> {
        self.listeners
            .iter()
            .filter(|l| l.node == node && l.kind == kind)
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}
