//! Instance cache
//!
//! `node id -> type name -> instance`. Holds at most one live instance per
//! (id, type) pair.

use std::collections::HashMap;

use crate::Block;

#[derive(Debug, Default)]
pub(crate) struct InstanceCache {
    nodes: HashMap<String, HashMap<String, Block>>,
}

impl InstanceCache {
    pub(crate) fn get(&self, id: &str, name: &str) -> Option<Block> {
        self.nodes.get(id)?.get(name).cloned()
    }

    /// Store an instance; an existing one for the same pair is kept
    ///
    /// Returns the instance now cached for the pair.
    pub(crate) fn insert(&mut self, block: Block) -> Block {
        self.nodes
            .entry(block.id().to_string())
            .or_default()
            .entry(block.name().to_string())
            .or_insert(block)
            .clone()
    }

    /// Drop one (id, type) entry; the node entry goes away with its last type
    pub(crate) fn remove(&mut self, id: &str, name: &str) -> Option<Block> {
        let blocks = self.nodes.get_mut(id)?;
        let removed = blocks.remove(name);
        if blocks.is_empty() {
            self.nodes.remove(id);
        }
        removed
    }

    /// Every cached instance of a node
    pub(crate) fn blocks_for(&self, id: &str) -> Vec<Block> {
        self.nodes
            .get(id)
            .map(|blocks| blocks.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn contains(&self, id: &str, name: Option<&str>) -> bool {
        match (self.nodes.get(id), name) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(blocks), Some(name)) => blocks.contains_key(name),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.values().map(HashMap::len).sum()
    }
}
