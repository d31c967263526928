//! Delegated event dispatch
//!
//! Every platform kind that appears in some compiled `dom` table gets one
//! root listener, recorded in the [`DispatcherRegistry`]. When it fires, the
//! path from the event target up to the document element is cut into
//! segments at block nodes:
//!
//! ```text
//! <html>                 <- block (space)
//!   <div data-nb="foo">  <- block
//!     <div>
//!       <div data-nb="bar">  <- block
//!         <div>
//!           <span>           <- target
//! ```
//!
//! `bar` sees the segment `[span, div]` for its selector routes and its own
//! node for the selector-less route. `foo` then sees everything below it,
//! `bar`'s node included. Instances are created only when a route matches.

use std::collections::BTreeSet;
use std::rc::Rc;

use nb_dom::{DomTree, Event, EventKind, NodeId};

use crate::compiler::Route;
use crate::engine::Engine;
use crate::error::BlockError;
use crate::factory::Factory;
use crate::handler::{run_chain, Flow, Handler, Payload};

/// Platform kinds that already have their root listener
#[derive(Debug, Default)]
pub(crate) struct DispatcherRegistry {
    attached: BTreeSet<EventKind>,
}

impl DispatcherRegistry {
    /// Record the root listener for `kind`; `true` if it was not there yet
    pub(crate) fn attach(&mut self, kind: EventKind) -> bool {
        self.attached.insert(kind)
    }

    pub(crate) fn is_attached(&self, kind: EventKind) -> bool {
        self.attached.contains(&kind)
    }

    pub(crate) fn len(&self) -> usize {
        self.attached.len()
    }
}

/// Block node reached by the walk, with its type names
struct Boundary {
    node: NodeId,
    names: Vec<String>,
}

/// State of one dispatch; never shared between event occurrences
struct Walk<'e> {
    event: &'e Event,
    /// Node the pointer came from or goes to, hover kinds only
    from: Option<NodeId>,
    cursor: NodeId,
    /// Nodes below the current block node collected so far
    segment: Vec<NodeId>,
}

impl<'e> Walk<'e> {
    fn new(event: &'e Event) -> Self {
        Self {
            event,
            from: event.related_target.filter(|_| event.kind.is_hover()),
            cursor: event.target,
            segment: Vec::new(),
        }
    }

    /// Collect nodes up to the next block node
    ///
    /// Stops at the document element: a node without a parent is never
    /// considered.
    fn next_boundary(&mut self, engine: &Engine) -> Option<Boundary> {
        let tree = engine.tree();
        loop {
            let parent = tree.parent(self.cursor)?;
            let names = engine.names_of(&tree, self.cursor);
            if !names.is_empty() {
                if self.from.is_some() {
                    // Pointer moved between two nodes: only the target and
                    // the block node itself are of interest.
                    let origin = self.event.target;
                    self.segment = if origin == self.cursor { Vec::new() } else { vec![origin] };
                }
                return Some(Boundary {
                    node: self.cursor,
                    names,
                });
            }
            self.segment.push(self.cursor);
            self.cursor = parent;
        }
    }

    /// Move above a processed block node
    fn advance(&mut self, engine: &Engine, block_node: NodeId) -> bool {
        self.segment.push(block_node);
        match engine.tree().parent(block_node) {
            Some(parent) => {
                self.cursor = parent;
                true
            }
            None => false,
        }
    }

    /// Hover events are dropped when the pointer stays within `node`
    fn suppressed(&self, tree: &DomTree, node: NodeId) -> bool {
        self.from
            .is_some_and(|from| from == node || tree.contains(node, from))
    }

    /// Match the routes of one layer against the current segment
    fn check_routes(
        &self,
        engine: &Engine,
        factory: &Rc<Factory>,
        block_node: NodeId,
        routes: &[Route],
    ) -> Result<Flow, BlockError> {
        for &node in &self.segment {
            let mut stop = false;
            for route in routes {
                let Some(selector) = &route.selector else {
                    continue;
                };
                let hit = {
                    let tree = engine.tree();
                    selector.matches(&tree, node) && !self.suppressed(&tree, node)
                };
                if hit && self.run(engine, factory, block_node, node, &route.chain)? == Flow::StopPropagation {
                    stop = true;
                }
            }
            if stop {
                return Ok(Flow::StopPropagation);
            }
        }

        // Selector-less routes belong to the block node only
        let Some(route) = routes.iter().find(|r| r.selector.is_none()) else {
            return Ok(Flow::Continue);
        };
        if self.suppressed(&engine.tree(), block_node) {
            return Ok(Flow::Continue);
        }
        self.run(engine, factory, block_node, block_node, &route.chain)
    }

    fn run(
        &self,
        engine: &Engine,
        factory: &Rc<Factory>,
        block_node: NodeId,
        node: NodeId,
        chain: &[Handler],
    ) -> Result<Flow, BlockError> {
        let block = engine.create_block(factory, block_node, &[])?;
        let payload = Payload::Dom {
            event: self.event,
            node,
        };
        match run_chain(chain, &block, &payload)? {
            Flow::StopPropagation => Ok(Flow::StopPropagation),
            Flow::Continue | Flow::StopChain => Ok(Flow::Continue),
        }
    }
}

/// Run the root listener for one event occurrence
///
/// Returns [`Flow::StopPropagation`] when some handler asked to stop.
pub(crate) fn dispatch(engine: &Engine, event: &Event) -> Result<Flow, BlockError> {
    if event.kind == EventKind::Click && event.button != 0 {
        tracing::trace!("Ignoring click with button {} on {}", event.button, event.target);
        return Ok(Flow::Continue);
    }

    let mut walk = Walk::new(event);
    while let Some(boundary) = walk.next_boundary(engine) {
        let mut stop = false;

        for name in &boundary.names {
            let Some(factory) = engine.factory(name) else {
                tracing::trace!("Skipping undefined block type {} on {}", name, boundary.node);
                continue;
            };
            for layer in factory.events().layers() {
                let Some(routes) = layer.dom.get(&event.kind) else {
                    continue;
                };
                // A stop does not keep the other types on this node from
                // seeing the event.
                if walk.check_routes(engine, &factory, boundary.node, routes)? == Flow::StopPropagation {
                    stop = true;
                }
            }
        }

        if stop {
            return Ok(Flow::StopPropagation);
        }
        // Moves between two nodes only concern the nearest block
        if walk.from.is_some() {
            return Ok(Flow::Continue);
        }
        if !walk.advance(engine, boundary.node) {
            break;
        }
    }

    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_once_per_kind() {
        let mut registry = DispatcherRegistry::default();
        assert!(registry.attach(EventKind::Click));
        assert!(!registry.attach(EventKind::Click));
        assert!(registry.attach(EventKind::MouseOver));

        assert!(registry.is_attached(EventKind::Click));
        assert!(!registry.is_attached(EventKind::KeyUp));
        assert_eq!(registry.len(), 2);
    }
}
