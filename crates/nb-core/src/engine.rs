//! Engine - Main entry point

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use nb_dom::{DomTree, ElementData, Event, EventKind, NodeId};
use serde::Serialize;
use serde_json::{json, Value};

use crate::cache::InstanceCache;
use crate::compiler::{EventTable, RawLayer};
use crate::definition::BlockDefinition;
use crate::dispatcher::{self, DispatcherRegistry};
use crate::error::BlockError;
use crate::factory::Factory;
use crate::handler::{Flow, Handler, Payload};
use crate::listeners::ListenerTable;
use crate::{Block, Config};

/// Engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Root listener invocations
    pub delegated_dispatches: u64,
    pub blocks_created: u64,
    pub blocks_destroyed: u64,
}

/// State shared between the engine handle and its blocks
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) tree: RefCell<DomTree>,
    pub(crate) factories: RefCell<HashMap<String, Rc<Factory>>>,
    pub(crate) cache: RefCell<InstanceCache>,
    pub(crate) dispatcher: RefCell<DispatcherRegistry>,
    pub(crate) listeners: RefCell<ListenerTable>,
    next_id: Cell<u64>,
    space: RefCell<Option<Block>>,
    stats: Cell<EngineStats>,
}

impl Shared {
    fn bump(&self, f: impl FnOnce(&mut EngineStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    pub(crate) fn count_destroyed(&self) {
        self.bump(|s| s.blocks_destroyed += 1);
    }
}

/// The nb block engine
///
/// Owns the element tree, the type registry, the instance cache and the
/// root listeners. Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct Engine {
    shared: Rc<Shared>,
}

impl Engine {
    /// Create an engine over a fresh tree
    pub fn new(config: Config) -> Self {
        Self::with_tree(DomTree::new(), config)
    }

    /// Create an engine over an existing tree
    pub fn with_tree(tree: DomTree, config: Config) -> Self {
        tracing::info!("nb engine {} initialized", crate::VERSION);
        let engine = Self {
            shared: Rc::new(Shared {
                config,
                tree: RefCell::new(tree),
                factories: RefCell::new(HashMap::new()),
                cache: RefCell::new(InstanceCache::default()),
                dispatcher: RefCell::new(DispatcherRegistry::default()),
                listeners: RefCell::new(ListenerTable::default()),
                next_id: Cell::new(0),
                space: RefCell::new(None),
                stats: Cell::new(EngineStats::default()),
            }),
        };

        if engine.shared.config.global_channel {
            if let Err(err) = engine.create_space() {
                tracing::warn!("Global channel unavailable: {}", err);
            }
        }
        engine
    }

    pub(crate) fn from_shared(shared: Rc<Shared>) -> Self {
        Self { shared }
    }

    /// Get engine configuration
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Borrow the element tree
    ///
    /// Do not hold the borrow while emitting events or creating blocks.
    pub fn tree(&self) -> Ref<'_, DomTree> {
        self.shared.tree.borrow()
    }

    /// Mutably borrow the element tree
    pub fn tree_mut(&self) -> RefMut<'_, DomTree> {
        self.shared.tree.borrow_mut()
    }

    fn next_name(&self) -> String {
        let n = self.shared.next_id.get();
        self.shared.next_id.set(n + 1);
        format!("{}{}", self.shared.config.id_prefix, n)
    }

    // === Types ===

    /// Register a block type
    ///
    /// Redefining a name replaces the previous factory; existing instances
    /// keep the one they were built with.
    pub fn define(&self, definition: BlockDefinition) -> Result<Rc<Factory>, BlockError> {
        let BlockDefinition {
            name,
            base,
            mixins,
            events,
            methods,
        } = definition;

        let name = name.unwrap_or_else(|| self.next_name());
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(BlockError::InvalidName(name));
        }

        let base_factory = base
            .as_deref()
            .map(|b| self.factory(b).ok_or_else(|| BlockError::UnknownType(b.to_string())))
            .transpose()?;
        let mixin_factories = mixins
            .iter()
            .map(|m| self.factory(m).ok_or_else(|| BlockError::UnknownType(m.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        let mut merged_methods = base_factory
            .as_ref()
            .map(|b| b.methods().clone())
            .unwrap_or_default();
        merged_methods.extend(methods);

        let raw = RawLayer::collect(&name, &events, &merged_methods)?;
        {
            let mut registry = self.shared.dispatcher.borrow_mut();
            for kind in raw.dom_kinds() {
                if registry.attach(kind) {
                    tracing::debug!("Attached root listener for {}", kind);
                }
            }
        }

        let mixin_tables: Vec<&EventTable> = mixin_factories.iter().map(|f| f.events()).collect();
        let table = EventTable::compile(raw, base_factory.as_ref().map(|b| b.events()), &mixin_tables);
        tracing::debug!(
            "Defined block type {} (base: {:?}, layers: {}, kinds: {:?})",
            name,
            base,
            table.layer_count(),
            table.dom_kinds()
        );

        let factory = Rc::new(Factory::new(name.clone(), base, mixins, merged_methods, table));
        if self
            .shared
            .factories
            .borrow_mut()
            .insert(name.clone(), Rc::clone(&factory))
            .is_some()
        {
            tracing::debug!("Block type {} redefined", name);
        }
        Ok(factory)
    }

    /// Factory of a defined type
    pub fn factory(&self, name: &str) -> Option<Rc<Factory>> {
        self.shared.factories.borrow().get(name).cloned()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.shared.factories.borrow().contains_key(name)
    }

    // === Instances ===

    pub(crate) fn names_of(&self, tree: &DomTree, node: NodeId) -> Vec<String> {
        tree.get_attribute(node, &self.shared.config.type_attribute)
            .map(|names| names.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Type names annotated on a node
    pub fn type_names(&self, node: NodeId) -> Vec<String> {
        self.names_of(&self.tree(), node)
    }

    /// Instance of type `name` on `node`, created if needed
    ///
    /// Unlike [`Engine::block`] this does not require the node to be
    /// annotated; a missing annotation is set to `name`.
    pub fn create(&self, name: &str, node: NodeId, extra: &[(&str, Handler)]) -> Result<Block, BlockError> {
        let factory = self
            .factory(name)
            .ok_or_else(|| BlockError::UnknownType(name.to_string()))?;
        self.create_block(&factory, node, extra)
    }

    pub(crate) fn create_block(
        &self,
        factory: &Rc<Factory>,
        node: NodeId,
        extra: &[(&str, Handler)],
    ) -> Result<Block, BlockError> {
        let id = self.ensure_identity(factory.name(), node)?;

        let cached = self.shared.cache.borrow().get(&id, factory.name());
        if let Some(block) = cached {
            return Ok(block);
        }

        // Cached before `init` runs so re-entrant lookups find this instance.
        let block = Block::new(id, node, Rc::clone(factory), Rc::downgrade(&self.shared));
        let block = self.shared.cache.borrow_mut().insert(block);
        self.shared.bump(|s| s.blocks_created += 1);
        tracing::debug!("Created block {} on {} ({})", block.name(), node, block.id());

        block.bind_events()?;
        block.trigger("init", Value::Null)?;

        let space = self.space();
        if let Some(space) = space.filter(|s| !s.ptr_eq(&block)) {
            space.trigger(&format!("inited:{}", block.id()), json!(block.id()))?;
        }

        for (key, handler) in extra {
            block.on(key, handler.clone())?;
        }
        Ok(block)
    }

    /// Read or assign the node ID, and annotate the node if it is not yet
    fn ensure_identity(&self, name: &str, node: NodeId) -> Result<String, BlockError> {
        let mut tree = self.shared.tree.borrow_mut();
        let element = tree.element(node).ok_or(nb_dom::DomError::UnknownNode(node))?;
        let existing = element.id().map(str::to_string);
        let annotated = element
            .attrs
            .get(&self.shared.config.type_attribute)
            .is_some_and(|a| !a.trim().is_empty());

        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.next_name();
                tree.set_attribute(node, "id", &id)?;
                id
            }
        };
        if !annotated {
            tree.set_attribute(node, &self.shared.config.type_attribute, name)?;
        }
        Ok(id)
    }

    /// One instance on an annotated node
    ///
    /// With `name`, the instance of that type; otherwise every annotated type
    /// is instantiated and the first one returned. `None` when the node is
    /// not annotated.
    pub fn block(
        &self,
        node: NodeId,
        extra: &[(&str, Handler)],
        name: Option<&str>,
    ) -> Result<Option<Block>, BlockError> {
        if self.type_names(node).is_empty() {
            return Ok(None);
        }
        match name {
            Some(name) => self.create(name, node, extra).map(Some),
            None => Ok(self.blocks(node, extra)?.into_iter().next()),
        }
    }

    /// Instances of every type annotated on a node
    pub fn blocks(&self, node: NodeId, extra: &[(&str, Handler)]) -> Result<Vec<Block>, BlockError> {
        let names = self.type_names(node);
        let mut blocks = Vec::with_capacity(names.len());
        for name in &names {
            blocks.push(self.create(name, node, extra)?);
        }
        Ok(blocks)
    }

    /// Instance on the element with the given ID
    pub fn find(&self, id: &str) -> Result<Option<Block>, BlockError> {
        let node = self.tree().get_element_by_id(id);
        match node {
            Some(node) => self.block(node, &[], None),
            None => Ok(None),
        }
    }

    /// Check for a live instance without creating one
    pub fn has_block(&self, node: NodeId, name: Option<&str>) -> bool {
        let id = self
            .tree()
            .element(node)
            .and_then(ElementData::id)
            .map(str::to_string);
        id.is_some_and(|id| self.shared.cache.borrow().contains(&id, name))
    }

    /// Number of live instances
    pub fn instance_count(&self) -> usize {
        self.shared.cache.borrow().len()
    }

    /// Nodes under `root` (inclusive) carrying the init class
    fn init_nodes(&self, root: Option<NodeId>) -> Vec<NodeId> {
        let tree = self.tree();
        let root = root.unwrap_or_else(|| tree.root());
        let class = self.shared.config.init_class.as_str();
        std::iter::once(root)
            .chain(tree.descendants(root))
            .filter(|&n| tree.has_class(n, class))
            .collect()
    }

    /// Create the instances of every node marked for eager activation
    pub fn init_all(&self, root: Option<NodeId>) -> Result<Vec<Block>, BlockError> {
        let mut blocks = Vec::new();
        for node in self.init_nodes(root) {
            blocks.extend(self.block(node, &[], None)?);
        }
        tracing::debug!("Initialized {} blocks", blocks.len());
        Ok(blocks)
    }

    /// Destroy every instance living on nodes marked for eager activation
    ///
    /// Returns the number of destroyed instances.
    pub fn destroy_all(&self, root: Option<NodeId>) -> Result<usize, BlockError> {
        let mut destroyed = 0;
        for node in self.init_nodes(root) {
            let id = self.tree().element(node).and_then(ElementData::id).map(str::to_string);
            let Some(id) = id else {
                continue;
            };
            let blocks = self.shared.cache.borrow().blocks_for(&id);
            for block in blocks {
                block.destroy()?;
                destroyed += 1;
            }
        }
        Ok(destroyed)
    }

    // === Global channel ===

    fn create_space(&self) -> Result<(), BlockError> {
        let factory = self.define(BlockDefinition::anonymous().on("click", |space, payload| {
            let target = payload.event().map(|e| e.target.index());
            space.trigger("space:click", json!(target))?;
            Ok(Flow::Continue)
        }))?;
        let html = self.tree().document_element();
        let space = self.create_block(&factory, html, &[])?;
        *self.shared.space.borrow_mut() = Some(space);
        Ok(())
    }

    /// Instance backing the global channel
    pub fn space(&self) -> Option<Block> {
        self.shared.space.borrow().clone()
    }

    /// Subscribe to a global event
    pub fn on(&self, name: &str, handler: Handler) -> Result<Handler, BlockError> {
        match self.space() {
            Some(space) => space.on(name, handler),
            None => {
                tracing::trace!("Global channel disabled, on({}) ignored", name);
                Ok(handler)
            }
        }
    }

    /// Subscribe a function to a global event
    pub fn on_fn(
        &self,
        name: &str,
        f: impl Fn(&Block, &Payload<'_>) -> crate::HandlerResult + 'static,
    ) -> Result<Handler, BlockError> {
        self.on(name, Handler::new(f))
    }

    /// Unsubscribe from a global event
    pub fn off(&self, name: &str, handler: Option<&Handler>) {
        if let Some(space) = self.space() {
            space.off(name, handler);
        }
    }

    /// Fire a global event
    pub fn trigger(&self, name: &str, params: Value) -> Result<(), BlockError> {
        match self.space() {
            Some(space) => space.trigger(name, params),
            None => Ok(()),
        }
    }

    // === Platform events ===

    /// Deliver a platform event
    ///
    /// Bubbles from the target to the document running node listeners, then
    /// runs the root listener for the kind if one is attached. Selector-less
    /// listeners see a non-bubbling kind on the target only. A handler
    /// returning [`Flow::StopPropagation`] stops bubbling and prevents the
    /// default action. Returns `false` when the default was prevented.
    pub fn emit(&self, event: &Event) -> Result<bool, BlockError> {
        let path: Vec<NodeId> = {
            let tree = self.tree();
            std::iter::once(event.target).chain(tree.ancestors(event.target)).collect()
        };

        let bubbles = event.kind.bubbles();
        for (depth, &current) in path.iter().enumerate() {
            let listeners = self.shared.listeners.borrow().for_node(current, event.kind);
            for listener in listeners {
                // destroyed by an earlier listener of this round
                if listener.block.is_destroyed() {
                    continue;
                }
                // Delegated listeners fire once per matching node, nearest first
                let matched: Vec<NodeId> = match &listener.selector {
                    None if bubbles || depth == 0 => vec![current],
                    None => Vec::new(),
                    Some(selector) => {
                        let tree = self.tree();
                        path[..depth]
                            .iter()
                            .copied()
                            .filter(|&n| selector.matches(&tree, n))
                            .collect()
                    }
                };

                for node in matched {
                    let payload = Payload::Dom { event, node };
                    if listener.handler.call(&listener.block, &payload)? == Flow::StopPropagation {
                        event.prevent_default();
                        event.stop_propagation();
                        break;
                    }
                }
            }
            if event.is_propagation_stopped() {
                return Ok(!event.is_default_prevented());
            }
        }

        let attached = self.shared.dispatcher.borrow().is_attached(event.kind);
        if attached {
            self.shared.bump(|s| s.delegated_dispatches += 1);
            if dispatcher::dispatch(self, event)? == Flow::StopPropagation {
                event.prevent_default();
                event.stop_propagation();
            }
        }

        Ok(!event.is_default_prevented())
    }

    /// Number of root listeners attached
    pub fn listener_count(&self) -> usize {
        self.shared.dispatcher.borrow().len()
    }

    /// Check if the root listener for `kind` is attached
    pub fn is_listening(&self, kind: EventKind) -> bool {
        self.shared.dispatcher.borrow().is_attached(kind)
    }

    /// Number of node-level listeners bound through `Block::on`
    pub fn node_listener_count(&self) -> usize {
        self.shared.listeners.borrow().len()
    }

    pub fn stats(&self) -> EngineStats {
        self.shared.stats.get()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.shared.config)
            .field("types", &self.shared.factories.borrow().len())
            .field("instances", &self.instance_count())
            .field("stats", &self.stats())
            .finish()
    }
}
