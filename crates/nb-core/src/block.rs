//! Block instances
//!
//! A [`Block`] is a cheap handle to one live (node, type) instance. It owns
//! its custom-event registry; the node itself lives in the engine's tree and
//! is only referenced by ID.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use nb_dom::{DomTree, EventKind, ModValue, NodeId, SelectorList};
use serde_json::{Map, Value};

use crate::engine::{Engine, Shared};
use crate::error::BlockError;
use crate::factory::Factory;
use crate::handler::{run_chain, Flow, Handler, Payload};
use crate::listeners::NodeListener;

/// Lifecycle of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Initialized,
    Destroyed,
}

struct BlockInner {
    id: String,
    node: NodeId,
    factory: Rc<Factory>,
    engine: Weak<Shared>,
    /// Custom-event handlers, `None` once destroyed
    handlers: RefCell<Option<HashMap<String, Vec<Handler>>>>,
    state: Cell<LifecycleState>,
    /// Set while the `destroy` hook runs
    tearing_down: Cell<bool>,
}

/// Handle to a block instance
#[derive(Clone)]
pub struct Block {
    inner: Rc<BlockInner>,
}

impl Block {
    pub(crate) fn new(id: String, node: NodeId, factory: Rc<Factory>, engine: Weak<Shared>) -> Self {
        Self {
            inner: Rc::new(BlockInner {
                id,
                node,
                factory,
                engine,
                handlers: RefCell::new(Some(HashMap::new())),
                state: Cell::new(LifecycleState::Initialized),
                tearing_down: Cell::new(false),
            }),
        }
    }

    /// Identifier of the block node
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Type name
    pub fn name(&self) -> &str {
        self.inner.factory.name()
    }

    /// Block node
    pub fn node(&self) -> NodeId {
        self.inner.node
    }

    pub fn factory(&self) -> &Rc<Factory> {
        &self.inner.factory
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state() == LifecycleState::Destroyed
    }

    /// Check if both handles refer to the same instance
    pub fn ptr_eq(&self, other: &Block) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Engine owning this block, unless it was dropped
    pub fn engine(&self) -> Option<Engine> {
        self.inner.engine.upgrade().map(Engine::from_shared)
    }

    /// Run `f` with read access to the element tree
    pub fn with_tree<R>(&self, f: impl FnOnce(&DomTree) -> R) -> Option<R> {
        let shared = self.inner.engine.upgrade()?;
        let tree = shared.tree.borrow();
        Some(f(&tree))
    }

    /// Run `f` with write access to the element tree
    pub fn with_tree_mut<R>(&self, f: impl FnOnce(&mut DomTree) -> R) -> Option<R> {
        let shared = self.inner.engine.upgrade()?;
        let mut tree = shared.tree.borrow_mut();
        Some(f(&mut tree))
    }

    // === Events ===

    /// Subscribe `handler` to an event key
    ///
    /// `"kind"` and `"kind selector"` bind a listener on the block node (run
    /// by `Engine::emit`); any other key is a custom event. Returns the
    /// handler so it can later be passed to [`Block::off`].
    pub fn on(&self, key: &str, handler: Handler) -> Result<Handler, BlockError> {
        if self.is_destroyed() {
            tracing::trace!("on({}) ignored, block {} ({}) is destroyed", key, self.name(), self.id());
            return Ok(handler);
        }

        match EventKind::split_key(key) {
            Some((kind, selector)) => {
                let selector = match selector {
                    "" => None,
                    s => Some(SelectorList::parse(s)?),
                };
                if let Some(shared) = self.inner.engine.upgrade() {
                    shared.listeners.borrow_mut().add(NodeListener {
                        node: self.node(),
                        kind,
                        selector,
                        handler: handler.clone(),
                        block: self.clone(),
                    });
                }
            }
            None => {
                if let Some(handlers) = self.inner.handlers.borrow_mut().as_mut() {
                    handlers.entry(key.to_string()).or_default().push(handler.clone());
                }
            }
        }

        Ok(handler)
    }

    /// Unsubscribe one handler, or all handlers for the key
    pub fn off(&self, key: &str, handler: Option<&Handler>) {
        match EventKind::split_key(key) {
            Some((kind, selector)) => {
                if let Some(shared) = self.inner.engine.upgrade() {
                    shared.listeners.borrow_mut().remove(self, kind, selector, handler);
                }
            }
            None => {
                let mut handlers = self.inner.handlers.borrow_mut();
                let Some(handlers) = handlers.as_mut() else {
                    return;
                };
                match handler {
                    Some(handler) => {
                        if let Some(list) = handlers.get_mut(key) {
                            if let Some(i) = list.iter().position(|h| h.ptr_eq(handler)) {
                                list.remove(i);
                            }
                        }
                    }
                    None => {
                        handlers.remove(key);
                    }
                }
            }
        }
    }

    /// Fire a custom event
    ///
    /// Handlers run in subscription order over a snapshot of the list, so
    /// subscribing or unsubscribing from inside a handler does not affect the
    /// current round. Return values are ignored; the first error aborts.
    pub fn trigger(&self, name: &str, params: Value) -> Result<(), BlockError> {
        let snapshot = match self.inner.handlers.borrow().as_ref() {
            Some(handlers) => handlers.get(name).cloned().unwrap_or_default(),
            None => {
                tracing::trace!("trigger({}) ignored, block {} ({}) is destroyed", name, self.name(), self.id());
                return Ok(());
            }
        };

        let payload = Payload::Custom { name, params: &params };
        for handler in &snapshot {
            handler.call(self, &payload)?;
        }
        Ok(())
    }

    /// Number of custom handlers subscribed to `name`
    pub fn handler_count(&self, name: &str) -> usize {
        self.inner
            .handlers
            .borrow()
            .as_ref()
            .and_then(|h| h.get(name).map(Vec::len))
            .unwrap_or(0)
    }

    /// Invoke an instance method by name
    pub fn call(&self, method: &str, params: Value) -> Result<Flow, BlockError> {
        let handler = self
            .inner
            .factory
            .method(method)
            .cloned()
            .ok_or_else(|| BlockError::UnknownMethod {
                block: self.name().to_string(),
                method: method.to_string(),
            })?;
        let payload = Payload::Custom { name: method, params: &params };
        Ok(handler.call(self, &payload)?)
    }

    // === Data ===

    /// Read one `data-nb-<key>` value
    pub fn data(&self, key: &str) -> Option<Value> {
        let shared = self.inner.engine.upgrade()?;
        let tree = shared.tree.borrow();
        tree.data(self.node(), &shared.config.data_prefix, key)
    }

    /// Write one `data-nb-<key>` value
    pub fn set_data(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        let Some(shared) = self.inner.engine.upgrade() else {
            return Ok(());
        };
        let mut tree = shared.tree.borrow_mut();
        tree.set_data(self.node(), &shared.config.data_prefix, key, value)?;
        Ok(())
    }

    /// Every `data-nb-*` value, keyed without the prefix
    pub fn all_data(&self) -> Map<String, Value> {
        let Some(shared) = self.inner.engine.upgrade() else {
            return Map::new();
        };
        let tree = shared.tree.borrow();
        tree.all_data(self.node(), &shared.config.data_prefix)
    }

    // === Visibility and modifiers ===

    /// Remove the hidden class and fire `show`
    pub fn show(&self) -> Result<(), BlockError> {
        self.set_hidden(false)?;
        self.trigger("show", Value::Null)
    }

    /// Add the hidden class and fire `hide`
    pub fn hide(&self) -> Result<(), BlockError> {
        self.set_hidden(true)?;
        self.trigger("hide", Value::Null)
    }

    fn set_hidden(&self, hidden: bool) -> Result<(), BlockError> {
        if let Some(shared) = self.inner.engine.upgrade() {
            let class = shared.config.hidden_class.as_str();
            shared
                .tree
                .borrow_mut()
                .update_class_list(self.node(), |list| list.toggle(class, Some(hidden)))?;
        }
        Ok(())
    }

    pub fn get_mod(&self, name: &str) -> ModValue {
        self.with_tree(|tree| tree.get_mod(self.node(), name))
            .unwrap_or(ModValue::Off)
    }

    pub fn set_mod(&self, name: &str, value: impl Into<ModValue>) -> Result<(), BlockError> {
        self.with_tree_mut(|tree| tree.set_mod(self.node(), name, value))
            .transpose()?;
        Ok(())
    }

    pub fn del_mod(&self, name: &str) -> Result<(), BlockError> {
        self.set_mod(name, ModValue::Off)
    }

    // === Structure ===

    /// Type names annotated on the block node
    pub fn type_names(&self) -> Vec<String> {
        self.engine().map(|engine| engine.type_names(self.node())).unwrap_or_default()
    }

    /// Instances of every block node strictly inside this one
    ///
    /// Missing instances are created.
    pub fn children(&self) -> Result<Vec<Block>, BlockError> {
        let Some(engine) = self.engine() else {
            return Ok(Vec::new());
        };
        let nodes: Vec<NodeId> = {
            let tree = engine.tree();
            tree.descendants(self.node())
                .filter(|&n| !engine.names_of(&tree, n).is_empty())
                .collect()
        };

        let mut children = Vec::new();
        for node in nodes {
            children.extend(engine.blocks(node, &[])?);
        }
        Ok(children)
    }

    // === Lifecycle ===

    /// Bind the compiled custom and local events of the type
    pub(crate) fn bind_events(&self) -> Result<(), BlockError> {
        let factory = Rc::clone(&self.inner.factory);

        for layer in factory.events().layers() {
            for (name, chain) in layer.custom.iter() {
                let chain = Rc::clone(chain);
                self.on(name, Handler::new(move |block, payload| run_chain(&chain, block, payload)))?;
            }

            for (kind, routes) in layer.local.iter() {
                for route in routes {
                    let chain = Rc::clone(&route.chain);
                    let key = match route.key.as_str() {
                        "" => kind.as_str().to_string(),
                        selector => format!("{} {}", kind, selector),
                    };
                    self.on(&key, Handler::new(move |block, payload| run_chain(&chain, block, payload)))?;
                }
            }
        }

        Ok(())
    }

    /// Tear the instance down
    ///
    /// Fires the `destroy` hook, then drops every handler and node listener
    /// of the instance and its cache entry. The node and its annotation are
    /// left untouched. Calling it again, the `destroy` hook included, is a
    /// no-op.
    pub fn destroy(&self) -> Result<(), BlockError> {
        if self.is_destroyed() || self.inner.tearing_down.replace(true) {
            tracing::trace!("block {} ({}) already destroyed", self.name(), self.id());
            return Ok(());
        }

        let hook = self.trigger("destroy", Value::Null);

        if let Some(shared) = self.inner.engine.upgrade() {
            shared.listeners.borrow_mut().remove_owned(self);
            shared.cache.borrow_mut().remove(self.id(), self.name());
            shared.count_destroyed();
        }
        self.inner.handlers.borrow_mut().take();
        self.inner.state.set(LifecycleState::Destroyed);

        tracing::debug!("Destroyed block {} on {} ({})", self.name(), self.node(), self.id());
        hook
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("node", &self.node())
            .field("state", &self.state())
            .finish()
    }
}
