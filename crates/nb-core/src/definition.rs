//! Block type definitions
//!
//! A [`BlockDefinition`] is the declarative input to [`Engine::define`]: an
//! event map, instance methods, an optional base type and optional mixins.
//!
//! ```ignore
//! let popup = BlockDefinition::named("popup")
//!     .extends("base")
//!     .on("click .close", |block, _| {
//!         block.hide()?;
//!         Ok(Flow::StopPropagation)
//!     })
//!     .on_method("open", "onopen")
//!     .method("onopen", |block, _| {
//!         block.show()?;
//!         Ok(Flow::Continue)
//!     });
//! engine.define(popup)?;
//! ```
//!
//! [`Engine::define`]: crate::Engine::define

use crate::handler::{Handler, HandlerResult, Payload};
use crate::Block;

/// Handler bound to one event key
#[derive(Debug, Clone)]
pub enum HandlerSpec {
    /// Name of an instance method, resolved when the type is defined
    Method(String),
    /// Direct function
    Func(Handler),
    /// Drop every inherited handler for this key
    Discard,
}

/// Declarative description of a block type
#[derive(Debug, Clone, Default)]
pub struct BlockDefinition {
    pub(crate) name: Option<String>,
    pub(crate) base: Option<String>,
    pub(crate) mixins: Vec<String>,
    pub(crate) events: Vec<(String, HandlerSpec)>,
    pub(crate) methods: Vec<(String, Handler)>,
}

impl BlockDefinition {
    /// Definition registered under `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Definition that gets a generated name
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Extend a previously defined type
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Add the events of a previously defined type as a separate layer
    pub fn mixin(mut self, name: impl Into<String>) -> Self {
        self.mixins.push(name.into());
        self
    }

    /// Bind a function to an event key (`"click"`, `"click .foo"`, `"open"`)
    pub fn on(
        self,
        key: impl Into<String>,
        f: impl Fn(&Block, &Payload<'_>) -> HandlerResult + 'static,
    ) -> Self {
        self.bind(key.into(), HandlerSpec::Func(Handler::new(f)))
    }

    /// Bind an existing handler to an event key
    pub fn on_handler(self, key: impl Into<String>, handler: Handler) -> Self {
        self.bind(key.into(), HandlerSpec::Func(handler))
    }

    /// Bind an instance method to an event key
    pub fn on_method(self, key: impl Into<String>, method: impl Into<String>) -> Self {
        self.bind(key.into(), HandlerSpec::Method(method.into()))
    }

    /// Ignore the inherited handlers for an event key
    pub fn discard(self, key: impl Into<String>) -> Self {
        self.bind(key.into(), HandlerSpec::Discard)
    }

    /// Add or override an instance method
    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Block, &Payload<'_>) -> HandlerResult + 'static,
    ) -> Self {
        let name = name.into();
        let handler = Handler::new(f);
        match self.methods.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = handler,
            None => self.methods.push((name, handler)),
        }
        self
    }

    /// Declared name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    // Event keys are unique; a later binding replaces an earlier one in place.
    fn bind(mut self, key: String, spec: HandlerSpec) -> Self {
        match self.events.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = spec,
            None => self.events.push((key, spec)),
        }
        self
    }
}
