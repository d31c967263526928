//! Block factories
//!
//! One [`Factory`] exists per defined type. It owns the merged method table
//! and the compiled [`EventTable`]; instances are built through
//! [`Engine::block`](crate::Engine::block) so the instance cache is always
//! consulted first.

use std::collections::HashMap;

use crate::compiler::EventTable;
use crate::handler::Handler;

/// Compiled block type
#[derive(Debug)]
pub struct Factory {
    name: String,
    base: Option<String>,
    mixins: Vec<String>,
    methods: HashMap<String, Handler>,
    events: EventTable,
}

impl Factory {
    pub(crate) fn new(
        name: String,
        base: Option<String>,
        mixins: Vec<String>,
        methods: HashMap<String, Handler>,
        events: EventTable,
    ) -> Self {
        Self {
            name,
            base,
            mixins,
            methods,
            events,
        }
    }

    /// Registered type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the extended type
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn mixins(&self) -> &[String] {
        &self.mixins
    }

    /// Look up an instance method, inherited ones included
    pub fn method(&self, name: &str) -> Option<&Handler> {
        self.methods.get(name)
    }

    pub(crate) fn methods(&self) -> &HashMap<String, Handler> {
        &self.methods
    }

    /// Compiled event table
    pub fn events(&self) -> &EventTable {
        &self.events
    }
}
