//! Handlers
//!
//! Every event handler and block method shares one signature: it receives the
//! block instance and a [`Payload`], and answers with a [`Flow`].

use std::fmt;
use std::rc::Rc;

use nb_dom::{Event, NodeId};
use serde_json::Value;

use crate::Block;

/// What a handler asks the dispatcher to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep going
    #[default]
    Continue,
    /// Skip the remaining (inherited) handlers of this chain only
    StopChain,
    /// Skip the remaining handlers and stop walking up the tree
    StopPropagation,
}

/// Result of a handler invocation; errors abort the whole dispatch
pub type HandlerResult = anyhow::Result<Flow>;

/// Data passed to a handler
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// Platform event, with the node that matched the handler's selector
    Dom { event: &'a Event, node: NodeId },
    /// Custom event or method call
    Custom { name: &'a str, params: &'a Value },
}

static NO_PARAMS: Value = Value::Null;

impl<'a> Payload<'a> {
    pub fn event(&self) -> Option<&'a Event> {
        match *self {
            Self::Dom { event, .. } => Some(event),
            Self::Custom { .. } => None,
        }
    }

    /// Matched node for platform events
    pub fn node(&self) -> Option<NodeId> {
        match *self {
            Self::Dom { node, .. } => Some(node),
            Self::Custom { .. } => None,
        }
    }

    /// Parameters of a custom event, `null` for platform events
    pub fn params(&self) -> &'a Value {
        match *self {
            Self::Dom { .. } => &NO_PARAMS,
            Self::Custom { params, .. } => params,
        }
    }

    /// Custom event name, or the platform event kind
    pub fn name(&self) -> &'a str {
        match *self {
            Self::Dom { event, .. } => event.kind.as_str(),
            Self::Custom { name, .. } => name,
        }
    }
}

type HandlerFn = dyn Fn(&Block, &Payload<'_>) -> HandlerResult;

/// Shared, comparable handler function
///
/// Clones share identity, which is what `off` uses to find a handler.
#[derive(Clone)]
pub struct Handler(Rc<HandlerFn>);

impl Handler {
    pub fn new(f: impl Fn(&Block, &Payload<'_>) -> HandlerResult + 'static) -> Self {
        Self(Rc::new(f))
    }

    #[inline]
    pub fn call(&self, block: &Block, payload: &Payload<'_>) -> HandlerResult {
        (self.0)(block, payload)
    }

    /// Check if both handles refer to the same function
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Rc::as_ptr(&self.0))
    }
}

/// Run a compiled chain most-derived first
///
/// Both stop variants end the chain; the one that ended it is returned.
pub(crate) fn run_chain(chain: &[Handler], block: &Block, payload: &Payload<'_>) -> HandlerResult {
    for handler in chain.iter().rev() {
        match handler.call(block, payload)? {
            Flow::Continue => {}
            stop => return Ok(stop),
        }
    }
    Ok(Flow::Continue)
}
