//! Platform Events
//!
//! The fixed set of event kinds blocks may subscribe to, and the event
//! record the host delivers for each occurrence.

use std::cell::Cell;
use std::fmt;

use crate::NodeId;

/// Event kinds that can be declared in a block's event map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Click,
    DblClick,
    MouseUp,
    MouseDown,
    KeyDown,
    KeyPress,
    KeyUp,
    Input,
    Change,
    Blur,
    MouseOver,
    MouseOut,
    FocusIn,
    FocusOut,
}

impl EventKind {
    /// Every supported kind
    pub const ALL: [EventKind; 14] = [
        Self::Click,
        Self::DblClick,
        Self::MouseUp,
        Self::MouseDown,
        Self::KeyDown,
        Self::KeyPress,
        Self::KeyUp,
        Self::Input,
        Self::Change,
        Self::Blur,
        Self::MouseOver,
        Self::MouseOut,
        Self::FocusIn,
        Self::FocusOut,
    ];

    /// Parse a platform event name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::DblClick => "dblclick",
            Self::MouseUp => "mouseup",
            Self::MouseDown => "mousedown",
            Self::KeyDown => "keydown",
            Self::KeyPress => "keypress",
            Self::KeyUp => "keyup",
            Self::Input => "input",
            Self::Change => "change",
            Self::Blur => "blur",
            Self::MouseOver => "mouseover",
            Self::MouseOut => "mouseout",
            Self::FocusIn => "focusin",
            Self::FocusOut => "focusout",
        }
    }

    /// Kinds that must be bound on the block node instead of the root
    pub fn is_local(self) -> bool {
        matches!(self, Self::Blur)
    }

    /// Whether the platform delivers the kind to ancestors of the target
    pub fn bubbles(self) -> bool {
        !matches!(self, Self::Blur)
    }

    /// Pointer over/out kinds, reinterpreted as enter/leave by the dispatcher
    pub fn is_hover(self) -> bool {
        matches!(self, Self::MouseOver | Self::MouseOut)
    }

    /// Split an event key such as `"click .close"` into kind and selector
    ///
    /// Returns `None` when the first word is not a platform kind, meaning the
    /// key names a custom event.
    pub fn split_key(key: &str) -> Option<(Self, &str)> {
        let key = key.trim();
        let (head, rest) = key.split_once(char::is_whitespace).unwrap_or((key, ""));
        Self::parse(head).map(|kind| (kind, rest.trim()))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single platform event occurrence
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    /// Node the event originated on
    pub target: NodeId,
    /// Node the pointer came from (over) or goes to (out)
    pub related_target: Option<NodeId>,
    /// Pointer button, 0 is primary
    pub button: u16,
    /// Key for keyboard kinds
    pub key: Option<String>,
    pub timestamp: f64,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    pub fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            related_target: None,
            button: 0,
            key: None,
            timestamp: 0.0,
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    /// Primary-button click
    pub fn click(target: NodeId) -> Self {
        Self::new(EventKind::Click, target)
    }

    /// Pointer moved onto `target` from `related`
    pub fn mouse_over(target: NodeId, related: Option<NodeId>) -> Self {
        Self::new(EventKind::MouseOver, target).with_related(related)
    }

    /// Pointer moved off `target` onto `related`
    pub fn mouse_out(target: NodeId, related: Option<NodeId>) -> Self {
        Self::new(EventKind::MouseOut, target).with_related(related)
    }

    /// Key event
    pub fn key(kind: EventKind, target: NodeId, key: &str) -> Self {
        let mut event = Self::new(kind, target);
        event.key = Some(key.to_string());
        event
    }

    pub fn with_related(mut self, related: Option<NodeId>) -> Self {
        self.related_target = related;
        self
    }

    pub fn with_button(mut self, button: u16) -> Self {
        self.button = button;
        self
    }

    /// Prevent the host's default action
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Stop native bubbling after the current node
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}
