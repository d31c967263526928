//! Event compiler
//!
//! Turns the event map of a [`BlockDefinition`] into an [`EventTable`]:
//! platform keys are split into delegated (`dom`) and node-bound (`local`)
//! routes keyed by selector, everything else is a custom event. Inheritance
//! is resolved here once, by prepending the base type's chains, so the
//! dispatcher never walks a type hierarchy.
//!
//! [`BlockDefinition`]: crate::BlockDefinition

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use nb_dom::{EventKind, SelectorList};

use crate::definition::HandlerSpec;
use crate::error::BlockError;
use crate::handler::Handler;

/// Handler chain, most-base first
pub(crate) type Chain = Rc<[Handler]>;

// === Raw (per-definition) tables ===

#[derive(Debug, Clone)]
enum Slot {
    Discard,
    /// Own handlers on top of the inherited chain
    Handlers(Vec<Handler>),
    /// Own handlers bound after a discard; nothing is inherited
    Replace(Vec<Handler>),
}

impl Slot {
    /// Add a binding on top of what this key already holds
    fn push(&mut self, other: Slot) {
        let more = match other {
            Slot::Discard => {
                *self = Slot::Discard;
                return;
            }
            Slot::Handlers(more) | Slot::Replace(more) => more,
        };
        match *self {
            Slot::Discard => *self = Slot::Replace(more),
            Slot::Handlers(ref mut list) | Slot::Replace(ref mut list) => list.extend(more),
        }
    }

    /// Chain resulting from putting this slot on top of a base chain
    fn over(self, base: Option<&Chain>) -> Vec<Handler> {
        match self {
            Slot::Discard => Vec::new(),
            Slot::Replace(own) => own,
            Slot::Handlers(own) => base
                .map(|b| b.iter().cloned())
                .into_iter()
                .flatten()
                .chain(own)
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct RawRoute {
    key: String,
    selector: Option<SelectorList>,
    slot: Slot,
}

type RawRoutes = Vec<RawRoute>;

/// Event map of one definition, before inheritance
#[derive(Debug, Default)]
pub(crate) struct RawLayer {
    dom: IndexMap<EventKind, RawRoutes>,
    local: IndexMap<EventKind, RawRoutes>,
    custom: IndexMap<String, Slot>,
}

impl RawLayer {
    /// Sort event keys and resolve method references
    pub(crate) fn collect(
        type_name: &str,
        events: &[(String, HandlerSpec)],
        methods: &HashMap<String, Handler>,
    ) -> Result<Self, BlockError> {
        let mut raw = Self::default();

        for (key, spec) in events {
            let slot = match spec {
                HandlerSpec::Discard => Slot::Discard,
                HandlerSpec::Func(handler) => Slot::Handlers(vec![handler.clone()]),
                HandlerSpec::Method(method) => {
                    let handler = methods.get(method).ok_or_else(|| BlockError::UnknownMethod {
                        block: type_name.to_string(),
                        method: method.clone(),
                    })?;
                    Slot::Handlers(vec![handler.clone()])
                }
            };

            match EventKind::split_key(key) {
                Some((kind, selector)) => {
                    let table = if kind.is_local() { &mut raw.local } else { &mut raw.dom };
                    let routes = table.entry(kind).or_default();
                    match routes.iter_mut().find(|r| r.key == selector) {
                        Some(route) => route.slot.push(slot),
                        None => routes.push(RawRoute {
                            key: selector.to_string(),
                            selector: parse_selector(selector)?,
                            slot,
                        }),
                    }
                }
                None => {
                    match raw.custom.entry(key.trim().to_string()) {
                        Entry::Occupied(mut existing) => existing.get_mut().push(slot),
                        Entry::Vacant(vacant) => {
                            vacant.insert(slot);
                        }
                    }
                }
            }
        }

        Ok(raw)
    }

    /// Platform kinds this definition delegates to the root listener
    pub(crate) fn dom_kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.dom.keys().copied()
    }
}

fn parse_selector(selector: &str) -> Result<Option<SelectorList>, BlockError> {
    if selector.is_empty() {
        Ok(None)
    } else {
        Ok(Some(SelectorList::parse(selector)?))
    }
}

// === Compiled tables ===

/// Handlers for one `kind selector` key
#[derive(Debug, Clone)]
pub(crate) struct Route {
    /// Selector source, empty for the block node itself
    pub(crate) key: String,
    pub(crate) selector: Option<SelectorList>,
    pub(crate) chain: Chain,
}

/// One layer of a compiled table; plain types have exactly one
#[derive(Debug, Clone, Default)]
pub(crate) struct EventLayer {
    pub(crate) dom: IndexMap<EventKind, Vec<Route>>,
    pub(crate) local: IndexMap<EventKind, Vec<Route>>,
    pub(crate) custom: IndexMap<String, Chain>,
}

impl EventLayer {
    fn finalize(raw: RawLayer, base: Option<&EventLayer>) -> Self {
        let empty = EventLayer::default();
        let base = base.unwrap_or(&empty);

        Self {
            dom: merge_kinds(raw.dom, &base.dom),
            local: merge_kinds(raw.local, &base.local),
            custom: merge_custom(raw.custom, &base.custom),
        }
    }
}

fn merge_kinds(
    own: IndexMap<EventKind, RawRoutes>,
    base: &IndexMap<EventKind, Vec<Route>>,
) -> IndexMap<EventKind, Vec<Route>> {
    let mut merged = IndexMap::new();
    let own_kinds: Vec<EventKind> = own.keys().copied().collect();

    for (kind, routes) in own {
        let base_routes = base.get(&kind).map(Vec::as_slice).unwrap_or_default();
        let routes = merge_routes(routes, base_routes);
        if !routes.is_empty() {
            merged.insert(kind, routes);
        }
    }
    for (kind, routes) in base.iter() {
        if !own_kinds.contains(kind) {
            merged.insert(*kind, routes.clone());
        }
    }

    merged
}

fn merge_routes(own: RawRoutes, base: &[Route]) -> Vec<Route> {
    let mut routes: Vec<Route> = Vec::with_capacity(own.len() + base.len());
    let own_keys: Vec<String> = own.iter().map(|r| r.key.clone()).collect();

    for raw in own {
        let inherited = base.iter().find(|r| r.key == raw.key).map(|r| &r.chain);
        let chain = raw.slot.over(inherited);
        if !chain.is_empty() {
            routes.push(Route {
                key: raw.key,
                selector: raw.selector,
                chain: chain.into(),
            });
        }
    }
    routes.extend(base.iter().filter(|r| !own_keys.contains(&r.key)).cloned());

    routes
}

fn merge_custom(own: IndexMap<String, Slot>, base: &IndexMap<String, Chain>) -> IndexMap<String, Chain> {
    let mut merged = IndexMap::new();
    let mut discarded = Vec::new();

    for (name, slot) in own {
        let chain = slot.over(base.get(&name));
        if chain.is_empty() {
            discarded.push(name);
        } else {
            merged.insert(name, chain.into());
        }
    }
    for (name, chain) in base.iter() {
        if !merged.contains_key(name) && !discarded.contains(name) {
            merged.insert(name.clone(), chain.clone());
        }
    }

    merged
}

/// Compiled event table of a block type
///
/// Layer 0 holds the type's own events merged with its base; every mixin
/// contributes its layers after that.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    layers: Vec<EventLayer>,
}

impl EventTable {
    pub(crate) fn compile(raw: RawLayer, base: Option<&EventTable>, mixins: &[&EventTable]) -> Self {
        let mut layers = vec![EventLayer::finalize(raw, base.and_then(|b| b.layers.first()))];
        if let Some(base) = base {
            layers.extend(base.layers.iter().skip(1).cloned());
        }
        for mixin in mixins {
            layers.extend(mixin.layers.iter().cloned());
        }
        Self { layers }
    }

    pub(crate) fn layers(&self) -> &[EventLayer] {
        &self.layers
    }

    /// Number of layers (1 + mixin layers)
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Platform kinds with delegated handlers, across layers
    pub fn dom_kinds(&self) -> Vec<EventKind> {
        let mut kinds: Vec<EventKind> = Vec::new();
        for kind in self.layers.iter().flat_map(|l| l.dom.keys()) {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }

    /// Length of the compiled chain for an event key in the first layer
    ///
    /// `"click .foo"` looks up a delegated or local route, anything else a
    /// custom event. Returns 0 when the key has no handlers.
    pub fn chain_len(&self, key: &str) -> usize {
        let Some(layer) = self.layers.first() else {
            return 0;
        };
        match EventKind::split_key(key) {
            Some((kind, selector)) => {
                let table = if kind.is_local() { &layer.local } else { &layer.dom };
                table
                    .get(&kind)
                    .and_then(|routes| routes.iter().find(|r| r.key == selector))
                    .map_or(0, |r| r.chain.len())
            }
            None => layer.custom.get(key.trim()).map_or(0, |c| c.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flow;

    fn func() -> HandlerSpec {
        HandlerSpec::Func(Handler::new(|_, _| Ok(Flow::Continue)))
    }

    fn compile(events: Vec<(&str, HandlerSpec)>, base: Option<&EventTable>) -> EventTable {
        let events: Vec<(String, HandlerSpec)> = events.into_iter().map(|(k, s)| (k.to_string(), s)).collect();
        let raw = RawLayer::collect("t", &events, &HashMap::new()).unwrap();
        EventTable::compile(raw, base, &[])
    }

    #[test]
    fn test_keys_are_categorized() {
        let table = compile(
            vec![("click", func()), ("click .close", func()), ("blur", func()), ("open", func())],
            None,
        );
        let layer = &table.layers()[0];

        assert_eq!(layer.dom.get(&EventKind::Click).map(Vec::len), Some(2));
        assert!(layer.local.contains_key(&EventKind::Blur));
        assert!(!layer.dom.contains_key(&EventKind::Blur));
        assert!(layer.custom.contains_key("open"));
        assert_eq!(table.dom_kinds(), vec![EventKind::Click]);
    }

    #[test]
    fn test_inheritance_prepends_base() {
        let base = compile(vec![("open", func()), ("click", func())], None);
        let derived = compile(vec![("open", func()), ("close", func())], Some(&base));

        assert_eq!(derived.chain_len("open"), 2);
        assert_eq!(derived.chain_len("close"), 1);
        assert_eq!(derived.chain_len("click"), 1);
    }

    #[test]
    fn test_discard_clears_inherited_chain() {
        let base = compile(vec![("open", func()), ("click .x", func())], None);
        let derived = compile(
            vec![("open", HandlerSpec::Discard), ("click .x", HandlerSpec::Discard)],
            Some(&base),
        );

        assert_eq!(derived.chain_len("open"), 0);
        assert_eq!(derived.chain_len("click .x"), 0);
        assert!(derived.dom_kinds().is_empty());
    }

    #[test]
    fn test_discard_survives_respelled_key() {
        let base = compile(vec![("click .x", func()), ("open", func())], None);
        let derived = compile(
            vec![
                ("click .x", HandlerSpec::Discard),
                ("click  .x", func()),
                ("open", HandlerSpec::Discard),
                (" open", func()),
            ],
            Some(&base),
        );

        assert_eq!(derived.chain_len("click .x"), 1);
        assert_eq!(derived.chain_len("open"), 1);
    }

    #[test]
    fn test_unknown_method_is_an_error() {
        let events = vec![("open".to_string(), HandlerSpec::Method("onopen".into()))];
        let err = RawLayer::collect("popup", &events, &HashMap::new()).unwrap_err();
        assert!(matches!(err, BlockError::UnknownMethod { ref method, .. } if method == "onopen"));
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let events = vec![("click a ~ b".to_string(), func())];
        let err = RawLayer::collect("t", &events, &HashMap::new()).unwrap_err();
        assert!(matches!(err, BlockError::Dom(_)));
    }

    #[test]
    fn test_mixin_layers_are_appended() {
        let mixin = compile(vec![("click", func())], None);
        let events = vec![("open".to_string(), func())];
        let raw = RawLayer::collect("t", &events, &HashMap::new()).unwrap();
        let table = EventTable::compile(raw, None, &[&mixin]);

        assert_eq!(table.layer_count(), 2);
        assert_eq!(table.chain_len("click"), 0);
        assert_eq!(table.dom_kinds(), vec![EventKind::Click]);
    }
}
