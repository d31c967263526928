//! Edge case tests for nb-dom

use nb_dom::{parse_data_value, DomError, DomTree, Event, EventKind, ModValue, NodeId, SelectorList};
use serde_json::json;

#[test]
fn test_invalid_selectors() {
    for input in ["", "   ", "a ~ b", "> a", "a >", "a, ", ".", "#", "[", "[=x]", "a > > b"] {
        let err = SelectorList::parse(input).unwrap_err();
        assert!(
            matches!(err, DomError::InvalidSelector { .. }),
            "expected a parse error for {input:?}"
        );
    }
}

#[test]
fn test_selector_source_is_trimmed() {
    let list = SelectorList::parse("  .a ,  .b  ").unwrap();
    assert_eq!(list.as_str(), ".a ,  .b");
}

#[test]
fn test_quoted_attribute_values() {
    let mut tree = DomTree::new();
    let node = tree.append_element(tree.document_element(), "a", &[("title", "a, b]")]);
    assert!(tree.matches_str(node, r#"[title="a, b]"]"#).unwrap());
    assert!(!tree.matches_str(node, "[title='x']").unwrap());
}

#[test]
fn test_document_is_not_an_element() {
    let tree = DomTree::new();
    assert!(tree.element(NodeId::ROOT).is_none());
    assert!(!tree.matches_str(NodeId::ROOT, "*").unwrap());
    assert_eq!(tree.get_mod(NodeId::ROOT, "x"), ModValue::Off);
}

#[test]
fn test_unknown_node_operations() {
    let mut tree = DomTree::new();
    let bogus = NodeId::NONE;

    assert_eq!(tree.parent(bogus), None);
    assert_eq!(tree.children(bogus).count(), 0);
    assert_eq!(tree.descendants(bogus).count(), 0);
    assert_eq!(tree.get_attribute(bogus, "id"), None);
    assert_eq!(tree.remove_attribute(bogus, "id"), None);
    assert_eq!(tree.set_attribute(bogus, "id", "x"), Err(DomError::UnknownNode(bogus)));
    assert!(tree.set_mod(bogus, "a", true).is_err());
    assert_eq!(bogus.to_string(), "#none");
}

#[test]
fn test_append_child_rejects_cycles() {
    let mut tree = DomTree::new();
    let outer = tree.append_element(tree.document_element(), "div", &[]);
    let inner = tree.append_element(outer, "div", &[]);

    tree.append_child(inner, outer);
    assert_eq!(tree.parent(outer), Some(tree.document_element()));
    assert_eq!(tree.parent(inner), Some(outer));
}

#[test]
fn test_append_child_moves_node() {
    let mut tree = DomTree::new();
    let html = tree.document_element();
    let a = tree.append_element(html, "div", &[]);
    let b = tree.append_element(html, "div", &[]);
    let child = tree.append_element(a, "span", &[]);

    tree.append_child(b, child);
    assert_eq!(tree.children(a).count(), 0);
    assert_eq!(tree.children(b).collect::<Vec<_>>(), vec![child]);
}

#[test]
fn test_empty_id_is_no_id() {
    let mut tree = DomTree::new();
    let node = tree.append_element(tree.document_element(), "div", &[("id", "")]);
    assert_eq!(tree.element(node).and_then(|e| e.id()), None);
    assert_eq!(tree.get_element_by_id(""), None);
}

#[test]
fn test_modifier_values_with_underscores() {
    let mut tree = DomTree::new();
    let node = tree.append_element(tree.document_element(), "div", &[]);

    tree.set_mod(node, "size", "x_large").unwrap();
    assert_eq!(tree.get_mod(node, "size").as_str(), Some("x_large"));

    // Setting a modifier drops every earlier token for it
    tree.set_attribute(node, "class", "size_s size_m other").unwrap();
    tree.set_mod(node, "size", "l").unwrap();
    assert_eq!(tree.get_attribute(node, "class"), Some("other size_l"));
}

#[test]
fn test_data_values_are_never_evaluated() {
    assert_eq!(parse_data_value("{}"), json!({}));
    assert_eq!(parse_data_value("[]"), json!([]));
    assert_eq!(parse_data_value("{ a: 1 }"), json!("{ a: 1 }"));
    assert_eq!(parse_data_value("(function(){})()"), json!("(function(){})()"));
    assert_eq!(parse_data_value(""), json!(""));
    assert_eq!(parse_data_value("true"), json!("true"));
}

#[test]
fn test_data_on_missing_key_and_node() {
    let tree = DomTree::new();
    let html = tree.document_element();
    assert_eq!(tree.data(html, "data-nb-", "x"), None);
    assert!(tree.all_data(NodeId::NONE, "data-nb-").is_empty());
}

#[test]
fn test_event_key_edge_cases() {
    assert_eq!(EventKind::split_key("  click   .a .b "), Some((EventKind::Click, ".a .b")));
    assert_eq!(EventKind::split_key("click-outside"), None);
    assert_eq!(EventKind::split_key("Click"), None);
    assert_eq!(EventKind::split_key(""), None);
}

#[test]
fn test_related_target_builder() {
    let tree = DomTree::new();
    let html = tree.document_element();
    let event = Event::new(EventKind::MouseOut, html).with_related(Some(NodeId::ROOT));
    assert_eq!(event.related_target, Some(NodeId::ROOT));
    assert_eq!(Event::key(EventKind::KeyDown, html, "Enter").key.as_deref(), Some("Enter"));
}
