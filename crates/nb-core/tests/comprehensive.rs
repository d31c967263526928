//! Comprehensive tests for nb-core
//!
//! Builds small widgets on top of the engine and drives them with platform
//! events, the way host code does.

use std::cell::RefCell;
use std::rc::Rc;

use nb_core::nb_dom::{Event, EventKind, ModValue, NodeId};
use nb_core::{BlockDefinition, Config, Engine, Flow, Handler};
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Base type shared by the widgets below
fn define_base(engine: &Engine) {
    engine
        .define(
            BlockDefinition::named("base")
                .on_method("init", "oninit")
                .method("oninit", |block, _| {
                    block.set_mod("_inited", true)?;
                    Ok(Flow::Continue)
                }),
        )
        .unwrap();
}

/// Popup that opens on `open`, closes from its close button or any click
/// outside of it
fn define_popup(engine: &Engine) {
    engine
        .define(
            BlockDefinition::named("popup")
                .extends("base")
                .on_method("open", "onopen")
                .on_method("close", "onclose")
                .on("click .popup__close", |block, _| {
                    block.trigger("close", Value::Null)?;
                    Ok(Flow::StopPropagation)
                })
                .method("onopen", |block, _| {
                    block.set_mod("popup_open", true)?;
                    block.show()?;
                    Ok(Flow::Continue)
                })
                .method("onclose", |block, _| {
                    block.del_mod("popup_open")?;
                    block.hide()?;
                    Ok(Flow::Continue)
                }),
        )
        .unwrap();
}

fn build_page(engine: &Engine) -> (NodeId, NodeId, NodeId, NodeId) {
    let mut tree = engine.tree_mut();
    let html = tree.document_element();
    let body = tree.append_element(html, "body", &[]);
    let popup = tree.append_element(
        body,
        "div",
        &[("data-nb", "popup"), ("id", "menu"), ("class", "popup _init"), ("data-nb-to", "bottom")],
    );
    let close = tree.append_element(popup, "span", &[("class", "popup__close")]);
    let outside = tree.append_element(body, "p", &[]);
    (body, popup, close, outside)
}

#[test]
fn test_popup_lifecycle() {
    init_tracing();
    let engine = Engine::new(Config::default());
    define_base(&engine);
    define_popup(&engine);
    let (_, popup, close, _) = build_page(&engine);

    let blocks = engine.init_all(None).unwrap();
    assert_eq!(blocks.len(), 1);
    let block = &blocks[0];
    assert_eq!(block.name(), "popup");
    assert_eq!(block.id(), "menu");
    assert_eq!(block.get_mod("_inited"), ModValue::On, "base init handler ran");
    assert_eq!(block.data("to"), Some(json!("bottom")));

    block.trigger("open", Value::Null).unwrap();
    assert_eq!(block.get_mod("popup_open"), ModValue::On);
    assert!(!engine.tree().has_class(popup, "nb-is-hidden"));

    let proceed = engine.emit(&Event::click(close)).unwrap();
    assert!(!proceed, "close button stops the click");
    assert!(block.get_mod("popup_open").is_off());
    assert!(engine.tree().has_class(popup, "nb-is-hidden"));
}

#[test]
fn test_global_click_closes_popups() {
    let engine = Engine::new(Config::default());
    define_base(&engine);
    define_popup(&engine);
    let (_, popup, close, outside) = build_page(&engine);
    let block = engine.block(popup, &[], None).unwrap().unwrap();

    // Close on any click that reaches the global channel
    let target = block.clone();
    let closer = engine
        .on_fn("space:click", move |_, _| {
            target.trigger("close", Value::Null)?;
            Ok(Flow::Continue)
        })
        .unwrap();

    block.trigger("open", Value::Null).unwrap();
    engine.emit(&Event::click(outside)).unwrap();
    assert!(block.get_mod("popup_open").is_off());

    // The close button stops propagation, so the relay never sees it
    block.trigger("open", Value::Null).unwrap();
    engine.off("space:click", Some(&closer));
    engine.emit(&Event::click(close)).unwrap();
    assert!(block.get_mod("popup_open").is_off());
    assert_eq!(engine.stats().delegated_dispatches, 2);
}

#[test]
fn test_inited_announcement() {
    let engine = Engine::new(Config::default());
    define_base(&engine);
    define_popup(&engine);
    let (_, popup, _, _) = build_page(&engine);

    let announced = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&announced);
    engine
        .on_fn("inited:menu", move |_, payload| {
            sink.borrow_mut().push(payload.params().clone());
            Ok(Flow::Continue)
        })
        .unwrap();

    engine.block(popup, &[], None).unwrap();
    engine.block(popup, &[], None).unwrap();
    assert_eq!(*announced.borrow(), [json!("menu")]);
}

#[test]
fn test_checkbox_toggle_with_nested_blocks() {
    let engine = Engine::new(Config::without_global_channel());
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    let sink = Rc::clone(&log);
    engine
        .define(BlockDefinition::named("checkbox").on("click", move |block, _| {
            let checked = block.get_mod("checkbox_checked").is_off();
            block.set_mod("checkbox_checked", checked)?;
            sink.borrow_mut().push(format!("checkbox:{checked}"));
            Ok(Flow::Continue)
        }))
        .unwrap();
    let sink = Rc::clone(&log);
    engine
        .define(BlockDefinition::named("form").on("click .row", move |_, payload| {
            let row = payload.node().expect("dom payload");
            sink.borrow_mut().push(format!("row:{}", row.index()));
            Ok(Flow::Continue)
        }))
        .unwrap();

    let (form, row, checkbox, label) = {
        let mut tree = engine.tree_mut();
        let html = tree.document_element();
        let form = tree.append_element(html, "form", &[("data-nb", "form")]);
        let row = tree.append_element(form, "div", &[("class", "row")]);
        let checkbox = tree.append_element(row, "span", &[("data-nb", "checkbox")]);
        let label = tree.append_element(checkbox, "i", &[]);
        (form, row, checkbox, label)
    };

    engine.emit(&Event::click(label)).unwrap();
    engine.emit(&Event::click(label)).unwrap();

    let row_entry = format!("row:{}", row.index());
    assert_eq!(
        *log.borrow(),
        ["checkbox:true", row_entry.as_str(), "checkbox:false", row_entry.as_str()]
    );
    assert!(engine.has_block(form, Some("form")));
    assert!(engine.has_block(checkbox, Some("checkbox")));
}

#[test]
fn test_select_with_mixins_and_children() {
    let engine = Engine::new(Config::without_global_channel());
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    let sink = Rc::clone(&log);
    engine
        .define(BlockDefinition::named("focusable").on("focusin", move |block, _| {
            sink.borrow_mut().push(format!("focus:{}", block.name()));
            Ok(Flow::Continue)
        }))
        .unwrap();
    engine
        .define(BlockDefinition::named("option").mixin("focusable"))
        .unwrap();
    engine
        .define(BlockDefinition::named("select").mixin("focusable"))
        .unwrap();

    let (select, first) = {
        let mut tree = engine.tree_mut();
        let html = tree.document_element();
        let select = tree.append_element(html, "div", &[("data-nb", "select")]);
        let first = tree.append_element(select, "div", &[("data-nb", "option")]);
        tree.append_element(select, "div", &[("data-nb", "option")]);
        (select, first)
    };

    engine.emit(&Event::new(EventKind::FocusIn, first)).unwrap();
    assert_eq!(*log.borrow(), ["focus:option", "focus:select"]);

    let block = engine.block(select, &[], Some("select")).unwrap().unwrap();
    let options = block.children().unwrap();
    assert_eq!(options.len(), 2);
    assert!(options.iter().all(|o| o.name() == "option"));
    assert_eq!(engine.instance_count(), 3);
}

#[test]
fn test_find_and_destroy_all() {
    let engine = Engine::new(Config::default());
    define_base(&engine);
    define_popup(&engine);
    let (body, popup, _, _) = build_page(&engine);

    let block = engine.find("menu").unwrap().unwrap();
    assert_eq!(block.node(), popup);
    assert!(engine.find("nothing").unwrap().is_none());

    let destroyed = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&destroyed);
    block
        .on(
            "destroy",
            Handler::new(move |_, _| {
                *flag.borrow_mut() = true;
                Ok(Flow::Continue)
            }),
        )
        .unwrap();

    assert_eq!(engine.destroy_all(Some(body)).unwrap(), 1);
    assert!(*destroyed.borrow());
    assert!(block.is_destroyed());
    assert!(!engine.has_block(popup, None));
}

#[test]
fn test_keyboard_events_reach_blocks() {
    let engine = Engine::new(Config::without_global_channel());
    let keys = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&keys);
    engine
        .define(BlockDefinition::named("input").on("keydown input", move |_, payload| {
            let key = payload.event().and_then(|e| e.key.clone());
            sink.borrow_mut().push(key);
            Ok(Flow::Continue)
        }))
        .unwrap();

    let (field, control) = {
        let mut tree = engine.tree_mut();
        let html = tree.document_element();
        let field = tree.append_element(html, "span", &[("data-nb", "input")]);
        let control = tree.append_element(field, "input", &[]);
        (field, control)
    };

    engine.emit(&Event::key(EventKind::KeyDown, control, "Enter")).unwrap();
    engine.emit(&Event::key(EventKind::KeyDown, field, "Tab")).unwrap();
    assert_eq!(*keys.borrow(), [Some("Enter".to_string())]);
    assert!(engine.is_listening(EventKind::KeyDown));
    assert!(!engine.is_listening(EventKind::KeyUp));
}
