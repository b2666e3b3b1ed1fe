use crate::element::event_name;
use crate::instance::{key_name, should_update_component};
use crate::*;
use indexmap::IndexMap;

fn div() -> ElementBuilder {
    Element::native("div")
}

#[test]
fn builder_stores_single_child_directly() {
    let el = div().child("only").build();
    let node = el.as_node().expect("node element");
    assert!(matches!(node.props.children(), Some(Element::Text(text)) if &**text == "only"));
}

#[test]
fn builder_collects_several_children_into_a_list() {
    let el = div().child("a").children(["b", "c"]).build();
    let children = el.as_node().and_then(|n| n.props.children()).cloned();
    match children {
        Some(Element::List(items)) => assert_eq!(items.len(), 3),
        other => panic!("expected list, got {other:?}"),
    }
}

#[test]
fn list_passed_as_one_child_stays_a_fragment() {
    let inner = Element::list(vec![Element::from("x"), Element::from("y")]);
    let el = div().child(inner).build();
    let children = el.as_node().and_then(|n| n.props.children()).cloned();
    let items = match children {
        Some(Element::List(items)) => items,
        other => panic!("expected list, got {other:?}"),
    };
    assert_eq!(items.len(), 2);
}

#[test]
fn builder_on_registers_camel_case_handler_prop() {
    let el = div().on("click", |_| {}).on("touchStart", |_| {}).build();
    let props = &el.as_node().expect("node").props;
    assert!(props.handler("onClick").is_some());
    assert!(props.handler("onTouchStart").is_some());
}

#[test]
fn children_prop_is_not_a_plain_prop() {
    let mut props = Props::new();
    props.insert("children", "ignored");
    assert!(props.is_empty());
    props.set_children("kept");
    assert!(props.children().is_some());
    assert_eq!(props.len(), 0);
}

#[test]
fn event_names_follow_on_uppercase_pattern() {
    assert_eq!(event_name("onClick").as_deref(), Some("click"));
    assert_eq!(event_name("onDoubleClick").as_deref(), Some("doubleclick"));
    assert_eq!(event_name("once"), None);
    assert_eq!(event_name("on"), None);
    assert_eq!(event_name("title"), None);
}

#[test]
fn numbers_format_like_script_strings() {
    assert_eq!(format_number(1.0), "1");
    assert_eq!(format_number(1.5), "1.5");
    assert_eq!(format_number(-0.0), "0");
    assert_eq!(format_number(f64::NAN), "NaN");
    assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    assert_eq!(Element::from(42).text_content().as_deref(), Some("42"));
}

#[test]
fn style_blank_values_count_as_absent_but_zero_does_not() {
    assert!(StyleValue::from("").is_blank());
    assert!(!StyleValue::from(0).is_blank());
    assert!(!StyleValue::from("0").is_blank());
    assert_eq!(StyleValue::cleared().to_string(), "");
}

#[test]
fn identity_is_by_pointer_for_nodes_and_by_value_for_text() {
    let a = div().build();
    let b = div().build();
    assert!(a.same(&a.clone()));
    assert!(!a.same(&b));
    assert!(Element::from("t").same(&Element::from("t")));
    assert!(Element::from(1).same(&Element::Number(1.0)));
}

#[test]
fn compatibility_requires_same_type_and_key() {
    let comp = ComponentType::function("C", |_| Ok(Element::Empty));
    let other = ComponentType::function("C", |_| Ok(Element::Empty));

    assert!(should_update_component(&div().build(), &div().build()));
    assert!(!should_update_component(&div().build(), &Element::native("span").build()));
    assert!(!should_update_component(
        &div().key("a").build(),
        &div().key("b").build()
    ));
    assert!(should_update_component(&Element::from("a"), &Element::from(2)));
    assert!(should_update_component(&Element::Empty, &Element::Bool(false)));
    assert!(!should_update_component(&Element::Empty, &Element::from("a")));
    assert!(should_update_component(
        &comp.element().build(),
        &comp.element().build()
    ));
    assert!(!should_update_component(
        &comp.element().build(),
        &other.element().build()
    ));
}

#[test]
fn key_names_prefer_explicit_keys_and_fall_back_to_base36_positions() {
    let mut taken: IndexMap<String, ()> = IndexMap::new();
    let keyed = div().key("row").build();
    let name = key_name(&taken, &keyed, 0);
    assert_eq!(name, "$row");
    taken.insert(name, ());

    // Duplicate keys fall back to the position.
    assert_eq!(key_name(&taken, &keyed, 1), ".1");
    assert_eq!(key_name(&taken, &div().build(), 35), ".z");
    assert_eq!(key_name(&taken, &div().build(), 36), ".10");
}

#[test]
fn shallow_eq_compares_values_strictly() {
    let handler = EventHandler::new(|_| {});
    let a = Props::new().with("n", 1).with("onClick", handler.clone());
    let b = Props::new().with("n", 1).with("onClick", handler);
    let c = Props::new().with("n", 1).with("onClick", EventHandler::new(|_| {}));
    assert!(a.shallow_eq(&b));
    assert!(!a.shallow_eq(&c));
}

#[test]
fn render_errors_have_stable_codes_and_wrap_host_errors() {
    let err = RenderError::from(NodeError::Missing { id: 3 });
    assert_eq!(err.code(), 7);
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(RenderError::HookOutsideRender.code(), 1);
    assert!(RenderError::TooManyReRenders { limit: 24 }
        .to_string()
        .contains("24"));
}

#[cfg(not(feature = "minified-errors"))]
#[test]
fn render_errors_describe_themselves_in_full_builds() {
    assert!(RenderError::HookOutsideRender
        .to_string()
        .contains("inside a function component render"));
    let invalid = RenderError::InvalidElement {
        element: "Empty".to_owned(),
    };
    assert!(invalid.to_string().contains("invalid element type: Empty"));
}

#[cfg(feature = "minified-errors")]
#[test]
fn render_errors_are_minified_with_their_code() {
    assert!(RenderError::HookOutsideRender
        .to_string()
        .contains("minified error #1"));
    let invalid = RenderError::InvalidElement {
        element: "Empty".to_owned(),
    };
    assert!(invalid.to_string().contains("minified error #2"));
    assert!(RenderError::TooManyReRenders { limit: 24 }
        .to_string()
        .contains("24"));
}
