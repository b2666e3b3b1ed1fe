//! Immutable element descriptions produced by render code.
//!
//! Elements are cheap to clone: every compound variant is reference counted,
//! and identity (`Rc::ptr_eq`) doubles as the fast-path equality check the
//! reconciler uses to skip unchanged subtrees.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::component::ComponentType;
use crate::refs::RefTarget;

pub(crate) const CHILDREN: &str = "children";
pub(crate) const STYLE: &str = "style";
pub(crate) const APPEND: &str = "append";

/// One position in the described UI tree.
#[derive(Clone, Default)]
pub enum Element {
    /// `null`/`undefined`: renders an empty placeholder node.
    #[default]
    Empty,
    /// Booleans render like [`Element::Empty`].
    Bool(bool),
    Text(Rc<str>),
    Number(f64),
    /// A fragment: its items are reconciled as siblings.
    List(Rc<[Element]>),
    Node(Rc<ElementNode>),
}

#[derive(Clone)]
pub struct ElementNode {
    pub kind: ElementType,
    pub props: Props,
    pub key: Option<String>,
    pub ref_target: Option<RefTarget>,
}

#[derive(Clone)]
pub enum ElementType {
    /// A host tag such as `"div"`.
    Native(Rc<str>),
    Component(ComponentType),
}

impl ElementType {
    /// Same tag, or the very same component definition.
    pub fn same(&self, other: &ElementType) -> bool {
        match (self, other) {
            (ElementType::Native(a), ElementType::Native(b)) => a == b,
            (ElementType::Component(a), ElementType::Component(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Element {
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Element::Text(text.into())
    }

    pub fn list(items: impl IntoIterator<Item = Element>) -> Self {
        Element::List(items.into_iter().collect())
    }

    pub fn native(tag: impl Into<Rc<str>>) -> ElementBuilder {
        ElementBuilder::new(ElementType::Native(tag.into()))
    }

    pub fn component(component: &ComponentType) -> ElementBuilder {
        ElementBuilder::new(ElementType::Component(component.clone()))
    }

    /// Strict identity: primitives by value, compound elements by pointer.
    pub fn same(&self, other: &Element) -> bool {
        match (self, other) {
            (Element::Empty, Element::Empty) => true,
            (Element::Bool(a), Element::Bool(b)) => a == b,
            (Element::Text(a), Element::Text(b)) => a == b,
            (Element::Number(a), Element::Number(b)) => a == b,
            (Element::List(a), Element::List(b)) => Rc::ptr_eq(a, b),
            (Element::Node(a), Element::Node(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `true` for the variants that render as an empty placeholder.
    pub fn is_void(&self) -> bool {
        matches!(self, Element::Empty | Element::Bool(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Element::Text(_) | Element::Number(_))
    }

    pub fn as_node(&self) -> Option<&ElementNode> {
        match self {
            Element::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.as_node().and_then(|node| node.key.as_deref())
    }

    /// Text content for `Text` and `Number` elements.
    pub fn text_content(&self) -> Option<String> {
        match self {
            Element::Text(text) => Some(text.to_string()),
            Element::Number(value) => Some(format_number(*value)),
            _ => None,
        }
    }

    /// The element seen as a child list: lists are spread, anything else is
    /// a single child.
    pub fn to_children(&self) -> Vec<Element> {
        match self {
            Element::List(items) => items.to_vec(),
            other => vec![other.clone()],
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Empty => f.write_str("Empty"),
            Element::Bool(value) => write!(f, "Bool({value})"),
            Element::Text(text) => write!(f, "Text({text:?})"),
            Element::Number(value) => write!(f, "Number({})", format_number(*value)),
            Element::List(items) => f.debug_list().entries(items.iter()).finish(),
            Element::Node(node) => {
                let mut out = f.debug_struct("Node");
                match &node.kind {
                    ElementType::Native(tag) => out.field("tag", tag),
                    ElementType::Component(component) => out.field("component", &component.name()),
                };
                if let Some(key) = &node.key {
                    out.field("key", key);
                }
                out.field("props", &node.props).finish()
            }
        }
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::Text(text.into())
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::Text(text.into())
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Element::Number(value)
    }
}

impl From<i32> for Element {
    fn from(value: i32) -> Self {
        Element::Number(value.into())
    }
}

impl From<bool> for Element {
    fn from(value: bool) -> Self {
        Element::Bool(value)
    }
}

impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl From<Vec<Element>> for Element {
    fn from(items: Vec<Element>) -> Self {
        Element::List(items.into())
    }
}

impl From<ElementBuilder> for Element {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

/// Formats a number the way a script engine stringifies it: integral values
/// drop the fraction, infinities are spelled out and `-0` prints as `0`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_owned()
    } else if value == 0.0 {
        "0".to_owned()
    } else {
        format!("{value}")
    }
}

/// String-keyed properties in insertion order, plus the `children` slot.
#[derive(Clone, Default)]
pub struct Props {
    values: IndexMap<String, PropValue>,
    children: Option<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a property. Children live in their own slot, see
    /// [`Props::set_children`].
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        let name = name.into();
        if name == CHILDREN {
            log::warn!("ignoring `children` passed as a plain prop; use set_children");
            return;
        }
        self.values.insert(name, value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        self.values.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.children.is_none()
    }

    pub fn children(&self) -> Option<&Element> {
        self.children.as_ref()
    }

    pub fn set_children(&mut self, children: impl Into<Element>) {
        self.children = Some(children.into());
    }

    pub fn with_children(mut self, children: impl Into<Element>) -> Self {
        self.set_children(children);
        self
    }

    pub fn style(&self) -> Option<&Rc<StyleMap>> {
        match self.values.get(STYLE) {
            Some(PropValue::Style(style)) => Some(style),
            _ => None,
        }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(PropValue::as_number)
    }

    pub fn handler(&self, name: &str) -> Option<&EventHandler> {
        self.get(name).and_then(PropValue::as_handler)
    }

    pub fn any<T: Any>(&self, name: &str) -> Option<&T> {
        match self.get(name) {
            Some(PropValue::Any(value)) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Shallow comparison: same names, each value strictly equal, and the
    /// same children element.
    pub fn shallow_eq(&self, other: &Props) -> bool {
        if self.values.len() != other.values.len() {
            return false;
        }
        let children_same = match (&self.children, &other.children) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same(b),
            _ => false,
        };
        children_same
            && self
                .values
                .iter()
                .all(|(name, value)| other.values.get(name).is_some_and(|o| o.same(value)))
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.values {
            map.entry(name, value);
        }
        if let Some(children) = &self.children {
            map.entry(&CHILDREN, children);
        }
        map.finish()
    }
}

#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Style(Rc<StyleMap>),
    Handler(EventHandler),
    Any(Rc<dyn Any>),
}

impl PropValue {
    pub fn any<T: Any>(value: T) -> Self {
        PropValue::Any(Rc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    /// Strict equality: scalars by value, everything else by pointer.
    pub fn same(&self, other: &PropValue) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Style(a), PropValue::Style(b)) => Rc::ptr_eq(a, b),
            (PropValue::Handler(a), PropValue::Handler(b)) => a.ptr_eq(b),
            (PropValue::Any(a), PropValue::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_style(&self) -> Option<&Rc<StyleMap>> {
        match self {
            PropValue::Style(style) => Some(style),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("null"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Number(value) => f.write_str(&format_number(*value)),
            PropValue::Str(text) => f.write_str(text),
            PropValue::Style(style) => {
                let mut first = true;
                for (name, value) in style.iter() {
                    if !first {
                        f.write_str(";")?;
                    }
                    first = false;
                    write!(f, "{name}:{value}")?;
                }
                Ok(())
            }
            PropValue::Handler(handler) => write!(f, "[handler {:#x}]", handler.id()),
            PropValue::Any(_) => f.write_str("[object]"),
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(text) => write!(f, "{text:?}"),
            other => write!(f, "{other}"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(text: &str) -> Self {
        PropValue::Str(text.into())
    }
}

impl From<String> for PropValue {
    fn from(text: String) -> Self {
        PropValue::Str(text.into())
    }
}

impl From<Rc<str>> for PropValue {
    fn from(text: Rc<str>) -> Self {
        PropValue::Str(text)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(value.into())
    }
}

impl From<StyleMap> for PropValue {
    fn from(style: StyleMap) -> Self {
        PropValue::Style(Rc::new(style))
    }
}

impl From<Rc<StyleMap>> for PropValue {
    fn from(style: Rc<StyleMap>) -> Self {
        PropValue::Style(style)
    }
}

impl From<EventHandler> for PropValue {
    fn from(handler: EventHandler) -> Self {
        PropValue::Handler(handler)
    }
}

impl From<Element> for PropValue {
    fn from(element: Element) -> Self {
        PropValue::Any(Rc::new(element))
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropValue::Null)
    }
}

pub type StyleMap = IndexMap<String, StyleValue>;

/// Builds a [`StyleMap`] from `(name, value)` pairs.
pub fn style<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> StyleMap
where
    K: Into<String>,
    V: Into<StyleValue>,
{
    entries
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum StyleValue {
    Str(Rc<str>),
    Number(f64),
}

impl StyleValue {
    /// The value written to clear a style entry.
    pub fn cleared() -> Self {
        StyleValue::Str("".into())
    }

    /// Empty strings and `NaN` count as absent. `0` is a real value.
    pub fn is_blank(&self) -> bool {
        match self {
            StyleValue::Str(text) => text.is_empty(),
            StyleValue::Number(value) => value.is_nan(),
        }
    }

    pub fn same(&self, other: &StyleValue) -> bool {
        self == other
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Str(text) => f.write_str(text),
            StyleValue::Number(value) => f.write_str(&format_number(*value)),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(text: &str) -> Self {
        StyleValue::Str(text.into())
    }
}

impl From<String> for StyleValue {
    fn from(text: String) -> Self {
        StyleValue::Str(text.into())
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Number(value)
    }
}

impl From<i32> for StyleValue {
    fn from(value: i32) -> Self {
        StyleValue::Number(value.into())
    }
}

/// Event delivered to an [`EventHandler`] by the host.
#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub data: PropValue,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: PropValue::Null,
        }
    }

    pub fn with_data(mut self, data: impl Into<PropValue>) -> Self {
        self.data = data.into();
        self
    }
}

/// A listener passed through `on<Event>` props. Compared by identity.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &EventHandler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address-derived identity, stable for the handler's lifetime.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:#x})", self.id())
    }
}

/// Returns the lowercase event name for an `on<Event>` prop.
pub(crate) fn event_name(prop: &str) -> Option<String> {
    let rest = prop.strip_prefix("on")?;
    if rest.chars().next()?.is_ascii_uppercase() {
        Some(rest.to_lowercase())
    } else {
        None
    }
}

/// Builder for node elements.
///
/// ```
/// use vdom_core::{style, Element};
///
/// let el = Element::native("div")
///     .key("row-1")
///     .prop("id", "row")
///     .style(style([("color", "red")]))
///     .child("hello")
///     .build();
/// assert_eq!(el.key(), Some("row-1"));
/// ```
pub struct ElementBuilder {
    kind: ElementType,
    props: Props,
    key: Option<String>,
    ref_target: Option<RefTarget>,
    children: Option<Vec<Element>>,
}

impl ElementBuilder {
    pub fn new(kind: ElementType) -> Self {
        Self {
            kind,
            props: Props::new(),
            key: None,
            ref_target: None,
            children: None,
        }
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name, value);
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        if let Some(children) = props.children() {
            self.children = Some(children.to_children());
        }
        for (name, value) in props.iter() {
            self.props.insert(name, value.clone());
        }
        self
    }

    pub fn style(self, style: impl Into<PropValue>) -> Self {
        self.prop(STYLE, style)
    }

    /// Registers `handler` under `on<Event>`; `on("click", ..)` sets `onClick`.
    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.handler(event, EventHandler::new(handler))
    }

    pub fn handler(self, event: &str, handler: EventHandler) -> Self {
        let mut chars = event.chars();
        let name = match chars.next() {
            Some(first) => format!("on{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => "on".to_owned(),
        };
        self.prop(name, handler)
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn ref_target(mut self, target: RefTarget) -> Self {
        self.ref_target = Some(target);
        self
    }

    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child.into());
        self
    }

    /// Appends each item as its own sibling.
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        self.children
            .get_or_insert_with(Vec::new)
            .extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Element {
        let mut props = self.props;
        match self.children {
            Some(mut children) if children.len() == 1 => {
                props.set_children(children.remove(0));
            }
            Some(children) => props.set_children(Element::List(children.into())),
            None => {}
        }
        Element::Node(Rc::new(ElementNode {
            kind: self.kind,
            props,
            key: self.key,
            ref_target: self.ref_target,
        }))
    }
}
