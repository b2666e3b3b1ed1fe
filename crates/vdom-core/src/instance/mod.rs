//! The instance tree: one engine-owned node per mounted element.
//!
//! [`instantiate`] is the only place that decides which variant an element
//! becomes. Every variant supports the same four operations: mount, update,
//! unmount and reporting its host nodes.

mod children;
mod composite;
mod fragment;
mod native;
mod text;

use std::rc::Rc;

pub(crate) use children::ChildList;
pub(crate) use composite::CompositeInstance;
pub(crate) use fragment::FragmentInstance;
pub use fragment::NodeList;
pub(crate) use native::NativeInstance;
pub(crate) use text::{EmptyInstance, TextInstance};

use crate::component::ContextMap;
use crate::element::{Element, ElementType};
use crate::error::RenderError;
use crate::runtime::Runtime;
use crate::NodeId;

/// Places freshly mounted host nodes. Receives the nodes and the host parent
/// the instance was mounted under. Without one, nodes are appended.
pub(crate) type Mounter<'a> = dyn FnMut(&[NodeId], NodeId) -> Result<(), RenderError> + 'a;

pub(crate) enum Instance {
    Empty(EmptyInstance),
    Text(TextInstance),
    Fragment(FragmentInstance),
    Native(NativeInstance),
    Composite(Rc<CompositeInstance>),
}

/// Builds an unmounted instance for `element`. Has no side effects.
pub(crate) fn instantiate(element: &Element) -> Result<Instance, RenderError> {
    let instance = match element {
        Element::Empty | Element::Bool(_) => Instance::Empty(EmptyInstance::new(element.clone())),
        Element::Text(_) | Element::Number(_) => {
            Instance::Text(TextInstance::new(element.clone()))
        }
        Element::List(_) => Instance::Fragment(FragmentInstance::new(element.clone())),
        Element::Node(node) => match &node.kind {
            ElementType::Native(tag) if tag.is_empty() => {
                return Err(RenderError::InvalidElement {
                    element: format!("{element:?}"),
                })
            }
            ElementType::Native(_) => Instance::Native(NativeInstance::new(element.clone())),
            ElementType::Component(component) => Instance::Composite(Rc::new(
                CompositeInstance::new(component.clone(), element.clone()),
            )),
        },
    };
    Ok(instance)
}

/// Whether `next` may update the instance currently showing `prev` in place.
pub(crate) fn should_update_component(prev: &Element, next: &Element) -> bool {
    if prev.is_void() || next.is_void() {
        return prev.is_void() && next.is_void();
    }
    match (prev, next) {
        (Element::List(_), Element::List(_)) => true,
        (prev, next) if prev.is_text() => next.is_text(),
        (Element::Node(prev), Element::Node(next)) => {
            prev.kind.same(&next.kind) && prev.key == next.key
        }
        _ => false,
    }
}

/// Name of a child within its sibling group: `$key` for the first element
/// carrying a key, else `.` plus the position in base 36.
pub(crate) fn key_name<V>(
    taken: &indexmap::IndexMap<String, V>,
    element: &Element,
    index: usize,
) -> String {
    if let Some(key) = element.key() {
        let name = format!("${key}");
        if !taken.contains_key(&name) {
            return name;
        }
        log::warn!(
            "duplicate child key {key:?}; keys must be unique among siblings, falling back to position {index}"
        );
    }
    format!(".{}", to_base36(index))
}

fn to_base36(mut value: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_owned();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[value % 36]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Inserts `nodes` through the mounter, or appends them to `parent`.
pub(crate) fn attach(
    runtime: &Runtime,
    nodes: &[NodeId],
    parent: NodeId,
    mounter: Option<&mut Mounter<'_>>,
) -> Result<(), RenderError> {
    match mounter {
        Some(mount) => mount(nodes, parent),
        None => {
            for &node in nodes {
                runtime.host(|driver| driver.append_child(node, parent))?;
            }
            Ok(())
        }
    }
}

impl Instance {
    pub(crate) fn mount(
        &mut self,
        runtime: &Runtime,
        parent: NodeId,
        context: &ContextMap,
        mounter: Option<&mut Mounter<'_>>,
    ) -> Result<(), RenderError> {
        match self {
            Instance::Empty(empty) => empty.mount(runtime, parent, mounter),
            Instance::Text(text) => text.mount(runtime, parent, mounter),
            Instance::Fragment(fragment) => fragment.mount(runtime, parent, context, mounter),
            Instance::Native(native) => native.mount(runtime, parent, context, mounter),
            Instance::Composite(composite) => composite.mount(runtime, parent, context, mounter),
        }
    }

    /// Applies `next`, which must satisfy [`should_update_component`]
    /// against the current element.
    pub(crate) fn update(
        &mut self,
        runtime: &Runtime,
        next: &Element,
        context: &ContextMap,
    ) -> Result<(), RenderError> {
        match self {
            Instance::Empty(empty) => {
                empty.update(next);
                Ok(())
            }
            Instance::Text(text) => text.update(runtime, next),
            Instance::Fragment(fragment) => fragment.update(runtime, next, context),
            Instance::Native(native) => native.update(runtime, next, context),
            Instance::Composite(composite) => composite.update(runtime, next, context),
        }
    }

    /// Tears the subtree down. With `skip_removal` the host nodes stay where
    /// they are because an ancestor's removal already covers them.
    pub(crate) fn unmount(&mut self, runtime: &Runtime, skip_removal: bool) -> Result<(), RenderError> {
        match self {
            Instance::Empty(empty) => empty.unmount(runtime, skip_removal),
            Instance::Text(text) => text.unmount(runtime, skip_removal),
            Instance::Fragment(fragment) => fragment.unmount(runtime, skip_removal),
            Instance::Native(native) => native.unmount(runtime, skip_removal),
            Instance::Composite(composite) => composite.unmount(runtime, skip_removal),
        }
    }

    /// Host nodes this instance contributes to its parent, in order.
    pub(crate) fn native_nodes(&self) -> Vec<NodeId> {
        match self {
            Instance::Empty(empty) => empty.node().into_iter().collect(),
            Instance::Text(text) => text.node().into_iter().collect(),
            Instance::Fragment(fragment) => fragment.native_nodes(),
            Instance::Native(native) => native.node().into_iter().collect(),
            Instance::Composite(composite) => composite.native_nodes(),
        }
    }

    pub(crate) fn first_node(&self) -> Option<NodeId> {
        self.native_nodes().first().copied()
    }

    pub(crate) fn element(&self) -> Element {
        match self {
            Instance::Empty(empty) => empty.element().clone(),
            Instance::Text(text) => text.element().clone(),
            Instance::Fragment(fragment) => fragment.element().clone(),
            Instance::Native(native) => native.element().clone(),
            Instance::Composite(composite) => composite.element(),
        }
    }

    /// Context the instance was last reconciled with. Leaves that do not
    /// pass context on report `None`.
    pub(crate) fn context(&self) -> Option<ContextMap> {
        match self {
            Instance::Empty(_) | Instance::Text(_) => None,
            Instance::Fragment(fragment) => Some(fragment.context().clone()),
            Instance::Native(native) => Some(native.context().clone()),
            Instance::Composite(composite) => Some(composite.context()),
        }
    }

    /// `true` when `next` differs from what the instance shows, by identity
    /// or by context.
    pub(crate) fn is_stale(&self, next: &Element, context: &ContextMap) -> bool {
        !self.element().same(next) || self.context().is_some_and(|current| !current.same(context))
    }

    pub(crate) fn node_list(&self) -> Option<NodeList> {
        match self {
            Instance::Fragment(fragment) => Some(fragment.node_list()),
            Instance::Composite(composite) => composite.node_list(),
            _ => None,
        }
    }
}
