//! Host elements: creation, prop/style/event diffing and child lists.

use crate::component::ContextMap;
use crate::element::{
    event_name, Element, ElementNode, ElementType, PropValue, Props, StyleMap, StyleValue, APPEND,
    STYLE,
};
use crate::error::RenderError;
use crate::instance::{attach, ChildList, Mounter};
use crate::refs::{self, RefValue};
use crate::runtime::Runtime;
use crate::NodeId;

const APPEND_NODE: &str = "node";

pub(crate) struct NativeInstance {
    element: Element,
    node: Option<NodeId>,
    parent: NodeId,
    context: ContextMap,
    /// Style applied by the last pass, diffed key by key on the next one.
    prev_style: Option<StyleMap>,
    children: ChildList,
}

impl NativeInstance {
    pub(crate) fn new(element: Element) -> Self {
        Self {
            element,
            node: None,
            parent: 0,
            context: ContextMap::default(),
            prev_style: None,
            children: ChildList::default(),
        }
    }

    pub(crate) fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub(crate) fn element(&self) -> &Element {
        &self.element
    }

    pub(crate) fn context(&self) -> &ContextMap {
        &self.context
    }

    pub(crate) fn mount(
        &mut self,
        runtime: &Runtime,
        parent: NodeId,
        context: &ContextMap,
        mounter: Option<&mut Mounter<'_>>,
    ) -> Result<(), RenderError> {
        self.parent = parent;
        self.context = context.clone();
        let element = self.element.clone();
        let (tag, props) = match element.as_node() {
            Some(ElementNode {
                kind: ElementType::Native(tag),
                props,
                ..
            }) => (tag, props),
            _ => {
                return Err(RenderError::InvalidElement {
                    element: format!("{element:?}"),
                })
            }
        };
        self.prev_style = props.style().map(|style| StyleMap::clone(style));

        let id = runtime.next_instance_id();
        let node = runtime.host(|driver| driver.create_element(tag, props, id))?;
        self.node = Some(node);
        log::trace!("mounting <{tag}> as node {node}");

        let children = props.children().map(Element::to_children);
        let node_mode = props.str(APPEND) == Some(APPEND_NODE);
        if node_mode {
            attach(runtime, &[node], parent, mounter)?;
            self.mount_children(runtime, node, children.as_deref(), context)?;
        } else {
            self.mount_children(runtime, node, children.as_deref(), context)?;
            attach(runtime, &[node], parent, mounter)?;
        }

        if let Some(target) = element.as_node().and_then(|n| n.ref_target.as_ref()) {
            target.attach(RefValue::Native(node));
        }
        Ok(())
    }

    fn mount_children(
        &mut self,
        runtime: &Runtime,
        node: NodeId,
        children: Option<&[Element]>,
        context: &ContextMap,
    ) -> Result<(), RenderError> {
        match children {
            Some(children) => self.children.mount(runtime, node, children, context, None),
            None => Ok(()),
        }
    }

    pub(crate) fn update(
        &mut self,
        runtime: &Runtime,
        next: &Element,
        context: &ContextMap,
    ) -> Result<(), RenderError> {
        let prev = std::mem::replace(&mut self.element, next.clone());
        self.context = context.clone();
        let node = self.node.ok_or(RenderError::NotMounted)?;
        let (Some(prev_node), Some(next_node)) = (prev.as_node(), next.as_node()) else {
            return Err(RenderError::InvalidElement {
                element: format!("{next:?}"),
            });
        };

        refs::update(
            prev_node.ref_target.as_ref(),
            next_node.ref_target.as_ref(),
            RefValue::Native(node),
        );
        self.update_properties(runtime, node, &prev_node.props, &next_node.props)?;

        let next_children = next_node.props.children().map(Element::to_children);
        let prev_had_children = prev_node
            .props
            .children()
            .is_some_and(|children| !matches!(children, Element::List(items) if items.is_empty()));
        if prev_had_children {
            self.children
                .update(runtime, node, Some(node), next_children.as_deref(), context)?;
        } else {
            self.mount_children(runtime, node, next_children.as_deref(), context)?;
        }
        Ok(())
    }

    /// Diffs props into driver calls. Style changes from the whole pass are
    /// sent as one `set_style` after every attribute and listener call.
    fn update_properties(
        &mut self,
        runtime: &Runtime,
        node: NodeId,
        prev: &Props,
        next: &Props,
    ) -> Result<(), RenderError> {
        let mut style_updates: Option<StyleMap> = None;

        for (name, prev_value) in prev.iter() {
            if prev_value.is_null() || next.contains(name) {
                continue;
            }
            if name == STYLE {
                if let Some(last) = self.prev_style.take() {
                    let updates = style_updates.get_or_insert_with(StyleMap::new);
                    for style_name in last.keys() {
                        updates.insert(style_name.clone(), StyleValue::cleared());
                    }
                }
            } else if let Some(event) = event_name(name) {
                if let Some(handler) = prev_value.as_handler() {
                    runtime.host(|driver| driver.remove_event_listener(node, &event, handler, None))?;
                }
            } else {
                runtime.host(|driver| driver.remove_attribute(node, name, prev_value))?;
            }
        }

        for (name, next_value) in next.iter() {
            if name == STYLE {
                if prev.get(STYLE).is_some_and(|prev_value| prev_value.same(next_value)) {
                    continue;
                }
                self.diff_style(next_value, &mut style_updates);
                continue;
            }
            let prev_value = prev.get(name);
            let unchanged = prev_value.is_some_and(|p| p.same(next_value))
                || (next_value.is_null() && prev_value.map_or(true, PropValue::is_null));
            if unchanged {
                continue;
            }
            if let Some(event) = event_name(name) {
                if let Some(handler) = prev_value.and_then(PropValue::as_handler) {
                    runtime.host(|driver| {
                        driver.remove_event_listener(node, &event, handler, Some(next))
                    })?;
                }
                if let Some(handler) = next_value.as_handler() {
                    runtime.host(|driver| driver.add_event_listener(node, &event, handler, next))?;
                }
            } else if !next_value.is_null() {
                runtime.host(|driver| driver.set_attribute(node, name, next_value))?;
            } else if let Some(prev_value) = prev_value {
                runtime.host(|driver| driver.remove_attribute(node, name, prev_value))?;
            }
        }

        if let Some(updates) = style_updates {
            if !updates.is_empty() {
                runtime.host(|driver| driver.set_style(node, &updates))?;
            }
        }
        Ok(())
    }

    /// Accumulates the delta between the retained style snapshot and
    /// `next_value`, then retains a copy of the next style.
    fn diff_style(&mut self, next_value: &PropValue, updates: &mut Option<StyleMap>) {
        let next_style = next_value.as_style();
        let prev_style = self.prev_style.take();
        self.prev_style = next_style.map(|style| StyleMap::clone(style));

        match prev_style {
            Some(prev_style) => {
                for style_name in prev_style.keys() {
                    let dropped = next_style
                        .and_then(|style| style.get(style_name))
                        .map_or(true, StyleValue::is_blank);
                    if dropped {
                        updates
                            .get_or_insert_with(StyleMap::new)
                            .insert(style_name.clone(), StyleValue::cleared());
                    }
                }
                if let Some(next_style) = next_style {
                    for (style_name, value) in next_style.iter() {
                        let changed = prev_style
                            .get(style_name)
                            .map_or(true, |prev| !prev.same(value));
                        if changed {
                            updates
                                .get_or_insert_with(StyleMap::new)
                                .insert(style_name.clone(), value.clone());
                        }
                    }
                }
            }
            None => {
                if let Some(next_style) = next_style {
                    let target = updates.get_or_insert_with(StyleMap::new);
                    for (style_name, value) in next_style.iter() {
                        target.insert(style_name.clone(), value.clone());
                    }
                }
            }
        }
    }

    /// Children are torn down first with their removal suppressed, then this
    /// node is removed unless an ancestor's removal covers it.
    pub(crate) fn unmount(&mut self, runtime: &Runtime, skip_removal: bool) -> Result<(), RenderError> {
        if let Some(node) = self.node {
            if let Some(target) = self.element.as_node().and_then(|n| n.ref_target.as_ref()) {
                target.detach(&RefValue::Native(node));
            }
        }
        self.children.unmount(runtime, true)?;
        if let Some(node) = self.node.take() {
            if !skip_removal {
                log::trace!("removing node {node} from {}", self.parent);
                runtime.host(|driver| driver.remove_child(node, self.parent))?;
            }
        }
        self.prev_style = None;
        Ok(())
    }
}
