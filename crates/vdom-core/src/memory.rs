//! An in-memory host tree that records every driver call.
//!
//! `MemoryDriver` is a cheap handle: clones share the same tree, so tests
//! keep one clone for inspection while the runtime owns another.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::element::{
    event_name, Event, EventHandler, PropValue, Props, StyleMap, StyleValue, STYLE,
};
use crate::error::NodeError;
use crate::platform::HostDriver;
use crate::{InstanceId, NodeId};

/// One recorded driver call.
#[derive(Clone, Debug, PartialEq)]
pub enum HostOp {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    CreateEmpty { node: NodeId },
    UpdateText { node: NodeId, text: String },
    AppendChild { node: NodeId, parent: NodeId },
    InsertBefore { node: NodeId, reference: NodeId },
    InsertAfter { node: NodeId, reference: NodeId },
    RemoveChild { node: NodeId, parent: NodeId },
    RemoveChildren { parent: NodeId },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetStyle { node: NodeId, style: Vec<(String, String)> },
    AddEventListener { node: NodeId, event: String, handler: usize },
    RemoveEventListener { node: NodeId, event: String, handler: usize },
}

impl HostOp {
    /// Creation calls build detached nodes; everything else mutates the tree.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            HostOp::CreateElement { .. } | HostOp::CreateText { .. } | HostOp::CreateEmpty { .. }
        )
    }

    pub fn is_move(&self) -> bool {
        matches!(
            self,
            HostOp::InsertBefore { .. } | HostOp::InsertAfter { .. } | HostOp::AppendChild { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
enum HostNodeKind {
    Element(String),
    Text(String),
    Empty,
}

struct HostNode {
    kind: HostNodeKind,
    instance: Option<InstanceId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: IndexMap<String, PropValue>,
    style: StyleMap,
    listeners: Vec<(String, EventHandler)>,
}

impl HostNode {
    fn new(kind: HostNodeKind, instance: Option<InstanceId>) -> Self {
        Self {
            kind,
            instance,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            style: StyleMap::new(),
            listeners: Vec::new(),
        }
    }
}

#[derive(Default)]
struct MemoryHost {
    nodes: Vec<HostNode>,
    ops: Vec<HostOp>,
    bulk_removal: bool,
}

impl MemoryHost {
    fn node(&self, id: NodeId) -> Result<&HostNode, NodeError> {
        self.nodes.get(id).ok_or(NodeError::Missing { id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut HostNode, NodeError> {
        self.nodes.get_mut(id).ok_or(NodeError::Missing { id })
    }

    fn create(&mut self, kind: HostNodeKind, instance: Option<InstanceId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(HostNode::new(kind, instance));
        id
    }

    fn detach(&mut self, id: NodeId) -> Result<(), NodeError> {
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    fn insert_relative(
        &mut self,
        node: NodeId,
        reference: NodeId,
        offset: usize,
    ) -> Result<(), NodeError> {
        self.node(node)?;
        let parent = self
            .node(reference)?
            .parent
            .ok_or(NodeError::Detached { id: reference })?;
        self.detach(node)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let position = siblings
            .iter()
            .position(|child| *child == reference)
            .ok_or(NodeError::NotAChild {
                node: reference,
                parent,
            })?;
        siblings.insert(position + offset, node);
        self.node_mut(node)?.parent = Some(parent);
        Ok(())
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.nodes.get(id) else {
            output.push_str(&format!("{indent}[{id}] (missing)\n"));
            return;
        };
        match &node.kind {
            HostNodeKind::Element(tag) => {
                output.push_str(&format!("{indent}<{tag}"));
                for (name, value) in &node.attributes {
                    output.push_str(&format!(" {name}={value:?}"));
                }
                if !node.style.is_empty() {
                    let style = node
                        .style
                        .iter()
                        .map(|(name, value)| format!("{name}:{value}"))
                        .collect::<Vec<_>>()
                        .join(";");
                    output.push_str(&format!(" style={style:?}"));
                }
                output.push_str(">\n");
            }
            HostNodeKind::Text(text) => output.push_str(&format!("{indent}{text:?}\n")),
            HostNodeKind::Empty => output.push_str(&format!("{indent}<!-- empty -->\n")),
        }
        for child in &node.children {
            self.dump_node(output, *child, depth + 1);
        }
    }

    fn text_content(&self, id: NodeId, output: &mut String) {
        if let Some(node) = self.nodes.get(id) {
            if let HostNodeKind::Text(text) = &node.kind {
                output.push_str(text);
            }
            for child in &node.children {
                self.text_content(*child, output);
            }
        }
    }
}

/// Recording host driver backed by an in-memory node arena.
#[derive(Clone, Default)]
pub struct MemoryDriver {
    host: Rc<RefCell<MemoryHost>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the bulk `remove_children` primitive.
    pub fn with_bulk_removal(self, enabled: bool) -> Self {
        self.host.borrow_mut().bulk_removal = enabled;
        self
    }

    /// Creates an attached-nowhere element to render into. Not recorded.
    pub fn create_container(&self, tag: &str) -> NodeId {
        self.host
            .borrow_mut()
            .create(HostNodeKind::Element(tag.to_owned()), None)
    }

    pub fn ops(&self) -> Vec<HostOp> {
        self.host.borrow().ops.clone()
    }

    pub fn take_ops(&self) -> Vec<HostOp> {
        std::mem::take(&mut self.host.borrow_mut().ops)
    }

    pub fn clear_ops(&self) {
        self.host.borrow_mut().ops.clear();
    }

    /// Number of recorded calls that changed the attached tree or a node.
    pub fn mutation_count(&self) -> usize {
        self.host
            .borrow()
            .ops
            .iter()
            .filter(|op| op.is_mutation())
            .count()
    }

    pub fn node_count(&self) -> usize {
        self.host.borrow().nodes.len()
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        match &self.host.borrow().nodes.get(node)?.kind {
            HostNodeKind::Element(tag) => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        match &self.host.borrow().nodes.get(node)?.kind {
            HostNodeKind::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn is_empty_node(&self, node: NodeId) -> bool {
        self.host
            .borrow()
            .nodes
            .get(node)
            .is_some_and(|n| n.kind == HostNodeKind::Empty)
    }

    /// Concatenated text of every text node under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut output = String::new();
        self.host.borrow().text_content(node, &mut output);
        output
    }

    pub fn instance_of(&self, node: NodeId) -> Option<InstanceId> {
        self.host.borrow().nodes.get(node)?.instance
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.host.borrow().nodes.get(node)?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.host
            .borrow()
            .nodes
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<PropValue> {
        self.host.borrow().nodes.get(node)?.attributes.get(name).cloned()
    }

    pub fn style(&self, node: NodeId, name: &str) -> Option<StyleValue> {
        self.host.borrow().nodes.get(node)?.style.get(name).cloned()
    }

    pub fn style_len(&self, node: NodeId) -> usize {
        self.host
            .borrow()
            .nodes
            .get(node)
            .map_or(0, |n| n.style.len())
    }

    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.host.borrow().nodes.get(node).map_or(0, |n| {
            n.listeners
                .iter()
                .filter(|(name, _)| name == event)
                .count()
        })
    }

    /// Depth-first search for the first element under `root` whose
    /// attribute `name` renders as `value`.
    pub fn find_by_attribute(&self, root: NodeId, name: &str, value: &str) -> Option<NodeId> {
        let host = self.host.borrow();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = host.nodes.get(id)?;
            if node
                .attributes
                .get(name)
                .is_some_and(|attr| attr.to_string() == value)
            {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Calls every listener registered for `event` on `node`. Returns how
    /// many ran. Listeners run after the tree borrow is released, so they may
    /// trigger renders.
    pub fn dispatch(&self, node: NodeId, event: &Event) -> usize {
        let handlers: Vec<EventHandler> = match self.host.borrow().nodes.get(node) {
            Some(n) => n
                .listeners
                .iter()
                .filter(|(name, _)| *name == event.name)
                .map(|(_, handler)| handler.clone())
                .collect(),
            None => Vec::new(),
        };
        for handler in &handlers {
            handler.call(event);
        }
        handlers.len()
    }

    pub fn dump_tree(&self, root: NodeId) -> String {
        let mut output = String::new();
        self.host.borrow().dump_node(&mut output, root, 0);
        output
    }

    fn record(&self, op: HostOp) {
        log::trace!("host op {op:?}");
        self.host.borrow_mut().ops.push(op);
    }
}

impl HostDriver for MemoryDriver {
    fn create_element(
        &mut self,
        tag: &str,
        props: &Props,
        instance: InstanceId,
    ) -> Result<NodeId, NodeError> {
        let id = {
            let mut host = self.host.borrow_mut();
            let id = host.create(HostNodeKind::Element(tag.to_owned()), Some(instance));
            let node = host.node_mut(id)?;
            for (name, value) in props.iter() {
                if value.is_null() {
                    continue;
                }
                if name == STYLE {
                    if let Some(style) = value.as_style() {
                        node.style = style
                            .iter()
                            .filter(|(_, value)| !value.is_blank())
                            .map(|(name, value)| (name.clone(), value.clone()))
                            .collect();
                    }
                } else if let Some(event) = event_name(name) {
                    if let Some(handler) = value.as_handler() {
                        node.listeners.push((event, handler.clone()));
                    }
                } else {
                    node.attributes.insert(name.to_owned(), value.clone());
                }
            }
            id
        };
        self.record(HostOp::CreateElement {
            node: id,
            tag: tag.to_owned(),
        });
        Ok(id)
    }

    fn create_text(&mut self, text: &str, instance: InstanceId) -> Result<NodeId, NodeError> {
        let id = self
            .host
            .borrow_mut()
            .create(HostNodeKind::Text(text.to_owned()), Some(instance));
        self.record(HostOp::CreateText {
            node: id,
            text: text.to_owned(),
        });
        Ok(id)
    }

    fn create_empty(&mut self, instance: InstanceId) -> Result<NodeId, NodeError> {
        let id = self
            .host
            .borrow_mut()
            .create(HostNodeKind::Empty, Some(instance));
        self.record(HostOp::CreateEmpty { node: id });
        Ok(id)
    }

    fn update_text(&mut self, node: NodeId, text: &str) -> Result<(), NodeError> {
        self.host.borrow_mut().node_mut(node)?.kind = HostNodeKind::Text(text.to_owned());
        self.record(HostOp::UpdateText {
            node,
            text: text.to_owned(),
        });
        Ok(())
    }

    fn append_child(&mut self, node: NodeId, parent: NodeId) -> Result<(), NodeError> {
        {
            let mut host = self.host.borrow_mut();
            host.node(parent)?;
            host.detach(node)?;
            host.node_mut(parent)?.children.push(node);
            host.node_mut(node)?.parent = Some(parent);
        }
        self.record(HostOp::AppendChild { node, parent });
        Ok(())
    }

    fn insert_before(&mut self, node: NodeId, reference: NodeId) -> Result<(), NodeError> {
        self.host.borrow_mut().insert_relative(node, reference, 0)?;
        self.record(HostOp::InsertBefore { node, reference });
        Ok(())
    }

    fn insert_after(&mut self, node: NodeId, reference: NodeId) -> Result<(), NodeError> {
        self.host.borrow_mut().insert_relative(node, reference, 1)?;
        self.record(HostOp::InsertAfter { node, reference });
        Ok(())
    }

    fn remove_child(&mut self, node: NodeId, parent: NodeId) -> Result<(), NodeError> {
        {
            let mut host = self.host.borrow_mut();
            if host.node(node)?.parent != Some(parent) {
                return Err(NodeError::NotAChild { node, parent });
            }
            host.detach(node)?;
        }
        self.record(HostOp::RemoveChild { node, parent });
        Ok(())
    }

    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), NodeError> {
        self.host
            .borrow_mut()
            .node_mut(node)?
            .attributes
            .insert(name.to_owned(), value.clone());
        self.record(HostOp::SetAttribute {
            node,
            name: name.to_owned(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        _prev: &PropValue,
    ) -> Result<(), NodeError> {
        self.host
            .borrow_mut()
            .node_mut(node)?
            .attributes
            .shift_remove(name);
        self.record(HostOp::RemoveAttribute {
            node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, style: &StyleMap) -> Result<(), NodeError> {
        {
            let mut host = self.host.borrow_mut();
            let target = &mut host.node_mut(node)?.style;
            for (name, value) in style {
                if value.is_blank() {
                    target.shift_remove(name);
                } else {
                    target.insert(name.clone(), value.clone());
                }
            }
        }
        self.record(HostOp::SetStyle {
            node,
            style: style
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect(),
        });
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
        _props: &Props,
    ) -> Result<(), NodeError> {
        self.host
            .borrow_mut()
            .node_mut(node)?
            .listeners
            .push((event.to_owned(), handler.clone()));
        self.record(HostOp::AddEventListener {
            node,
            event: event.to_owned(),
            handler: handler.id(),
        });
        Ok(())
    }

    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
        _props: Option<&Props>,
    ) -> Result<(), NodeError> {
        self.host
            .borrow_mut()
            .node_mut(node)?
            .listeners
            .retain(|(name, existing)| !(name == event && existing.ptr_eq(handler)));
        self.record(HostOp::RemoveEventListener {
            node,
            event: event.to_owned(),
            handler: handler.id(),
        });
        Ok(())
    }

    fn supports_remove_children(&self) -> bool {
        self.host.borrow().bulk_removal
    }

    fn remove_children(&mut self, parent: NodeId) -> Result<(), NodeError> {
        {
            let mut host = self.host.borrow_mut();
            if !host.bulk_removal {
                return Err(NodeError::Unsupported {
                    operation: "remove_children",
                });
            }
            let children = std::mem::take(&mut host.node_mut(parent)?.children);
            for child in children {
                host.node_mut(child)?.parent = None;
            }
        }
        self.record(HostOp::RemoveChildren { parent });
        Ok(())
    }
}
