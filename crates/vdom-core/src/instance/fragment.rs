use std::cell::RefCell;
use std::rc::Rc;

use crate::component::ContextMap;
use crate::element::Element;
use crate::error::RenderError;
use crate::instance::{attach, ChildList, Mounter};
use crate::runtime::Runtime;
use crate::NodeId;

/// Shared, in-place refreshed list of the host nodes a fragment produces.
///
/// Holders of a clone observe every reconciliation of the fragment.
#[derive(Clone, Default, Debug)]
pub struct NodeList(Rc<RefCell<Vec<NodeId>>>);

impl NodeList {
    pub fn to_vec(&self) -> Vec<NodeId> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &NodeList) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn replace_contents(&self, nodes: &[NodeId]) {
        let mut list = self.0.borrow_mut();
        list.clear();
        list.extend_from_slice(nodes);
    }
}

/// A list element. Its children are mounted straight into the parent's
/// host node; the fragment itself owns no host node.
pub(crate) struct FragmentInstance {
    element: Element,
    parent: NodeId,
    context: ContextMap,
    children: ChildList,
    nodes: NodeList,
}

/// An empty list still renders one placeholder so the fragment has a
/// position in its parent.
fn fragment_children(element: &Element) -> Vec<Element> {
    match element {
        Element::List(items) if !items.is_empty() => items.to_vec(),
        _ => vec![Element::Empty],
    }
}

impl FragmentInstance {
    pub(crate) fn new(element: Element) -> Self {
        Self {
            element,
            parent: 0,
            context: ContextMap::default(),
            children: ChildList::default(),
            nodes: NodeList::default(),
        }
    }

    pub(crate) fn element(&self) -> &Element {
        &self.element
    }

    pub(crate) fn context(&self) -> &ContextMap {
        &self.context
    }

    pub(crate) fn node_list(&self) -> NodeList {
        self.nodes.clone()
    }

    pub(crate) fn native_nodes(&self) -> Vec<NodeId> {
        self.children.native_nodes()
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
        let children = fragment_children(&self.element);

        let mut collected = Vec::new();
        let mut collect = |nodes: &[NodeId], _parent: NodeId| -> Result<(), RenderError> {
            collected.extend_from_slice(nodes);
            Ok(())
        };
        self.children
            .mount(runtime, parent, &children, context, Some(&mut collect))?;

        attach(runtime, &collected, parent, mounter)?;
        self.nodes.replace_contents(&collected);
        Ok(())
    }

    pub(crate) fn update(
        &mut self,
        runtime: &Runtime,
        next: &Element,
        context: &ContextMap,
    ) -> Result<(), RenderError> {
        self.element = next.clone();
        self.context = context.clone();
        let children = fragment_children(next);
        let nodes = self
            .children
            .update(runtime, self.parent, None, Some(&children), context)?;
        self.nodes.replace_contents(&nodes);
        Ok(())
    }

    pub(crate) fn unmount(&mut self, runtime: &Runtime, skip_removal: bool) -> Result<(), RenderError> {
        self.children.unmount(runtime, skip_removal)?;
        self.nodes.replace_contents(&[]);
        Ok(())
    }
}
