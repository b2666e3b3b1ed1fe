use crate::element::Element;
use crate::error::RenderError;
use crate::instance::{attach, Mounter};
use crate::runtime::Runtime;
use crate::NodeId;

/// Text and number elements.
pub(crate) struct TextInstance {
    element: Element,
    text: String,
    node: Option<NodeId>,
    parent: NodeId,
}

impl TextInstance {
    pub(crate) fn new(element: Element) -> Self {
        let text = element.text_content().unwrap_or_default();
        Self {
            element,
            text,
            node: None,
            parent: 0,
        }
    }

    pub(crate) fn mount(
        &mut self,
        runtime: &Runtime,
        parent: NodeId,
        mounter: Option<&mut Mounter<'_>>,
    ) -> Result<(), RenderError> {
        self.parent = parent;
        let id = runtime.next_instance_id();
        let text = &self.text;
        let node = runtime.host(|driver| driver.create_text(text, id))?;
        self.node = Some(node);
        attach(runtime, &[node], parent, mounter)
    }

    pub(crate) fn update(&mut self, runtime: &Runtime, next: &Element) -> Result<(), RenderError> {
        self.element = next.clone();
        let text = next.text_content().unwrap_or_default();
        if text == self.text {
            return Ok(());
        }
        self.text = text;
        if let Some(node) = self.node {
            let text = &self.text;
            runtime.host(|driver| driver.update_text(node, text))?;
        }
        Ok(())
    }

    pub(crate) fn unmount(&mut self, runtime: &Runtime, skip_removal: bool) -> Result<(), RenderError> {
        if let Some(node) = self.node.take() {
            if !skip_removal {
                runtime.host(|driver| driver.remove_child(node, self.parent))?;
            }
        }
        Ok(())
    }

    pub(crate) fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub(crate) fn element(&self) -> &Element {
        &self.element
    }
}

/// `null`, `undefined` and booleans render a placeholder node so that every
/// instance owns at least one host node to anchor insertions against.
pub(crate) struct EmptyInstance {
    element: Element,
    node: Option<NodeId>,
    parent: NodeId,
}

impl EmptyInstance {
    pub(crate) fn new(element: Element) -> Self {
        Self {
            element,
            node: None,
            parent: 0,
        }
    }

    pub(crate) fn mount(
        &mut self,
        runtime: &Runtime,
        parent: NodeId,
        mounter: Option<&mut Mounter<'_>>,
    ) -> Result<(), RenderError> {
        self.parent = parent;
        let id = runtime.next_instance_id();
        let node = runtime.host(|driver| driver.create_empty(id))?;
        self.node = Some(node);
        attach(runtime, &[node], parent, mounter)
    }

    pub(crate) fn update(&mut self, next: &Element) {
        self.element = next.clone();
    }

    pub(crate) fn unmount(&mut self, runtime: &Runtime, skip_removal: bool) -> Result<(), RenderError> {
        if let Some(node) = self.node.take() {
            if !skip_removal {
                runtime.host(|driver| driver.remove_child(node, self.parent))?;
            }
        }
        Ok(())
    }

    pub(crate) fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub(crate) fn element(&self) -> &Element {
        &self.element
    }
}
