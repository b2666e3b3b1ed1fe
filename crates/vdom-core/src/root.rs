use std::cell::RefCell;

use crate::component::ContextMap;
use crate::element::Element;
use crate::error::RenderError;
use crate::instance::{instantiate, should_update_component, Instance, NodeList};
use crate::runtime::Runtime;
use crate::NodeId;

/// Entry point that keeps one element tree mounted under a host container.
///
/// ```
/// use std::sync::Arc;
/// use vdom_core::{DefaultScheduler, Element, MemoryDriver, Root, Runtime};
///
/// let driver = MemoryDriver::new();
/// let container = driver.create_container("root");
/// let root = Root::new(Runtime::new(driver.clone(), Arc::new(DefaultScheduler)), container);
///
/// root.render(Element::native("div").child("hello")).unwrap();
/// assert_eq!(driver.text_content(container), "hello");
/// ```
pub struct Root {
    runtime: Runtime,
    container: NodeId,
    instance: RefCell<Option<Instance>>,
    context: ContextMap,
}

impl Root {
    pub fn new(runtime: Runtime, container: NodeId) -> Self {
        Self {
            runtime,
            container,
            instance: RefCell::new(None),
            context: ContextMap::default(),
        }
    }

    /// Renders `element` as one batch. A compatible tree is updated in
    /// place, anything else replaces the mounted tree.
    pub fn render(&self, element: impl Into<Element>) -> Result<(), RenderError> {
        let element = element.into();
        self.runtime.batched_updates(|| {
            let mut slot = self.instance.borrow_mut();
            if let Some(current) = slot.as_mut() {
                if should_update_component(&current.element(), &element) {
                    if current.is_stale(&element, &self.context) {
                        current.update(&self.runtime, &element, &self.context)?;
                    }
                    return Ok(());
                }
            }
            if let Some(mut previous) = slot.take() {
                previous.unmount(&self.runtime, false)?;
            }
            let mut instance = instantiate(&element)?;
            instance.mount(&self.runtime, self.container, &self.context, None)?;
            *slot = Some(instance);
            Ok(())
        })
    }

    pub fn unmount(&self) -> Result<(), RenderError> {
        self.runtime.batched_updates(|| {
            let previous = self.instance.borrow_mut().take();
            match previous {
                Some(mut previous) => previous.unmount(&self.runtime, false),
                None => Ok(()),
            }
        })
    }

    pub fn is_mounted(&self) -> bool {
        self.instance.borrow().is_some()
    }

    /// Host nodes of the mounted tree, in order.
    pub fn native_nodes(&self) -> Vec<NodeId> {
        self.instance
            .borrow()
            .as_ref()
            .map(Instance::native_nodes)
            .unwrap_or_default()
    }

    /// Live node list when the mounted tree renders a fragment.
    pub fn node_list(&self) -> Option<NodeList> {
        self.instance.borrow().as_ref().and_then(Instance::node_list)
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}
