//! Function, class and provider components.
//!
//! A composite owns no host node. It renders one element, keeps the
//! instance for it in `rendered`, and reports that instance's nodes as its
//! own. Hook state lives in an ordered slot arena reset at every render.

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::component::{
    ComponentHandle, ComponentKind, ComponentType, ContextMap, ErasedComponent, StateUpdate,
    PROVIDER_VALUE,
};
use crate::element::{Element, ElementNode, PropValue, Props};
use crate::error::{RenderError, RenderResult};
use crate::hooks::{EffectSlot, HookKind};
use crate::instance::{instantiate, should_update_component, Instance, NodeList};
use crate::owner;
use crate::refs::{self, RefValue};
use crate::runtime::{Runtime, RuntimeHandle};
use crate::{InstanceId, NodeId};

struct HookSlot {
    kind: HookKind,
    value: Rc<dyn Any>,
}

pub(crate) struct CompositeInstance {
    id: Cell<InstanceId>,
    runtime: RefCell<RuntimeHandle>,
    component: ComponentType,
    element: RefCell<Element>,
    /// Context received from the parent.
    context: RefCell<ContextMap>,
    /// Context handed to the rendered subtree. Differs from `context` only
    /// for providers.
    child_context: RefCell<ContextMap>,
    provided: RefCell<Option<Rc<dyn Any>>>,
    parent: Cell<NodeId>,
    rendered: RefCell<Option<Instance>>,
    class: RefCell<Option<Box<dyn ErasedComponent>>>,
    pending_state: RefCell<Vec<StateUpdate>>,
    force_update: Cell<bool>,

    hooks: RefCell<Vec<HookSlot>>,
    hook_cursor: Cell<usize>,
    committed_hook_count: Cell<Option<usize>>,
    effects: RefCell<Vec<Rc<EffectSlot>>>,
    scheduled: Cell<bool>,
    re_renders: Cell<usize>,
    /// Set when props, context or hook state changed since the last render;
    /// otherwise the cached element is returned again.
    should_update: Cell<bool>,
    cached: RefCell<Element>,

    pending_update: Cell<bool>,
    enqueued: Cell<bool>,
    mounted: Cell<bool>,
    unmounted: Cell<bool>,
}

fn node_of(element: &Element) -> Result<&ElementNode, RenderError> {
    element.as_node().ok_or_else(|| RenderError::InvalidElement {
        element: format!("{element:?}"),
    })
}

impl CompositeInstance {
    pub(crate) fn new(component: ComponentType, element: Element) -> Self {
        Self {
            id: Cell::new(0),
            runtime: RefCell::new(RuntimeHandle::default()),
            component,
            element: RefCell::new(element),
            context: RefCell::new(ContextMap::default()),
            child_context: RefCell::new(ContextMap::default()),
            provided: RefCell::new(None),
            parent: Cell::new(0),
            rendered: RefCell::new(None),
            class: RefCell::new(None),
            pending_state: RefCell::new(Vec::new()),
            force_update: Cell::new(false),
            hooks: RefCell::new(Vec::new()),
            hook_cursor: Cell::new(0),
            committed_hook_count: Cell::new(None),
            effects: RefCell::new(Vec::new()),
            scheduled: Cell::new(false),
            re_renders: Cell::new(0),
            should_update: Cell::new(true),
            cached: RefCell::new(Element::Empty),
            pending_update: Cell::new(false),
            enqueued: Cell::new(false),
            mounted: Cell::new(false),
            unmounted: Cell::new(false),
        }
    }

    pub(crate) fn id(&self) -> InstanceId {
        self.id.get()
    }

    pub(crate) fn element(&self) -> Element {
        self.element.borrow().clone()
    }

    pub(crate) fn context(&self) -> ContextMap {
        self.context.borrow().clone()
    }

    pub(crate) fn native_nodes(&self) -> Vec<NodeId> {
        self.rendered
            .borrow()
            .as_ref()
            .map(Instance::native_nodes)
            .unwrap_or_default()
    }

    pub(crate) fn node_list(&self) -> Option<NodeList> {
        self.rendered.borrow().as_ref().and_then(Instance::node_list)
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted.get() && !self.unmounted.get()
    }

    pub(crate) fn is_unmounted(&self) -> bool {
        self.unmounted.get()
    }

    pub(crate) fn runtime(&self) -> Result<Runtime, RenderError> {
        self.runtime
            .borrow()
            .upgrade()
            .ok_or(RenderError::RuntimeDropped)
    }

    /// Returns `true` when the instance was not already on the dirty list.
    pub(crate) fn mark_enqueued(&self) -> bool {
        !self.enqueued.replace(true)
    }

    pub(crate) fn clear_enqueued(&self) {
        self.enqueued.set(false);
    }

    pub(crate) fn enqueue_state(&self, update: StateUpdate) {
        self.pending_state.borrow_mut().push(update);
    }

    pub(crate) fn mark_forced(&self) {
        self.force_update.set(true);
    }

    pub(crate) fn with_class<R>(&self, f: impl FnOnce(&dyn Any) -> Option<R>) -> Option<R> {
        let class = self.class.try_borrow().ok()?;
        f(class.as_ref()?.as_any())
    }

    // Hook plumbing.

    /// Returns the slot at the current cursor, creating it with `init` on
    /// the first render. The second value is `true` for a fresh slot.
    pub(crate) fn hook<T: 'static>(
        &self,
        kind: HookKind,
        init: impl FnOnce() -> T,
    ) -> Result<(Rc<T>, bool), RenderError> {
        let index = self.hook_cursor.get();
        self.hook_cursor.set(index + 1);

        let existing = self
            .hooks
            .borrow()
            .get(index)
            .map(|slot| (slot.kind, Rc::clone(&slot.value)));
        match existing {
            Some((found, value)) => {
                if found != kind {
                    return Err(RenderError::HookMismatch {
                        index,
                        expected: found,
                        found: kind,
                    });
                }
                let value = value.downcast::<T>().map_err(|_| RenderError::HookTypeMismatch {
                    index,
                    expected: type_name::<T>(),
                })?;
                Ok((value, false))
            }
            None => {
                let value = Rc::new(init());
                self.hooks.borrow_mut().push(HookSlot {
                    kind,
                    value: Rc::clone(&value) as Rc<dyn Any>,
                });
                Ok((value, true))
            }
        }
    }

    pub(crate) fn re_renders(&self) -> usize {
        self.re_renders.get()
    }

    pub(crate) fn mark_scheduled(&self) {
        self.scheduled.set(true);
    }

    pub(crate) fn mark_should_update(&self) {
        self.should_update.set(true);
    }

    pub(crate) fn register_effect(&self, slot: Rc<EffectSlot>) {
        self.effects.borrow_mut().push(slot);
    }

    /// A state change from a hook: re-run the render loop when this instance
    /// is the one rendering, else request a standalone update.
    pub(crate) fn schedule_update(self: &Rc<Self>) -> Result<(), RenderError> {
        if owner::is_current(self) {
            self.mark_scheduled();
            Ok(())
        } else {
            self.request_update()
        }
    }

    /// Queues this instance for reconciliation, opening a batch when none is
    /// running. Opening a batch flushes pending deferred effects first.
    pub(crate) fn request_update(self: &Rc<Self>) -> Result<(), RenderError> {
        if self.unmounted.get() {
            log::warn!(
                "state update on unmounted component {}; this is a no-op",
                self.component.name()
            );
            return Ok(());
        }
        let runtime = self.runtime()?;
        self.pending_update.set(true);
        if runtime.is_updating() {
            runtime.enqueue_dirty(self);
            return Ok(());
        }
        runtime.batched_updates(|| {
            runtime.enqueue_dirty(self);
            Ok(())
        })
    }

    // Lifecycle.

    pub(crate) fn mount(
        self: &Rc<Self>,
        runtime: &Runtime,
        parent: NodeId,
        context: &ContextMap,
        mounter: Option<&mut crate::instance::Mounter<'_>>,
    ) -> Result<(), RenderError> {
        self.id.set(runtime.next_instance_id());
        *self.runtime.borrow_mut() = runtime.handle();
        self.parent.set(parent);
        *self.context.borrow_mut() = context.clone();

        let element = self.element();
        let node = node_of(&element)?;
        log::trace!("mounting <{}> as instance {}", self.component.name(), self.id());

        if let ComponentKind::Class { construct } = self.component.kind() {
            let mut class = construct(&node.props, ComponentHandle(Rc::downgrade(self)));
            class.component_mut().component_will_mount(&node.props);
            *self.class.borrow_mut() = Some(class);
        }
        self.refresh_child_context(true, &node.props);

        let rendered = self.render(runtime, &node.props)?;
        let mut child = instantiate(&rendered)?;
        let child_context = self.child_context.borrow().clone();
        child.mount(runtime, parent, &child_context, mounter)?;
        *self.rendered.borrow_mut() = Some(child);
        self.mounted.set(true);

        if let Some(target) = &node.ref_target {
            match self.component.kind() {
                ComponentKind::Class { .. } => {
                    target.attach(RefValue::Component(ComponentHandle(Rc::downgrade(self))))
                }
                _ => log::warn!(
                    "function component {} cannot be given a ref; use use_imperative_handle with a prop instead",
                    self.component.name()
                ),
            }
        }

        if let Some(class) = self.class.borrow_mut().as_mut() {
            class.component_mut().component_did_mount();
        }
        for slot in self.effect_slots() {
            slot.create(runtime);
        }
        Ok(())
    }

    pub(crate) fn update(
        self: &Rc<Self>,
        runtime: &Runtime,
        next: &Element,
        context: &ContextMap,
    ) -> Result<(), RenderError> {
        if !self.is_mounted() {
            return Err(RenderError::NotMounted);
        }
        let prev = self.element.replace(next.clone());
        let element_changed = !prev.same(next);
        let context_changed = !self.context.borrow().same(context);
        *self.context.borrow_mut() = context.clone();

        let prev_node = node_of(&prev)?;
        let next_node = node_of(next)?;

        let rerender = match self.component.kind() {
            ComponentKind::Function { compare, .. } => {
                let props_changed = match compare {
                    Some(are_equal) => !are_equal(&prev_node.props, &next_node.props),
                    None => element_changed,
                };
                if props_changed || context_changed {
                    self.mark_should_update();
                }
                props_changed || context_changed || self.pending_update.get()
            }
            ComponentKind::Class { .. } => {
                refs::update(
                    prev_node.ref_target.as_ref(),
                    next_node.ref_target.as_ref(),
                    RefValue::Component(ComponentHandle(Rc::downgrade(self))),
                );
                let mut class = self.class.borrow_mut();
                let Some(class) = class.as_mut() else {
                    return Err(RenderError::NotMounted);
                };
                if element_changed {
                    class
                        .component_mut()
                        .component_will_receive_props(&next_node.props);
                }
                self.force_update.get()
                    || !self.pending_state.borrow().is_empty()
                    || ((element_changed || context_changed)
                        && class.component().should_component_update(&next_node.props))
            }
            ComponentKind::Provider { .. } => {
                element_changed || context_changed || self.pending_update.get()
            }
        };

        if !rerender {
            log::trace!("skipping render of <{}>", self.component.name());
            return Ok(());
        }
        self.refresh_child_context(context_changed, &next_node.props);
        self.rerender(runtime, &prev_node.props)
    }

    /// Reconciles an update this instance requested itself.
    pub(crate) fn flush_pending(self: &Rc<Self>, runtime: &Runtime) -> Result<(), RenderError> {
        if !self.is_mounted() || !self.pending_update.get() {
            return Ok(());
        }
        log::trace!("re-rendering <{}> for a state update", self.component.name());
        let element = self.element();
        let node = node_of(&element)?;
        self.rerender(runtime, &node.props)
    }

    fn rerender(self: &Rc<Self>, runtime: &Runtime, prev_props: &Props) -> Result<(), RenderError> {
        let element = self.element();
        let node = node_of(&element)?;
        let next = self.render(runtime, &node.props)?;
        let child_context = self.child_context.borrow().clone();
        self.update_rendered(runtime, &next, &child_context)?;

        if let Some(class) = self.class.borrow_mut().as_mut() {
            class.component_mut().component_did_update(prev_props);
        }
        for slot in self.effect_slots() {
            if slot.needs_rerun() {
                slot.destroy(runtime);
                slot.create(runtime);
            }
        }
        Ok(())
    }

    /// Updates the rendered child in place, or replaces it when the new
    /// root is of a different type: the new nodes go in before the old first
    /// node, then the old subtree is removed.
    fn update_rendered(
        &self,
        runtime: &Runtime,
        next: &Element,
        context: &ContextMap,
    ) -> Result<(), RenderError> {
        let mut rendered = self.rendered.borrow_mut();
        let Some(current) = rendered.as_mut() else {
            return Err(RenderError::NotMounted);
        };
        if should_update_component(&current.element(), next) {
            if current.is_stale(next, context) {
                current.update(runtime, next, context)?;
            }
            return Ok(());
        }

        log::trace!("replacing rendered root of <{}>", self.component.name());
        let anchor = current.first_node();
        let mut replacement = instantiate(next)?;
        let mut mounter = |nodes: &[NodeId], host_parent: NodeId| -> Result<(), RenderError> {
            for &node in nodes {
                match anchor {
                    Some(reference) => runtime.host(|driver| driver.insert_before(node, reference))?,
                    None => runtime.host(|driver| driver.append_child(node, host_parent))?,
                }
            }
            Ok(())
        };
        replacement.mount(runtime, self.parent.get(), context, Some(&mut mounter))?;
        let mut previous = std::mem::replace(current, replacement);
        drop(rendered);
        previous.unmount(runtime, false)
    }

    pub(crate) fn unmount(self: &Rc<Self>, runtime: &Runtime, skip_removal: bool) -> Result<(), RenderError> {
        if self.unmounted.replace(true) {
            return Ok(());
        }
        log::trace!("unmounting <{}> (instance {})", self.component.name(), self.id());

        if let Some(class) = self.class.borrow_mut().as_mut() {
            class.component_mut().component_will_unmount();
        }
        for slot in self.effect_slots() {
            slot.destroy(runtime);
        }
        if matches!(self.component.kind(), ComponentKind::Class { .. }) {
            let element = self.element();
            if let Some(target) = element.as_node().and_then(|node| node.ref_target.as_ref()) {
                target.detach(&RefValue::Component(ComponentHandle(Rc::downgrade(self))));
            }
        }

        let rendered = self.rendered.borrow_mut().take();
        if let Some(mut rendered) = rendered {
            rendered.unmount(runtime, skip_removal)?;
        }
        self.pending_state.borrow_mut().clear();
        self.pending_update.set(false);
        Ok(())
    }

    // Rendering.

    fn render(self: &Rc<Self>, runtime: &Runtime, props: &Props) -> RenderResult {
        match self.component.kind() {
            ComponentKind::Function { render, .. } => self.render_function(runtime, render, props),
            ComponentKind::Class { .. } => self.render_class(props),
            ComponentKind::Provider { .. } => {
                self.pending_update.set(false);
                Ok(props.children().cloned().unwrap_or_default())
            }
        }
    }

    fn render_function(
        self: &Rc<Self>,
        runtime: &Runtime,
        render: &crate::component::RenderFn,
        props: &Props,
    ) -> RenderResult {
        let limit = runtime.config().re_render_limit;
        let _owner = owner::enter(self);
        self.pending_update.set(false);
        self.re_renders.set(0);

        let element = loop {
            self.hook_cursor.set(0);
            self.scheduled.set(false);
            let element = render(props)?;
            if !self.scheduled.get() {
                break element;
            }
            let passes = self.re_renders.get() + 1;
            if passes > limit {
                return Err(RenderError::TooManyReRenders { limit });
            }
            self.re_renders.set(passes);
        };

        let used = self.hook_cursor.get();
        match self.committed_hook_count.get() {
            Some(expected) if expected != used => {
                if runtime.config().strict_hooks {
                    return Err(RenderError::HookCountChanged {
                        expected,
                        found: used,
                    });
                }
                log::warn!(
                    "<{}> rendered {used} hooks but the previous render used {expected}",
                    self.component.name()
                );
            }
            _ => {}
        }
        self.committed_hook_count.set(Some(used));

        if self.should_update.replace(false) {
            *self.cached.borrow_mut() = element;
        }
        Ok(self.cached.borrow().clone())
    }

    fn render_class(&self, props: &Props) -> RenderResult {
        let updates = std::mem::take(&mut *self.pending_state.borrow_mut());
        let mut class = self.class.borrow_mut();
        let Some(class) = class.as_mut() else {
            return Err(RenderError::NotMounted);
        };
        for update in updates {
            update(class.as_any_mut());
        }
        self.force_update.set(false);
        self.pending_update.set(false);
        class.component().render(props)
    }

    /// Derives the context for the rendered subtree. A provider keeps its
    /// previous map while both the parent map and its value are unchanged,
    /// so consumers below are not marked stale.
    fn refresh_child_context(&self, parent_changed: bool, props: &Props) {
        let ComponentKind::Provider {
            context: id,
            same_value,
        } = self.component.kind()
        else {
            *self.child_context.borrow_mut() = self.context();
            return;
        };
        let value = match props.get(PROVIDER_VALUE) {
            Some(PropValue::Any(value)) => Some(Rc::clone(value)),
            _ => None,
        };
        let value_same = match (self.provided.borrow().as_ref(), value.as_ref()) {
            (Some(prev), Some(next)) => same_value(prev.as_ref(), next.as_ref()),
            (None, None) => true,
            _ => false,
        };
        if !parent_changed && value_same && self.mounted.get() {
            return;
        }
        let parent = self.context();
        *self.child_context.borrow_mut() = match &value {
            Some(value) => parent.with_value(*id, Rc::clone(value)),
            None => parent,
        };
        *self.provided.borrow_mut() = value;
    }

    fn effect_slots(&self) -> Vec<Rc<EffectSlot>> {
        self.effects.borrow().clone()
    }
}
