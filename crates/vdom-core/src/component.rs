//! Composite component definitions: function components, class components
//! and context providers.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::collections::map::HashMap;
use crate::element::{Element, ElementBuilder, Props, PropValue};
use crate::error::{RenderError, RenderResult};
use crate::instance::CompositeInstance;

pub(crate) type RenderFn = dyn Fn(&Props) -> RenderResult;
pub(crate) type PropsEq = dyn Fn(&Props, &Props) -> bool;
pub(crate) type Construct = dyn Fn(&Props, ComponentHandle) -> Box<dyn ErasedComponent>;
pub(crate) type ValueEq = dyn Fn(&dyn Any, &dyn Any) -> bool;

pub(crate) enum ComponentKind {
    Function {
        render: Box<RenderFn>,
        /// Present for memoized components: `true` means "props unchanged".
        compare: Option<Box<PropsEq>>,
    },
    Class {
        construct: Box<Construct>,
    },
    Provider {
        context: ContextId,
        same_value: Box<ValueEq>,
    },
}

pub(crate) struct ComponentDef {
    name: String,
    pub(crate) kind: ComponentKind,
}

/// A component reference. Two elements have the same component type only
/// when they share the same `ComponentType` allocation.
#[derive(Clone)]
pub struct ComponentType(Rc<ComponentDef>);

impl ComponentType {
    pub fn function(
        name: impl Into<String>,
        render: impl Fn(&Props) -> RenderResult + 'static,
    ) -> Self {
        Self::from_kind(
            name,
            ComponentKind::Function {
                render: Box::new(render),
                compare: None,
            },
        )
    }

    /// A function component that skips re-rendering while its props stay
    /// shallowly equal.
    pub fn memo(name: impl Into<String>, render: impl Fn(&Props) -> RenderResult + 'static) -> Self {
        Self::memo_with(name, render, |prev, next| prev.shallow_eq(next))
    }

    pub fn memo_with(
        name: impl Into<String>,
        render: impl Fn(&Props) -> RenderResult + 'static,
        are_equal: impl Fn(&Props, &Props) -> bool + 'static,
    ) -> Self {
        Self::from_kind(
            name,
            ComponentKind::Function {
                render: Box::new(render),
                compare: Some(Box::new(are_equal)),
            },
        )
    }

    /// A stateful component. `construct` runs once per mounted instance.
    pub fn class<C: Component>(
        name: impl Into<String>,
        construct: impl Fn(&Props, ComponentHandle) -> C + 'static,
    ) -> Self {
        Self::from_kind(
            name,
            ComponentKind::Class {
                construct: Box::new(
                    move |props: &Props, handle: ComponentHandle| -> Box<dyn ErasedComponent> {
                        Box::new(construct(props, handle))
                    },
                ),
            },
        )
    }

    fn from_kind(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self(Rc::new(ComponentDef {
            name: name.into(),
            kind,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ptr_eq(&self, other: &ComponentType) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn element(&self) -> ElementBuilder {
        Element::component(self)
    }

    pub(crate) fn kind(&self) -> &ComponentKind {
        &self.0.kind
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentType").field(&self.0.name).finish()
    }
}

/// Lifecycle of a class component. Only `render` is required.
pub trait Component: Any {
    fn render(&self, props: &Props) -> RenderResult;

    fn component_will_mount(&mut self, _props: &Props) {}

    fn component_did_mount(&mut self) {}

    /// Called before an update caused by the parent, with the incoming props.
    fn component_will_receive_props(&mut self, _next: &Props) {}

    /// Consulted for parent-driven updates. State updates always re-render.
    fn should_component_update(&self, _next: &Props) -> bool {
        true
    }

    fn component_did_update(&mut self, _prev: &Props) {}

    fn component_will_unmount(&mut self) {}
}

pub(crate) trait ErasedComponent {
    fn component(&self) -> &dyn Component;
    fn component_mut(&mut self) -> &mut dyn Component;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedComponent for C {
    fn component(&self) -> &dyn Component {
        self
    }

    fn component_mut(&mut self) -> &mut dyn Component {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) type StateUpdate = Box<dyn FnOnce(&mut dyn Any)>;

/// Handle given to a class component at construction. It does not keep the
/// instance alive.
#[derive(Clone)]
pub struct ComponentHandle(pub(crate) Weak<CompositeInstance>);

impl ComponentHandle {
    /// Queues a mutation of the component and schedules a re-render. Inside a
    /// batch the render happens when the batch ends.
    pub fn set_state<C: Component>(
        &self,
        update: impl FnOnce(&mut C) + 'static,
    ) -> Result<(), RenderError> {
        let Some(instance) = self.0.upgrade() else {
            return Ok(());
        };
        instance.enqueue_state(Box::new(move |any: &mut dyn Any| {
            if let Some(component) = any.downcast_mut::<C>() {
                update(component);
            }
        }));
        instance.request_update()
    }

    pub fn force_update(&self) -> Result<(), RenderError> {
        let Some(instance) = self.0.upgrade() else {
            return Ok(());
        };
        instance.mark_forced();
        instance.request_update()
    }

    /// Reads the component. Returns `None` once unmounted, or while one of
    /// its lifecycle methods holds it mutably.
    pub fn with<C: Component, R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        let instance = self.0.upgrade()?;
        instance.with_class(|any| any.downcast_ref::<C>().map(f))
    }

    pub fn is_mounted(&self) -> bool {
        self.0
            .upgrade()
            .map(|instance| instance.is_mounted())
            .unwrap_or(false)
    }

    pub fn ptr_eq(&self, other: &ComponentHandle) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

/// A value passed down the tree without threading it through props.
pub struct Context<T> {
    id: ContextId,
    default: T,
    provider: ComponentType,
}

impl<T: Clone> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: self.default.clone(),
            provider: self.provider.clone(),
        }
    }
}

pub fn create_context<T: Clone + PartialEq + 'static>(default: T) -> Context<T> {
    let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
    let provider = ComponentType::from_kind(
        format!("Context{}.Provider", id.0),
        ComponentKind::Provider {
            context: id,
            same_value: Box::new(|a: &dyn Any, b: &dyn Any| match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }),
        },
    );
    Context {
        id,
        default,
        provider,
    }
}

impl<T: Clone + 'static> Context<T> {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Element that provides `value` to every descendant of `children`.
    pub fn provider(&self, value: T, children: impl Into<Element>) -> Element {
        self.provider
            .element()
            .prop(PROVIDER_VALUE, PropValue::any(value))
            .child(children)
            .build()
    }

    pub(crate) fn read(&self, map: &ContextMap) -> T {
        map.get(self.id)
            .and_then(|value| value.downcast_ref::<T>().cloned())
            .unwrap_or_else(|| self.default.clone())
    }
}

pub(crate) const PROVIDER_VALUE: &str = "value";

/// Snapshot of every provided context value visible at one tree position.
/// Compared by identity: a provider creates a new map only when its value
/// changes.
#[derive(Clone, Default)]
pub struct ContextMap(Option<Rc<HashMap<ContextId, Rc<dyn Any>>>>);

impl ContextMap {
    pub fn same(&self, other: &ContextMap) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn get(&self, id: ContextId) -> Option<&Rc<dyn Any>> {
        self.0.as_ref().and_then(|values| values.get(&id))
    }

    pub(crate) fn with_value(&self, id: ContextId, value: Rc<dyn Any>) -> ContextMap {
        let mut values = self
            .0
            .as_ref()
            .map(|values| HashMap::clone(values))
            .unwrap_or_default();
        values.insert(id, value);
        ContextMap(Some(Rc::new(values)))
    }
}

impl fmt::Debug for ContextMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.0.as_ref().map_or(0, |values| values.len());
        write!(f, "ContextMap({len} values)")
    }
}
