use std::any::Any;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::component::ComponentHandle;
use crate::NodeId;

/// A mutable box that survives re-renders. Returned by `use_ref` and used as
/// the object form of element refs.
pub struct MutableRef<T>(Rc<RefCell<T>>);

impl<T> Clone for MutableRef<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> MutableRef<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn replace(&self, value: T) -> T {
        self.0.replace(value)
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn ptr_eq(&self, other: &MutableRef<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> MutableRef<T> {
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for MutableRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MutableRef").field(&*self.0.borrow()).finish()
    }
}

/// What a ref points at once attached.
#[derive(Clone)]
pub enum RefValue {
    Native(NodeId),
    Component(ComponentHandle),
    /// A value exposed with `use_imperative_handle`.
    Handle(Rc<dyn Any>),
}

impl RefValue {
    pub fn same(&self, other: &RefValue) -> bool {
        match (self, other) {
            (RefValue::Native(a), RefValue::Native(b)) => a == b,
            (RefValue::Component(a), RefValue::Component(b)) => a.ptr_eq(b),
            (RefValue::Handle(a), RefValue::Handle(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_native(&self) -> Option<NodeId> {
        match self {
            RefValue::Native(node) => Some(*node),
            _ => None,
        }
    }

    pub fn downcast_handle<T: Any>(&self) -> Option<&T> {
        match self {
            RefValue::Handle(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefValue::Native(node) => write!(f, "Native({node})"),
            RefValue::Component(handle) => write!(f, "Component({handle:?})"),
            RefValue::Handle(_) => f.write_str("Handle"),
        }
    }
}

/// The `ref` of an element: a callback or a `{current}` box.
#[derive(Clone)]
pub enum RefTarget {
    Callback(Rc<dyn Fn(Option<RefValue>)>),
    Object(MutableRef<Option<RefValue>>),
}

impl RefTarget {
    pub fn callback(f: impl Fn(Option<RefValue>) + 'static) -> Self {
        RefTarget::Callback(Rc::new(f))
    }

    pub fn object(target: &MutableRef<Option<RefValue>>) -> Self {
        RefTarget::Object(target.clone())
    }

    pub fn same(&self, other: &RefTarget) -> bool {
        match (self, other) {
            (RefTarget::Callback(a), RefTarget::Callback(b)) => Rc::ptr_eq(a, b),
            (RefTarget::Object(a), RefTarget::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub(crate) fn id(&self) -> usize {
        match self {
            RefTarget::Callback(f) => Rc::as_ptr(f) as *const () as usize,
            RefTarget::Object(target) => Rc::as_ptr(&target.0) as *const () as usize,
        }
    }

    pub(crate) fn attach(&self, value: RefValue) {
        match self {
            RefTarget::Callback(f) => f(Some(value)),
            RefTarget::Object(target) => target.set(Some(value)),
        }
    }

    /// Clears the ref. An object ref is only cleared while it still points
    /// at `value`, so a newer attachment is left alone.
    pub(crate) fn detach(&self, value: &RefValue) {
        match self {
            RefTarget::Callback(f) => f(None),
            RefTarget::Object(target) => {
                let still_ours = target
                    .borrow()
                    .as_ref()
                    .is_some_and(|current| current.same(value));
                if still_ours {
                    target.set(None);
                }
            }
        }
    }
}

impl fmt::Debug for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Callback(_) => f.write_str("RefTarget::Callback"),
            RefTarget::Object(target) => write!(f, "RefTarget::Object({:?})", target.borrow()),
        }
    }
}

/// Moves `value` from the previous ref to the next one when they differ.
pub(crate) fn update(prev: Option<&RefTarget>, next: Option<&RefTarget>, value: RefValue) {
    match (prev, next) {
        (Some(prev), Some(next)) if prev.same(next) => {}
        (prev, next) => {
            if let Some(prev) = prev {
                prev.detach(&value);
            }
            if let Some(next) = next {
                next.attach(value);
            }
        }
    }
}
