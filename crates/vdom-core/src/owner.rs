//! The function component whose render is currently running.
//!
//! Hooks find their instance here. The stack is pushed only around a render
//! call, and the guard pops it on every exit path including panics.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RenderError;
use crate::instance::CompositeInstance;

thread_local! {
    static CURRENT_OWNER: RefCell<Vec<Rc<CompositeInstance>>> = const { RefCell::new(Vec::new()) };
}

pub(crate) struct OwnerGuard {
    _private: (),
}

impl Drop for OwnerGuard {
    fn drop(&mut self) {
        CURRENT_OWNER.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub(crate) fn enter(instance: &Rc<CompositeInstance>) -> OwnerGuard {
    CURRENT_OWNER.with(|stack| stack.borrow_mut().push(Rc::clone(instance)));
    OwnerGuard { _private: () }
}

/// The rendering instance, or [`RenderError::HookOutsideRender`].
pub(crate) fn current() -> Result<Rc<CompositeInstance>, RenderError> {
    CURRENT_OWNER
        .with(|stack| stack.borrow().last().cloned())
        .ok_or(RenderError::HookOutsideRender)
}

pub(crate) fn is_current(instance: &CompositeInstance) -> bool {
    CURRENT_OWNER.with(|stack| {
        stack
            .borrow()
            .last()
            .is_some_and(|top| std::ptr::eq(Rc::as_ptr(top), instance))
    })
}
