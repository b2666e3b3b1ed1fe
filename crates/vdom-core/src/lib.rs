#![doc = r"Keyed reconciliation and hook-state engine for a declarative UI tree."]
//!
//! Render code describes the UI as [`Element`]s. A [`Root`] keeps an
//! instance tree mirroring the last description and, on every render,
//! reconciles it against the next one, sending the minimal set of host
//! mutations through a [`HostDriver`].

pub mod collections;
pub mod component;
pub mod element;
pub mod error;
pub mod hash;
pub mod hooks;
mod instance;
pub mod memory;
mod owner;
pub mod platform;
pub mod refs;
pub mod root;
pub mod runtime;

pub use component::{
    create_context, Component, ComponentHandle, ComponentType, Context, ContextId, ContextMap,
};
pub use element::{
    format_number, style, Element, ElementBuilder, ElementNode, ElementType, Event, EventHandler,
    PropValue, Props, StyleMap, StyleValue,
};
pub use error::{NodeError, RenderError, RenderResult};
pub use hooks::{
    use_callback, use_context, use_effect, use_imperative_handle, use_layout_effect, use_memo,
    use_reducer, use_reducer_with_init, use_ref, use_state, Cleanup, Deps, Dispatch, HookKind,
    StateSetter,
};
pub use instance::NodeList;
pub use memory::{HostOp, MemoryDriver};
pub use platform::{HostDriver, RuntimeScheduler};
pub use refs::{MutableRef, RefTarget, RefValue};
pub use root::Root;
pub use runtime::{DefaultScheduler, Runtime, RuntimeConfig, RuntimeHandle};

/// Handle of a host node, assigned by the [`HostDriver`].
pub type NodeId = usize;

/// Identity of a mounted instance. Assigned in mount order, so a parent
/// always has a smaller id than its descendants.
pub type InstanceId = u64;

#[cfg(test)]
#[path = "tests/element_tests.rs"]
mod element_tests;

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod reconcile_tests;

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod hooks_tests;

#[cfg(test)]
#[path = "tests/component_tests.rs"]
mod component_tests;
