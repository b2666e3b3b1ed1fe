//! Platform abstraction traits for the reconciler.
//!
//! The engine never touches real UI nodes itself. Every mutation goes through
//! a [`HostDriver`], and deferred effects are flushed when the host answers a
//! [`RuntimeScheduler`] request.

use crate::element::{EventHandler, PropValue, Props, StyleMap};
use crate::error::NodeError;
use crate::{InstanceId, NodeId};

/// Primitive host-tree mutations.
///
/// Every call is synchronous. Errors are passed through to the caller of the
/// current render pass untouched.
pub trait HostDriver {
    /// Creates a detached element node with every prop already applied.
    fn create_element(
        &mut self,
        tag: &str,
        props: &Props,
        instance: InstanceId,
    ) -> Result<NodeId, NodeError>;

    fn create_text(&mut self, text: &str, instance: InstanceId) -> Result<NodeId, NodeError>;

    /// Creates the placeholder node rendered for empty elements.
    fn create_empty(&mut self, instance: InstanceId) -> Result<NodeId, NodeError>;

    fn update_text(&mut self, node: NodeId, text: &str) -> Result<(), NodeError>;

    fn append_child(&mut self, node: NodeId, parent: NodeId) -> Result<(), NodeError>;

    /// Moves or inserts `node` so it directly precedes `reference`.
    fn insert_before(&mut self, node: NodeId, reference: NodeId) -> Result<(), NodeError>;

    /// Moves or inserts `node` so it directly follows `reference`.
    fn insert_after(&mut self, node: NodeId, reference: NodeId) -> Result<(), NodeError>;

    fn remove_child(&mut self, node: NodeId, parent: NodeId) -> Result<(), NodeError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &PropValue)
        -> Result<(), NodeError>;

    fn remove_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        prev: &PropValue,
    ) -> Result<(), NodeError>;

    /// Applies a style delta. An empty string value clears that entry.
    fn set_style(&mut self, node: NodeId, style: &StyleMap) -> Result<(), NodeError>;

    /// `props` is the full prop set of the owning element, so drivers can read
    /// sibling flags such as capture options.
    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
        props: &Props,
    ) -> Result<(), NodeError>;

    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
        props: Option<&Props>,
    ) -> Result<(), NodeError>;

    /// Whether [`HostDriver::remove_children`] is implemented.
    fn supports_remove_children(&self) -> bool {
        false
    }

    /// Removes every child of `parent` at once. Must leave the same state as
    /// calling [`HostDriver::remove_child`] for each child.
    fn remove_children(&mut self, parent: NodeId) -> Result<(), NodeError> {
        let _ = parent;
        Err(NodeError::Unsupported {
            operation: "remove_children",
        })
    }
}

/// Asks the host to flush deferred effects.
///
/// Implementations must eventually call
/// [`Runtime::flush_effects`](crate::Runtime::flush_effects) on the thread
/// that owns the runtime. The engine also flushes on its own before every
/// externally triggered update, so a scheduler that never answers still
/// keeps effect ordering intact.
pub trait RuntimeScheduler: Send + Sync {
    /// Called when the deferred effect queue goes from empty to non-empty.
    fn schedule_flush(&self);
}
