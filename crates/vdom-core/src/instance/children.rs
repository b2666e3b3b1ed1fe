//! Keyed child-list reconciliation shared by native and fragment instances.

use indexmap::IndexMap;

use crate::component::ContextMap;
use crate::element::Element;
use crate::error::RenderError;
use crate::instance::{instantiate, key_name, should_update_component, Instance, Mounter};
use crate::runtime::Runtime;
use crate::NodeId;

pub(crate) struct RenderedChild {
    instance: Instance,
    /// Position among siblings after the last reconciliation.
    mount_index: usize,
}

enum NextChild {
    Reused(RenderedChild),
    Fresh(Instance),
}

/// Rendered children keyed by child name. Iteration order is the order of
/// the last reconciliation.
#[derive(Default)]
pub(crate) struct ChildList {
    rendered: IndexMap<String, RenderedChild>,
}

impl ChildList {
    /// Mounts `children` from scratch under `parent`.
    pub(crate) fn mount(
        &mut self,
        runtime: &Runtime,
        parent: NodeId,
        children: &[Element],
        context: &ContextMap,
        mut mounter: Option<&mut Mounter<'_>>,
    ) -> Result<(), RenderError> {
        self.rendered = IndexMap::with_capacity(children.len());
        for (index, element) in children.iter().enumerate() {
            let name = key_name(&self.rendered, element, index);
            let mut instance = instantiate(element)?;
            instance.mount(runtime, parent, context, mounter.as_deref_mut())?;
            self.rendered.insert(
                name,
                RenderedChild {
                    instance,
                    mount_index: index,
                },
            );
        }
        Ok(())
    }

    /// Reconciles the rendered children against `next` and returns the host
    /// nodes of the new list in order.
    ///
    /// `parent` is the host node the children live under. `own_node` is set
    /// when that parent belongs to the reconciling instance, which makes the
    /// bulk-removal fast path available.
    pub(crate) fn update(
        &mut self,
        runtime: &Runtime,
        parent: NodeId,
        own_node: Option<NodeId>,
        next: Option<&[Element]>,
        context: &ContextMap,
    ) -> Result<Vec<NodeId>, RenderError> {
        let mut prev = std::mem::take(&mut self.rendered);
        let next = next.unwrap_or(&[]);
        if next.is_empty() && prev.is_empty() {
            return Ok(Vec::new());
        }
        let first_name = prev.keys().next().cloned();

        // Match next children by name. Incompatible previous instances are
        // only marked here; they may still anchor placement.
        let mut doomed: Vec<(String, RenderedChild)> = Vec::new();
        let mut next_children: IndexMap<String, NextChild> = IndexMap::with_capacity(next.len());
        for (index, element) in next.iter().enumerate() {
            let name = key_name(&next_children, element, index);
            let slot = match prev.swap_remove(&name) {
                Some(mut child)
                    if should_update_component(&child.instance.element(), element) =>
                {
                    if child.instance.is_stale(element, context) {
                        child.instance.update(runtime, element, context)?;
                    }
                    NextChild::Reused(child)
                }
                Some(child) => {
                    doomed.push((name.clone(), child));
                    NextChild::Fresh(instantiate(element)?)
                }
                None => NextChild::Fresh(instantiate(element)?),
            };
            next_children.insert(name, slot);
        }

        let remove_all = own_node.is_some()
            && next_children.is_empty()
            && runtime.supports_remove_children();

        // Unmount what is gone, except the previous first child: its node is
        // the insert-before anchor for the whole placement pass.
        let mut first_gone: Option<RenderedChild> = None;
        for (name, mut child) in doomed.into_iter().chain(prev) {
            if first_name.as_deref() == Some(name.as_str()) {
                first_gone = Some(child);
            } else {
                child.instance.unmount(runtime, remove_all)?;
            }
        }
        let anchor = match &first_gone {
            Some(child) => child.instance.first_node(),
            None => first_name
                .as_ref()
                .and_then(|name| next_children.get(name))
                .and_then(|slot| match slot {
                    NextChild::Reused(child) => child.instance.first_node(),
                    NextChild::Fresh(_) => None,
                }),
        };

        let mut last_placed: Option<NodeId> = None;
        let mut next_nodes = Vec::new();
        let mut rendered = IndexMap::with_capacity(next_children.len());
        for (next_index, (name, slot)) in next_children.into_iter().enumerate() {
            let mut child = match slot {
                NextChild::Reused(child) => {
                    if child.mount_index != next_index {
                        log::trace!("moving child {name} from {} to {next_index}", child.mount_index);
                        let nodes = child.instance.native_nodes();
                        place_nodes(runtime, &nodes, last_placed, anchor, None)?;
                    }
                    child
                }
                NextChild::Fresh(mut instance) => {
                    let (after, before) = (last_placed, anchor);
                    let mut mounter = move |nodes: &[NodeId], host_parent: NodeId| {
                        place_nodes(runtime, nodes, after, before, Some(host_parent))
                    };
                    instance.mount(runtime, parent, context, Some(&mut mounter))?;
                    RenderedChild {
                        instance,
                        mount_index: next_index,
                    }
                }
            };
            child.mount_index = next_index;
            let nodes = child.instance.native_nodes();
            if let Some(&last) = nodes.last() {
                last_placed = Some(last);
            }
            next_nodes.extend(nodes);
            rendered.insert(name, child);
        }

        if let Some(mut child) = first_gone {
            child.instance.unmount(runtime, remove_all)?;
        }
        if let (true, Some(node)) = (remove_all, own_node) {
            runtime.host(|driver| driver.remove_children(node))?;
        }
        self.rendered = rendered;
        Ok(next_nodes)
    }

    pub(crate) fn unmount(&mut self, runtime: &Runtime, skip_removal: bool) -> Result<(), RenderError> {
        for (_, mut child) in std::mem::take(&mut self.rendered) {
            child.instance.unmount(runtime, skip_removal)?;
        }
        Ok(())
    }

    pub(crate) fn native_nodes(&self) -> Vec<NodeId> {
        self.rendered
            .values()
            .flat_map(|child| child.instance.native_nodes())
            .collect()
    }
}

/// Positions `nodes` after the last placed sibling, else before the anchor,
/// else at the end of `parent`.
fn place_nodes(
    runtime: &Runtime,
    nodes: &[NodeId],
    after: Option<NodeId>,
    before: Option<NodeId>,
    parent: Option<NodeId>,
) -> Result<(), RenderError> {
    if let Some(reference) = after {
        // Reverse so the nodes end up in order after `reference`.
        for &node in nodes.iter().rev() {
            runtime.host(|driver| driver.insert_after(node, reference))?;
        }
    } else if let Some(reference) = before {
        for &node in nodes {
            runtime.host(|driver| driver.insert_before(node, reference))?;
        }
    } else if let Some(parent) = parent {
        for &node in nodes {
            runtime.host(|driver| driver.append_child(node, parent))?;
        }
    }
    Ok(())
}
