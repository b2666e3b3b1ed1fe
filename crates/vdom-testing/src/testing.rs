use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vdom_core::{
    Element, HostOp, MemoryDriver, NodeId, RenderError, Root, Runtime, RuntimeConfig,
    RuntimeScheduler,
};

/// Scheduler that only counts flush requests. Tests decide when deferred
/// effects run by calling [`TestRoot::flush_effects`].
#[derive(Clone, Default)]
pub struct TestScheduler {
    requests: Arc<AtomicUsize>,
}

impl TestScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the runtime asked for a deferred-effect flush.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl RuntimeScheduler for TestScheduler {
    fn schedule_flush(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Headless harness for exercising element trees in tests.
///
/// `TestRoot` owns a [`MemoryDriver`], a [`Root`] mounted on a fresh
/// container and a [`TestScheduler`], and exposes helpers for rendering,
/// flushing deferred effects and inspecting the host tree.
pub struct TestRoot {
    driver: MemoryDriver,
    scheduler: TestScheduler,
    root: Root,
}

impl TestRoot {
    /// Create a new harness backed by the default in-memory driver.
    pub fn new() -> Self {
        Self::with_driver(MemoryDriver::new(), RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_driver(MemoryDriver::new(), config)
    }

    /// Use a preconfigured driver, for example one with bulk removal on.
    pub fn with_driver(driver: MemoryDriver, config: RuntimeConfig) -> Self {
        let scheduler = TestScheduler::new();
        let container = driver.create_container("root");
        let runtime = Runtime::with_config(driver.clone(), Arc::new(scheduler.clone()), config);
        Self {
            driver,
            scheduler,
            root: Root::new(runtime, container),
        }
    }

    pub fn render(&self, element: impl Into<Element>) -> Result<(), RenderError> {
        self.root.render(element)
    }

    /// Render and return the host calls the render made.
    pub fn render_ops(&self, element: impl Into<Element>) -> Result<Vec<HostOp>, RenderError> {
        self.driver.clear_ops();
        self.root.render(element)?;
        Ok(self.driver.take_ops())
    }

    pub fn unmount(&self) -> Result<(), RenderError> {
        self.root.unmount()
    }

    /// Run every queued deferred effect, as the host would on a flush
    /// request.
    pub fn flush_effects(&self) {
        if self.root.runtime().has_pending_effects() {
            log::trace!("test root flushing deferred effects");
        }
        self.root.runtime().flush_effects();
    }

    pub fn has_pending_effects(&self) -> bool {
        self.root.runtime().has_pending_effects()
    }

    pub fn driver(&self) -> &MemoryDriver {
        &self.driver
    }

    pub fn scheduler(&self) -> &TestScheduler {
        &self.scheduler
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn runtime(&self) -> &Runtime {
        self.root.runtime()
    }

    pub fn container(&self) -> NodeId {
        self.root.container()
    }

    /// Host children of the container.
    pub fn children(&self) -> Vec<NodeId> {
        self.driver.children(self.container())
    }

    pub fn text(&self) -> String {
        self.driver.text_content(self.container())
    }

    pub fn dump(&self) -> String {
        self.driver.dump_tree(self.container())
    }

    pub fn take_ops(&self) -> Vec<HostOp> {
        self.driver.take_ops()
    }

    pub fn clear_ops(&self) {
        self.driver.clear_ops();
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need a `TestRoot` for the
/// duration of a closure.
pub fn run_test_root<R>(f: impl FnOnce(&TestRoot) -> R) -> R {
    let root = TestRoot::new();
    f(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdom_core::{use_effect, Cleanup, ComponentType, Deps};

    #[test]
    fn test_root_renders_and_reports_ops() {
        run_test_root(|root| {
            let ops = root
                .render_ops(Element::native("p").child("hi"))
                .expect("render");
            assert!(ops.iter().any(|op| matches!(op, HostOp::AppendChild { .. })));
            assert_eq!(root.text(), "hi");

            let ops = root
                .render_ops(Element::native("p").child("hi"))
                .expect("render again");
            assert!(ops.is_empty());
        });
    }

    #[test]
    fn scheduler_counts_flush_requests() {
        let root = TestRoot::new();
        let component = ComponentType::function("Effect", |_| {
            use_effect(Cleanup::none, Deps::once())?;
            Ok(Element::Empty)
        });

        root.render(component.element()).expect("mount");
        assert_eq!(root.scheduler().requests(), 1);
        assert!(root.has_pending_effects());

        root.flush_effects();
        assert!(!root.has_pending_effects());
    }
}
