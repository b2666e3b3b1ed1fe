use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::error::{NodeError, RenderError};
use crate::instance::CompositeInstance;
use crate::platform::{HostDriver, RuntimeScheduler};
use crate::InstanceId;

/// Tunables for one runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum extra render passes a component may request from inside its
    /// own render before failing with [`RenderError::TooManyReRenders`].
    pub re_render_limit: usize,
    /// Fail when a component calls a different number of hooks than on its
    /// previous render.
    pub strict_hooks: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            re_render_limit: 24,
            strict_hooks: cfg!(debug_assertions),
        }
    }
}

type Effect = Box<dyn FnOnce() + 'static>;

pub(crate) struct RuntimeInner {
    driver: RefCell<Box<dyn HostDriver>>,
    scheduler: Arc<dyn RuntimeScheduler>,
    config: RuntimeConfig,
    effects: RefCell<VecDeque<Effect>>,
    updating: Cell<bool>,
    dirty: RefCell<Vec<Weak<CompositeInstance>>>,
    next_instance_id: Cell<InstanceId>,
}

impl RuntimeInner {
    fn new(
        driver: Box<dyn HostDriver>,
        scheduler: Arc<dyn RuntimeScheduler>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            driver: RefCell::new(driver),
            scheduler,
            config,
            effects: RefCell::new(VecDeque::new()),
            updating: Cell::new(false),
            dirty: RefCell::new(Vec::new()),
            next_instance_id: Cell::new(1),
        }
    }

    fn enqueue_effect(&self, effect: Effect) {
        let was_empty = {
            let mut effects = self.effects.borrow_mut();
            let was_empty = effects.is_empty();
            effects.push_back(effect);
            was_empty
        };
        if was_empty {
            self.scheduler.schedule_flush();
        }
    }

    fn pop_effect(&self) -> Option<Effect> {
        self.effects.borrow_mut().pop_front()
    }

    fn take_dirty(&self) -> Vec<Rc<CompositeInstance>> {
        let mut batch: Vec<Rc<CompositeInstance>> = self
            .dirty
            .borrow_mut()
            .drain(..)
            .filter_map(|instance| instance.upgrade())
            .collect();
        batch.sort_by_key(|instance| instance.id());
        batch
    }
}

/// Resets the updating flag on every exit path of a batch.
struct UpdatingGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> UpdatingGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for UpdatingGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Owns the host driver, the deferred effect queue and the batch state.
///
/// Single threaded: clones share one runtime on the current thread.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(driver: impl HostDriver + 'static, scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self::with_config(driver, scheduler, RuntimeConfig::default())
    }

    pub fn with_config(
        driver: impl HostDriver + 'static,
        scheduler: Arc<dyn RuntimeScheduler>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(Box::new(driver), scheduler, config)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// `true` while a batch is reconciling.
    pub fn is_updating(&self) -> bool {
        self.inner.updating.get()
    }

    /// Queues a deferred effect. The scheduler is notified when the queue
    /// was empty.
    pub fn schedule_effect(&self, effect: impl FnOnce() + 'static) {
        self.inner.enqueue_effect(Box::new(effect));
    }

    pub fn has_pending_effects(&self) -> bool {
        !self.inner.effects.borrow().is_empty()
    }

    /// Runs queued deferred effects in FIFO order until the queue is empty,
    /// including effects queued while flushing.
    pub fn flush_effects(&self) {
        let mut ran = 0usize;
        while let Some(effect) = self.inner.pop_effect() {
            effect();
            ran += 1;
        }
        if ran > 0 {
            log::trace!("flushed {ran} deferred effects");
        }
    }

    /// Runs `f` as one batch: pending deferred effects are flushed first,
    /// state updates requested inside `f` are coalesced, and every dirty
    /// component is reconciled, parents first, before this returns.
    ///
    /// Nested calls join the outer batch.
    pub fn batched_updates<R>(
        &self,
        f: impl FnOnce() -> Result<R, RenderError>,
    ) -> Result<R, RenderError> {
        if self.is_updating() {
            return f();
        }
        self.flush_effects();
        let _guard = UpdatingGuard::enter(&self.inner.updating);
        let result = f()?;
        self.flush_dirty()?;
        Ok(result)
    }

    fn flush_dirty(&self) -> Result<(), RenderError> {
        loop {
            let batch = self.inner.take_dirty();
            if batch.is_empty() {
                return Ok(());
            }
            log::debug!("reconciling {} dirty components", batch.len());
            for instance in batch {
                instance.clear_enqueued();
                instance.flush_pending(self)?;
            }
        }
    }

    pub(crate) fn enqueue_dirty(&self, instance: &Rc<CompositeInstance>) {
        if instance.mark_enqueued() {
            self.inner.dirty.borrow_mut().push(Rc::downgrade(instance));
        }
    }

    pub(crate) fn next_instance_id(&self) -> InstanceId {
        let id = self.inner.next_instance_id.get();
        self.inner.next_instance_id.set(id + 1);
        id
    }

    /// Runs one driver call, lifting its error into the render error.
    pub(crate) fn host<R>(
        &self,
        op: impl FnOnce(&mut dyn HostDriver) -> Result<R, NodeError>,
    ) -> Result<R, RenderError> {
        let mut driver = self.inner.driver.borrow_mut();
        op(&mut **driver).map_err(RenderError::from)
    }

    pub(crate) fn supports_remove_children(&self) -> bool {
        self.inner.driver.borrow().supports_remove_children()
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_flush(&self) {}
}

/// Non-owning reference to a [`Runtime`].
#[derive(Clone)]
pub struct RuntimeHandle(pub(crate) Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }

    pub fn flush_effects(&self) {
        if let Some(runtime) = self.upgrade() {
            runtime.flush_effects();
        }
    }

    pub fn is_updating(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.updating.get())
            .unwrap_or(false)
    }
}

impl Default for RuntimeHandle {
    fn default() -> Self {
        RuntimeHandle(Weak::new())
    }
}
