//! Hooks for function components.
//!
//! Every hook reads or allocates the slot at the owner's call cursor, so a
//! component must call the same hooks in the same order on every render. A
//! slot is tagged with its [`HookKind`] and type, and a mismatch fails the
//! render instead of reading the wrong state.
//!
//! ```
//! use vdom_core::{use_state, ComponentType, Element, RenderResult, Props};
//!
//! fn counter(_props: &Props) -> RenderResult {
//!     let (count, set_count) = use_state(|| 0)?;
//!     Ok(Element::native("button")
//!         .on("click", move |_| {
//!             let _ = set_count.update(|n| n + 1);
//!         })
//!         .child(count)
//!         .build())
//! }
//!
//! let counter = ComponentType::function("Counter", counter);
//! # let _ = counter;
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use crate::component::Context;
use crate::error::RenderError;
use crate::hash::hash_one;
use crate::instance::CompositeInstance;
use crate::owner;
use crate::refs::{MutableRef, RefTarget, RefValue};
use crate::runtime::Runtime;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HookKind {
    State,
    Reducer,
    Memo,
    Ref,
    Effect,
    LayoutEffect,
}

/// Dependency list of a memo or effect hook, stored as a digest.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Deps {
    /// Recompute on every render.
    Always,
    Keyed(u64),
}

impl Deps {
    pub fn always() -> Self {
        Deps::Always
    }

    /// Computed on the first render only.
    pub fn once() -> Self {
        Deps::Keyed(hash_one(&()))
    }

    /// Recomputed whenever `key` hashes differently from the last render.
    /// Use a tuple for several dependencies.
    ///
    /// Only a 64-bit digest of `key` is kept: equal digests count as
    /// unchanged, so two distinct keys that collide skip the re-run. Values
    /// without `Hash` (floats, pointer identity) need a hashable stand-in
    /// such as `f64::to_bits` or an id.
    pub fn of<K: Hash + ?Sized>(key: &K) -> Self {
        Deps::Keyed(hash_one(key))
    }

    fn changed_from(self, prev: Deps) -> bool {
        self == Deps::Always || self != prev
    }

    fn with_extra(self, extra: usize) -> Self {
        match self {
            Deps::Always => Deps::Always,
            Deps::Keyed(key) => Deps::Keyed(hash_one(&(key, extra))),
        }
    }
}

/// Teardown returned by an effect.
#[derive(Default)]
pub struct Cleanup(Option<Box<dyn FnOnce()>>);

impl Cleanup {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Cleanup(Some(Box::new(f)))
    }

    pub fn none() -> Self {
        Cleanup(None)
    }

    fn run(self) {
        if let Some(f) = self.0 {
            f();
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cleanup").field(&self.0.is_some()).finish()
    }
}

fn warn_unmounted(hook: &str) {
    log::warn!("{hook} called on an unmounted component; the update is ignored");
}

/// Setters flush pending deferred effects before touching state, unless a
/// batch is already reconciling.
fn flush_before_update(owner: &CompositeInstance) {
    if let Ok(runtime) = owner.runtime() {
        if !runtime.is_updating() {
            runtime.flush_effects();
        }
    }
}

// State.

struct StateCell<T> {
    committed: RefCell<T>,
    /// Latest value handed to the setter, promoted at the next render.
    pending: RefCell<T>,
}

struct SetterInner<T> {
    cell: Rc<StateCell<T>>,
    owner: Weak<CompositeInstance>,
}

/// Setter returned by [`use_state`]. The same setter is returned on every
/// render of one component.
pub struct StateSetter<T>(Rc<SetterInner<T>>);

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateSetter")
    }
}

impl<T: Clone + PartialEq + 'static> StateSetter<T> {
    pub fn set(&self, value: T) -> Result<(), RenderError> {
        self.update(move |_| value)
    }

    /// Computes the next state from the latest pending one. Equal values do
    /// not schedule anything.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<(), RenderError> {
        let Some(owner) = self.0.owner.upgrade() else {
            return Ok(());
        };
        if owner.is_unmounted() {
            warn_unmounted("state setter");
            return Ok(());
        }
        flush_before_update(&owner);

        let current = self.0.cell.pending.borrow().clone();
        let next = f(&current);
        if next == current {
            return Ok(());
        }
        *self.0.cell.pending.borrow_mut() = next;
        owner.schedule_update()
    }

    pub fn ptr_eq(&self, other: &StateSetter<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

struct StateHook<T> {
    cell: Rc<StateCell<T>>,
    setter: StateSetter<T>,
}

/// Local state. `init` runs on the first render only.
pub fn use_state<T: Clone + PartialEq + 'static>(
    init: impl FnOnce() -> T,
) -> Result<(T, StateSetter<T>), RenderError> {
    let owner = owner::current()?;
    let (hook, _) = owner.hook(HookKind::State, || {
        let value = init();
        let cell = Rc::new(StateCell {
            committed: RefCell::new(value.clone()),
            pending: RefCell::new(value),
        });
        StateHook {
            setter: StateSetter(Rc::new(SetterInner {
                cell: Rc::clone(&cell),
                owner: Rc::downgrade(&owner),
            })),
            cell,
        }
    })?;

    let pending = hook.cell.pending.borrow().clone();
    if *hook.cell.committed.borrow() != pending {
        *hook.cell.committed.borrow_mut() = pending.clone();
        owner.mark_should_update();
    }
    Ok((pending, hook.setter.clone()))
}

// Reducer.

type Reducer<S, A> = Rc<dyn Fn(&S, &A) -> S>;

struct ReducerQueue<S, A> {
    actions: Vec<A>,
    /// Reducer and state captured by the last render. Dispatches outside
    /// render evaluate against this pair.
    eager_reducer: Reducer<S, A>,
    eager_state: S,
}

struct ReducerCell<S, A> {
    state: RefCell<S>,
    queue: RefCell<ReducerQueue<S, A>>,
}

trait ActionSink<A> {
    fn dispatch(&self, action: A) -> Result<(), RenderError>;
}

struct ReducerSink<S, A> {
    cell: Rc<ReducerCell<S, A>>,
    owner: Weak<CompositeInstance>,
}

impl<S: Clone + PartialEq + 'static, A: 'static> ActionSink<A> for ReducerSink<S, A> {
    fn dispatch(&self, action: A) -> Result<(), RenderError> {
        let Some(owner) = self.owner.upgrade() else {
            return Ok(());
        };
        if owner.is_unmounted() {
            warn_unmounted("dispatch");
            return Ok(());
        }
        flush_before_update(&owner);

        if owner::is_current(&owner) {
            self.cell.queue.borrow_mut().actions.push(action);
            owner.mark_scheduled();
            return Ok(());
        }

        let (reducer, current) = {
            let queue = self.cell.queue.borrow();
            (Rc::clone(&queue.eager_reducer), queue.eager_state.clone())
        };
        let eager = reducer(&current, &action);
        if eager == current {
            return Ok(());
        }
        {
            let mut queue = self.cell.queue.borrow_mut();
            queue.eager_state = eager;
            queue.actions.push(action);
        }
        owner.request_update()
    }
}

/// Dispatcher returned by [`use_reducer`]. Stable across renders.
pub struct Dispatch<A>(Rc<dyn ActionSink<A>>);

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatch")
    }
}

impl<A> Dispatch<A> {
    pub fn dispatch(&self, action: A) -> Result<(), RenderError> {
        self.0.dispatch(action)
    }

    pub fn ptr_eq(&self, other: &Dispatch<A>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

struct ReducerHook<S, A> {
    cell: Rc<ReducerCell<S, A>>,
    dispatch: Dispatch<A>,
}

pub fn use_reducer<S, A>(
    reducer: impl Fn(&S, &A) -> S + 'static,
    initial: S,
) -> Result<(S, Dispatch<A>), RenderError>
where
    S: Clone + PartialEq + 'static,
    A: 'static,
{
    use_reducer_with_init(reducer, initial, |state| state)
}

/// Like [`use_reducer`], with the initial state computed by `init(arg)` on
/// the first render.
pub fn use_reducer_with_init<S, A, I>(
    reducer: impl Fn(&S, &A) -> S + 'static,
    arg: I,
    init: impl FnOnce(I) -> S,
) -> Result<(S, Dispatch<A>), RenderError>
where
    S: Clone + PartialEq + 'static,
    A: 'static,
{
    let owner = owner::current()?;
    let reducer: Reducer<S, A> = Rc::new(reducer);
    let (hook, fresh) = owner.hook(HookKind::Reducer, || {
        let initial = init(arg);
        let cell = Rc::new(ReducerCell {
            state: RefCell::new(initial.clone()),
            queue: RefCell::new(ReducerQueue {
                actions: Vec::new(),
                eager_reducer: Rc::clone(&reducer),
                eager_state: initial,
            }),
        });
        let sink: Rc<dyn ActionSink<A>> = Rc::new(ReducerSink {
            cell: Rc::clone(&cell),
            owner: Rc::downgrade(&owner),
        });
        ReducerHook {
            cell,
            dispatch: Dispatch(sink),
        }
    })?;
    if fresh {
        let state = hook.cell.state.borrow().clone();
        return Ok((state, hook.dispatch.clone()));
    }

    let current = hook.cell.state.borrow().clone();
    let (actions, eager_state) = {
        let mut queue = hook.cell.queue.borrow_mut();
        (std::mem::take(&mut queue.actions), queue.eager_state.clone())
    };
    // Actions dispatched during this render were never evaluated eagerly.
    let next = if owner.re_renders() > 0 {
        actions
            .iter()
            .fold(current.clone(), |state, action| reducer(&state, action))
    } else {
        eager_state
    };
    if next != current {
        *hook.cell.state.borrow_mut() = next.clone();
        owner.mark_should_update();
    }
    {
        let mut queue = hook.cell.queue.borrow_mut();
        queue.eager_reducer = reducer;
        queue.eager_state = next.clone();
    }
    Ok((next, hook.dispatch.clone()))
}

// Memo and ref.

struct MemoSlot<T> {
    value: RefCell<Option<T>>,
    deps: Cell<Deps>,
}

/// Caches `create()` until `deps` change.
pub fn use_memo<T: Clone + 'static>(
    create: impl FnOnce() -> T,
    deps: Deps,
) -> Result<T, RenderError> {
    let owner = owner::current()?;
    let (slot, fresh) = owner.hook(HookKind::Memo, || MemoSlot::<T> {
        value: RefCell::new(None),
        deps: Cell::new(deps),
    })?;
    if !fresh && !deps.changed_from(slot.deps.get()) {
        if let Some(value) = slot.value.borrow().as_ref() {
            return Ok(value.clone());
        }
    }
    let value = create();
    slot.deps.set(deps);
    *slot.value.borrow_mut() = Some(value.clone());
    Ok(value)
}

/// Returns the first `callback` passed with the current `deps`, so the
/// value keeps its identity while the deps are unchanged.
pub fn use_callback<T: Clone + 'static>(callback: T, deps: Deps) -> Result<T, RenderError> {
    use_memo(move || callback, deps)
}

/// A mutable box kept for the lifetime of the component. Writing to it
/// never schedules a render.
pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> Result<MutableRef<T>, RenderError> {
    let owner = owner::current()?;
    let (slot, _) = owner.hook(HookKind::Ref, || MutableRef::new(init()))?;
    Ok(MutableRef::clone(&slot))
}

pub fn use_context<T: Clone + 'static>(context: &Context<T>) -> Result<T, RenderError> {
    let owner = owner::current()?;
    Ok(context.read(&owner.context()))
}

// Effects.

type Create = Box<dyn FnOnce() -> Cleanup>;

/// One `use_effect` or `use_layout_effect` call site.
pub(crate) struct EffectSlot {
    /// Effect from the latest render, taken when it is committed.
    pending: RefCell<Option<Create>>,
    /// Cleanup of the effect that last ran.
    destroy: RefCell<Option<Cleanup>>,
    inputs: Cell<Deps>,
    prev_inputs: Cell<Deps>,
    deferred: bool,
}

impl EffectSlot {
    fn new(deps: Deps, deferred: bool) -> Self {
        Self {
            pending: RefCell::new(None),
            destroy: RefCell::new(None),
            inputs: Cell::new(deps),
            prev_inputs: Cell::new(deps),
            deferred,
        }
    }

    pub(crate) fn needs_rerun(&self) -> bool {
        self.inputs.get().changed_from(self.prev_inputs.get())
    }

    /// Commits the pending effect: now for layout effects, through the
    /// deferred queue otherwise.
    pub(crate) fn create(self: &Rc<Self>, runtime: &Runtime) {
        let Some(create) = self.pending.borrow_mut().take() else {
            return;
        };
        let slot = Rc::clone(self);
        let run = move || {
            let cleanup = create();
            *slot.destroy.borrow_mut() = Some(cleanup);
        };
        if self.deferred {
            runtime.schedule_effect(run);
        } else {
            run();
        }
    }

    /// Runs the cleanup of the last effect. A deferred destroy looks the
    /// cleanup up when it runs, so it pairs with a create queued before it.
    pub(crate) fn destroy(self: &Rc<Self>, runtime: &Runtime) {
        let slot = Rc::clone(self);
        let run = move || {
            let cleanup = slot.destroy.borrow_mut().take();
            if let Some(cleanup) = cleanup {
                cleanup.run();
            }
        };
        if self.deferred {
            runtime.schedule_effect(run);
        } else {
            run();
        }
    }
}

fn use_effect_impl(
    kind: HookKind,
    effect: Create,
    deps: Deps,
    deferred: bool,
) -> Result<(), RenderError> {
    let owner = owner::current()?;
    let (slot, fresh) = owner.hook(kind, || EffectSlot::new(deps, deferred))?;
    if fresh {
        owner.register_effect(Rc::clone(&slot));
    } else if owner.re_renders() == 0 {
        // Re-render passes keep the inputs of the last committed render.
        slot.prev_inputs.set(slot.inputs.get());
    }
    slot.inputs.set(deps);
    *slot.pending.borrow_mut() = Some(effect);
    Ok(())
}

/// Runs `effect` after the commit, from the deferred queue. It runs again,
/// after the previous cleanup, whenever `deps` change.
pub fn use_effect(effect: impl FnOnce() -> Cleanup + 'static, deps: Deps) -> Result<(), RenderError> {
    use_effect_impl(HookKind::Effect, Box::new(effect), deps, true)
}

/// Like [`use_effect`], but runs synchronously inside the commit.
pub fn use_layout_effect(
    effect: impl FnOnce() -> Cleanup + 'static,
    deps: Deps,
) -> Result<(), RenderError> {
    use_effect_impl(HookKind::LayoutEffect, Box::new(effect), deps, false)
}

/// Exposes `create()` through `target` as a [`RefValue::Handle`]. The ref
/// itself counts as a dependency.
pub fn use_imperative_handle<T: 'static>(
    target: Option<&RefTarget>,
    create: impl FnOnce() -> T + 'static,
    deps: Deps,
) -> Result<(), RenderError> {
    let deps = match target {
        Some(target) => deps.with_extra(target.id()),
        None => deps,
    };
    let target = target.cloned();
    use_layout_effect(
        move || match target {
            Some(target) => {
                let value = RefValue::Handle(Rc::new(create()));
                target.attach(value.clone());
                Cleanup::new(move || target.detach(&value))
            }
            None => Cleanup::none(),
        },
        deps,
    )
}
