use crate::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn log(entry: impl Into<String>) {
    LOG.with(|entries| entries.borrow_mut().push(entry.into()));
}

fn take_log() -> Vec<String> {
    LOG.with(|entries| std::mem::take(&mut *entries.borrow_mut()))
}

fn setup() -> (MemoryDriver, NodeId, Root) {
    let driver = MemoryDriver::new();
    let container = driver.create_container("root");
    let runtime = Runtime::new(driver.clone(), Arc::new(DefaultScheduler));
    (driver, container, Root::new(runtime, container))
}

type Slot<T> = Rc<RefCell<Option<T>>>;

fn taken<T: Clone>(slot: &Slot<T>) -> T {
    slot.borrow().clone().expect("captured during render")
}

struct Clock {
    ticks: i32,
}

impl Component for Clock {
    fn render(&self, props: &Props) -> RenderResult {
        log("render");
        let label = props.str("label").unwrap_or_default().to_owned();
        Ok(Element::native("span")
            .child(format!("{label}:{}", self.ticks))
            .build())
    }

    fn component_will_mount(&mut self, _props: &Props) {
        log("will_mount");
    }

    fn component_did_mount(&mut self) {
        log("did_mount");
    }

    fn component_will_receive_props(&mut self, _next: &Props) {
        log("will_receive_props");
    }

    fn should_component_update(&self, next: &Props) -> bool {
        next.get("frozen").and_then(PropValue::as_bool) != Some(true)
    }

    fn component_did_update(&mut self, _prev: &Props) {
        log("did_update");
    }

    fn component_will_unmount(&mut self) {
        log("will_unmount");
    }
}

fn clock(handle: Slot<ComponentHandle>) -> ComponentType {
    ComponentType::class("Clock", move |_props, h| {
        *handle.borrow_mut() = Some(h);
        Clock { ticks: 0 }
    })
}

#[test]
fn class_lifecycle_runs_in_order() {
    let (driver, container, root) = setup();
    let handle: Slot<ComponentHandle> = Rc::default();
    let component = clock(handle.clone());
    take_log();

    root.render(component.element().prop("label", "a")).expect("mount");
    assert_eq!(take_log(), ["will_mount", "render", "did_mount"]);
    assert_eq!(driver.text_content(container), "a:0");

    root.render(component.element().prop("label", "b")).expect("update");
    assert_eq!(take_log(), ["will_receive_props", "render", "did_update"]);
    assert_eq!(driver.text_content(container), "b:0");

    root.unmount().expect("unmount");
    assert_eq!(take_log(), ["will_unmount"]);
    assert!(!taken(&handle).is_mounted());
}

#[test]
fn should_component_update_only_gates_parent_updates() {
    let (driver, container, root) = setup();
    let handle: Slot<ComponentHandle> = Rc::default();
    let component = clock(handle.clone());
    root.render(component.element().prop("label", "a")).expect("mount");
    take_log();

    root.render(component.element().prop("label", "b").prop("frozen", true))
        .expect("frozen update");
    assert_eq!(take_log(), ["will_receive_props"]);
    assert_eq!(driver.text_content(container), "a:0");

    taken(&handle)
        .set_state::<Clock>(|clock| clock.ticks += 1)
        .expect("set_state");
    assert_eq!(take_log(), ["render", "did_update"]);
    assert_eq!(driver.text_content(container), "b:1");
}

#[test]
fn set_state_calls_in_one_batch_render_once() {
    let (driver, container, root) = setup();
    let handle: Slot<ComponentHandle> = Rc::default();
    root.render(clock(handle.clone()).element()).expect("mount");
    take_log();

    let handle = taken(&handle);
    root.runtime()
        .batched_updates(|| {
            handle.set_state::<Clock>(|clock| clock.ticks += 1)?;
            handle.set_state::<Clock>(|clock| clock.ticks += 1)
        })
        .expect("batch");

    assert_eq!(take_log(), ["render", "did_update"]);
    assert_eq!(driver.text_content(container), ":2");
    assert_eq!(handle.with::<Clock, _>(|clock| clock.ticks), Some(2));
}

#[test]
fn force_update_bypasses_should_component_update() {
    let (_driver, _container, root) = setup();
    let handle: Slot<ComponentHandle> = Rc::default();
    root.render(clock(handle.clone()).element().prop("frozen", true))
        .expect("mount");
    take_log();

    taken(&handle).force_update().expect("force");
    assert_eq!(take_log(), ["render", "did_update"]);
}

#[test]
fn handle_of_unmounted_class_ignores_updates() {
    let (_driver, _container, root) = setup();
    let handle: Slot<ComponentHandle> = Rc::default();
    root.render(clock(handle.clone()).element()).expect("mount");
    root.unmount().expect("unmount");
    take_log();

    let handle = taken(&handle);
    handle
        .set_state::<Clock>(|clock| clock.ticks = 9)
        .expect("ignored");
    assert!(take_log().is_empty());
}

#[test]
fn class_ref_points_at_the_component() {
    let (_driver, _container, root) = setup();
    let target: MutableRef<Option<RefValue>> = MutableRef::new(None);
    let component = clock(Rc::default());

    root.render(
        component
            .element()
            .ref_target(RefTarget::object(&target)),
    )
    .expect("mount");

    let Some(RefValue::Component(handle)) = target.get() else {
        panic!("expected a component ref");
    };
    assert_eq!(handle.with::<Clock, _>(|clock| clock.ticks), Some(0));

    root.unmount().expect("unmount");
    assert!(target.get().is_none());
}

#[test]
fn callback_ref_on_function_component_is_not_attached() {
    let (_driver, _container, root) = setup();
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let component = ComponentType::function("Plain", |_| Ok(Element::Empty));

    root.render(
        component
            .element()
            .ref_target(RefTarget::callback(move |_| seen.set(seen.get() + 1))),
    )
    .expect("mount");
    assert_eq!(calls.get(), 0);
}

#[test]
fn memo_component_skips_equal_props() {
    let (driver, container, root) = setup();
    let renders = Rc::new(Cell::new(0));
    let calls = renders.clone();
    let label = ComponentType::memo("Label", move |props| {
        calls.set(calls.get() + 1);
        Ok(Element::from(props.str("text").unwrap_or_default()))
    });

    root.render(label.element().prop("text", "a")).expect("mount");
    root.render(label.element().prop("text", "a")).expect("equal props");
    assert_eq!(renders.get(), 1);

    root.render(label.element().prop("text", "b")).expect("new props");
    assert_eq!(renders.get(), 2);
    assert_eq!(driver.text_content(container), "b");
}

#[test]
fn memo_with_custom_comparison() {
    let (_driver, _container, root) = setup();
    let renders = Rc::new(Cell::new(0));
    let calls = renders.clone();
    let component = ComponentType::memo_with(
        "IdOnly",
        move |_| {
            calls.set(calls.get() + 1);
            Ok(Element::Empty)
        },
        |prev, next| prev.number("id") == next.number("id"),
    );

    root.render(component.element().prop("id", 1).prop("noise", 1)).expect("mount");
    root.render(component.element().prop("id", 1).prop("noise", 2)).expect("noise");
    assert_eq!(renders.get(), 1);
}

#[test]
fn context_consumers_read_default_without_provider() {
    let (driver, container, root) = setup();
    let theme = create_context("light");
    let consumer = ComponentType::function("Themed", move |_| {
        Ok(Element::from(use_context(&theme)?))
    });

    root.render(consumer.element()).expect("mount");
    assert_eq!(driver.text_content(container), "light");
}

#[test]
fn context_change_reaches_consumers_behind_memo() {
    let (driver, container, root) = setup();
    let theme = create_context("light");
    let renders = Rc::new(Cell::new(0));
    let calls = renders.clone();
    let reader = theme.clone();
    let consumer = ComponentType::function("Themed", move |_| {
        calls.set(calls.get() + 1);
        Ok(Element::from(use_context(&reader)?))
    });
    let middle = ComponentType::memo("Middle", move |_| Ok(consumer.element().build()));

    root.render(theme.provider("dark", middle.element())).expect("mount");
    assert_eq!(driver.text_content(container), "dark");

    root.render(theme.provider("dark", middle.element())).expect("same value");
    assert_eq!(renders.get(), 1);

    root.render(theme.provider("dim", middle.element())).expect("new value");
    assert_eq!(renders.get(), 2);
    assert_eq!(driver.text_content(container), "dim");
}

#[test]
fn nested_providers_shadow_outer_values() {
    let (driver, container, root) = setup();
    let theme = create_context("light");
    let reader = theme.clone();
    let consumer = ComponentType::function("Themed", move |_| {
        Ok(Element::from(use_context(&reader)?))
    });

    let wrapped = theme.provider(
        "outer",
        Element::native("div")
            .children([
                consumer.element().build(),
                theme.provider("inner", consumer.element().build()),
            ])
            .build(),
    );
    root.render(wrapped).expect("nested");
    assert_eq!(driver.text_content(container), "outerinner");
}

#[test]
fn parent_rerender_with_identical_child_element_is_silent() {
    let (driver, _container, root) = setup();
    let child_renders = Rc::new(Cell::new(0));
    let calls = child_renders.clone();
    let child = ComponentType::function("Child", move |_| {
        calls.set(calls.get() + 1);
        Ok(Element::native("b").child("static").build())
    });
    let child_element = child.element().build();
    let setter: Slot<StateSetter<i32>> = Rc::default();
    let slot = setter.clone();
    let parent = ComponentType::function("Parent", move |_| {
        let (_, set) = use_state(|| 0)?;
        *slot.borrow_mut() = Some(set);
        Ok(Element::native("div").child(child_element.clone()).build())
    });
    root.render(parent.element()).expect("mount");
    driver.clear_ops();

    taken(&setter).set(1).expect("set");
    assert_eq!(child_renders.get(), 1);
    assert!(driver.ops().is_empty());
}

#[test]
fn dirty_components_render_parent_first_and_once() {
    let (_driver, _container, root) = setup();
    let child_setter: Slot<StateSetter<i32>> = Rc::default();
    let parent_setter: Slot<StateSetter<i32>> = Rc::default();
    let slot = child_setter.clone();
    let child = ComponentType::function("Child", move |_| {
        let (n, set) = use_state(|| 0)?;
        *slot.borrow_mut() = Some(set);
        log(format!("child {n}"));
        Ok(Element::Empty)
    });
    let slot = parent_setter.clone();
    let parent = ComponentType::function("Parent", move |_| {
        let (n, set) = use_state(|| 0)?;
        *slot.borrow_mut() = Some(set);
        log(format!("parent {n}"));
        Ok(child.element().prop("n", n).build())
    });
    root.render(parent.element()).expect("mount");
    take_log();

    root.runtime()
        .batched_updates(|| {
            taken(&child_setter).set(1)?;
            taken(&parent_setter).set(1)
        })
        .expect("batch");
    assert_eq!(take_log(), ["parent 1", "child 1"]);
}

#[test]
fn replacing_a_composite_root_keeps_sibling_order() {
    let (driver, container, root) = setup();
    let setter: Slot<StateSetter<bool>> = Rc::default();
    let slot = setter.clone();
    let toggle = ComponentType::function("Toggle", move |_| {
        let (on, set) = use_state(|| false)?;
        *slot.borrow_mut() = Some(set);
        Ok(if on {
            Element::native("strong").child("on").build()
        } else {
            Element::native("em").child("off").build()
        })
    });
    root.render(Element::native("p").children([
        Element::native("i").child("a").build(),
        toggle.element().build(),
        Element::native("i").child("c").build(),
    ]))
    .expect("mount");
    let p = driver.children(container)[0];

    taken(&setter).set(true).expect("toggle");
    let tags: Vec<_> = driver
        .children(p)
        .into_iter()
        .filter_map(|node| driver.tag(node))
        .collect();
    assert_eq!(tags, ["i", "strong", "i"]);
    assert_eq!(driver.text_content(p), "aonc");
}

#[test]
fn keyed_reorder_preserves_component_state() {
    let (driver, container, root) = setup();
    let item = ComponentType::function("Item", |props| {
        let label = props.str("label").unwrap_or_default().to_owned();
        let initial = label.clone();
        let (first, _) = use_state(move || initial)?;
        Ok(Element::native("li").child(format!("{first}/{label};")).build())
    });
    let list = |entries: &[(&str, &str)]| {
        Element::native("ul")
            .children(entries.iter().map(|(key, label)| {
                item.element().key(*key).prop("label", *label).build()
            }))
            .build()
    };

    root.render(list(&[("a", "a"), ("b", "b")])).expect("mount");
    root.render(list(&[("b", "b2"), ("a", "a2")])).expect("reorder");
    assert_eq!(driver.text_content(container), "b/b2;a/a2;");
}

#[test]
fn event_handler_updates_state() {
    let (driver, container, root) = setup();
    let component = ComponentType::function("Clicker", |_| {
        let (count, set_count) = use_state(|| 0)?;
        Ok(Element::native("button")
            .on("click", move |_| {
                if let Err(err) = set_count.update(|n| n + 1) {
                    panic!("{err}");
                }
            })
            .child(count)
            .build())
    });
    root.render(component.element()).expect("mount");
    let button = driver.children(container)[0];

    assert_eq!(driver.dispatch(button, &Event::new("click")), 1);
    assert_eq!(driver.dispatch(button, &Event::new("click")), 1);
    assert_eq!(driver.text_content(container), "2");
    assert_eq!(driver.listener_count(button, "click"), 1);
}

struct Hooked;

impl Component for Hooked {
    fn render(&self, _props: &Props) -> RenderResult {
        use_state(|| 0)?;
        Ok(Element::Empty)
    }
}

#[test]
fn hooks_inside_class_render_fail() {
    let (_driver, _container, root) = setup();
    let component = ComponentType::class("Hooked", |_, _| Hooked);

    let err = root.render(component.element()).expect_err("class hooks");
    assert_eq!(err, RenderError::HookOutsideRender);
}
