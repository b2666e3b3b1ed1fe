//! End-to-end checks of the reconciler's observable guarantees, driven
//! through the `TestRoot` harness.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vdom_testing::prelude::*;

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(event: impl Into<String>) {
    EVENTS.with(|events| events.borrow_mut().push(event.into()));
}

fn drain_events() -> Vec<String> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

fn row(key: &str) -> Element {
    Element::native("li")
        .key(key)
        .prop("id", key)
        .child(key.to_owned())
        .build()
}

fn rows(keys: &[&str]) -> Element {
    Element::native("ul")
        .children(keys.iter().map(|key| row(key)))
        .build()
}

fn row_ids(root: &TestRoot) -> Vec<String> {
    let list = root.children()[0];
    root.driver()
        .children(list)
        .into_iter()
        .map(|node| root.driver().text_content(node))
        .collect()
}

#[test]
fn identical_rerender_makes_no_host_calls() {
    let root = TestRoot::new();
    let tree = Element::native("div")
        .prop("title", "t")
        .style(style([("color", "red")]))
        .on("click", |_| {})
        .children([rows(&["a", "b"]), Element::text("tail")])
        .build();
    root.render(tree.clone()).expect("mount");

    let ops = root.render_ops(tree).expect("rerender");
    assert!(ops.is_empty(), "unexpected ops: {ops:?}");
}

#[test]
fn keyed_reorder_only_moves_nodes() {
    let root = TestRoot::new();
    root.render(rows(&["a", "b", "c", "d"])).expect("mount");
    let before = root.driver().node_count();

    let ops = root.render_ops(rows(&["d", "c", "b", "a"])).expect("reorder");
    assert!(!ops.is_empty());
    assert!(ops.iter().all(HostOp::is_move), "unexpected ops: {ops:?}");
    assert_eq!(root.driver().node_count(), before);
    assert_eq!(row_ids(&root), ["d", "c", "b", "a"]);
}

#[test]
fn keyed_reorder_keeps_hook_state() {
    let root = TestRoot::new();
    let mounts = Rc::new(Cell::new(0));
    let counter = mounts.clone();
    let item = ComponentType::function("Item", move |props| {
        let counter = counter.clone();
        let serial = use_memo(
            move || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            Deps::once(),
        )?;
        let name = props.str("name").unwrap_or_default().to_owned();
        Ok(Element::native("li").child(format!("{name}#{serial}")).build())
    });
    let list = |names: &[&str]| {
        Element::native("ul")
            .children(
                names
                    .iter()
                    .map(|name| item.element().key(*name).prop("name", *name).build()),
            )
            .build()
    };

    root.render(list(&["x", "y", "z"])).expect("mount");
    root.render(list(&["z", "x", "y"])).expect("reorder");

    assert_eq!(mounts.get(), 3);
    assert_eq!(row_ids(&root), ["z#3", "x#1", "y#2"]);
}

#[test]
fn style_change_is_one_delta_call() {
    let root = TestRoot::new();
    let styled = |entries: Vec<(&str, i32)>| {
        Element::native("div").style(style(entries)).build()
    };
    root.render(styled(vec![("a", 1), ("b", 2)])).expect("mount");

    let ops = root
        .render_ops(styled(vec![("a", 1), ("c", 3)]))
        .expect("restyle");
    let styles: Vec<_> = ops
        .iter()
        .filter_map(|op| match op {
            HostOp::SetStyle { style, .. } => Some(style.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        styles,
        [vec![("b".to_owned(), String::new()), ("c".to_owned(), "3".to_owned())]]
    );
}

#[test]
fn handler_change_removes_old_then_adds_new() {
    let root = TestRoot::new();
    let f = EventHandler::new(|_| record("f"));
    let g = EventHandler::new(|_| record("g"));
    root.render(Element::native("button").handler("click", f.clone()))
        .expect("mount");

    let ops = root
        .render_ops(Element::native("button").handler("click", g.clone()))
        .expect("swap");
    let listener_ops: Vec<_> = ops
        .iter()
        .filter_map(|op| match op {
            HostOp::RemoveEventListener { handler, .. } => Some(("remove", *handler)),
            HostOp::AddEventListener { handler, .. } => Some(("add", *handler)),
            _ => None,
        })
        .collect();
    assert_eq!(listener_ops, [("remove", f.id()), ("add", g.id())]);

    drain_events();
    let button = root.children()[0];
    root.driver().dispatch(button, &Event::new("click"));
    assert_eq!(drain_events(), ["g"]);
}

#[test]
fn equal_state_does_not_schedule() {
    let root = TestRoot::new();
    let renders = Rc::new(Cell::new(0));
    let setter: Rc<RefCell<Option<StateSetter<String>>>> = Rc::default();
    let (calls, slot) = (renders.clone(), setter.clone());
    let component = ComponentType::function("Name", move |_| {
        calls.set(calls.get() + 1);
        let (name, set_name) = use_state(|| "ada".to_owned())?;
        *slot.borrow_mut() = Some(set_name);
        Ok(Element::from(name))
    });
    root.render(component.element()).expect("mount");

    let set_name = setter.borrow().clone().expect("setter");
    set_name.set("ada".to_owned()).expect("same");
    assert_eq!(renders.get(), 1);
    set_name.set("grace".to_owned()).expect("changed");
    assert_eq!(renders.get(), 2);
    assert_eq!(root.text(), "grace");
}

#[derive(Clone, Copy)]
enum Step {
    Add(i32),
    Keep,
}

#[test]
fn reducer_eager_bail_out_schedule_and_drain() {
    let root = TestRoot::new();
    let renders = Rc::new(Cell::new(0));
    let dispatch: Rc<RefCell<Option<Dispatch<Step>>>> = Rc::default();
    let (calls, slot) = (renders.clone(), dispatch.clone());
    let component = ComponentType::function("Total", move |props| {
        calls.set(calls.get() + 1);
        let (total, dispatch) = use_reducer(
            |total: &i32, step: &Step| match step {
                Step::Add(n) => total + n,
                Step::Keep => *total,
            },
            0,
        )?;
        *slot.borrow_mut() = Some(dispatch);
        let rev = props.number("rev").unwrap_or_default();
        Ok(Element::from(format!("{total}@{rev}")))
    });
    root.render(component.element().prop("rev", 0)).expect("mount");
    let dispatch = dispatch.borrow().clone().expect("dispatch");

    dispatch.dispatch(Step::Keep).expect("bail out");
    assert_eq!(renders.get(), 1);

    dispatch.dispatch(Step::Add(5)).expect("eager");
    assert_eq!(renders.get(), 2);
    assert_eq!(root.text(), "5@0");

    root.render(component.element().prop("rev", 1)).expect("rerender");
    assert_eq!(root.text(), "5@1");
}

#[test]
fn layout_effect_runs_in_mount_and_deferred_effect_waits() {
    let root = TestRoot::new();
    let component = ComponentType::function("Effects", |props| {
        let n = props.number("n").unwrap_or_default();
        record(format!("render {n}"));
        use_layout_effect(
            || {
                record("layout");
                Cleanup::none()
            },
            Deps::once(),
        )?;
        use_effect(
            || {
                record("passive");
                Cleanup::none()
            },
            Deps::once(),
        )?;
        Ok(Element::Empty)
    });
    drain_events();

    root.render(component.element().prop("n", 1)).expect("mount");
    assert_eq!(drain_events(), ["render 1", "layout"]);
    assert!(root.has_pending_effects());
    assert_eq!(root.scheduler().requests(), 1);

    root.render(component.element().prop("n", 2)).expect("update");
    assert_eq!(drain_events(), ["passive", "render 2"]);
}

#[test]
fn destroy_runs_once_when_unmounted_before_flush() {
    let root = TestRoot::new();
    let creates = Rc::new(Cell::new(0));
    let destroys = Rc::new(Cell::new(0));
    let (c, d) = (creates.clone(), destroys.clone());
    let component = ComponentType::function("Subscription", move |_| {
        let (c, d) = (c.clone(), d.clone());
        use_effect(
            move || {
                c.set(c.get() + 1);
                Cleanup::new(move || d.set(d.get() + 1))
            },
            Deps::once(),
        )?;
        Ok(Element::Empty)
    });

    root.render(component.element()).expect("mount");
    root.unmount().expect("unmount");
    root.flush_effects();
    root.flush_effects();

    assert_eq!(creates.get(), 1);
    assert_eq!(destroys.get(), 1);
    assert!(root.children().is_empty());
}

#[test]
fn bulk_and_individual_removal_end_in_the_same_tree() {
    let tree = |keys: &[&str]| {
        Element::native("section")
            .children([rows(keys), Element::native("footer").child("end").build()])
            .build()
    };
    let individual = TestRoot::new();
    let bulk = TestRoot::with_driver(
        MemoryDriver::new().with_bulk_removal(true),
        RuntimeConfig::default(),
    );

    for root in [&individual, &bulk] {
        root.render(tree(&["a", "b", "c"])).expect("mount");
        root.render(tree(&[])).expect("clear");
    }

    assert_eq!(individual.dump(), bulk.dump());
    assert!(bulk
        .driver()
        .ops()
        .iter()
        .any(|op| matches!(op, HostOp::RemoveChildren { .. })));
}
