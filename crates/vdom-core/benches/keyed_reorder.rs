use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vdom_core::{DefaultScheduler, Element, MemoryDriver, Root, Runtime};

const LIST_SIZES: &[usize] = &[16, 128, 1024];

fn row(key: usize) -> Element {
    Element::native("li")
        .key(key.to_string())
        .prop("data-row", key as f64)
        .child(format!("Row {key}"))
        .build()
}

fn list(keys: impl IntoIterator<Item = usize>) -> Element {
    Element::native("ul").children(keys.into_iter().map(row)).build()
}

struct ListFixture {
    driver: MemoryDriver,
    root: Root,
    size: usize,
}

impl ListFixture {
    fn new(size: usize) -> Self {
        let driver = MemoryDriver::new();
        let container = driver.create_container("root");
        let runtime = Runtime::new(driver.clone(), Arc::new(DefaultScheduler));
        let root = Root::new(runtime, container);
        root.render(list(0..size)).expect("mount");
        driver.clear_ops();
        Self { driver, root, size }
    }

    fn reverse(&self) {
        self.root.render(list((0..self.size).rev())).expect("reverse");
        self.root.render(list(0..self.size)).expect("restore");
        self.driver.clear_ops();
    }

    fn rotate(&self) {
        let size = self.size;
        self.root
            .render(list((0..size).map(|i| (i + 1) % size)))
            .expect("rotate");
        self.root.render(list(0..size)).expect("restore");
        self.driver.clear_ops();
    }
}

fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("mount");
    for &size in LIST_SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| black_box(ListFixture::new(size)));
        });
    }
    group.finish();
}

fn bench_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_reorder");
    for &size in LIST_SIZES {
        let fixture = ListFixture::new(size);
        group.bench_with_input(BenchmarkId::new("reverse", size), &size, |b, _| {
            b.iter(|| fixture.reverse());
        });
        group.bench_with_input(BenchmarkId::new("rotate", size), &size, |b, _| {
            b.iter(|| fixture.rotate());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mount, bench_reorder);
criterion_main!(benches);
