// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use espalier_anchor::{Anchor, AnchorPoint, AnchorTarget, Tree, WidgetId};
use kurbo::{Rect, Size};

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u32() as usize) % upper_exclusive
    }
}

fn screen_tree() -> Tree {
    Tree::with_screen(Rect::new(0.0, 0.0, 1920.0, 1080.0))
}

/// `n` widgets chained corner to corner, each depending on the previous.
fn build_chain(n: usize) -> Tree {
    let mut tree = screen_tree();
    let root = tree.insert(None);
    tree.set_anchor(
        root,
        Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
    )
    .expect("screen anchors never cycle");
    tree.set_size(root, Size::new(4.0, 4.0));
    let mut prev = root;
    for _ in 1..n {
        let id = tree.insert(None);
        tree.set_anchor(
            id,
            Anchor::abs(AnchorPoint::TopLeft, prev, AnchorPoint::BottomRight),
        )
        .expect("forward chain never cycles");
        tree.set_size(id, Size::new(4.0, 4.0));
        prev = id;
    }
    tree
}

/// One hub with `n` dependents scattered around it.
fn build_fanout(n: usize, seed: u64) -> (Tree, WidgetId) {
    let mut tree = screen_tree();
    let mut rng = Lcg::new(seed);
    let hub = tree.insert(None);
    tree.set_anchor(
        hub,
        Anchor::abs(AnchorPoint::Center, AnchorTarget::Screen, AnchorPoint::Center),
    )
    .expect("screen anchors never cycle");
    tree.set_size(hub, Size::new(400.0, 300.0));
    for _ in 0..n {
        let id = tree.insert(None);
        let dx = rng.gen_range_usize(800) as f64 - 400.0;
        let dy = rng.gen_range_usize(600) as f64 - 300.0;
        tree.set_anchor(
            id,
            Anchor::abs(AnchorPoint::TopLeft, hub, AnchorPoint::Center).with_offset(dx, dy),
        )
        .expect("hub dependents never cycle");
        tree.set_size(id, Size::new(16.0, 16.0));
    }
    (tree, hub)
}

/// `groups` independent panels, each carrying `per_group` widgets anchored
/// inside it. Approximates a window-per-dialog UI.
fn build_groups(groups: usize, per_group: usize) -> (Tree, Vec<WidgetId>) {
    let mut tree = screen_tree();
    let mut panels = Vec::with_capacity(groups);
    for g in 0..groups {
        let panel = tree.insert(None);
        let x = (g % 8) as f64 * 240.0;
        let y = (g / 8) as f64 * 135.0;
        tree.set_anchor(
            panel,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft)
                .with_offset(x, y),
        )
        .expect("screen anchors never cycle");
        tree.set_size(panel, Size::new(220.0, 120.0));
        for i in 0..per_group {
            let id = tree.insert(Some(panel));
            tree.set_anchor(
                id,
                Anchor::abs(AnchorPoint::TopLeft, panel, AnchorPoint::TopLeft)
                    .with_offset(8.0, 14.0 * i as f64),
            )
            .expect("panel children never cycle");
            tree.set_size(id, Size::new(180.0, 12.0));
        }
        panels.push(panel);
    }
    (tree, panels)
}

fn bench_anchors(c: &mut Criterion) {
    let mut group = c.benchmark_group("espalier_anchor");
    group.sample_size(50);

    for &n in &[256_usize, 1_024] {
        group.bench_function(format!("resolve_all(chain n={n})"), |b| {
            b.iter_batched(
                || build_chain(n),
                |mut tree| {
                    tree.resolve_all();
                    black_box(tree.take_redraws().len());
                },
                BatchSize::LargeInput,
            );
        });
    }

    for &n in &[256_usize, 4_096] {
        group.bench_function(format!("invalidate_and_reresolve(fanout n={n})"), |b| {
            b.iter_batched(
                || {
                    let (mut tree, hub) = build_fanout(n, 0xE5_7A11_E500_0001);
                    tree.resolve_all();
                    tree.take_redraws();
                    (tree, hub)
                },
                |(mut tree, hub)| {
                    tree.set_size(hub, Size::new(420.0, 310.0));
                    black_box(tree.take_redraws().len());
                    tree.resolve_all();
                    black_box(tree);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("remove_hub(fanout n={n})"), |b| {
            b.iter_batched(
                || {
                    let (mut tree, hub) = build_fanout(n, 0xE5_7A11_E500_0002);
                    tree.resolve_all();
                    (tree, hub)
                },
                |(mut tree, hub)| {
                    tree.remove(hub);
                    tree.resolve_all();
                    black_box(tree);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.bench_function("reanchor_one_group(groups=64,per=8)", |b| {
        b.iter_batched(
            || {
                let (mut tree, panels) = build_groups(64, 8);
                tree.resolve_all();
                tree.take_redraws();
                (tree, panels)
            },
            |(mut tree, panels)| {
                // Move one panel; only its group should recompute.
                let panel = panels[panels.len() / 2];
                tree.set_anchor(
                    panel,
                    Anchor::abs(
                        AnchorPoint::TopLeft,
                        AnchorTarget::Screen,
                        AnchorPoint::TopLeft,
                    )
                    .with_offset(33.0, 77.0),
                )
                .expect("screen anchors never cycle");
                tree.resolve_all();
                black_box(tree.take_redraws().len());
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_anchors);
criterion_main!(benches);
