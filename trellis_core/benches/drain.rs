// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drain throughput on cold and warm trees.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kurbo::Size;
use trellis_core::backend::Color;
use trellis_core::config::RenderConfig;
use trellis_core::measure::{Axis, Measure};
use trellis_core::node::NodeId;
use trellis_core::tree::LayoutTree;
use trellis_core::widget::{Panel, Stack};

const ROW_COUNTS: &[usize] = &[16, 128, 1024];
const CELLS_PER_ROW: usize = 8;
const SURFACE: Size = Size::new(1920.0, 1080.0);

/// A vertical stack of horizontal stacks of fixed and stretched panels.
fn build(rows: usize) -> (LayoutTree, Vec<NodeId>) {
    let mut tree = LayoutTree::new(SURFACE);
    let root = tree.root();
    let column = tree.create_node(Stack::vertical());
    tree.add_child(root, column).unwrap();
    let mut cells = Vec::with_capacity(rows * CELLS_PER_ROW);
    for _ in 0..rows {
        let row = tree.create_node(Stack::horizontal());
        tree.set_height(row, Measure::Fit);
        tree.add_child(column, row).unwrap();
        for c in 0..CELLS_PER_ROW {
            let cell = tree.create_node(Panel::new(Color::WHITE));
            if c % 2 == 0 {
                tree.set_width(cell, Measure::Fixed(40.0));
            } else {
                tree.set_width(cell, Measure::Stretch);
            }
            tree.set_height(cell, Measure::Fixed(12.0));
            tree.add_child(row, cell).unwrap();
            cells.push(cell);
        }
    }
    (tree, cells)
}

fn bench_cold_drain(c: &mut Criterion) {
    let config = RenderConfig::default();
    let mut group = c.benchmark_group("cold_drain");
    for &rows in ROW_COUNTS {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter_batched(
                || build(rows).0,
                |mut tree| black_box(tree.drain(&config)),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_single_resize(c: &mut Criterion) {
    let config = RenderConfig::default();
    let mut group = c.benchmark_group("single_cell_resize");
    for &rows in ROW_COUNTS {
        let (mut tree, cells) = build(rows);
        tree.drain(&config);
        let target = cells[cells.len() / 2];
        let mut wide = false;
        group.bench_function(BenchmarkId::from_parameter(rows), |b| {
            b.iter(|| {
                wide = !wide;
                let w = if wide { 60.0 } else { 40.0 };
                tree.set_measure(target, Axis::Horizontal, Measure::Fixed(w));
                black_box(tree.drain(&config));
                tree.process_clipping();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cold_drain, bench_single_resize);
criterion_main!(benches);
