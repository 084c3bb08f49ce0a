//! Planner benchmarks for performance profiling.
//!
//! Run with: `cargo bench -p mcts`
//!
//! These benchmarks measure:
//! - Full planning calls at varying iteration budgets, for both variants
//! - Tree operations (insertion, UCB selection) in isolation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mcts::{
    DpwConfig, DpwPlanner, MctsConfig, MctsPlanner, NextAction, RandomRollout, StateActionNode,
    StateNode, ValueEstimate, VanillaTree,
};
use mdps_gridworld::{GridPos, GridWorld, Move};
use rand::Rng;
use rand_chacha::ChaCha20Rng;

fn bench_vanilla_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("vanilla_search");

    for iters in [32u32, 128, 512] {
        group.throughput(Throughput::Elements(u64::from(iters)));
        group.bench_with_input(BenchmarkId::new("rollout", iters), &iters, |b, &iters| {
            let world = GridWorld::ten_by_ten().with_slip(0.1);
            let config = MctsConfig::default().with_iterations(iters).with_depth(20);

            b.iter(|| {
                let mut planner = MctsPlanner::new(config.clone(), 42)
                    .unwrap()
                    .with_estimator(ValueEstimate::rollout(RandomRollout));
                black_box(planner.action(&world, &GridPos::new(5, 1)).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_dpw_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("dpw_search");

    for iters in [32u32, 128, 512] {
        group.throughput(Throughput::Elements(u64::from(iters)));
        group.bench_with_input(BenchmarkId::new("uniform", iters), &iters, |b, &iters| {
            let world = GridWorld::ten_by_ten().with_slip(0.1);
            let config = DpwConfig::default()
                .with_iterations(iters)
                .with_depth(20)
                .with_action_widening(2.0, 0.5)
                .with_state_widening(2.0, 0.5);

            b.iter(|| {
                let mut planner = DpwPlanner::new(config.clone(), 42)
                    .unwrap()
                    .with_next_action(NextAction::from_fn(
                        |_w: &GridWorld, _s, _node, rng: &mut ChaCha20Rng| {
                            Move::ALL[rng.gen_range(0..Move::ALL.len())]
                        },
                    ));
                black_box(planner.action(&world, &GridPos::new(5, 1)).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_tree_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_ops");

    group.bench_function("insert_100_nodes", |b| {
        b.iter(|| {
            let mut tree: VanillaTree<GridWorld> = VanillaTree::new();
            for i in 0..100u32 {
                let children = Move::ALL
                    .iter()
                    .map(|&m| StateActionNode::new(m, 0, 0.0))
                    .collect();
                tree.insert(GridPos::new(i % 10 + 1, i / 10 + 1), StateNode::new(children));
            }
            black_box(tree.len())
        });
    });

    group.bench_function("select_ucb", |b| {
        let mut tree: VanillaTree<GridWorld> = VanillaTree::new();
        let children = Move::ALL
            .iter()
            .map(|&m| StateActionNode::new(m, 0, 0.0))
            .collect();
        let id = tree.insert(GridPos::new(1, 1), StateNode::new(children));

        // Seed realistic statistics through the backup path.
        for round in 0..100u32 {
            let node = tree.get_mut(id);
            node.total_n += 1;
            let idx = (round % 4) as usize;
            node.children[idx].record(f64::from(round % 7));
        }

        b.iter(|| black_box(tree.select_ucb(id, 1.0)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_vanilla_iterations,
    bench_dpw_iterations,
    bench_tree_operations,
);

criterion_main!(benches);
