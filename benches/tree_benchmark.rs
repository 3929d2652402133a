use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use madrone::Madrone;
use rand::prelude::*;
use rbtree::RBTree;
use std::collections::BTreeSet;
use std::hint::black_box;
use std::ops::Range;

fn bench_baseline_multi_insertions(data: Vec<usize>) {
    let mut tree = BTreeSet::new();

    for i in data {
        tree.insert(i);
    }
}

fn bench_rbtree_multi_insertions(data: Vec<usize>) {
    let mut tree = RBTree::new();

    for i in data {
        tree.insert(i, ());
    }
}

fn bench_multi_insertions(data: Vec<usize>) {
    let mut tree = Madrone::new();

    for i in data {
        tree.insert(i);
    }
}

fn bench_multi_insertions_hint(data: Vec<usize>) {
    let mut tree = Madrone::new();
    tree.reserve(data.len());

    for i in data {
        tree.insert(i);
    }
}

fn init_large_btree() -> BTreeSet<usize> {
    let mut tree = BTreeSet::new();

    for i in random_insertion_order() {
        tree.insert(i);
    }

    tree
}

fn init_large_rbtree() -> RBTree<usize, ()> {
    let mut tree = RBTree::new();

    for i in random_insertion_order() {
        tree.insert(i, ());
    }

    tree
}

fn init_large_madrone_tree() -> Madrone<usize> {
    let mut tree = Madrone::new();

    for i in random_insertion_order() {
        tree.insert(i);
    }

    tree
}

fn random_insertion_order() -> Vec<usize> {
    let mut rng = rand::thread_rng();
    let mut indices: Vec<usize> = (0..100000).collect();

    indices.shuffle(&mut rng);

    indices
}

fn init_random_data(count: usize, range_opt: Option<Range<usize>>) -> Vec<usize> {
    let mut rng = rand::thread_rng();
    let range = range_opt.unwrap_or(0..100000);
    let range = rand::distributions::Uniform::new(range.start, range.end);

    let indices: Vec<usize> = (0..count).map(|_| rng.sample(&range)).collect();

    indices
}

fn bench_baseline_random_lookups(tree: BTreeSet<usize>, indices: Vec<usize>) {
    for idx in indices {
        assert!(tree.contains(&idx));
    }
}

fn bench_rbtree_random_lookups(tree: RBTree<usize, ()>, indices: Vec<usize>) {
    for idx in indices {
        assert!(tree.get(&idx).is_some());
    }
}

fn bench_random_lookups(tree: Madrone<usize>, indices: Vec<usize>) {
    for idx in indices {
        assert!(tree.contains(&idx));
    }
}

fn bench_random_bound_queries(tree: Madrone<usize>, indices: Vec<usize>) {
    for idx in indices {
        black_box(tree.lower_bound(&idx));
        black_box(tree.upper_bound(&idx));
    }
}

fn inorder_iteration_btree(tree: BTreeSet<usize>) {
    for (i, &elem) in tree.iter().enumerate() {
        assert_eq!(i, elem);
    }
}

fn inorder_iteration(tree: Madrone<usize>) {
    for (i, &elem) in tree.iter().enumerate() {
        assert_eq!(i, elem);
    }
}

fn madrone_tree_benchmark(c: &mut Criterion) {
    c.bench_function("baseline tree 100K insertions", |b| {
        b.iter_batched(
            || random_insertion_order(),
            |order| bench_baseline_multi_insertions(order),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("rbtree crate 100K insertions", |b| {
        b.iter_batched(
            || random_insertion_order(),
            |order| bench_rbtree_multi_insertions(order),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("tree 100K insertions", |b| {
        b.iter_batched(
            || random_insertion_order(),
            |order| bench_multi_insertions(order),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("tree 100K insertions with size hint", |b| {
        b.iter_batched(
            || random_insertion_order(),
            |order| bench_multi_insertions_hint(order),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("baseline tree random lookups", |b| {
        b.iter_batched(
            || (init_large_btree(), init_random_data(5000, None)),
            |(tree, indices)| bench_baseline_random_lookups(tree, indices),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("rbtree crate random lookups", |b| {
        b.iter_batched(
            || (init_large_rbtree(), init_random_data(5000, None)),
            |(tree, indices)| bench_rbtree_random_lookups(tree, indices),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("tree random lookups", |b| {
        b.iter_batched(
            || (init_large_madrone_tree(), init_random_data(5000, None)),
            |(tree, indices)| bench_random_lookups(tree, indices),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("tree random bound queries", |b| {
        b.iter_batched(
            || (init_large_madrone_tree(), init_random_data(5000, None)),
            |(tree, indices)| bench_random_bound_queries(tree, indices),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("tree inorder iteration", |b| {
        b.iter_batched(
            || init_large_madrone_tree(),
            |tree| inorder_iteration(tree),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("baseline tree inorder iteration", |b| {
        b.iter_batched(
            || init_large_btree(),
            |tree| inorder_iteration_btree(tree),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, madrone_tree_benchmark);
criterion_main!(benches);
