use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

use std::sync::Arc;

use arbordb::common::types::Rid;
use arbordb::index::btree::BPlusTree;
use arbordb::storage::buffer::BufferPoolManager;
use arbordb::MemoryDiskManager;

fn create_tree(pool_size: usize) -> BPlusTree<i32> {
    let buffer_pool = Arc::new(BufferPoolManager::new(
        pool_size,
        Arc::new(MemoryDiskManager::new()),
    ));
    let header_page_id = buffer_pool.new_page();
    BPlusTree::with_default_sizes(buffer_pool, header_page_id)
}

fn btree_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BPlusTree");

    for size in [1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("sequential_insert", size), size, |b, &size| {
            b.iter(|| {
                let tree = create_tree(64);
                for key in 0..size {
                    tree.insert(key, Rid::new(key, 0));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("random_lookup", size), size, |b, &size| {
            let tree = create_tree(64);
            for key in 0..size {
                tree.insert(key, Rid::new(key, 0));
            }
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| {
                let key = rng.gen_range(0..size);
                tree.get_value(&key)
            });
        });

        group.bench_with_input(BenchmarkId::new("full_scan", size), size, |b, &size| {
            let tree = create_tree(64);
            for key in 0..size {
                tree.insert(key, Rid::new(key, 0));
            }
            b.iter(|| tree.begin().count());
        });
    }

    group.finish();
}

criterion_group!(benches, btree_benchmark);
criterion_main!(benches);
