use anyhow::Result;

use arbordb::common::types::{Rid, INVALID_PAGE_ID};
use arbordb::index::btree::node::{page_is_leaf, InternalPage, LeafPage};
use arbordb::index::btree::BPlusTree;
use arbordb::storage::buffer::BufferPoolManager;

use std::sync::Arc;

mod common;
use common::{create_file_buffer_pool, create_memory_buffer_pool};

fn create_tree(
    buffer_pool: &Arc<BufferPoolManager>,
    leaf_max: usize,
    internal_max: usize,
) -> BPlusTree<i32> {
    let header_page_id = buffer_pool.new_page();
    BPlusTree::new(Arc::clone(buffer_pool), header_page_id, leaf_max, internal_max)
}

/// Walk the leaf chain from the leftmost leaf and return how many leaves
/// it holds.
fn count_leaves(buffer_pool: &Arc<BufferPoolManager>, tree: &BPlusTree<i32>) -> usize {
    let mut page_id = tree.root_page_id();
    if page_id == INVALID_PAGE_ID {
        return 0;
    }
    loop {
        let guard = buffer_pool.read_page(page_id);
        if page_is_leaf(guard.data()) {
            break;
        }
        page_id = InternalPage::<_, i32>::new(guard.data()).child_at(0);
    }
    let mut count = 0;
    while page_id != INVALID_PAGE_ID {
        let guard = buffer_pool.read_page(page_id);
        count += 1;
        page_id = LeafPage::<_, i32>::new(guard.data()).next_page_id();
    }
    count
}

#[test]
fn test_empty_tree() {
    let buffer_pool = create_memory_buffer_pool(16);
    let tree = create_tree(&buffer_pool, 4, 4);

    assert!(tree.is_empty());
    assert_eq!(tree.root_page_id(), INVALID_PAGE_ID);
    assert_eq!(tree.get_value(&1), None);
    assert!(tree.begin().is_end());
    assert_eq!(tree.begin().next(), None);
}

#[test]
fn test_small_tree_mixed_insert_order() {
    let buffer_pool = create_memory_buffer_pool(64);
    let tree = create_tree(&buffer_pool, 4, 4);

    let keys = [
        12, 6, 18, 3, 9, 15, 21, 1, 4, 7, 10, 13, 16, 19, 22, 2, 5, 8, 11, 14, 17, 20, 23, 24,
    ];
    for &key in &keys {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }

    let collected: Vec<i32> = tree.begin().map(|(k, _)| k).collect();
    let expected: Vec<i32> = (1..=24).collect();
    assert_eq!(collected, expected);

    assert_eq!(tree.get_value(&13), Some(Rid::new(13, 0)));
    assert_eq!(tree.get_value(&25), None);
}

#[test]
fn test_leaf_split_preserves_chain() {
    let buffer_pool = create_memory_buffer_pool(64);
    let tree = create_tree(&buffer_pool, 32, 32);

    for key in 0..40 {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }

    let collected: Vec<i32> = tree.begin().map(|(k, _)| k).collect();
    let expected: Vec<i32> = (0..40).collect();
    assert_eq!(collected, expected);

    assert_eq!(tree.get_value(&33), Some(Rid::new(33, 0)));
    assert!(count_leaves(&buffer_pool, &tree) >= 2);

    // The root became an internal page once the first leaf split.
    let root_guard = buffer_pool.read_page(tree.root_page_id());
    assert!(!page_is_leaf(root_guard.data()));
}

#[test]
fn test_duplicate_insert_is_rejected() {
    let buffer_pool = create_memory_buffer_pool(64);
    let tree = create_tree(&buffer_pool, 4, 4);

    for key in 0..20 {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }
    let before: Vec<(i32, Rid)> = tree.begin().collect();

    assert!(!tree.insert(7, Rid::new(999, 9)));

    let after: Vec<(i32, Rid)> = tree.begin().collect();
    assert_eq!(before, after);
    assert_eq!(tree.get_value(&7), Some(Rid::new(7, 0)));
}

#[test]
fn test_remove_with_redistribute_and_merge() {
    let buffer_pool = create_memory_buffer_pool(128);
    let tree = create_tree(&buffer_pool, 4, 4);

    for key in 0..50 {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }
    for key in 10..20 {
        tree.remove(&key);
    }

    let collected: Vec<i32> = tree.begin().map(|(k, _)| k).collect();
    let expected: Vec<i32> = (0..10).chain(20..50).collect();
    assert_eq!(collected, expected);
    assert_eq!(collected.len(), 40);

    assert_eq!(tree.get_value(&15), None);
    assert_eq!(tree.get_value(&9), Some(Rid::new(9, 0)));
    assert_eq!(tree.get_value(&20), Some(Rid::new(20, 0)));

    // Removing an absent key is a no-op.
    tree.remove(&15);
    assert_eq!(tree.begin().count(), 40);
}

#[test]
fn test_delete_all_clears_root() {
    let buffer_pool = create_memory_buffer_pool(128);
    let tree = create_tree(&buffer_pool, 4, 4);

    for key in 0..30 {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }
    for key in 0..30 {
        tree.remove(&key);
    }

    assert_eq!(tree.root_page_id(), INVALID_PAGE_ID);
    assert!(tree.is_empty());
    assert_eq!(tree.get_value(&5), None);
    assert_eq!(tree.begin().next(), None);

    // The tree grows a fresh root afterwards.
    assert!(tree.insert(3, Rid::new(3, 0)));
    assert_eq!(tree.get_value(&3), Some(Rid::new(3, 0)));
}

#[test]
fn test_remove_in_reverse_order() {
    let buffer_pool = create_memory_buffer_pool(128);
    let tree = create_tree(&buffer_pool, 4, 4);

    for key in 0..40 {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }
    for key in (20..40).rev() {
        tree.remove(&key);
    }

    let collected: Vec<i32> = tree.begin().map(|(k, _)| k).collect();
    let expected: Vec<i32> = (0..20).collect();
    assert_eq!(collected, expected);
}

#[test]
fn test_begin_at_positions_iterator() {
    let buffer_pool = create_memory_buffer_pool(64);
    let tree = create_tree(&buffer_pool, 4, 4);

    for key in (0..40).step_by(2) {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }

    // Exact hit.
    let from_ten: Vec<i32> = tree.begin_at(&10).map(|(k, _)| k).collect();
    let expected: Vec<i32> = (10..40).step_by(2).collect();
    assert_eq!(from_ten, expected);

    // Absent key: starts at the next greater key.
    let from_eleven: Vec<i32> = tree.begin_at(&11).map(|(k, _)| k).collect();
    let expected: Vec<i32> = (12..40).step_by(2).collect();
    assert_eq!(from_eleven, expected);

    // Past the greatest key.
    assert_eq!(tree.begin_at(&100).next(), None);
}

#[test]
fn test_end_iterator_is_terminal() {
    let buffer_pool = create_memory_buffer_pool(64);
    let tree = create_tree(&buffer_pool, 4, 4);

    for key in 0..10 {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }

    let mut end = tree.end();
    assert!(end.is_end());
    assert_eq!(end.next(), None);
}

#[test]
fn test_interleaved_insert_remove_round_trip() {
    let buffer_pool = create_memory_buffer_pool(256);
    let tree = create_tree(&buffer_pool, 4, 4);

    // Deterministic pseudo-shuffle of 0..200.
    let keys: Vec<i32> = (0..200).map(|i| (i * 73) % 200).collect();
    for &key in &keys {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }
    // Remove every third key.
    for &key in keys.iter().filter(|k| *k % 3 == 0) {
        tree.remove(&key);
    }

    for key in 0..200 {
        let expected = if key % 3 == 0 {
            None
        } else {
            Some(Rid::new(key, 0))
        };
        assert_eq!(tree.get_value(&key), expected, "key {}", key);
    }

    let collected: Vec<i32> = tree.begin().map(|(k, _)| k).collect();
    let expected: Vec<i32> = (0..200).filter(|k| k % 3 != 0).collect();
    assert_eq!(collected, expected);
}

#[test]
fn test_default_sizes_hold_thousands_of_keys() {
    let buffer_pool = create_memory_buffer_pool(64);
    let header_page_id = buffer_pool.new_page();
    let tree: BPlusTree<i32> = BPlusTree::with_default_sizes(Arc::clone(&buffer_pool), header_page_id);

    for key in 0..5000 {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }
    assert_eq!(tree.begin().count(), 5000);
    assert_eq!(tree.get_value(&4999), Some(Rid::new(4999, 0)));
}

#[test]
fn test_tree_under_eviction_pressure() -> Result<()> {
    // A pool far smaller than the tree forces faulting through the file
    // backend on nearly every descent.
    let (buffer_pool, _db_file) = create_file_buffer_pool(8)?;
    let tree = create_tree(&buffer_pool, 16, 16);

    for key in 0..500 {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }
    for key in 0..500 {
        assert_eq!(tree.get_value(&key), Some(Rid::new(key, 0)), "key {}", key);
    }
    assert!(buffer_pool.disk_writes() > 0);
    assert!(buffer_pool.cache_misses() > 0);

    let collected: Vec<i32> = tree.begin().map(|(k, _)| k).collect();
    let expected: Vec<i32> = (0..500).collect();
    assert_eq!(collected, expected);
    Ok(())
}

#[test]
fn test_dump_renders_structure() {
    let buffer_pool = create_memory_buffer_pool(64);
    let tree = create_tree(&buffer_pool, 4, 4);

    assert_eq!(tree.dump(), "(empty tree)");

    for key in 0..10 {
        assert!(tree.insert(key, Rid::new(key, 0)));
    }
    let rendering = tree.dump();
    assert!(rendering.contains("node"));
    assert!(rendering.contains("leaf"));
}
