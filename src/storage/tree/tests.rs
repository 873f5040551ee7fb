use std::collections::BTreeMap;
use std::ops::Bound;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{Tree, Violation};
use crate::test_util;

fn keys(tree: &Tree<u32, u32>) -> Vec<u32> { tree.iter().map(|(key, _)| key).collect() }

fn leaf_count(tree: &Tree<u32, u32>) -> usize {
    let mut count = 0;
    let mut leaf = tree.leftmost_leaf();
    while let Some(id) = leaf {
        count += 1;
        leaf = tree.leaf(id).next;
    }
    count
}

fn ascending(order: usize, keys: impl IntoIterator<Item = u32>) -> Tree<u32, u32> {
    let mut tree = Tree::new(order);
    for key in keys {
        assert_eq!(tree.insert(key, key * 10), None);
    }
    tree
}

#[test]
fn test_empty() {
    let mut tree = Tree::<u32, u32>::new(5);
    assert_eq!(tree.get(&1), None);
    assert_eq!(tree.get_mut(&1), None);
    assert_eq!(tree.remove(&1), None);
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.height(), 0);
    assert_eq!(tree.leftmost_leaf(), None);
    assert_eq!(tree.first_key(), None);
    assert_eq!(tree.iter().next(), None);
    assert_eq!(tree.range(3..).next(), None);
    assert_eq!(tree.leaves().to_string(), "(empty)");
    assert_eq!(tree.check(), Ok(()));
}

#[test]
fn test_first_insert_creates_root_leaf() {
    let tree = ascending(5, [42]);
    assert_eq!(tree.height(), 1);
    assert_eq!(tree.get(&42), Some(420));
    assert_eq!(tree.leaves().to_string(), "[42]");
}

#[test]
#[should_panic = "Tree order 2 is smaller than 3"]
fn test_order_too_small() { Tree::<u32, u32>::new(2); }

#[test]
fn test_fifth_insert_splits_order_5_leaf() {
    test_util::init();

    let mut tree = ascending(5, [10, 20, 30, 40]);
    assert_eq!(tree.height(), 1);
    assert_eq!(leaf_count(&tree), 1);

    tree.insert(50, 500);
    assert_eq!(tree.height(), 2);
    assert_eq!(leaf_count(&tree), 2);
    assert_eq!(tree.leaves().to_string(), "[10, 20, 30] -> [40, 50]");
    assert_eq!(keys(&tree), vec![10, 20, 30, 40, 50]);
    assert_eq!(tree.check(), Ok(()));
}

#[test]
fn test_order_plus_one_ascending_keys_split_once() {
    for order in 3..=10 {
        let count = u32::try_from(order).unwrap() + 1;
        let tree = ascending(order, 1..=count);

        assert_eq!(tree.height(), 2, "order {order}");
        assert_eq!(leaf_count(&tree), 2, "order {order}");
        assert_eq!(keys(&tree), (1..=count).collect::<Vec<_>>(), "order {order}");
        assert_eq!(tree.check(), Ok(()), "order {order}");
    }
}

#[test]
fn test_iteration_complete_after_first_split() {
    // Descending inserts make every split happen in the leftmost leaf,
    // so a scan starting from the first leaf ever created would miss keys.
    let tree = ascending(4, (1..=20).rev());
    assert_eq!(keys(&tree), (1..=20).collect::<Vec<_>>());
    assert_eq!(tree.first_key(), Some(1));
    assert_eq!(tree.last_key(), Some(20));
}

#[test]
fn test_thousand_ascending_keys_order_5() {
    test_util::init();

    let tree = ascending(5, 0..1000);

    // ceil(log5(1000)) = 5 levels at full fill; half-full nodes give at most 7.
    let height = tree.height();
    assert!((5..=7).contains(&height), "height {height} out of expected range");

    assert_eq!(tree.len(), 1000);
    assert_eq!(keys(&tree), (0..1000).collect::<Vec<_>>());
    assert_eq!(tree.check(), Ok(()));
    for key in 0..1000 {
        assert_eq!(tree.get(&key), Some(key * 10));
    }
}

#[test]
fn test_insert_existing_updates_in_place() {
    let mut tree = ascending(3, 1..=10);
    assert_eq!(tree.insert(4, 7), Some(40));
    assert_eq!(tree.len(), 10);
    assert_eq!(tree.get(&4), Some(7));

    *tree.get_mut(&9).unwrap() = 11;
    assert_eq!(tree.get(&9), Some(11));
    assert_eq!(tree.check(), Ok(()));
}

#[test]
fn test_range_bounds() {
    let tree = ascending(4, (0..50).map(|key| key * 2));

    let collect = |range: (Bound<u32>, Bound<u32>)| -> Vec<u32> {
        tree.range(range).map(|(key, _)| key).collect()
    };

    assert_eq!(collect((Bound::Included(10), Bound::Included(16))), vec![10, 12, 14, 16]);
    assert_eq!(collect((Bound::Excluded(10), Bound::Excluded(16))), vec![12, 14]);
    assert_eq!(collect((Bound::Included(11), Bound::Included(15))), vec![12, 14]);
    assert_eq!(collect((Bound::Unbounded, Bound::Excluded(6))), vec![0, 2, 4]);
    assert_eq!(collect((Bound::Included(94), Bound::Unbounded)), vec![94, 96, 98]);
    assert_eq!(collect((Bound::Included(99), Bound::Unbounded)), Vec::<u32>::new());
    assert_eq!(collect((Bound::Included(20), Bound::Included(10))), Vec::<u32>::new());
    assert_eq!(tree.range(..).count(), 50);
}

#[test]
fn test_range_starting_at_separator() {
    let tree = ascending(5, [10, 20, 30, 40, 50]);
    let keys: Vec<_> = tree.range(40..=40).map(|(key, _)| key).collect();
    assert_eq!(keys, vec![40]);
    let keys: Vec<_> = tree.range(31..45).map(|(key, _)| key).collect();
    assert_eq!(keys, vec![40]);
}

#[test]
fn test_remove_absent() {
    let mut tree = ascending(5, [1, 3, 5]);
    assert_eq!(tree.remove(&2), None);
    assert_eq!(tree.len(), 3);
}

#[test]
fn test_remove_all_ascending() {
    for order in 3..=8 {
        let mut tree = ascending(order, 0..200);
        for key in 0..200 {
            assert_eq!(tree.remove(&key), Some(key * 10), "order {order}");
            assert_eq!(tree.check(), Ok(()), "order {order} after removing {key}");
        }
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.leaves().to_string(), "(empty)");
    }
}

#[test]
fn test_remove_all_descending() {
    for order in 3..=8 {
        let mut tree = ascending(order, 0..200);
        for key in (0..200).rev() {
            assert_eq!(tree.remove(&key), Some(key * 10), "order {order}");
            assert_eq!(tree.check(), Ok(()), "order {order} after removing {key}");
        }
        assert!(tree.is_empty());
    }
}

#[test]
fn test_remove_collapses_root() {
    let mut tree = ascending(5, [10, 20, 30, 40, 50]);
    tree.remove(&10);
    assert_eq!(tree.leaves().to_string(), "[20, 30] -> [40, 50]");
    assert_eq!(tree.height(), 2);

    // neither leaf has a spare entry, so they merge and the root collapses
    tree.remove(&50);
    assert_eq!(tree.height(), 1);
    assert_eq!(tree.leaves().to_string(), "[20, 30, 40]");
    assert_eq!(tree.check(), Ok(()));
}

#[test]
fn test_remove_borrows_from_sibling() {
    let mut tree = ascending(5, [10, 20, 30, 40, 50]);
    tree.remove(&40);
    // the right leaf underflows and takes 30 from its left sibling
    assert_eq!(tree.leaves().to_string(), "[10, 20] -> [30, 50]");
    assert_eq!(tree.height(), 2);
    assert_eq!(tree.check(), Ok(()));
}

#[test]
fn test_arena_reuses_released_nodes() {
    let mut tree = ascending(3, 0..100);
    let allocated = tree.nodes.len();
    for key in 0..100 {
        tree.remove(&key);
    }
    for key in 0..100 {
        tree.insert(key, key);
    }
    assert_eq!(tree.nodes.len(), allocated);
}

#[test]
fn test_check_detects_broken_chain() {
    let mut tree = ascending(3, 0..10);
    let first = tree.leftmost_leaf().unwrap();
    tree.leaf_mut(first).next = None;
    assert!(matches!(tree.check(), Err(Violation::LeafChain { .. })));
}

#[test]
fn test_check_detects_length_mismatch() {
    let mut tree = ascending(3, 0..10);
    tree.len = 3;
    assert_eq!(tree.check(), Err(Violation::Length { cached: 3, counted: 10 }));
}

#[test]
fn test_random_operations_match_btree_map() {
    test_util::init();

    for order in [3, 4, 5, 7, 16] {
        let mut rng = StdRng::seed_from_u64(order as u64);
        let mut tree = Tree::<u32, u32>::new(order);
        let mut expected = BTreeMap::new();

        for step in 0..3000 {
            let key = rng.gen_range(0..500);
            if rng.gen_bool(0.6) {
                let value = rng.gen();
                assert_eq!(tree.insert(key, value), expected.insert(key, value), "step {step}");
            } else {
                assert_eq!(tree.remove(&key), expected.remove(&key), "step {step}");
            }

            if step % 50 == 0 {
                if let Err(err) = tree.check() {
                    panic!("order {order} step {step}: {err}; leaves: {}", tree.leaves());
                }
            }
        }

        assert_eq!(tree.check(), Ok(()));
        assert_eq!(tree.len(), expected.len());
        assert_eq!(tree.iter().collect::<Vec<_>>(), expected.into_iter().collect::<Vec<_>>());
    }
}

#[test]
fn test_shuffled_inserts_keep_fill() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut keys: Vec<u32> = (0..2000).collect();
    keys.shuffle(&mut rng);

    let mut tree = Tree::new(6);
    for &key in &keys {
        tree.insert(key, key);
    }

    assert_eq!(tree.check(), Ok(()));
    assert_eq!(tree.iter().map(|(key, _)| key).collect::<Vec<_>>(), (0..2000).collect::<Vec<_>>());

    let range: Vec<_> = tree.range(500..=510).map(|(key, _)| key).collect();
    assert_eq!(range, (500..=510).collect::<Vec<_>>());
}
