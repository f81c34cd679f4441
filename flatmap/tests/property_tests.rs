use std::collections::BTreeMap;

use flatmap::{FlatMap, FlatMapError};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(u16, u32),
    InsertOrAssign(u16, u32),
    Erase(u16),
    GetOrInsertDefault(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Small key space so that collisions and erasures of present keys happen.
    let key = 0u16..64;
    prop_oneof![
        (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::InsertOrAssign(k, v)),
        key.clone().prop_map(Op::Erase),
        key.prop_map(Op::GetOrInsertDefault),
    ]
}

fn assert_strictly_ascending(map: &FlatMap<u16, u32>) {
    for window in map.as_slice().windows(2) {
        assert!(window[0].0 < window[1].0, "unsorted: {map:?}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn operations_match_btree_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut map: FlatMap<u16, u32> = FlatMap::new();
        let mut model: BTreeMap<u16, u32> = BTreeMap::new();

        for op in ops {
            let len_before = map.len();
            match op {
                Op::Insert(k, v) => {
                    let result = map.insert(k, v).map(|value| *value);
                    if let std::collections::btree_map::Entry::Vacant(slot) = model.entry(k) {
                        slot.insert(v);
                        prop_assert_eq!(result, Ok(v));
                        prop_assert_eq!(map.len(), len_before + 1);
                    } else {
                        prop_assert_eq!(result, Err(FlatMapError::DuplicateKey));
                        prop_assert_eq!(map.len(), len_before);
                    }
                }
                Op::InsertOrAssign(k, v) => {
                    let previous = map.insert_or_assign(k, v).unwrap();
                    prop_assert_eq!(previous, model.insert(k, v));
                    prop_assert_eq!(map.at(&k), Ok(&v));
                }
                Op::Erase(k) => {
                    let erased = map.erase(&k);
                    prop_assert_eq!(erased, model.remove(&k).is_some());
                    prop_assert_eq!(map.find(&k), map.end());
                    if erased {
                        prop_assert_eq!(map.len(), len_before - 1);
                    } else {
                        prop_assert_eq!(map.len(), len_before);
                    }
                }
                Op::GetOrInsertDefault(k) => {
                    let value = *map.get_or_insert_default(k).unwrap();
                    prop_assert_eq!(value, *model.entry(k).or_default());
                }
            }

            assert_strictly_ascending(&map);
            prop_assert!(map.len() <= map.capacity());
        }

        prop_assert!(map.iter().eq(model.iter()));
        for (k, v) in &model {
            prop_assert_eq!(map.at(k), Ok(v));
        }
    }

    #[test]
    fn distinct_keys_in_any_order_iterate_sorted(keys in prop::collection::hash_set(any::<i32>(), 0..300)) {
        let mut map = FlatMap::new();
        for &k in &keys {
            map.insert(k, k.wrapping_mul(3)).unwrap();
        }

        let mut sorted: Vec<i32> = keys.into_iter().collect();
        sorted.sort_unstable();

        prop_assert_eq!(map.len(), sorted.len());
        prop_assert!(map.keys().copied().eq(sorted.iter().copied()));
        for k in sorted {
            prop_assert_eq!(map.at(&k), Ok(&k.wrapping_mul(3)));
        }
    }

    #[test]
    fn insert_or_assign_twice_keeps_last_value(k in any::<u16>(), v1 in any::<u32>(), v2 in any::<u32>()) {
        let mut map: FlatMap<u16, u32> = FlatMap::new();

        map.insert_or_assign(k, v1).unwrap();
        let len = map.len();
        map.insert_or_assign(k, v2).unwrap();

        prop_assert_eq!(map.at(&k), Ok(&v2));
        prop_assert_eq!(map.len(), len);
    }

    #[test]
    fn erase_range_matches_vec_drain(
        keys in prop::collection::btree_set(any::<u8>(), 0..40),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let mut map: FlatMap<u8, ()> = FlatMap::try_from_iter(keys.iter().map(|&k| (k, ()))).unwrap();
        let mut expected: Vec<u8> = keys.into_iter().collect();

        let (lo, hi) = {
            let x = a.index(expected.len() + 1);
            let y = b.index(expected.len() + 1);
            (x.min(y), x.max(y))
        };
        let first = map.begin().offset(lo as isize).unwrap();
        let last = map.begin().offset(hi as isize).unwrap();

        map.erase_range(first, last).unwrap();
        expected.drain(lo..hi);

        prop_assert!(map.keys().copied().eq(expected.iter().copied()));
    }
}
