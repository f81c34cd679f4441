use std::cell::Cell;
use std::rc::Rc;

use flatmap::FlatMap;

fn letters() -> FlatMap<char, u32> {
    FlatMap::try_from([('c', 3), ('a', 1), ('d', 4), ('b', 2)]).unwrap()
}

#[test]
fn test_iterator_empty_map() {
    let map: FlatMap<char, u32> = FlatMap::new();

    let mut iter = map.iter();
    assert_eq!(iter.next(), None);
    assert_eq!(iter.size_hint(), (0, Some(0)));
}

#[test]
fn test_iterator_populated_map() {
    let map = letters();

    let mut iter = map.iter();
    assert_eq!(iter.size_hint(), (4, Some(4)));
    assert_eq!(iter.next(), Some((&'a', &1)));
    assert_eq!(iter.len(), 3);
    assert_eq!(iter.next_back(), Some((&'d', &4)));
    assert_eq!(iter.as_slice(), &[('b', 2), ('c', 3)]);
    assert_eq!(iter.next(), Some((&'b', &2)));
    assert_eq!(iter.next(), Some((&'c', &3)));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next_back(), None);
}

#[test]
fn test_iterator_for_loop() {
    let map = letters();

    let mut keys = String::new();
    for (key, _) in &map {
        keys.push(*key);
    }
    assert_eq!(keys, "abcd");
}

#[test]
fn test_iterator_nth_and_clone() {
    let map = letters();

    let mut iter = map.iter();
    assert_eq!(iter.nth(2), Some((&'c', &3)));
    let copy = iter.clone();
    assert_eq!(iter.count(), 1);
    assert_eq!(copy.count(), 1);
}

#[test]
fn test_reverse_iterator() {
    let map = letters();

    let keys: String = map.iter_rev().map(|(k, _)| *k).collect();
    assert_eq!(keys, "dcba");

    let keys: String = map.keys().rev().copied().collect();
    assert_eq!(keys, "dcba");
}

#[test]
fn test_keys_and_values() {
    let map = letters();

    assert_eq!(map.keys().copied().collect::<Vec<_>>(), ['a', 'b', 'c', 'd']);
    assert_eq!(map.values().copied().collect::<Vec<_>>(), [1, 2, 3, 4]);
    assert_eq!(map.values().len(), 4);
}

#[test]
fn test_iter_mut_changes_values_only() {
    let mut map = letters();

    for (key, value) in map.iter_mut() {
        *value *= 10;
        assert!(key.is_ascii_lowercase());
    }
    for value in map.values_mut().rev().take(1) {
        *value += 1;
    }
    for (_, value) in &mut map {
        *value += 1;
    }

    assert_eq!(map.values().copied().collect::<Vec<_>>(), [11, 21, 31, 42]);
}

#[test]
fn test_into_iter_yields_owned_entries() {
    let map: FlatMap<String, Vec<u8>> = FlatMap::try_from(vec![
        ("b".to_string(), vec![2]),
        ("a".to_string(), vec![1]),
    ])
    .unwrap();

    let owned: Vec<(String, Vec<u8>)> = map.into_iter().collect();
    assert_eq!(
        owned,
        [("a".to_string(), vec![1]), ("b".to_string(), vec![2])]
    );
}

#[test]
fn test_into_iter_both_ends() {
    let map = letters();

    let mut iter = map.into_iter();
    assert_eq!(iter.len(), 4);
    assert_eq!(iter.next_back(), Some(('d', 4)));
    assert_eq!(iter.next(), Some(('a', 1)));
    assert_eq!(iter.next_back(), Some(('c', 3)));
    assert_eq!(iter.next_back(), Some(('b', 2)));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next_back(), None);
}

struct DropCounter(Rc<Cell<usize>>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn test_into_iter_drops_remaining_entries() {
    let drops = Rc::new(Cell::new(0));
    let mut map = FlatMap::new();
    for k in 0..5u32 {
        map.insert(k, DropCounter(drops.clone())).unwrap();
    }

    let mut iter = map.into_iter();
    let first = iter.next().unwrap();
    assert_eq!(first.0, 0);
    assert_eq!(drops.get(), 0);

    drop(iter);
    assert_eq!(drops.get(), 4);
    drop(first);
    assert_eq!(drops.get(), 5);
}

#[test]
fn test_map_drop_destroys_every_entry() {
    let drops = Rc::new(Cell::new(0));
    {
        let mut map = FlatMap::new();
        for k in (0..6u32).rev() {
            map.insert(k, DropCounter(drops.clone())).unwrap();
        }
        assert!(map.erase(&3));
        assert_eq!(drops.get(), 1);
        map.insert_or_assign(4, DropCounter(drops.clone())).unwrap();
        assert_eq!(drops.get(), 2);
    }
    assert_eq!(drops.get(), 7);
}

#[test]
fn test_iterator_adapters_over_map() {
    let map: FlatMap<u32, u32> = (1..=10u32)
        .map(|k| (k, k * k))
        .try_fold(FlatMap::new(), |mut map, (k, v)| {
            map.insert(k, v)?;
            Ok::<_, flatmap::FlatMapError>(map)
        })
        .unwrap();

    let even_squares: u32 = map.iter().filter(|(k, _)| *k % 2 == 0).map(|(_, v)| v).sum();
    assert_eq!(even_squares, 4 + 16 + 36 + 64 + 100);
    assert_eq!(map.iter().position(|(k, _)| *k == 7), Some(6));
}
