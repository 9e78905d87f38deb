use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

// Walk the tree checking every node against the bounds its ancestors impose:
// left subtrees strictly below, right subtrees at or above.
fn validate_tree(t: &MatchIndex) {
    let mut stack: Vec<(&Node, Option<&[u8]>, Option<&[u8]>)> = Vec::new();
    if let Some(root) = t.root.as_deref() {
        stack.push((root, None, None));
    }

    let mut count = 0usize;
    while let Some((node, low, high)) = stack.pop() {
        count += 1;
        let seq: &[u8] = &node.sequence;
        assert!(!seq.is_empty(), "empty sequence stored");
        if let Some(low) = low {
            assert!(seq >= low, "{:?} sits right of {:?}", seq, low);
        }
        if let Some(high) = high {
            assert!(seq < high, "{:?} sits left of {:?}", seq, high);
        }
        if let Some(left) = node.left.as_deref() {
            stack.push((left, low, Some(seq)));
        }
        if let Some(right) = node.right.as_deref() {
            stack.push((right, Some(seq), high));
        }
    }

    assert_eq!(count, t.len(), "reachable node count must match len");
}

fn sequence_at(window: &[u8], off: usize, len: usize) -> Vec<u8> {
    (0..len).map(|i| window[(off + i) % window.len()]).collect()
}

fn contents(t: &MatchIndex) -> Vec<(Vec<u8>, usize)> {
    t.iter().map(|(s, o)| (s.to_vec(), o)).collect()
}

#[derive(Clone, Debug)]
enum Op {
    Insert(usize, usize),
    Remove(usize),
    Find(usize, usize),
}

fn window_and_ops() -> impl Strategy<Value = (Vec<u8>, Vec<Op>)> {
    // a small alphabet keeps duplicates and shared prefixes common
    prop::collection::vec(b'a'..=b'd', 8..=64).prop_flat_map(|window| {
        let w = window.len();
        let op = prop_oneof![
            50 => (0..w, 1usize..=8).prop_map(|(o, l)| Op::Insert(o, l)),
            30 => (0..w).prop_map(Op::Remove),
            20 => (0..w, 1usize..=8).prop_map(|(o, l)| Op::Find(o, l)),
        ];
        (Just(window), prop::collection::vec(op, 0..=300))
    })
}

// replay ops against the index and an offset -> length model
fn build(window: &[u8], ops: &[Op]) -> (MatchIndex, BTreeMap<usize, usize>) {
    let w = window.len();
    let mut t = MatchIndex::new();
    let mut m: BTreeMap<usize, usize> = BTreeMap::new();
    for op in ops {
        match *op {
            Op::Insert(off, len) => {
                if m.contains_key(&off) {
                    continue;
                }
                t.insert(&sequence_at(window, off, len), off);
                m.insert(off, len);
            }
            Op::Remove(off) => match m.remove(&off) {
                Some(len) => assert!(t.remove(window, off, len, w)),
                None => assert!(!t.remove(window, off, 4, w)),
            },
            Op::Find(..) => {}
        }
    }
    (t, m)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_matches_model((window, ops) in window_and_ops()) {
        let w = window.len();
        let mut t = MatchIndex::new();
        let mut m: BTreeMap<usize, usize> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(off, len) => {
                    if m.contains_key(&off) {
                        continue;
                    }
                    t.insert(&sequence_at(&window, off, len), off);
                    m.insert(off, len);
                }
                Op::Remove(off) => {
                    let removed = match m.remove(&off) {
                        Some(len) => t.remove(&window, off, len, w),
                        None => !t.remove(&window, off, 4, w),
                    };
                    prop_assert!(removed);
                }
                Op::Find(start, size) => {
                    let found = t.find_longest_match(&window, start, size, w);
                    prop_assert!(found.length < size);
                    if found.length > 0 {
                        prop_assert!((1..=w).contains(&found.distance));
                        let off = (start + w - found.distance) % w;
                        let len = m.get(&off).copied();
                        prop_assert!(len.is_some(), "match points at offset {} not in the index", off);
                        prop_assert!(len.unwrap_or(0) >= found.length);
                        prop_assert_eq!(
                            sequence_at(&window, off, found.length),
                            sequence_at(&window, start, found.length)
                        );
                    } else {
                        prop_assert_eq!(found, Match::NONE);
                    }
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let got = contents(&t);
        prop_assert!(got.windows(2).all(|p| p[0].0 <= p[1].0));
        let mut got_sorted = got;
        got_sorted.sort();
        let mut expected: Vec<(Vec<u8>, usize)> = m
            .iter()
            .map(|(&off, &len)| (sequence_at(&window, off, len), off))
            .collect();
        expected.sort();
        prop_assert_eq!(got_sorted, expected);
    }

    #[test]
    fn prop_insert_remove_roundtrip(
        (window, ops) in window_and_ops(),
        pick in any::<prop::sample::Index>(),
        len in 1usize..=8,
    ) {
        let w = window.len();
        let (mut t, m) = build(&window, &ops);
        let free: Vec<usize> = (0..w).filter(|o| !m.contains_key(o)).collect();
        prop_assume!(!free.is_empty());
        let off = free[pick.index(free.len())];

        let before = contents(&t);
        t.insert(&sequence_at(&window, off, len), off);
        validate_tree(&t);
        prop_assert!(t.remove(&window, off, len, w));
        validate_tree(&t);
        prop_assert_eq!(contents(&t), before);
    }

    #[test]
    fn prop_clear_empties((window, ops) in window_and_ops()) {
        let (mut t, _) = build(&window, &ops);
        t.clear();
        prop_assert!(t.is_empty());
        prop_assert_eq!(t.len(), 0);
        prop_assert_eq!(t.iter().count(), 0);
        validate_tree(&t);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_remove_order_small_set() {
    // offsets 0 and 3 both hold "ba", 4 and 7 both hold "ab" (7 wraps)
    let window = b"bacbabca";
    let w = window.len();
    let offsets: Vec<usize> = (0..w).collect();

    for_each_permutation(&offsets[..6], |perm| {
        let mut t = MatchIndex::new();
        for &off in &offsets {
            t.insert(&sequence_at(window, off, 2), off);
        }
        let mut live: BTreeMap<usize, ()> = offsets.iter().map(|&o| (o, ())).collect();

        for off in perm {
            assert!(t.remove(&window[..], off, 2, w));
            live.remove(&off);
            validate_tree(&t);
            let left: Vec<usize> = {
                let mut v: Vec<usize> = t.iter().map(|(_, o)| o).collect();
                v.sort();
                v
            };
            assert_eq!(left, live.keys().copied().collect::<Vec<_>>());
        }
        assert_eq!(t.len(), 2);
    });
}

#[test]
fn exhaustive_insert_order_small_set() {
    let window = b"abcaabca";
    let w = window.len();
    let offsets: Vec<usize> = (0..w).collect();

    for_each_permutation(&offsets[..7], |perm| {
        let mut t = MatchIndex::new();
        for off in perm {
            t.insert(&sequence_at(window, off, 3), off);
        }
        validate_tree(&t);
        // every stored sequence can find itself
        for &off in &offsets[..7] {
            let m = t.find_longest_match(&window[..], off, 4, w);
            assert_eq!(m.length, 3, "offset {}", off);
        }
    });
}
