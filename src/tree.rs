use std::cmp::Ordering;
use std::fmt;

use crate::window::Window;

type Link = Option<Box<Node>>;

struct Node {
    // owned copy, so later window overwrites can't change what we compare against
    sequence: Box<[u8]>,
    offset: usize,
    left: Link,
    right: Link,
}

impl Node {
    fn child_mut(&mut self, dir: Ordering) -> &mut Link {
        if dir == Ordering::Less {
            &mut self.left
        } else {
            &mut self.right
        }
    }
}

/// A back-reference candidate: `distance` bytes back from the lookahead,
/// `length` bytes long. `(0, 0)` means nothing matched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Match {
    pub distance: usize,
    pub length: usize,
}

impl Match {
    pub const NONE: Match = Match {
        distance: 0,
        length: 0,
    };

    pub fn is_none(&self) -> bool {
        self.length == 0
    }
}

/// Unbalanced binary search tree of window sequences, keyed by content.
///
/// Every node holds the bytes that started at one window offset. Smaller
/// sequences go left, greater-or-equal ones go right, so identical sequences
/// at different offsets form a chain down the right side and are told apart
/// by offset alone. No rebalancing is done: feeding it long runs of equal
/// bytes degrades it into a list, which is why every walk here is a loop
/// instead of recursion.
#[derive(Default)]
pub struct MatchIndex {
    root: Link,
    len: usize,
}

impl MatchIndex {
    pub fn new() -> Self {
        MatchIndex { root: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Store a copy of `sequence` as starting at window offset `offset`.
    ///
    /// Inserting the same (sequence, offset) pair twice without removing it
    /// in between is a caller bug; the index will happily keep both.
    pub fn insert(&mut self, sequence: &[u8], offset: usize) {
        debug_assert!(!sequence.is_empty());
        let mut link = &mut self.root;
        while let Some(node) = link {
            // ties go right
            link = node.child_mut(sequence.cmp(&node.sequence[..]));
        }
        *link = Some(Box::new(Node {
            sequence: sequence.into(),
            offset,
            left: None,
            right: None,
        }));
        self.len += 1;
    }

    /// Longest stored prefix of the lookahead found along a single descent.
    ///
    /// At most `lookahead_size - 1` bytes are ever reported, leaving one
    /// lookahead byte for the encoder to emit after the match. The walk stops
    /// early on the first node that agrees with the lookahead all the way to
    /// that cap; otherwise it follows the sign of the first differing byte.
    /// Nodes off the descent path are never looked at, so this is not
    /// guaranteed to be the global optimum.
    pub fn find_longest_match<W: Window + ?Sized>(
        &self,
        window: &W,
        lookahead_start: usize,
        lookahead_size: usize,
        window_size: usize,
    ) -> Match {
        debug_assert!(lookahead_size >= 1);
        let cap = lookahead_size - 1;
        let mut best = Match::NONE;
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            let (matched, ord) = compare_lookahead(
                window,
                lookahead_start,
                cap,
                window_size,
                &node.sequence,
            );
            if matched > best.length {
                best = Match {
                    distance: distance(lookahead_start, node.offset, window_size),
                    length: matched,
                };
            }
            cur = match ord {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => break,
            };
        }
        best
    }

    /// Unlink the node holding the `length` window bytes at `target_offset`.
    ///
    /// The window must still contain the bytes that were inserted for that
    /// offset. Returns false (and changes nothing) if no such node exists.
    pub fn remove<W: Window + ?Sized>(
        &mut self,
        window: &W,
        target_offset: usize,
        length: usize,
        window_size: usize,
    ) -> bool {
        let mut link = &mut self.root;
        loop {
            let dir = match link.as_deref() {
                None => return false,
                Some(node) => {
                    match compare_window(window, target_offset, length, window_size, &node.sequence) {
                        // same bytes, different position: a duplicate, which
                        // insert always pushed to the right
                        Ordering::Equal if node.offset != target_offset => Ordering::Greater,
                        Ordering::Equal => break,
                        ord => ord,
                    }
                }
            };
            link = match link {
                Some(node) => node.child_mut(dir),
                None => return false,
            };
        }

        let Some(node) = link else {
            return false;
        };
        if node.left.is_none() {
            let right = node.right.take();
            *link = right;
        } else if node.right.is_none() {
            let left = node.left.take();
            *link = left;
        } else if let Some(donor) = take_min(&mut node.right) {
            // successor splice: the right subtree's minimum takes this
            // node's place in the ordering, its own node is discarded
            node.sequence = donor.sequence;
            node.offset = donor.offset;
        }
        self.len -= 1;
        true
    }

    /// Drop every node, children before parents.
    pub fn clear(&mut self) {
        let mut stack: Vec<Box<Node>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
        self.len = 0;
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(&Node, usize)> =
            self.root.as_deref().map(|n| (n, 1)).into_iter().collect();
        while let Some((node, d)) = stack.pop() {
            deepest = deepest.max(d);
            stack.extend(node.left.as_deref().map(|n| (n, d + 1)));
            stack.extend(node.right.as_deref().map(|n| (n, d + 1)));
        }
        deepest
    }

    /// In-order walk yielding `(sequence, offset)` pairs.
    pub fn iter(&self) -> Iter<'_> {
        let mut it = Iter { stack: vec![] };
        it.push_left(self.root.as_deref());
        it
    }
}

impl Drop for MatchIndex {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for MatchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.iter()
                    .map(|(seq, off)| (String::from_utf8_lossy(seq), off)),
            )
            .finish()
    }
}

impl<'a> IntoIterator for &'a MatchIndex {
    type Item = (&'a [u8], usize);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iter<'a> {
    fn push_left(&mut self, mut node: Option<&'a Node>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], usize);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some((&node.sequence[..], node.offset))
    }
}

// distance from the lookahead back to `offset`, going around the window if
// the lookahead has already wrapped past it
fn distance(lookahead_start: usize, offset: usize, window_size: usize) -> usize {
    if lookahead_start > offset {
        lookahead_start - offset
    } else {
        lookahead_start + window_size - offset
    }
}

// Walk the lookahead against a stored sequence. Returns how many bytes agreed
// and the ordering of the lookahead relative to the stored sequence at the
// point the walk stopped. Equal means the walk reached `cap` without a
// difference.
fn compare_lookahead<W: Window + ?Sized>(
    window: &W,
    start: usize,
    cap: usize,
    window_size: usize,
    stored: &[u8],
) -> (usize, Ordering) {
    let mut i = 0;
    loop {
        let Some(&b) = stored.get(i) else {
            // stored sequence is a proper prefix of the lookahead
            let ord = if i == cap { Ordering::Equal } else { Ordering::Greater };
            return (i, ord);
        };
        let ord = window.byte_at((start + i) % window_size).cmp(&b);
        if ord != Ordering::Equal || i == cap {
            return (i, ord);
        }
        i += 1;
    }
}

// Same ordering as `<[u8]>::cmp`, with the left-hand side read circularly
// out of the window.
fn compare_window<W: Window + ?Sized>(
    window: &W,
    start: usize,
    len: usize,
    window_size: usize,
    stored: &[u8],
) -> Ordering {
    for (i, b) in stored.iter().take(len).enumerate() {
        let ord = window.byte_at((start + i) % window_size).cmp(b);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    len.cmp(&stored.len())
}

// Detach the leftmost node of a non-empty subtree, splicing its right child
// into its place.
fn take_min(mut link: &mut Link) -> Option<Box<Node>> {
    while link.as_ref()?.left.is_some() {
        link = &mut link.as_mut()?.left;
    }
    let mut min = link.take()?;
    *link = min.right.take();
    Some(min)
}

#[cfg(test)]
mod proptests;
