// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic R-tree with quadratic split and condense-on-delete.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::{self, Debug};

use crate::fanout::Fanout;
use crate::node::{Arena, Child, Entry, Node, NodeIdx};
use crate::split::quadratic_split;
use crate::types::{Aabb2D, Scalar, area, enlargement, lt, union_aabb};

/// Dynamic R-tree mapping rectangles to copyable payloads.
///
/// The root node always exists; an empty tree is a single empty leaf. Every
/// non-root node holds between [`Fanout::min_entries`] and
/// [`Fanout::max_entries`] entries and all leaves sit at the same depth.
///
/// Duplicate `(rect, payload)` pairs are allowed and stored separately.
/// [`RTree::delete`] removes a single occurrence per call.
pub struct RTree<T: Scalar, P: Copy + PartialEq + Debug> {
    fanout: Fanout,
    root: NodeIdx,
    arena: Arena<T, P>,
    len: usize,
}

impl<T: Scalar, P: Copy + PartialEq + Debug> Default for RTree<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar, P: Copy + PartialEq + Debug> RTree<T, P> {
    /// Empty tree with the default `2..=4` fanout.
    pub fn new() -> Self {
        Self::with_fanout(Fanout::default())
    }

    /// Empty tree with a custom fanout.
    pub fn with_fanout(fanout: Fanout) -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(Node::new(true, fanout.max_entries()));
        Self {
            fanout,
            root,
            arena,
            len: 0,
        }
    }

    /// Fanout this tree was built with.
    pub const fn fanout(&self) -> Fanout {
        self.fanout
    }

    /// Number of stored entries.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no entries.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels, counting the root. An empty tree has height 1.
    pub fn height(&self) -> usize {
        let mut h = 1;
        let mut idx = self.root;
        while let Some(child) = self.node(idx).child_nodes().next() {
            h += 1;
            idx = child;
        }
        h
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = self.arena.alloc(Node::new(true, self.fanout.max_entries()));
        self.len = 0;
    }

    /// Add an entry. Duplicates are stored separately.
    pub fn insert(&mut self, rect: Aabb2D<T>, payload: P) {
        self.insert_entry(rect, payload);
        self.len += 1;
    }

    /// All payloads whose rectangle intersects `query` (edges inclusive), in no
    /// particular order.
    pub fn search(&self, query: Aabb2D<T>) -> Vec<P> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(i) = stack.pop() {
            for e in &self.node(i).entries {
                if !e.mbr.intersects(&query) {
                    continue;
                }
                match e.child {
                    Child::Leaf(p) => out.push(p),
                    Child::Node(c) => stack.push(c),
                }
            }
        }
        out
    }

    /// All payloads whose rectangle contains the point (edges inclusive).
    pub fn search_point(&self, x: T, y: T) -> Vec<P> {
        self.search(Aabb2D::point(x, y))
    }

    /// Remove one entry carrying `payload` whose rectangle intersects `rect`
    /// (or equals it, for inverted rectangles).
    ///
    /// The outcome depends only on the stored entries, never on the tree's shape.
    /// Returns `false` and leaves the tree untouched if no such entry exists.
    /// Underflowing nodes are dissolved and their entries reinserted.
    pub fn delete(&mut self, rect: Aabb2D<T>, payload: P) -> bool {
        let Some((leaf, pos)) = self.find_leaf(self.root, &rect, payload) else {
            return false;
        };
        self.node_mut(leaf).entries.swap_remove(pos);
        self.len -= 1;
        self.condense(leaf);
        self.shrink_root();
        true
    }

    /// Move an entry: delete `(old_rect, old_payload)` then insert
    /// `(new_rect, new_payload)`.
    ///
    /// Returns `false` without inserting if the old entry is not present.
    pub fn update(
        &mut self,
        old_rect: Aabb2D<T>,
        old_payload: P,
        new_rect: Aabb2D<T>,
        new_payload: P,
    ) -> bool {
        if !self.delete(old_rect, old_payload) {
            return false;
        }
        self.insert(new_rect, new_payload);
        true
    }

    /// Check every structural invariant and return the number of leaf entries.
    ///
    /// Intended for tests and debugging; cost is linear in the tree size.
    pub fn validate(&self) -> Result<usize, Violation> {
        let min = self.fanout.min_entries();
        let max = self.fanout.max_entries();
        let mut leaf_depth: Option<usize> = None;
        let mut count = 0;
        let mut stack = vec![(self.root, None, 1_usize)];
        while let Some((idx, expected_parent, depth)) = stack.pop() {
            let node = self.arena.get(idx).ok_or(Violation::DanglingNode)?;
            if node.parent != expected_parent {
                return Err(Violation::BrokenParentLink { depth });
            }
            let entries = node.entries.len();
            if idx != self.root && entries < min {
                return Err(Violation::Underflow { depth, entries });
            }
            if entries > max {
                return Err(Violation::Overflow { depth, entries });
            }
            if node.leaf {
                match leaf_depth {
                    None => leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(Violation::Unbalanced {
                            expected,
                            found: depth,
                        });
                    }
                    Some(_) => {}
                }
                for e in &node.entries {
                    if matches!(e.child, Child::Node(_)) {
                        return Err(Violation::MixedEntries { depth });
                    }
                }
                count += entries;
                continue;
            }
            for e in &node.entries {
                let Child::Node(c) = e.child else {
                    return Err(Violation::MixedEntries { depth });
                };
                let child = self.arena.get(c).ok_or(Violation::DanglingNode)?;
                if e.mbr != child.mbr() {
                    return Err(Violation::LooseBound { depth });
                }
                stack.push((c, Some(idx), depth + 1));
            }
        }
        if count != self.len {
            return Err(Violation::CountMismatch {
                stored: self.len,
                found: count,
            });
        }
        Ok(count)
    }

    fn node(&self, idx: NodeIdx) -> &Node<T, P> {
        self.arena.get(idx).expect("dangling R-tree node handle")
    }

    fn node_mut(&mut self, idx: NodeIdx) -> &mut Node<T, P> {
        self.arena.get_mut(idx).expect("dangling R-tree node handle")
    }

    /// Insert without touching `len`; shared by [`RTree::insert`] and reinsertion.
    fn insert_entry(&mut self, mbr: Aabb2D<T>, payload: P) {
        let leaf = self.choose_leaf(&mbr);
        self.node_mut(leaf).entries.push(Entry::leaf(mbr, payload));
        let split = self.split_if_overflowing(leaf);
        self.adjust_tree(leaf, split);
    }

    /// Descend by least enlargement, ties broken by smaller area.
    fn choose_leaf(&self, mbr: &Aabb2D<T>) -> NodeIdx {
        let mut idx = self.root;
        loop {
            let node = self.node(idx);
            if node.leaf {
                return idx;
            }
            let mut best: Option<(NodeIdx, T::Acc, T::Acc)> = None;
            for e in &node.entries {
                let Child::Node(c) = e.child else { continue };
                let grow = enlargement(&e.mbr, mbr);
                let a = area(&e.mbr);
                let better = match best {
                    None => true,
                    Some((_, bg, ba)) => lt(grow, bg) || (!lt(bg, grow) && lt(a, ba)),
                };
                if better {
                    best = Some((c, grow, a));
                }
            }
            match best {
                Some((c, _, _)) => idx = c,
                None => return idx,
            }
        }
    }

    /// Split `idx` if it exceeds `max_entries`; returns the new sibling.
    fn split_if_overflowing(&mut self, idx: NodeIdx) -> Option<NodeIdx> {
        let max = self.fanout.max_entries();
        let node = self.node_mut(idx);
        if node.entries.len() <= max {
            return None;
        }
        let leaf = node.leaf;
        let entries = core::mem::take(&mut node.entries);
        let (keep, moved) = quadratic_split(entries, self.fanout.min_entries());
        let node = self.node_mut(idx);
        node.entries = keep;
        node.entries.reserve(max + 1);

        let mut sibling = Node::new(leaf, max);
        sibling.entries.extend(moved);
        let children: Vec<NodeIdx> = sibling.child_nodes().collect();
        let sibling = self.arena.alloc(sibling);
        for c in children {
            self.node_mut(c).parent = Some(sibling);
        }
        Some(sibling)
    }

    /// Walk from `idx` to the root, refreshing parent bounds and propagating splits.
    fn adjust_tree(&mut self, mut idx: NodeIdx, mut split: Option<NodeIdx>) {
        loop {
            if idx == self.root {
                if let Some(sibling) = split {
                    self.grow_root(sibling);
                }
                return;
            }
            let Some(parent) = self.node(idx).parent else {
                return;
            };
            let mbr = self.node(idx).mbr();
            if let Some(pos) = self.node(parent).position_of(idx) {
                self.node_mut(parent).entries[pos].mbr = mbr;
            }
            if let Some(sibling) = split {
                let sibling_mbr = self.node(sibling).mbr();
                self.node_mut(parent)
                    .entries
                    .push(Entry::node(sibling_mbr, sibling));
                self.node_mut(sibling).parent = Some(parent);
            }
            split = self.split_if_overflowing(parent);
            idx = parent;
        }
    }

    /// New internal root over the old root and its split sibling.
    fn grow_root(&mut self, sibling: NodeIdx) {
        let old = self.root;
        let mut root = Node::new(false, self.fanout.max_entries());
        root.entries.push(Entry::node(self.node(old).mbr(), old));
        root.entries.push(Entry::node(self.node(sibling).mbr(), sibling));
        let root = self.arena.alloc(root);
        self.node_mut(old).parent = Some(root);
        self.node_mut(sibling).parent = Some(root);
        self.root = root;
        tracing::trace!(height = self.height(), "r-tree root split");
    }

    /// Leaf and position of the first entry carrying `payload` whose rectangle
    /// intersects `rect` or equals it exactly.
    fn find_leaf(&self, idx: NodeIdx, rect: &Aabb2D<T>, payload: P) -> Option<(NodeIdx, usize)> {
        let node = self.node(idx);
        if node.leaf {
            return node
                .entries
                .iter()
                .position(|e| {
                    matches!(e.child, Child::Leaf(p) if p == payload)
                        && (e.mbr == *rect || e.mbr.intersects(rect))
                })
                .map(|pos| (idx, pos));
        }
        for e in &node.entries {
            // A stored rectangle is always absorbed by every ancestor bound, which
            // keeps inverted rectangles reachable.
            if let Child::Node(c) = e.child
                && (e.mbr.intersects(rect) || union_aabb(e.mbr, *rect) == e.mbr)
                && let Some(hit) = self.find_leaf(c, rect, payload)
            {
                return Some(hit);
            }
        }
        None
    }

    /// Dissolve underflowing nodes on the path from `leaf` to the root and
    /// reinsert their leaf entries.
    fn condense(&mut self, leaf: NodeIdx) {
        let min = self.fanout.min_entries();
        let mut orphans = Vec::new();
        let mut idx = leaf;
        while idx != self.root {
            let Some(parent) = self.node(idx).parent else {
                break;
            };
            let pos = self.node(parent).position_of(idx);
            if self.node(idx).entries.len() < min {
                if let Some(pos) = pos {
                    self.node_mut(parent).entries.swap_remove(pos);
                }
                self.node_mut(idx).parent = None;
                orphans.push(idx);
            } else if let Some(pos) = pos {
                let mbr = self.node(idx).mbr();
                self.node_mut(parent).entries[pos].mbr = mbr;
            }
            idx = parent;
        }

        let mut reinserted = 0_usize;
        let mut pending = Vec::new();
        for orphan in orphans {
            self.drain_subtree(orphan, &mut pending);
            reinserted += pending.len();
            for (mbr, payload) in pending.drain(..) {
                self.insert_entry(mbr, payload);
            }
        }
        if reinserted > 0 {
            tracing::trace!(reinserted, "r-tree condensed");
        }
    }

    /// Free every node under `idx` and collect its leaf entries.
    fn drain_subtree(&mut self, idx: NodeIdx, out: &mut Vec<(Aabb2D<T>, P)>) {
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            let Some(node) = self.arena.take(i) else {
                continue;
            };
            for e in node.entries {
                match e.child {
                    Child::Leaf(p) => out.push((e.mbr, p)),
                    Child::Node(c) => stack.push(c),
                }
            }
        }
    }

    /// Replace an internal root holding a single child by that child.
    fn shrink_root(&mut self) {
        let root = self.node(self.root);
        if root.leaf || root.entries.len() != 1 {
            return;
        }
        let Child::Node(child) = root.entries[0].child else {
            return;
        };
        let old = self.root;
        self.root = child;
        self.node_mut(child).parent = None;
        self.arena.take(old);
        tracing::trace!(height = self.height(), "r-tree root shrunk");
    }
}

impl<T: Scalar, P: Copy + PartialEq + Debug> Debug for RTree<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTree")
            .field("fanout", &self.fanout)
            .field("len", &self.len)
            .field("height", &self.height())
            .field("nodes", &self.arena.live())
            .finish_non_exhaustive()
    }
}

/// R-tree with i64 coordinates and i128 metrics.
pub type RTreeI64<P> = RTree<i64, P>;

/// R-tree with f32 coordinates and f64 metrics.
pub type RTreeF32<P> = RTree<f32, P>;

/// R-tree with f64 coordinates and f64 metrics.
pub type RTreeF64<P> = RTree<f64, P>;

/// Structural problem reported by [`RTree::validate`].
///
/// Depths count from 1 at the root.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// An entry points at a freed node.
    DanglingNode,
    /// A node's parent link does not name the node holding its entry.
    BrokenParentLink {
        /// Depth of the offending node.
        depth: usize,
    },
    /// A non-root node holds fewer than `min_entries`.
    Underflow {
        /// Depth of the offending node.
        depth: usize,
        /// Entries found.
        entries: usize,
    },
    /// A node holds more than `max_entries`.
    Overflow {
        /// Depth of the offending node.
        depth: usize,
        /// Entries found.
        entries: usize,
    },
    /// An internal entry's rectangle is not exactly the union of its child's entries.
    LooseBound {
        /// Depth of the node holding the entry.
        depth: usize,
    },
    /// Leaves at different depths.
    Unbalanced {
        /// Depth of the first leaf seen.
        expected: usize,
        /// Depth of the offending leaf.
        found: usize,
    },
    /// A leaf holds a child pointer or an internal node holds a payload.
    MixedEntries {
        /// Depth of the offending node.
        depth: usize,
    },
    /// The stored length disagrees with the number of leaf entries.
    CountMismatch {
        /// Tracked length.
        stored: usize,
        /// Leaf entries found.
        found: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingNode => f.write_str("entry points at a freed node"),
            Self::BrokenParentLink { depth } => {
                write!(f, "node at depth {depth} has a stale parent link")
            }
            Self::Underflow { depth, entries } => {
                write!(f, "node at depth {depth} underflows with {entries} entries")
            }
            Self::Overflow { depth, entries } => {
                write!(f, "node at depth {depth} overflows with {entries} entries")
            }
            Self::LooseBound { depth } => {
                write!(f, "entry bound at depth {depth} does not match its child")
            }
            Self::Unbalanced { expected, found } => {
                write!(f, "leaf at depth {found}, expected {expected}")
            }
            Self::MixedEntries { depth } => {
                write!(f, "node at depth {depth} mixes leaf and child entries")
            }
            Self::CountMismatch { stored, found } => {
                write!(f, "tree claims {stored} entries but holds {found}")
            }
        }
    }
}

impl core::error::Error for Violation {}
