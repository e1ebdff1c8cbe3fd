// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arena-backed R-tree nodes and entries.

use alloc::vec::Vec;

use crate::types::{Aabb2D, Scalar, union_aabb};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeIdx(usize);

impl NodeIdx {
    const fn get(self) -> usize {
        self.0
    }
}

/// What an entry points at. Leaves hold payloads, internal nodes hold children.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Child<P> {
    Leaf(P),
    Node(NodeIdx),
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Entry<T, P> {
    pub(crate) mbr: Aabb2D<T>,
    pub(crate) child: Child<P>,
}

impl<T, P> Entry<T, P> {
    pub(crate) const fn leaf(mbr: Aabb2D<T>, payload: P) -> Self {
        Self {
            mbr,
            child: Child::Leaf(payload),
        }
    }

    pub(crate) const fn node(mbr: Aabb2D<T>, child: NodeIdx) -> Self {
        Self {
            mbr,
            child: Child::Node(child),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node<T, P> {
    pub(crate) leaf: bool,
    pub(crate) entries: Vec<Entry<T, P>>,
    pub(crate) parent: Option<NodeIdx>,
}

impl<T: Scalar, P> Node<T, P> {
    /// Empty node with room for one overflow entry before a split.
    pub(crate) fn new(leaf: bool, max_entries: usize) -> Self {
        Self {
            leaf,
            entries: Vec::with_capacity(max_entries + 1),
            parent: None,
        }
    }

    /// Union of all entry bounds; a zero box when empty.
    pub(crate) fn mbr(&self) -> Aabb2D<T> {
        let mut it = self.entries.iter();
        let Some(first) = it.next() else {
            return Aabb2D::new(T::zero(), T::zero(), T::zero(), T::zero());
        };
        it.fold(first.mbr, |acc, e| union_aabb(acc, e.mbr))
    }

    /// Position of the entry pointing at `child`, if any.
    pub(crate) fn position_of(&self, child: NodeIdx) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(e.child, Child::Node(c) if c == child))
    }

    /// Child handles of an internal node.
    pub(crate) fn child_nodes(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.entries.iter().filter_map(|e| match e.child {
            Child::Node(c) => Some(c),
            Child::Leaf(_) => None,
        })
    }
}

/// Slot arena with a free list. Freed slots are reused by later allocations.
#[derive(Clone, Debug)]
pub(crate) struct Arena<T, P> {
    slots: Vec<Option<Node<T, P>>>,
    free_list: Vec<usize>,
}

impl<T, P> Arena<T, P> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, node: Node<T, P>) -> NodeIdx {
        if let Some(i) = self.free_list.pop() {
            self.slots[i] = Some(node);
            NodeIdx(i)
        } else {
            self.slots.push(Some(node));
            NodeIdx(self.slots.len() - 1)
        }
    }

    pub(crate) fn take(&mut self, idx: NodeIdx) -> Option<Node<T, P>> {
        let node = self.slots.get_mut(idx.get())?.take()?;
        self.free_list.push(idx.get());
        Some(node)
    }

    pub(crate) fn get(&self, idx: NodeIdx) -> Option<&Node<T, P>> {
        self.slots.get(idx.get())?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, idx: NodeIdx) -> Option<&mut Node<T, P>> {
        self.slots.get_mut(idx.get())?.as_mut()
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
    }
}
