// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber records and their generational arena.

use alloc::vec::Vec;
use kurbo::{Affine, Rect};
use understory_rtree::Aabb2D;
use understory_scene::{ElementKind, NodeId, NodeKind, NodeRef};

use crate::types::{EffectFlags, FiberId, FiberKey};

/// Unit of reconciliation work mirroring one scene node.
///
/// Tree links (`parent`, `child`, `sibling`) and the double-buffer link
/// (`alternate`) are arena handles.
#[derive(Clone, Debug)]
pub(crate) struct Fiber {
    pub(crate) node: NodeId,
    pub(crate) tag: NodeKind,
    pub(crate) element: ElementKind,
    pub(crate) key: FiberKey,
    /// Position among siblings at the time this fiber was reconciled.
    pub(crate) index: usize,

    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,

    pub(crate) flags: EffectFlags,
    /// Union of all descendants' `flags | subtree_flags`; own flags excluded.
    pub(crate) subtree_flags: EffectFlags,

    pub(crate) world_transform: Affine,
    pub(crate) world_bounds: Option<Rect>,
    /// Entry last written to the spatial index. Its id differs from `node` after
    /// a keyed match rebinds the fiber to another scene node.
    pub(crate) indexed: Option<(Aabb2D<f64>, NodeId)>,
}

impl Fiber {
    pub(crate) fn new(node: NodeId, tag: NodeKind, element: ElementKind, key: FiberKey) -> Self {
        Self {
            node,
            tag,
            element,
            key,
            index: 0,
            parent: None,
            child: None,
            sibling: None,
            alternate: None,
            deletions: Vec::new(),
            flags: EffectFlags::empty(),
            subtree_flags: EffectFlags::empty(),
            world_transform: Affine::IDENTITY,
            world_bounds: None,
            indexed: None,
        }
    }

    /// Fresh fiber for a live scene node.
    pub(crate) fn for_node(node: &NodeRef<'_>) -> Self {
        Self::new(node.id, node.kind, node.element, FiberKey::of(node))
    }

    /// Clear per-pass state before the fiber is reused as a work-in-progress copy.
    pub(crate) fn reset(&mut self) {
        self.flags = EffectFlags::empty();
        self.subtree_flags = EffectFlags::empty();
        self.child = None;
        self.sibling = None;
        self.deletions.clear();
    }
}

/// Slot arena for fibers with generation checks and a free list.
#[derive(Clone, Debug, Default)]
pub(crate) struct FiberArena {
    slots: Vec<Option<Fiber>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl FiberArena {
    pub(crate) fn alloc(&mut self, fiber: Fiber) -> FiberId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(fiber);
            (idx, generation)
        } else {
            self.slots.push(Some(fiber));
            self.generations.push(1);
            (self.slots.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "FiberId uses 32-bit indices by design."
        )]
        let idx = idx as u32;
        FiberId(idx, generation)
    }

    /// Free a live fiber. Stale handles are ignored.
    pub(crate) fn free(&mut self, id: FiberId) -> Option<Fiber> {
        if !self.contains(id) {
            return None;
        }
        let fiber = self.slots[id.idx()].take();
        self.free_list.push(id.idx());
        fiber
    }

    pub(crate) fn contains(&self, id: FiberId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: FiberId) -> Option<&Fiber> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.slots.get(id.idx())?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.slots.get_mut(id.idx())?.as_mut()
    }

    /// Number of live fibers.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }
}
