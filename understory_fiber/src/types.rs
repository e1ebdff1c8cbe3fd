// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: fiber handles, keys, effect bits, and pass state.

use understory_scene::{NodeId, NodeRef};

/// Handle to a fiber in a [`Reconciler`](crate::Reconciler)'s arena.
///
/// Generational like [`NodeId`]: a handle to a freed fiber never aliases the
/// fiber that later reuses its slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FiberId(pub(crate) u32, pub(crate) u32);

impl FiberId {
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Identity used to match a child against the previous pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum FiberKey {
    /// The scene node carried an explicit key.
    Explicit(u32),
    /// No explicit key; the node's own id is used.
    Node(NodeId),
}

impl FiberKey {
    /// Key for a scene node: its explicit key if set, else its id.
    pub fn of(node: &NodeRef<'_>) -> Self {
        match node.key {
            Some(k) => Self::Explicit(k),
            None => Self::Node(node.id),
        }
    }
}

bitflags::bitflags! {
    /// Effects recorded on a fiber during a pass and applied at commit.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EffectFlags: u8 {
        /// Fiber is new; its node must be inserted.
        const PLACEMENT      = 0b0000_0001;
        /// Node content, bounds or world transform changed.
        const UPDATE         = 0b0000_0010;
        /// Reused fiber whose position among its siblings changed.
        const MOVE           = 0b0000_0100;
        /// Fiber from the previous pass that no longer has a counterpart.
        const DELETION       = 0b0000_1000;
        /// Fiber has queued deletions of former children.
        const CHILD_DELETION = 0b0001_0000;
    }
}

/// Effect reported to an [`EffectHost`](crate::EffectHost) at commit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Node appeared.
    Placement,
    /// Node changed in place.
    Update,
    /// Node changed position among its siblings.
    Move,
    /// Node (and its whole subtree) went away.
    Deletion,
}

/// Where the reconciler is in its pass lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum PassState {
    /// No pass scheduled; the current tree is committed.
    #[default]
    Idle,
    /// A pass is scheduled and has not run out of budget yet.
    Building,
    /// The last `work_loop` ran out of budget; call it again to resume.
    Suspended,
}
