// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Commit-time hooks into the rendering host.

use alloc::vec::Vec;
use understory_scene::{NodeId, NodeKind};

use crate::types::Effect;

/// Receives effects when a pass commits.
///
/// Calls happen only inside `work_loop`, after the whole pass has been diffed,
/// in this order: all deletions, then placements, moves and updates top-down.
/// Both methods default to no-ops.
pub trait EffectHost {
    /// Apply one effect for `node`.
    ///
    /// [`Effect::Deletion`] is reported for every node of a deleted subtree,
    /// parents before children.
    fn commit_effect(&mut self, node: NodeId, kind: NodeKind, effect: Effect) {
        let _ = (node, kind, effect);
    }

    /// Tear down the host-side overlay of a deleted or replaced node whose element
    /// [`hosts_overlay`](understory_scene::ElementKind::hosts_overlay).
    fn release_overlay(&mut self, node: NodeId) {
        let _ = node;
    }
}

/// Host that ignores every effect.
impl EffectHost for () {}

/// Host that records every call, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectLog {
    /// `(node, effect)` pairs from [`EffectHost::commit_effect`].
    pub effects: Vec<(NodeId, Effect)>,
    /// Nodes passed to [`EffectHost::release_overlay`].
    pub released_overlays: Vec<NodeId>,
}

impl EffectLog {
    /// Number of recorded effects of one kind.
    pub fn count(&self, effect: Effect) -> usize {
        self.effects.iter().filter(|(_, e)| *e == effect).count()
    }

    /// Effects recorded for one node, in order.
    pub fn effects_for(&self, node: NodeId) -> Vec<Effect> {
        self.effects
            .iter()
            .filter(|(n, _)| *n == node)
            .map(|(_, e)| *e)
            .collect()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.released_overlays.is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.effects.clear();
        self.released_overlays.clear();
    }
}

impl EffectHost for EffectLog {
    fn commit_effect(&mut self, node: NodeId, _kind: NodeKind, effect: Effect) {
        self.effects.push((node, effect));
    }

    fn release_overlay(&mut self, node: NodeId) {
        self.released_overlays.push(node);
    }
}
