// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instrumentation counters.

/// Running totals over the reconciler's lifetime.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcilerStats {
    /// Fibers processed by the work loop.
    pub units_of_work: u64,
    /// Child lists diffed. Bailed-out fibers do not count.
    pub reconcile_children_calls: u64,
    /// Fibers that adopted their previous children without diffing.
    pub bailouts: u64,
    /// Passes that reached commit.
    pub passes_committed: u64,
    /// Passes abandoned by `cancel` or a restarting `schedule_update`.
    pub passes_discarded: u64,
}

/// What the most recent commit applied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Placement effects.
    pub placements: u32,
    /// Update effects.
    pub updates: u32,
    /// Move effects.
    pub moves: u32,
    /// Deletion effects, one per deleted node.
    pub deletions: u32,
    /// Fibers returned to the arena.
    pub fibers_freed: u32,
}

impl CommitStats {
    /// Whether the commit applied no effect at all.
    pub fn is_empty(&self) -> bool {
        self.placements == 0 && self.updates == 0 && self.moves == 0 && self.deletions == 0
    }
}
