// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double-buffered reconciliation: scheduling, the budgeted work loop, child diffing, commit.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use kurbo::{Affine, Point, Rect};
use understory_rtree::{Aabb2D, Fanout, RTreeF64};
use understory_scene::{DirtyFlags, ElementKind, NodeId, NodeKind, SceneView};

use crate::clock::Clock;
use crate::fiber::{Fiber, FiberArena};
use crate::host::EffectHost;
use crate::stats::{CommitStats, ReconcilerStats};
use crate::types::{Effect, EffectFlags, FiberId, FiberKey, PassState};

/// Node bits that turn a reused fiber into an update.
const CHANGED: DirtyFlags = DirtyFlags::CONTENT
    .union(DirtyFlags::LAYOUT)
    .union(DirtyFlags::TRANSFORM);

/// Node bits that force a fiber to re-diff its children.
const REDIFF: DirtyFlags = DirtyFlags::LAYOUT.union(DirtyFlags::SUBTREE);

/// Effects that need the spatial index brought up to date at commit.
const SYNCED: EffectFlags = EffectFlags::PLACEMENT
    .union(EffectFlags::UPDATE)
    .union(EffectFlags::MOVE);

/// Incremental reconciler mirroring a scene graph in a double-buffered fiber tree.
///
/// A pass starts with [`schedule_update`](Self::schedule_update) and is driven by
/// [`work_loop`](Self::work_loop), which may suspend when its time budget runs out
/// and resumes where it left off on the next call. Effects reach the
/// [`EffectHost`] only once the whole pass has been diffed.
///
/// The reconciler owns an R-tree of world-space bounds keyed by [`NodeId`], kept in
/// sync at every commit; see [`spatial`](Self::spatial).
///
/// The scene must not change while a pass is suspended. To pick up edits made in
/// between, call `schedule_update` again, which discards the in-flight pass.
pub struct Reconciler<C> {
    clock: C,
    fibers: FiberArena,
    current_root: Option<FiberId>,
    wip_root: Option<FiberId>,
    next_unit: Option<FiberId>,
    /// Fibers allocated by the in-flight pass, freed if it is abandoned.
    pass_allocs: Vec<FiberId>,
    state: PassState,
    spatial: RTreeF64<NodeId>,
    stats: ReconcilerStats,
    last_commit: CommitStats,
}

impl<C> core::fmt::Debug for Reconciler<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reconciler")
            .field("state", &self.state)
            .field("fibers", &self.fibers.len())
            .field("current_root", &self.current_root)
            .field("wip_root", &self.wip_root)
            .field("spatial", &self.spatial)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<C: Clock> Reconciler<C> {
    /// Reconciler whose spatial index uses the default fanout.
    pub fn new(clock: C) -> Self {
        Self::with_fanout(clock, Fanout::default())
    }

    /// Reconciler whose spatial index uses `fanout`.
    pub fn with_fanout(clock: C, fanout: Fanout) -> Self {
        Self {
            clock,
            fibers: FiberArena::default(),
            current_root: None,
            wip_root: None,
            next_unit: None,
            pass_allocs: Vec::new(),
            state: PassState::Idle,
            spatial: RTreeF64::with_fanout(fanout),
            stats: ReconcilerStats::default(),
            last_commit: CommitStats::default(),
        }
    }

    /// Pass lifecycle state.
    pub fn state(&self) -> PassState {
        self.state
    }

    /// Lifetime counters.
    pub fn stats(&self) -> ReconcilerStats {
        self.stats
    }

    /// What the most recent commit applied.
    pub fn last_commit(&self) -> CommitStats {
        self.last_commit
    }

    /// World-space bounds of every committed node.
    pub fn spatial(&self) -> &RTreeF64<NodeId> {
        &self.spatial
    }

    /// Committed nodes whose world bounds contain `pt`.
    pub fn query_point(&self, pt: Point) -> Vec<NodeId> {
        self.spatial.search_point(pt.x, pt.y)
    }

    /// Committed nodes whose world bounds intersect `rect`.
    pub fn query_rect(&self, rect: Rect) -> Vec<NodeId> {
        self.spatial.search(rect_to_aabb(rect))
    }

    /// Scene node mirrored by the committed root fiber.
    pub fn current_root_node(&self) -> Option<NodeId> {
        self.fibers.get(self.current_root?).map(|f| f.node)
    }

    /// Number of live fibers across both buffers.
    pub fn fiber_count(&self) -> usize {
        self.fibers.len()
    }

    /// Start a pass rooted at `root`.
    ///
    /// If the committed tree mirrors the same node, its fibers are reused through
    /// their alternates. Otherwise a fresh tree is built and the whole previous tree
    /// is deleted at commit. An in-flight pass is discarded first.
    pub fn schedule_update<S: SceneView + ?Sized>(&mut self, scene: &S, root: NodeId) {
        if self.wip_root.is_some() {
            tracing::debug!(?root, "restarting in-flight reconciliation pass");
            self.cancel();
        }

        let node = scene.node(root);
        let reusable = self
            .current_root
            .filter(|&cur| self.fibers.get(cur).is_some_and(|f| f.node == root));
        let wip = match reusable {
            Some(cur) => {
                let wip = self.create_work_in_progress(cur);
                if node.is_some_and(|n| n.dirty.intersects(CHANGED)) {
                    self.fiber_mut(wip).flags |= EffectFlags::UPDATE;
                }
                wip
            }
            None => {
                let fiber = match &node {
                    Some(n) => Fiber::for_node(n),
                    None => Fiber::new(
                        root,
                        NodeKind::default(),
                        ElementKind::default(),
                        FiberKey::Node(root),
                    ),
                };
                let wip = self.alloc_fiber(fiber);
                self.fiber_mut(wip).flags = EffectFlags::PLACEMENT;
                if let Some(old) = self.current_root.filter(|&id| self.fibers.contains(id)) {
                    self.fiber_mut(old).flags |= EffectFlags::DELETION;
                    let f = self.fiber_mut(wip);
                    f.deletions.push(old);
                    f.flags |= EffectFlags::CHILD_DELETION;
                }
                wip
            }
        };

        let f = self.fiber_mut(wip);
        f.parent = None;
        f.sibling = None;
        f.index = 0;
        self.wip_root = Some(wip);
        self.next_unit = Some(wip);
        self.state = PassState::Building;
        tracing::debug!(?root, reused = reusable.is_some(), "reconciliation pass scheduled");
    }

    /// Abandon the in-flight pass, if any, and free the fibers it allocated.
    ///
    /// The committed tree and the spatial index are left untouched.
    pub fn cancel(&mut self) {
        if self.wip_root.is_none() {
            return;
        }
        let freed = self.pass_allocs.len();
        for id in core::mem::take(&mut self.pass_allocs) {
            self.fibers.free(id);
        }
        self.wip_root = None;
        self.next_unit = None;
        self.state = PassState::Idle;
        self.stats.passes_discarded += 1;
        tracing::debug!(freed, "reconciliation pass discarded");
    }

    /// Advance the scheduled pass until `budget_ms` milliseconds have elapsed.
    ///
    /// Every call performs at least one unit of work, so a pass always finishes
    /// after finitely many calls. The budget is checked between units; a single
    /// unit is never split. A budget `<= 0` runs to completion. Returns `true` if work remains and the
    /// caller must call again; otherwise the pass is committed (effects go to `host`)
    /// and `false` is returned. With no pass scheduled this returns `false` at once.
    pub fn work_loop<S, H>(&mut self, scene: &S, host: &mut H, budget_ms: f64) -> bool
    where
        S: SceneView + ?Sized,
        H: EffectHost + ?Sized,
    {
        if self.wip_root.is_none() {
            return false;
        }
        self.state = PassState::Building;
        let start = self.clock.now_ms();
        while let Some(unit) = self.next_unit {
            self.next_unit = self.perform_unit_of_work(scene, unit);
            if self.next_unit.is_some()
                && budget_ms > 0.0
                && self.clock.now_ms() - start >= budget_ms
            {
                self.state = PassState::Suspended;
                tracing::debug!(
                    units_of_work = self.stats.units_of_work,
                    "reconciliation pass suspended"
                );
                return true;
            }
        }
        self.commit_root(host);
        false
    }

    fn fiber(&self, id: FiberId) -> &Fiber {
        self.fibers.get(id).expect("dangling FiberId")
    }

    fn fiber_mut(&mut self, id: FiberId) -> &mut Fiber {
        self.fibers.get_mut(id).expect("dangling FiberId")
    }

    fn alloc_fiber(&mut self, fiber: Fiber) -> FiberId {
        let id = self.fibers.alloc(fiber);
        self.pass_allocs.push(id);
        id
    }

    /// Work-in-progress copy of a committed fiber, reusing its alternate when alive.
    fn create_work_in_progress(&mut self, current: FiberId) -> FiberId {
        let cur = self.fiber(current);
        let (node, tag, element, key) = (cur.node, cur.tag, cur.element, cur.key);
        let (index, indexed) = (cur.index, cur.indexed);
        let reuse = cur.alternate.filter(|&a| self.fibers.contains(a));

        let wip = match reuse {
            Some(w) => {
                self.fiber_mut(w).reset();
                w
            }
            None => {
                let w = self.alloc_fiber(Fiber::new(node, tag, element, key));
                self.fiber_mut(current).alternate = Some(w);
                w
            }
        };
        let f = self.fiber_mut(wip);
        f.node = node;
        f.tag = tag;
        f.element = element;
        f.key = key;
        f.index = index;
        f.indexed = indexed;
        f.alternate = Some(current);
        wip
    }

    /// Begin `unit`, then complete upward until a sibling is found or the pass ends.
    fn perform_unit_of_work<S: SceneView + ?Sized>(
        &mut self,
        scene: &S,
        unit: FiberId,
    ) -> Option<FiberId> {
        self.stats.units_of_work += 1;
        if let Some(child) = self.begin_work(scene, unit) {
            return Some(child);
        }
        let mut cur = unit;
        loop {
            self.complete_work(cur);
            if Some(cur) == self.wip_root {
                return None;
            }
            let f = self.fiber(cur);
            if let Some(sibling) = f.sibling {
                return Some(sibling);
            }
            cur = f.parent?;
        }
    }

    /// Compute world geometry, then either bail out or diff the children.
    ///
    /// Returns the first child to process next, if any.
    fn begin_work<S: SceneView + ?Sized>(&mut self, scene: &S, id: FiberId) -> Option<FiberId> {
        let f = self.fiber(id);
        let (node_id, parent, alternate) = (f.node, f.parent, f.alternate);
        let had_index_entry = f.indexed.is_some();
        let node = scene.node(node_id);

        let parent_tf = parent
            .and_then(|p| self.fibers.get(p))
            .map_or(Affine::IDENTITY, |p| p.world_transform);
        let world = parent_tf * node.map_or(Affine::IDENTITY, |n| n.local_transform);
        let bounds = node.map(|n| world.transform_rect_bbox(n.local_bounds));
        let f = self.fiber_mut(id);
        f.world_transform = world;
        f.world_bounds = bounds;
        if node.is_none() && had_index_entry {
            // Dead node: the commit drops its index entry.
            f.flags |= EffectFlags::UPDATE;
        }

        let previous = alternate
            .and_then(|a| self.fibers.get(a))
            .map(|a| (a.world_transform, a.child, a.node == node_id));
        if let (Some(n), Some((prev_world, prev_child, same_node))) = (node, previous) {
            if prev_world != world {
                self.fiber_mut(id).flags |= EffectFlags::UPDATE;
            } else if same_node && !n.dirty.intersects(REDIFF) {
                self.bail_out(id, prev_child);
                return None;
            }
        }

        let children: Vec<NodeId> = node.map(|n| n.children.to_vec()).unwrap_or_default();
        self.reconcile_children(scene, id, &children);
        self.fiber(id).child
    }

    /// Adopt the previous pass's child chain without diffing it.
    fn bail_out(&mut self, id: FiberId, first: Option<FiberId>) {
        self.fiber_mut(id).child = first;
        let mut cur = first;
        while let Some(c) = cur {
            let Some(f) = self.fibers.get_mut(c) else {
                break;
            };
            f.parent = Some(id);
            cur = f.sibling;
        }
        self.stats.bailouts += 1;
    }

    /// Keyed single-pass diff of `children` against the alternate's child chain.
    fn reconcile_children<S: SceneView + ?Sized>(
        &mut self,
        scene: &S,
        parent: FiberId,
        children: &[NodeId],
    ) {
        self.stats.reconcile_children_calls += 1;

        let mut previous: BTreeMap<FiberKey, FiberId> = BTreeMap::new();
        let mut deletions = Vec::new();
        let mut cur = self
            .fiber(parent)
            .alternate
            .and_then(|a| self.fibers.get(a))
            .and_then(|a| a.child);
        while let Some(c) = cur {
            let Some(f) = self.fibers.get(c) else {
                break;
            };
            // Duplicate keys: only the last one can be matched.
            if let Some(shadowed) = previous.insert(f.key, c) {
                deletions.push(shadowed);
            }
            cur = f.sibling;
        }

        let mut first = None;
        let mut prev: Option<FiberId> = None;
        let mut position = 0;
        for &child in children {
            let Some(node) = scene.node(child) else {
                continue;
            };
            let key = FiberKey::of(&node);
            // A matching key reuses the fiber as long as the tag agrees, even when an
            // explicit key now names a different scene node.
            let reusable = match previous.remove(&key) {
                Some(old) if self.fibers.get(old).is_some_and(|f| f.tag == node.kind) => {
                    Some(old)
                }
                Some(old) => {
                    deletions.push(old);
                    None
                }
                None => None,
            };

            let id = match reusable {
                Some(old) => {
                    let moved = self.fiber(old).index != position;
                    let wip = self.create_work_in_progress(old);
                    let f = self.fiber_mut(wip);
                    if moved {
                        f.flags |= EffectFlags::MOVE;
                    }
                    if f.node != child || node.dirty.intersects(CHANGED) {
                        f.node = child;
                        f.flags |= EffectFlags::UPDATE;
                    }
                    wip
                }
                None => {
                    let wip = self.alloc_fiber(Fiber::for_node(&node));
                    self.fiber_mut(wip).flags = EffectFlags::PLACEMENT;
                    wip
                }
            };

            let f = self.fiber_mut(id);
            f.element = node.element;
            f.index = position;
            f.parent = Some(parent);
            f.sibling = None;
            match prev {
                Some(p) => self.fiber_mut(p).sibling = Some(id),
                None => first = Some(id),
            }
            prev = Some(id);
            position += 1;
        }

        deletions.extend(previous.into_values());
        for &d in &deletions {
            if let Some(f) = self.fibers.get_mut(d) {
                f.flags |= EffectFlags::DELETION;
            }
        }
        let f = self.fiber_mut(parent);
        f.child = first;
        if !deletions.is_empty() {
            f.flags |= EffectFlags::CHILD_DELETION;
            f.deletions.extend(deletions);
        }
    }

    /// Bubble this fiber's effects into its parent's `subtree_flags`.
    fn complete_work(&mut self, id: FiberId) {
        let f = self.fiber(id);
        let bubbled = f.flags | f.subtree_flags;
        let parent = f.parent;
        if let Some(p) = parent
            && let Some(pf) = self.fibers.get_mut(p)
        {
            pf.subtree_flags |= bubbled;
        }
    }

    fn commit_root<H: EffectHost + ?Sized>(&mut self, host: &mut H) {
        let Some(root) = self.wip_root.take() else {
            return;
        };
        self.next_unit = None;

        let mut commit = CommitStats::default();
        let f = self.fiber(root);
        if !(f.flags | f.subtree_flags).is_empty() {
            self.commit_deletions(root, host, &mut commit);
            self.commit_mutations(root, host, &mut commit);
        }

        self.current_root = Some(root);
        self.pass_allocs.clear();
        self.state = PassState::Idle;
        self.stats.passes_committed += 1;
        self.last_commit = commit;
        tracing::debug!(
            placements = commit.placements,
            updates = commit.updates,
            moves = commit.moves,
            deletions = commit.deletions,
            fibers_freed = commit.fibers_freed,
            indexed = self.spatial.len(),
            "reconciliation pass committed"
        );
    }

    /// Top-down walk applying every queued deletion. Clean branches are skipped.
    fn commit_deletions<H: EffectHost + ?Sized>(
        &mut self,
        root: FiberId,
        host: &mut H,
        commit: &mut CommitStats,
    ) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(f) = self.fibers.get_mut(id) else {
                continue;
            };
            let deletions = core::mem::take(&mut f.deletions);
            let descend = !f.subtree_flags.is_empty();
            let child = f.child;
            for d in deletions {
                self.commit_deletion(d, host, commit);
            }
            if descend {
                self.push_children(child, &mut stack);
            }
        }
    }

    /// Report every node of a deleted subtree (parents first), drop their index
    /// entries, release overlays, and free the fibers.
    fn commit_deletion<H: EffectHost + ?Sized>(
        &mut self,
        subtree: FiberId,
        host: &mut H,
        commit: &mut CommitStats,
    ) {
        let mut stack = vec![subtree];
        while let Some(id) = stack.pop() {
            let Some(f) = self.fibers.free(id) else {
                continue;
            };
            host.commit_effect(f.node, f.tag, Effect::Deletion);
            commit.deletions += 1;
            commit.fibers_freed += 1;
            if let Some((bounds, indexed_as)) = f.indexed {
                self.spatial.delete(bounds, indexed_as);
            }
            if f.element.hosts_overlay() {
                host.release_overlay(f.node);
            }
            if let Some(alt) = f.alternate
                && self.fibers.free(alt).is_some()
            {
                commit.fibers_freed += 1;
            }
            self.push_children(f.child, &mut stack);
        }
    }

    /// Top-down walk applying placements, moves and updates. Clean branches are skipped.
    fn commit_mutations<H: EffectHost + ?Sized>(
        &mut self,
        root: FiberId,
        host: &mut H,
        commit: &mut CommitStats,
    ) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(f) = self.fibers.get(id) else {
                continue;
            };
            let (node, tag, flags, child) = (f.node, f.tag, f.flags, f.child);
            let alternate = f.alternate;
            let descend = !f.subtree_flags.is_empty();

            if flags.intersects(SYNCED) {
                self.sync_index(id);
                // A keyed match rebound this fiber; the previous node is gone.
                if let Some(prev) = alternate.and_then(|a| self.fibers.get(a))
                    && prev.node != node
                    && prev.element.hosts_overlay()
                {
                    host.release_overlay(prev.node);
                }
                if flags.contains(EffectFlags::PLACEMENT) {
                    host.commit_effect(node, tag, Effect::Placement);
                    commit.placements += 1;
                } else {
                    if flags.contains(EffectFlags::MOVE) {
                        host.commit_effect(node, tag, Effect::Move);
                        commit.moves += 1;
                    }
                    if flags.contains(EffectFlags::UPDATE) {
                        host.commit_effect(node, tag, Effect::Update);
                        commit.updates += 1;
                    }
                }
            }
            if descend {
                self.push_children(child, &mut stack);
            }
        }
    }

    /// Push a child chain so that the first child is popped first.
    fn push_children(&self, first: Option<FiberId>, stack: &mut Vec<FiberId>) {
        let start = stack.len();
        let mut cur = first;
        while let Some(c) = cur {
            stack.push(c);
            cur = self.fibers.get(c).and_then(|f| f.sibling);
        }
        stack[start..].reverse();
    }

    /// Make the index entry for this fiber match its node and world bounds.
    fn sync_index(&mut self, id: FiberId) {
        let f = self.fiber(id);
        let old = f.indexed;
        let new = f.world_bounds.map(|r| (rect_to_aabb(r), f.node));
        if old == new {
            return;
        }
        match (old, new) {
            (Some((ob, on)), Some((nb, nn))) => {
                if !self.spatial.update(ob, on, nb, nn) {
                    self.spatial.insert(nb, nn);
                }
            }
            (None, Some((nb, nn))) => self.spatial.insert(nb, nn),
            (Some((ob, on)), None) => {
                self.spatial.delete(ob, on);
            }
            (None, None) => {}
        }
        self.fiber_mut(id).indexed = new;
    }
}

fn rect_to_aabb(r: Rect) -> Aabb2D<f64> {
    Aabb2D::new(r.x0, r.y0, r.x1, r.y1)
}
