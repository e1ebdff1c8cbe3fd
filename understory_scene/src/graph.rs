// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph arena: structure edits, property updates, dirty tracking.

use alloc::vec;
use alloc::vec::Vec;
use kurbo::{Affine, Rect};

use crate::types::{DirtyFlags, NodeDesc, NodeId, Props};
use crate::view::{NodeRef, SceneView};

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Owning scene graph.
///
/// Nodes live in slots addressed by generational [`NodeId`]s. A graph may hold
/// several detached roots; reconciliation is scheduled on one of them.
pub struct SceneGraph {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
}

impl core::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let dirty = self
            .nodes
            .iter()
            .flatten()
            .filter(|n| !n.dirty.is_empty())
            .count();
        f.debug_struct("SceneGraph")
            .field("nodes_total", &total)
            .field("nodes_alive", &self.len())
            .field("nodes_dirty", &dirty)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    desc: NodeDesc,
    dirty: DirtyFlags,
}

impl Node {
    fn new(generation: u32, desc: NodeDesc) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            desc,
            dirty: DirtyFlags::CONTENT | DirtyFlags::LAYOUT,
        }
    }
}

impl SceneGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Whether the graph has no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a node, appended as the last child of `parent` (or detached if `None`).
    ///
    /// New nodes start [`CONTENT`](DirtyFlags::CONTENT) | [`LAYOUT`](DirtyFlags::LAYOUT)
    /// dirty. A stale `parent` leaves the node detached.
    pub fn insert(&mut self, parent: Option<NodeId>, desc: NodeDesc) -> NodeId {
        let id = self.alloc(desc);
        if let Some(p) = parent {
            self.append_child(p, id);
        }
        id
    }

    fn alloc(&mut self, desc: NodeDesc) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, desc));
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, desc)));
            self.generations.push(generation);
            (self.nodes.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "NodeId uses 32-bit indices by design."
        )]
        let idx = idx as u32;
        NodeId::new(idx, generation)
    }

    /// Returns `true` if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Parent of a live node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Ordered children of `id`; empty for stale ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Whether `id` has at least one child.
    pub fn has_children(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    /// Pending-change bits of `id`; empty for stale ids.
    pub fn dirty(&self, id: NodeId) -> DirtyFlags {
        self.get(id).map(|n| n.dirty).unwrap_or_default()
    }

    /// Creation data of a live node, as last edited.
    pub fn desc(&self, id: NodeId) -> Option<&NodeDesc> {
        self.get(id).map(|n| &n.desc)
    }

    /// Whether `node` is `ancestor` itself or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.is_alive(ancestor) {
            return false;
        }
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// Parent that a newly created node should be placed in.
    ///
    /// With an empty selection this is `page`. Otherwise the first selected node is
    /// used if it is a container, else its parent, else `page`.
    pub fn insert_target(&self, selection: &[NodeId], page: NodeId) -> NodeId {
        let Some(&target) = selection.first() else {
            return page;
        };
        let Some(node) = self.get(target) else {
            return page;
        };
        if node.desc.kind.is_container() {
            target
        } else {
            node.parent.unwrap_or(page)
        }
    }

    /// Append `child` as the last child of `parent`, detaching it from any previous parent.
    ///
    /// Returns `false` if either id is stale or the edit would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.can_adopt(parent, child) {
            return false;
        }
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.attach(parent, child);
        true
    }

    /// Insert `child` into `parent` right before `before`.
    ///
    /// Returns `false` if `before` is not a child of `parent`, if `child == before`,
    /// or under the same conditions as [`append_child`](Self::append_child).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) -> bool {
        if child == before || self.parent(before) != Some(parent) {
            return false;
        }
        if !self.can_adopt(parent, child) {
            return false;
        }
        self.detach(child);
        let siblings = &mut self.node_mut(parent).children;
        let Some(pos) = siblings.iter().position(|c| *c == before) else {
            return false;
        };
        siblings.insert(pos, child);
        self.attach(parent, child);
        true
    }

    /// Detach `child` from `parent`. The child stays alive as a detached root.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.is_alive(child) || self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        true
    }

    /// Put `new_child` in `old_child`'s position under `parent`; `old_child` becomes detached.
    pub fn replace_child(&mut self, parent: NodeId, old_child: NodeId, new_child: NodeId) -> bool {
        if old_child == new_child || self.parent(old_child) != Some(parent) {
            return false;
        }
        if !self.can_adopt(parent, new_child) {
            return false;
        }
        self.detach(new_child);
        let siblings = &mut self.node_mut(parent).children;
        let Some(pos) = siblings.iter().position(|c| *c == old_child) else {
            return false;
        };
        siblings[pos] = new_child;
        self.node_mut(old_child).parent = None;
        self.attach(parent, new_child);
        true
    }

    /// Move `id` under `new_parent` (appended last), or detach it when `None`.
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> bool {
        match new_parent {
            Some(p) => self.append_child(p, id),
            None => {
                if !self.is_alive(id) {
                    return false;
                }
                self.detach(id);
                true
            }
        }
    }

    /// Remove a node and its whole subtree, freeing their slots.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        let mut freed = 0_usize;
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes[n.idx()].take() {
                stack.extend(node.children);
                self.free_list.push(n.idx());
                freed += 1;
            }
        }
        tracing::trace!(freed, "scene subtree removed");
    }

    /// Replace the props of a node. Marks it [`CONTENT`](DirtyFlags::CONTENT) dirty.
    pub fn set_props(&mut self, id: NodeId, props: Props) {
        if let Some(n) = self.node_opt_mut(id) {
            n.desc.props = props;
            self.mark_dirty(id, DirtyFlags::CONTENT);
        }
    }

    /// Replace the local transform. Marks it [`TRANSFORM`](DirtyFlags::TRANSFORM) dirty.
    pub fn set_local_transform(&mut self, id: NodeId, transform: Affine) {
        if let Some(n) = self.node_opt_mut(id) {
            n.desc.local_transform = transform;
            self.mark_dirty(id, DirtyFlags::TRANSFORM);
        }
    }

    /// Replace the local bounds. Marks it [`LAYOUT`](DirtyFlags::LAYOUT) dirty.
    pub fn set_local_bounds(&mut self, id: NodeId, bounds: Rect) {
        if let Some(n) = self.node_opt_mut(id) {
            n.desc.local_bounds = bounds;
            self.mark_dirty(id, DirtyFlags::LAYOUT);
        }
    }

    /// Replace the explicit key. Marks it [`CONTENT`](DirtyFlags::CONTENT) dirty.
    pub fn set_key(&mut self, id: NodeId, key: Option<u32>) {
        if let Some(n) = self.node_opt_mut(id) {
            n.desc.key = key;
            self.mark_dirty(id, DirtyFlags::CONTENT);
        }
    }

    /// Set `flags` on a node and bubble [`SUBTREE`](DirtyFlags::SUBTREE) up its ancestors.
    ///
    /// Bubbling stops at the first ancestor already marked `SUBTREE`; everything
    /// above it is marked too.
    pub fn mark_dirty(&mut self, id: NodeId, flags: DirtyFlags) {
        let Some(n) = self.node_opt_mut(id) else {
            return;
        };
        n.dirty |= flags;
        let mut cur = n.parent;
        while let Some(p) = cur {
            let Some(pn) = self.node_opt_mut(p) else {
                break;
            };
            if pn.dirty.contains(DirtyFlags::SUBTREE) {
                break;
            }
            pn.dirty |= DirtyFlags::SUBTREE;
            cur = pn.parent;
        }
    }

    /// Clear every node's dirty bits, typically right after a committed pass.
    pub fn clear_dirty(&mut self) {
        for n in self.nodes.iter_mut().flatten() {
            n.dirty = DirtyFlags::empty();
        }
    }

    /// Deep-copy `id` and its subtree into fresh, detached nodes.
    ///
    /// Clones drop explicit keys so they never collide with the original among siblings.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        let desc = self.get(id)?.desc.clone();
        let root = self.alloc(NodeDesc { key: None, ..desc });
        let mut stack = vec![(id, root)];
        while let Some((src, dst)) = stack.pop() {
            let children = self.children(src).to_vec();
            for c in children {
                let Some(desc) = self.desc(c).cloned() else {
                    continue;
                };
                let copy = self.alloc(NodeDesc { key: None, ..desc });
                self.node_mut(dst).children.push(copy);
                self.node_mut(copy).parent = Some(dst);
                stack.push((c, copy));
            }
        }
        Some(root)
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.idx())?
            .as_ref()
            .filter(|n| n.generation == id.1)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.idx())?
            .as_mut()
            .filter(|n| n.generation == id.1)
    }

    /// Panics if `id` is stale; callers check liveness first.
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.node_opt_mut(id).expect("dangling NodeId")
    }

    fn can_adopt(&self, parent: NodeId, child: NodeId) -> bool {
        self.is_alive(parent) && self.is_alive(child) && !self.contains(child, parent)
    }

    /// Unlink `id` from its parent, marking the parent's child list changed.
    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.node_opt_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        self.node_mut(id).parent = None;
        self.mark_dirty(parent, DirtyFlags::LAYOUT);
    }

    /// Finish linking `child` under `parent` after it was placed in the child list.
    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.mark_dirty(parent, DirtyFlags::LAYOUT);
        self.mark_dirty(child, DirtyFlags::TRANSFORM);
    }
}

impl SceneView for SceneGraph {
    fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        let n = self.get(id)?;
        Some(NodeRef {
            id,
            kind: n.desc.kind,
            element: n.desc.element,
            key: n.desc.key,
            props: &n.desc.props,
            local_transform: n.desc.local_transform,
            local_bounds: n.desc.local_bounds,
            children: &n.children,
            dirty: n.dirty,
        })
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        Self::children(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ElementKind, NodeKind, TextProps};

    fn group() -> NodeDesc {
        NodeDesc::new(NodeKind::Group)
    }

    #[test]
    fn liveness_insert_remove_reuse() {
        let mut g = SceneGraph::new();
        let root = g.insert(None, NodeDesc::new(NodeKind::Page));
        let a = g.insert(Some(root), group());
        let b = g.insert(Some(a), group());
        assert_eq!(g.len(), 3);
        assert_eq!(g.children(root), &[a]);

        g.remove(a);
        assert!(!g.is_alive(a));
        assert!(!g.is_alive(b));
        assert!(g.children(root).is_empty());

        let c = g.insert(Some(root), group());
        assert!(g.is_alive(c));
        assert!(!g.is_alive(a), "reused slot must not revive the stale id");
        assert_ne!(a, c);
    }

    #[test]
    fn new_nodes_start_dirty_and_bubble() {
        let mut g = SceneGraph::new();
        let root = g.insert(None, NodeDesc::new(NodeKind::Page));
        let a = g.insert(Some(root), group());
        assert!(g.dirty(a).contains(DirtyFlags::CONTENT | DirtyFlags::LAYOUT));
        assert!(g.dirty(root).contains(DirtyFlags::SUBTREE | DirtyFlags::LAYOUT));
    }

    #[test]
    fn mutations_bubble_subtree_to_every_ancestor() {
        let mut g = SceneGraph::new();
        let root = g.insert(None, NodeDesc::new(NodeKind::Page));
        let a = g.insert(Some(root), group());
        let b = g.insert(Some(a), group());
        let c = g.insert(Some(b), group());
        g.clear_dirty();

        g.set_local_bounds(c, Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(g.dirty(c), DirtyFlags::LAYOUT);
        for id in [b, a, root] {
            assert_eq!(g.dirty(id), DirtyFlags::SUBTREE);
        }

        g.clear_dirty();
        g.set_props(b, Props::Text(TextProps::default()));
        assert_eq!(g.dirty(b), DirtyFlags::CONTENT);
        assert_eq!(g.dirty(c), DirtyFlags::empty());
        assert_eq!(g.dirty(root), DirtyFlags::SUBTREE);
    }

    #[test]
    fn child_edits_mark_parent_layout() {
        let mut g = SceneGraph::new();
        let root = g.insert(None, NodeDesc::new(NodeKind::Page));
        let a = g.insert(Some(root), group());
        let b = g.insert(Some(root), group());
        let c = g.insert(None, group());
        g.clear_dirty();

        assert!(g.insert_before(root, c, b));
        assert_eq!(g.children(root), &[a, c, b]);
        assert!(g.dirty(root).contains(DirtyFlags::LAYOUT));

        g.clear_dirty();
        assert!(g.remove_child(root, a));
        assert_eq!(g.children(root), &[c, b]);
        assert_eq!(g.parent(a), None);
        assert!(g.dirty(root).contains(DirtyFlags::LAYOUT));

        assert!(g.replace_child(root, b, a));
        assert_eq!(g.children(root), &[c, a]);
        assert_eq!(g.parent(b), None);
        assert_eq!(g.parent(a), Some(root));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut g = SceneGraph::new();
        let root = g.insert(None, group());
        let a = g.insert(Some(root), group());
        let b = g.insert(Some(a), group());
        assert!(!g.append_child(b, root));
        assert!(!g.append_child(a, a));
        assert!(g.contains(root, b));
        assert!(!g.contains(b, root));
        assert!(g.reparent(b, Some(root)));
        assert_eq!(g.children(root), &[a, b]);
        assert!(!g.has_children(a));
    }

    #[test]
    fn insert_target_prefers_containers() {
        let mut g = SceneGraph::new();
        let page = g.insert(None, NodeDesc::new(NodeKind::Page));
        let frame = g.insert(Some(page), NodeDesc::new(NodeKind::Frame));
        let shape = g.insert(Some(frame), NodeDesc::new(NodeKind::Polygon));
        let loose = g.insert(None, NodeDesc::new(NodeKind::Text));

        assert_eq!(g.insert_target(&[], page), page);
        assert_eq!(g.insert_target(&[frame], page), frame);
        assert_eq!(g.insert_target(&[shape, page], page), frame);
        assert_eq!(g.insert_target(&[loose], page), page);
    }

    #[test]
    fn clone_subtree_gets_fresh_ids() {
        let mut g = SceneGraph::new();
        let root = g.insert(None, group().with_key(7));
        let a = g.insert(
            Some(root),
            NodeDesc::new(NodeKind::Text).with_element(ElementKind::Input),
        );
        let _b = g.insert(Some(a), group());

        let copy = g.clone_subtree(root).unwrap();
        assert_ne!(copy, root);
        assert_eq!(g.parent(copy), None);
        assert_eq!(g.len(), 6);
        assert_eq!(g.desc(copy).unwrap().key, None);
        let [ca] = g.children(copy) else {
            panic!("clone should have one child");
        };
        assert_ne!(*ca, a);
        assert_eq!(g.desc(*ca).unwrap().element, ElementKind::Input);
        assert_eq!(g.children(*ca).len(), 1);
    }

    #[test]
    fn view_exposes_node_data() {
        let mut g = SceneGraph::new();
        let root = g.insert(
            None,
            NodeDesc::new(NodeKind::Frame).with_bounds(Rect::new(0.0, 0.0, 10.0, 20.0)),
        );
        let a = g.insert(Some(root), group());
        let view = g.node(root).unwrap();
        assert_eq!(view.kind, NodeKind::Frame);
        assert_eq!(view.children, &[a]);
        assert_eq!(view.local_bounds, Rect::new(0.0, 0.0, 10.0, 20.0));
        g.remove(root);
        assert!(g.node(root).is_none());
        assert!(SceneView::children(&g, root).is_empty());
    }
}
