// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only access to a scene, as seen by reconciliation.

use kurbo::{Affine, Rect};

use crate::types::{DirtyFlags, ElementKind, NodeId, NodeKind, Props};

/// Borrowed snapshot of one live scene node.
#[derive(Copy, Clone, Debug)]
pub struct NodeRef<'a> {
    /// The node's identity.
    pub id: NodeId,
    /// Design-level type.
    pub kind: NodeKind,
    /// Interactive element semantics.
    pub element: ElementKind,
    /// Explicit reconciliation key, if any.
    pub key: Option<u32>,
    /// Drawable payload.
    pub props: &'a Props,
    /// Transform relative to the parent.
    pub local_transform: Affine,
    /// Untransformed bounds.
    pub local_bounds: Rect,
    /// Ordered children.
    pub children: &'a [NodeId],
    /// Pending-change bits.
    pub dirty: DirtyFlags,
}

/// A scene that can be reconciled.
///
/// Implementations must keep [`DirtyFlags`] honest: any change to a node sets a bit
/// on it and [`DirtyFlags::SUBTREE`] on every ancestor. Reconciliation skips
/// subtrees whose flags are clean.
pub trait SceneView {
    /// Look up a node. Returns `None` for stale ids.
    fn node(&self, id: NodeId) -> Option<NodeRef<'_>>;

    /// Ordered children of `id`; empty for stale ids.
    fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children).unwrap_or(&[])
    }
}
