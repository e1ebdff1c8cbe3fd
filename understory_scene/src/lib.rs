// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Scene: the design-level scene graph behind a canvas editor.
//!
//! A [`SceneGraph`] owns nodes in a generational arena. Each node has a
//! [`NodeKind`], optional interactive [`ElementKind`] semantics, an opaque [`Props`]
//! payload, a local transform and bounds (Kurbo types), and an ordered child list.
//!
//! Every edit records what changed in the node's [`DirtyFlags`] and marks all
//! ancestors [`SUBTREE`](DirtyFlags::SUBTREE) dirty. Reconciliation reads the graph
//! through the [`SceneView`] trait and uses those bits to skip clean subtrees, so
//! the graph is expected to be cleared with [`SceneGraph::clear_dirty`] after each
//! committed pass.
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Affine, Rect};
//! use understory_scene::{DirtyFlags, NodeDesc, NodeKind, SceneGraph};
//!
//! let mut scene = SceneGraph::new();
//! let page = scene.insert(None, NodeDesc::new(NodeKind::Page));
//! let frame = scene.insert(
//!     Some(page),
//!     NodeDesc::new(NodeKind::Frame).with_bounds(Rect::new(0.0, 0.0, 200.0, 100.0)),
//! );
//! scene.clear_dirty();
//!
//! scene.set_local_transform(frame, Affine::translate((10.0, 0.0)));
//! assert_eq!(scene.dirty(frame), DirtyFlags::TRANSFORM);
//! assert_eq!(scene.dirty(page), DirtyFlags::SUBTREE);
//! ```

#![no_std]

extern crate alloc;

mod graph;
mod types;
mod view;

pub use graph::SceneGraph;
pub use types::{
    DirtyFlags, ElementKind, ImageProps, NodeDesc, NodeId, NodeKind, Props, RectProps, ScaleMode,
    TextAlign, TextProps,
};
pub use view::{NodeRef, SceneView};
