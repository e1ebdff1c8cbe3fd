// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Fiber: an incremental, time-budgeted reconciler for scene graphs.
//!
//! A [`Reconciler`] mirrors a scene (anything implementing
//! [`SceneView`](understory_scene::SceneView)) in a tree of fibers. Each pass builds
//! a work-in-progress tree next to the committed one, diffing every child list by
//! key and skipping subtrees whose nodes are clean. When the pass is done the
//! effects are applied to an [`EffectHost`] and the two trees swap roles.
//!
//! - Work runs in small units, so [`Reconciler::work_loop`] can stop when its time
//!   budget is spent and pick up where it left off on the next call. Nothing is
//!   visible to the host until the final call commits.
//! - Deletions are applied first, then placements, moves and updates top-down.
//! - Every commit brings an R-tree of world-space bounds up to date, so hit tests
//!   against [`Reconciler::query_point`] always see the committed scene.
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use understory_fiber::{Effect, EffectLog, Reconciler, StdClock};
//! use understory_scene::{NodeDesc, NodeKind, SceneGraph};
//!
//! let mut scene = SceneGraph::new();
//! let page = scene.insert(None, NodeDesc::new(NodeKind::Page));
//! let card = scene.insert(
//!     Some(page),
//!     NodeDesc::new(NodeKind::Frame).with_bounds(Rect::new(0.0, 0.0, 100.0, 50.0)),
//! );
//!
//! let mut reconciler = Reconciler::new(StdClock::new());
//! let mut log = EffectLog::default();
//! reconciler.schedule_update(&scene, page);
//! while reconciler.work_loop(&scene, &mut log, 4.0) {
//!     // Yield to the host, then resume.
//! }
//! scene.clear_dirty();
//!
//! assert_eq!(log.effects_for(card), [Effect::Placement]);
//! assert_eq!(reconciler.query_point(Point::new(10.0, 10.0)), [card]);
//! ```
//!
//! ## Scene edits during a pass
//!
//! The scene must stay unchanged between the `work_loop` calls of one pass. To pick
//! up edits, call [`Reconciler::schedule_update`] again: the in-flight pass is
//! discarded and a new one starts from the committed tree.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod clock;
mod fiber;
mod host;
mod reconciler;
mod stats;
mod types;

#[cfg(feature = "std")]
pub use clock::StdClock;
pub use clock::Clock;
pub use host::{EffectHost, EffectLog};
pub use reconciler::Reconciler;
pub use stats::{CommitStats, ReconcilerStats};
pub use types::{Effect, EffectFlags, FiberId, FiberKey, PassState};
