// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory R-tree: a dynamic 2D R-tree over axis-aligned bounding boxes.
//!
//! - Insert `(rect, payload)` pairs, search by intersecting rectangle or point.
//! - Delete a single `(rect, payload)` occurrence; underflowing nodes are dissolved
//!   and their entries reinserted so every non-root node keeps at least
//!   `min_entries` entries.
//! - Overflowing nodes split with Guttman's quadratic algorithm.
//!
//! The tree is generic over the scalar type `T` (see [`Scalar`]) and over a small
//! copyable payload `P`, typically a handle into some other arena. It does not
//! depend on any geometry crate.
//!
//! # Example
//!
//! ```rust
//! use understory_rtree::{Aabb2D, RTreeF64};
//!
//! let mut tree = RTreeF64::new();
//! tree.insert(Aabb2D::new(0.0, 0.0, 10.0, 10.0), 'A');
//! tree.insert(Aabb2D::new(5.0, 5.0, 15.0, 15.0), 'B');
//!
//! let mut hits = tree.search(Aabb2D::new(6.0, 6.0, 7.0, 7.0));
//! hits.sort();
//! assert_eq!(hits, ['A', 'B']);
//!
//! assert!(tree.delete(Aabb2D::new(0.0, 0.0, 10.0, 10.0), 'A'));
//! assert_eq!(tree.search_point(6.0, 6.0), ['B']);
//! assert!(tree.validate().is_ok());
//! ```
//!
//! ## Fanout
//!
//! [`Fanout`] bounds the entries per node. The default `2..=4` keeps trees deep,
//! which suits small scenes; `Fanout::new(5, 10)` is a common wider choice.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates. Comparisons involving
//! NaN are treated as "not less" and "not intersecting". Inverted rectangles are
//! stored as given.

#![no_std]

extern crate alloc;

mod fanout;
mod node;
mod rtree;
mod split;
pub mod types;

pub use fanout::{Fanout, FanoutError};
pub use rtree::{RTree, RTreeF32, RTreeF64, RTreeI64, Violation};
pub use types::{Aabb2D, Scalar, area, enlargement};
