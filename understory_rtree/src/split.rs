// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quadratic-cost node split.
//!
//! 1. `pick_seeds` scans all pairs and keeps the pair wasting the most area when
//!    covered by one box: `area(a ∪ b) - area(a) - area(b)`.
//! 2. `pick_next` repeatedly selects the unassigned entry with the strongest
//!    preference, i.e. the largest `|d1 - d2|` between its enlargement costs for
//!    the two groups, and assigns it to the cheaper group.
//! 3. Once a group can only reach `min_entries` by taking every remaining entry,
//!    all remaining entries go to that group.

use alloc::vec;
use alloc::vec::Vec;

use crate::node::Entry;
use crate::types::{Aabb2D, Scalar, abs_diff, area, enlargement, lt, union_aabb};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

struct Group<T> {
    mbr: Aabb2D<T>,
    count: usize,
}

impl<T: Scalar> Group<T> {
    fn seeded(mbr: Aabb2D<T>) -> Self {
        Self { mbr, count: 1 }
    }

    fn add(&mut self, mbr: Aabb2D<T>) {
        self.mbr = union_aabb(self.mbr, mbr);
        self.count += 1;
    }
}

/// Split an overflowing entry list into two groups of at least `min_entries` each.
///
/// The first group is meant to stay in the original node; the second moves to a
/// new sibling.
pub(crate) fn quadratic_split<T: Scalar, P>(
    entries: Vec<Entry<T, P>>,
    min_entries: usize,
) -> (Vec<Entry<T, P>>, Vec<Entry<T, P>>) {
    let n = entries.len();
    debug_assert!(n >= 2, "split needs at least two entries");

    let (s1, s2) = pick_seeds(&entries);
    let mut side: Vec<Option<Side>> = vec![None; n];
    side[s1] = Some(Side::First);
    side[s2] = Some(Side::Second);
    let mut first = Group::seeded(entries[s1].mbr);
    let mut second = Group::seeded(entries[s2].mbr);
    let mut remaining = n.saturating_sub(2);

    while remaining > 0 {
        let forced = if first.count + remaining <= min_entries {
            Some(Side::First)
        } else if second.count + remaining <= min_entries {
            Some(Side::Second)
        } else {
            None
        };
        if let Some(target) = forced {
            for s in side.iter_mut().filter(|s| s.is_none()) {
                *s = Some(target);
            }
            break;
        }

        let Some(next) = pick_next(&entries, &side, &first.mbr, &second.mbr) else {
            break;
        };
        let mbr = entries[next].mbr;
        let target = choose_side(&first, &second, &mbr);
        side[next] = Some(target);
        match target {
            Side::First => first.add(mbr),
            Side::Second => second.add(mbr),
        }
        remaining -= 1;
    }

    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);
    for (entry, s) in entries.into_iter().zip(side) {
        match s {
            Some(Side::Second) => right.push(entry),
            _ => left.push(entry),
        }
    }
    (left, right)
}

/// Index pair (i < j) maximizing wasted area. Falls back to `(0, 1)`.
fn pick_seeds<T: Scalar, P>(entries: &[Entry<T, P>]) -> (usize, usize) {
    let mut best: Option<(T::Acc, usize, usize)> = None;
    for (i, a) in entries.iter().enumerate() {
        for (j, b) in entries.iter().enumerate().skip(i + 1) {
            let waste = area(&union_aabb(a.mbr, b.mbr)) - area(&a.mbr) - area(&b.mbr);
            if best.is_none_or(|(w, _, _)| lt(w, waste)) {
                best = Some((waste, i, j));
            }
        }
    }
    best.map(|(_, i, j)| (i, j)).unwrap_or((0, 1))
}

fn pick_next<T: Scalar, P>(
    entries: &[Entry<T, P>],
    side: &[Option<Side>],
    mbr1: &Aabb2D<T>,
    mbr2: &Aabb2D<T>,
) -> Option<usize> {
    let mut best: Option<(T::Acc, usize)> = None;
    for (i, e) in entries.iter().enumerate() {
        if side[i].is_some() {
            continue;
        }
        let diff = abs_diff(enlargement(mbr1, &e.mbr), enlargement(mbr2, &e.mbr));
        if best.is_none_or(|(d, _)| lt(d, diff)) {
            best = Some((diff, i));
        }
    }
    best.map(|(_, i)| i)
}

/// Smaller enlargement wins, then smaller group area, then fewer members.
fn choose_side<T: Scalar>(first: &Group<T>, second: &Group<T>, mbr: &Aabb2D<T>) -> Side {
    let d1 = enlargement(&first.mbr, mbr);
    let d2 = enlargement(&second.mbr, mbr);
    if lt(d1, d2) {
        return Side::First;
    }
    if lt(d2, d1) {
        return Side::Second;
    }
    let a1 = area(&first.mbr);
    let a2 = area(&second.mbr);
    if lt(a1, a2) {
        Side::First
    } else if lt(a2, a1) {
        Side::Second
    } else if first.count <= second.count {
        Side::First
    } else {
        Side::Second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(x0: f64, y0: f64, x1: f64, y1: f64, p: u32) -> Entry<f64, u32> {
        Entry::leaf(Aabb2D::new(x0, y0, x1, y1), p)
    }

    fn payloads(v: &[Entry<f64, u32>]) -> Vec<u32> {
        let mut out: Vec<u32> = v
            .iter()
            .filter_map(|e| match e.child {
                crate::node::Child::Leaf(p) => Some(p),
                crate::node::Child::Node(_) => None,
            })
            .collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn seeds_are_the_most_wasteful_pair() {
        let entries = vec![
            leaf(0.0, 0.0, 1.0, 1.0, 0),
            leaf(1.0, 1.0, 2.0, 2.0, 1),
            leaf(100.0, 100.0, 101.0, 101.0, 2),
            leaf(2.0, 0.0, 3.0, 1.0, 3),
        ];
        assert_eq!(pick_seeds(&entries), (0, 2));
    }

    #[test]
    fn clusters_end_up_in_separate_groups() {
        let entries = vec![
            leaf(0.0, 0.0, 1.0, 1.0, 0),
            leaf(100.0, 100.0, 101.0, 101.0, 1),
            leaf(1.0, 1.0, 2.0, 2.0, 2),
            leaf(101.0, 101.0, 102.0, 102.0, 3),
            leaf(2.0, 2.0, 3.0, 3.0, 4),
        ];
        let (a, b) = quadratic_split(entries, 2);
        assert_eq!(payloads(&a), vec![0, 2, 4]);
        assert_eq!(payloads(&b), vec![1, 3]);
    }

    #[test]
    fn forced_assignment_respects_minimum() {
        // One far outlier: without forcing, the outlier's group would stay at one entry.
        let entries = vec![
            leaf(0.0, 0.0, 1.0, 1.0, 0),
            leaf(1.0, 0.0, 2.0, 1.0, 1),
            leaf(0.0, 1.0, 1.0, 2.0, 2),
            leaf(1.0, 1.0, 2.0, 2.0, 3),
            leaf(500.0, 500.0, 501.0, 501.0, 4),
        ];
        let (a, b) = quadratic_split(entries, 2);
        assert!(a.len() >= 2 && b.len() >= 2, "both groups reach min_entries");
        assert_eq!(a.len() + b.len(), 5);
    }

    #[test]
    fn identical_rects_split_evenly_enough() {
        let entries: Vec<_> = (0..5).map(|p| leaf(0.0, 0.0, 1.0, 1.0, p)).collect();
        let (a, b) = quadratic_split(entries, 2);
        assert!(a.len() >= 2 && b.len() >= 2, "ties fall back to member counts");
    }
}
