// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node fanout configuration.

use core::fmt;

/// Minimum and maximum number of entries per non-root node.
///
/// The default is `2..=4`, which keeps trees tall enough that splits and
/// condensation are exercised even with small inputs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fanout {
    min_entries: usize,
    max_entries: usize,
}

impl Fanout {
    const MIN_ENTRIES_FLOOR: usize = 1;

    /// Validate and build a fanout.
    ///
    /// Requires `min_entries >= 1` and `max_entries >= 2 * min_entries`, so that an
    /// overflowing node (`max_entries + 1` entries) can always be split into two
    /// groups of at least `min_entries`.
    pub const fn new(min_entries: usize, max_entries: usize) -> Result<Self, FanoutError> {
        if min_entries < Self::MIN_ENTRIES_FLOOR {
            return Err(FanoutError::MinTooSmall);
        }
        if max_entries < 2 * min_entries {
            return Err(FanoutError::MaxTooSmall {
                min_entries,
                max_entries,
            });
        }
        Ok(Self {
            min_entries,
            max_entries,
        })
    }

    /// Minimum entries for every non-root node.
    pub const fn min_entries(&self) -> usize {
        self.min_entries
    }

    /// Maximum entries for every node.
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl Default for Fanout {
    fn default() -> Self {
        Self {
            min_entries: 2,
            max_entries: 4,
        }
    }
}

/// Rejected [`Fanout`] configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FanoutError {
    /// `min_entries` was zero.
    MinTooSmall,
    /// `max_entries` was below `2 * min_entries`.
    MaxTooSmall {
        /// Requested minimum.
        min_entries: usize,
        /// Requested maximum.
        max_entries: usize,
    },
}

impl fmt::Display for FanoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinTooSmall => f.write_str("min_entries must be at least 1"),
            Self::MaxTooSmall {
                min_entries,
                max_entries,
            } => write!(
                f,
                "max_entries ({max_entries}) must be at least twice min_entries ({min_entries})"
            ),
        }
    }
}

impl core::error::Error for FanoutError {}
