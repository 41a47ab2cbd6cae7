//! Key-range algebra.
//!
//! A `KeyRange` is `[lower, upper)`: lower inclusive, upper exclusive. Any
//! range with `lower >= upper` is empty and contributes no rows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub lower: Key,
    pub upper: Key,
}

impl KeyRange {
    pub fn new(lower: Key, upper: Key) -> Self {
        Self { lower, upper }
    }

    /// `[<Min>, <Max>)`, every row.
    pub fn universe() -> Self {
        Self::new(Key::min(), Key::max())
    }

    /// `[<Max>, <Min>)`, the identity of `unite`.
    pub fn empty() -> Self {
        Self::new(Key::max(), Key::min())
    }

    pub fn is_empty(&self) -> bool {
        self.lower >= self.upper
    }

    pub fn intersect(&self, other: &KeyRange) -> KeyRange {
        KeyRange::new(
            self.lower.clone().max(other.lower.clone()),
            self.upper.clone().min(other.upper.clone()),
        )
    }

    /// Smallest range covering both; empty operands are ignored.
    pub fn unite(&self, other: &KeyRange) -> KeyRange {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        KeyRange::new(
            self.lower.clone().min(other.lower.clone()),
            self.upper.clone().max(other.upper.clone()),
        )
    }

    /// True if every key of `other` lies in `self`. The empty range is
    /// contained in everything.
    pub fn contains(&self, other: &KeyRange) -> bool {
        other.is_empty() || (self.lower <= other.lower && other.upper <= self.upper)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.lower <= *key && *key < self.upper
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::universe()
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.lower, self.upper)
    }
}
