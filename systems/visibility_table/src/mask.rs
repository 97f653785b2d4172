//! Fixed-size bitset over the sorted sight lines.

use std::ops::{BitAnd, BitOr};

/// Set of sight lines, indexed by their position in the sorted slope table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SightMask(u128);

impl SightMask {
    /// Number of sight lines a mask can hold.
    pub const CAPACITY: usize = 128;

    /// The mask holding no sight line.
    pub const EMPTY: Self = Self(0);

    /// Mask holding sight lines `0..count`.
    #[must_use]
    pub const fn full(count: usize) -> Self {
        if count >= Self::CAPACITY {
            Self(u128::MAX)
        } else {
            Self((1u128 << count) - 1)
        }
    }

    /// Mask holding the single sight line `index`.
    #[must_use]
    pub const fn single(index: usize) -> Self {
        if index < Self::CAPACITY {
            Self(1u128 << index)
        } else {
            Self::EMPTY
        }
    }

    /// Adds a sight line to the mask. Indices past the capacity are ignored.
    pub fn insert(&mut self, index: usize) {
        self.0 |= Self::single(index).0;
    }

    /// Reports whether the mask holds the sight line.
    #[must_use]
    pub const fn contains(self, index: usize) -> bool {
        self.0 & Self::single(index).0 != 0
    }

    /// Sight lines held by either mask.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Sight lines held by both masks.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Sight lines held by `self` but not by `other`.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Removes every sight line held by `other`.
    pub fn clear(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Reports whether the masks share a sight line.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Reports whether any sight line is held.
    #[must_use]
    pub const fn any(self) -> bool {
        self.0 != 0
    }

    /// Number of sight lines held.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterates over the held sight lines in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..Self::CAPACITY).filter(move |index| bits & (1u128 << index) != 0)
    }
}

impl BitOr for SightMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for SightMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}
