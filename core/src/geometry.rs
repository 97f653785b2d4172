//! Grid geometry primitives shared by the visibility systems.
//!
//! Everything here works on integer offsets relative to an origin cell. The
//! eight [`Octant`] transforms fold any offset onto the canonical wedge
//! `0 <= y <= x`, which is the only wedge the visibility table stores.

use serde::{Deserialize, Serialize};

use crate::GridOffset;

/// Approximate distance between the origin and the offset `(dy, dx)`.
///
/// The metric is `max(|dy|, |dx|) + min(|dy|, |dx|) / 2` with the halved term
/// truncated, which is what every range and radius in the crate is measured in.
#[must_use]
pub const fn distance(dy: i32, dx: i32) -> i32 {
    let ay = dy.saturating_abs();
    let ax = dx.saturating_abs();
    if ay > ax {
        ay.saturating_add(ax >> 1)
    } else {
        ax.saturating_add(ay >> 1)
    }
}

/// One of the eight symmetric 45 degree wedges around an origin.
///
/// Variants are named after the compass direction the wedge covers, with rows
/// growing southwards and columns growing eastwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Octant {
    /// Canonical wedge, `(+y, +x)`.
    EastSouthEast,
    /// `(+x, +y)`.
    SouthSouthEast,
    /// `(+x, -y)`.
    SouthSouthWest,
    /// `(+y, -x)`.
    WestSouthWest,
    /// `(-y, -x)`.
    WestNorthWest,
    /// `(-x, -y)`.
    NorthNorthWest,
    /// `(-x, +y)`.
    NorthNorthEast,
    /// `(-y, +x)`.
    EastNorthEast,
}

/// Offset folded onto the canonical wedge `0 <= y <= x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalOffset {
    /// Offset along the minor axis.
    pub y: i32,
    /// Offset along the dominant axis.
    pub x: i32,
}

impl Octant {
    /// All octants in index order.
    pub const ALL: [Self; 8] = [
        Self::EastSouthEast,
        Self::SouthSouthEast,
        Self::SouthSouthWest,
        Self::WestSouthWest,
        Self::WestNorthWest,
        Self::NorthNorthWest,
        Self::NorthNorthEast,
        Self::EastNorthEast,
    ];

    /// Zero-based index of the octant.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Maps a canonical offset `(y, x)` into this octant.
    #[must_use]
    pub const fn transform(self, y: i32, x: i32) -> GridOffset {
        match self {
            Self::EastSouthEast => GridOffset::new(y, x),
            Self::SouthSouthEast => GridOffset::new(x, y),
            Self::SouthSouthWest => GridOffset::new(x, -y),
            Self::WestSouthWest => GridOffset::new(y, -x),
            Self::WestNorthWest => GridOffset::new(-y, -x),
            Self::NorthNorthWest => GridOffset::new(-x, -y),
            Self::NorthNorthEast => GridOffset::new(-x, y),
            Self::EastNorthEast => GridOffset::new(-y, x),
        }
    }

    /// Classifies a non-zero offset into the octant containing it.
    ///
    /// Offsets on a boundary between two octants resolve to the lower-indexed
    /// horizontal wedge. Returns `None` for the zero offset, which has no
    /// direction.
    #[must_use]
    pub const fn classify(offset: GridOffset) -> Option<(Self, CanonicalOffset)> {
        let dy = offset.dy();
        let dx = offset.dx();
        if dy == 0 && dx == 0 {
            return None;
        }

        let ay = dy.abs();
        let ax = dx.abs();
        if ax >= ay {
            let octant = match (dy >= 0, dx > 0) {
                (true, true) => Self::EastSouthEast,
                (true, false) => Self::WestSouthWest,
                (false, false) => Self::WestNorthWest,
                (false, true) => Self::EastNorthEast,
            };
            Some((octant, CanonicalOffset { y: ay, x: ax }))
        } else {
            let octant = match (dy > 0, dx >= 0) {
                (true, true) => Self::SouthSouthEast,
                (true, false) => Self::SouthSouthWest,
                (false, false) => Self::NorthNorthWest,
                (false, true) => Self::NorthNorthEast,
            };
            Some((octant, CanonicalOffset { y: ax, x: ay }))
        }
    }
}
