#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Static sight-line table shared by the field of view and path tracer.
//!
//! The table describes one octant of the disc of radius [`MAX_SIGHT`]. Every
//! cell `(y, x)` with `0 <= y <= x` inside the disc gets an entry listing the
//! sight lines (rational slopes through cell corners) that pass through its
//! interior, the slope of the line of fire through its centre, and links to
//! the two cells one step further out. Entries are stored in breadth-first
//! order, so walking them front to back moves outward from the origin.
//!
//! The table is built once and never mutated. Consumers either own a
//! [`VisibilityTable`] or share the process-wide copy installed by
//! [`init_global`].

mod mask;
mod walk;

use std::sync::OnceLock;

use dungeon_sight_core::{distance, GridOffset, Octant, MAX_SIGHT};
use log::{error, info};
use thiserror::Error;

pub use mask::SightMask;
pub use walk::TableWalk;

/// Fixed-point factor applied to every stored slope.
pub const SLOPE_SCALE: i64 = 100_000;

/// Number of entries in the table built for [`MAX_SIGHT`].
pub const TABLE_CELLS: usize = 161;

/// Number of distinct sight lines in the table built for [`MAX_SIGHT`].
pub const TABLE_SLOPES: usize = 126;

const MAX_TABLE_RADIUS: i32 = 40;

/// Radius and expected sizes a table is built and validated against.
///
/// The expected sizes must be regenerated whenever the radius changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TableConfig {
    /// Radius of the disc covered by the table.
    pub radius: i32,
    /// Number of canonical cells inside the disc.
    pub expected_cells: usize,
    /// Number of distinct sight lines through those cells.
    pub expected_slopes: usize,
}

impl TableConfig {
    /// Configuration matching [`MAX_SIGHT`].
    pub const STANDARD: Self = Self {
        radius: MAX_SIGHT,
        expected_cells: TABLE_CELLS,
        expected_slopes: TABLE_SLOPES,
    };
}

/// Configuration errors detected while building the table.
///
/// None of these can be recovered from: every consumer assumes a correct table.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// The radius cannot be represented by the table.
    #[error("table radius {radius} is outside 1..={MAX_TABLE_RADIUS}")]
    InvalidRadius {
        /// Requested radius.
        radius: i32,
    },
    /// More cells than expected lie inside the disc.
    #[error("more than {expected} cells lie within the sight radius")]
    TooManyCells {
        /// Expected cell count.
        expected: usize,
    },
    /// Fewer cells than expected lie inside the disc.
    #[error("expected {expected} cells within the sight radius, found {found}")]
    CellCountMismatch {
        /// Expected cell count.
        expected: usize,
        /// Cells found.
        found: usize,
    },
    /// The sight lines do not fit the mask.
    #[error("more than {} sight lines cross the disc", SightMask::CAPACITY)]
    TooManySlopes,
    /// A different number of sight lines than expected was found.
    #[error("expected {expected} sight lines, found {found}")]
    SlopeCountMismatch {
        /// Expected slope count.
        expected: usize,
        /// Slopes found.
        found: usize,
    },
    /// The origin's children do not cover every sight line.
    #[error("{missing} sight lines are not covered by the origin's children")]
    IncompleteCoverage {
        /// Number of sight lines missing from the union.
        missing: u32,
    },
}

/// Line-of-fire slopes through the centre of an entry.
///
/// `low == high` when a stored sight line passes exactly through the centre;
/// otherwise the centre line lies strictly between the two neighbouring
/// sight lines. Cells on the axis use the shallowest sight line alone, since
/// it only ever crosses row zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FireSlopes {
    low: u8,
    high: u8,
}

impl FireSlopes {
    fn exact(index: usize) -> Self {
        let index = u8::try_from(index).unwrap_or(u8::MAX);
        Self {
            low: index,
            high: index,
        }
    }

    fn between(low: usize, high: usize) -> Self {
        Self {
            low: u8::try_from(low).unwrap_or(u8::MAX),
            high: u8::try_from(high).unwrap_or(u8::MAX),
        }
    }

    /// Index of the lower (or only) sight line.
    #[must_use]
    pub const fn low(&self) -> usize {
        self.low as usize
    }

    /// Index of the upper (or only) sight line.
    #[must_use]
    pub const fn high(&self) -> usize {
        self.high as usize
    }

    /// Whether a single sight line passes exactly through the centre.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.low == self.high
    }

    /// Mask holding the one or two sight lines.
    #[must_use]
    pub const fn mask(&self) -> SightMask {
        SightMask::single(self.low as usize).union(SightMask::single(self.high as usize))
    }
}

/// Precomputed data for one canonical cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TableEntry {
    offsets: [GridOffset; 8],
    mask: SightMask,
    fire: FireSlopes,
    straight: u16,
    diagonal: u16,
    y: u8,
    x: u8,
    distance: u8,
    ring: u8,
}

impl TableEntry {
    fn pending(y: i32, x: i32) -> Self {
        Self {
            offsets: Octant::ALL.map(|octant| octant.transform(y, x)),
            mask: SightMask::EMPTY,
            fire: FireSlopes::default(),
            straight: 0,
            diagonal: 0,
            y: u8::try_from(y).unwrap_or(u8::MAX),
            x: u8::try_from(x).unwrap_or(u8::MAX),
            distance: u8::try_from(distance(y, x)).unwrap_or(u8::MAX),
            ring: 0,
        }
    }

    /// Offset of this cell from the origin inside the provided octant.
    #[must_use]
    pub const fn offset(&self, octant: Octant) -> GridOffset {
        self.offsets[octant.index()]
    }

    /// Sight lines crossing the interior of the cell.
    #[must_use]
    pub const fn mask(&self) -> SightMask {
        self.mask
    }

    /// Line-of-fire slopes through the centre of the cell.
    #[must_use]
    pub const fn fire(&self) -> FireSlopes {
        self.fire
    }

    /// Index of the child one step along the dominant axis, `0` when none.
    #[must_use]
    pub const fn straight(&self) -> usize {
        self.straight as usize
    }

    /// Index of the child one step along both axes, `0` when none.
    #[must_use]
    pub const fn diagonal(&self) -> usize {
        self.diagonal as usize
    }

    /// Both children, straight first.
    #[must_use]
    pub const fn children(&self) -> [usize; 2] {
        [self.straight(), self.diagonal()]
    }

    /// Canonical minor-axis offset.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y as i32
    }

    /// Canonical dominant-axis offset.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x as i32
    }

    /// Approximate distance from the origin.
    #[must_use]
    pub const fn distance(&self) -> i32 {
        self.distance as i32
    }

    /// Distance along the axis or the diagonal; zero for every other cell.
    #[must_use]
    pub const fn ring(&self) -> i32 {
        self.ring as i32
    }
}

/// Immutable sight-line table for one octant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibilityTable {
    radius: i32,
    slopes: Vec<i64>,
    entries: Vec<TableEntry>,
    lookup: Vec<Option<u16>>,
    full_mask: SightMask,
}

impl VisibilityTable {
    /// Index of the origin entry.
    pub const ORIGIN: usize = 0;

    /// Indices of the origin's straight and diagonal children.
    ///
    /// The origin sits on the diagonal, so its own links both point at the
    /// diagonal child; walks start from these two entries instead.
    pub const SEEDS: [usize; 2] = [1, 2];

    /// Builds the table for [`MAX_SIGHT`].
    pub fn build() -> Result<Self, TableError> {
        Self::build_with(TableConfig::STANDARD)
    }

    /// Builds the table for the provided configuration.
    pub fn build_with(config: TableConfig) -> Result<Self, TableError> {
        let table = Self::build_unchecked(config).inspect_err(|error| {
            error!("visibility table rejected for radius {}: {error}", config.radius);
        })?;
        info!(
            "visibility table built: radius {}, {} cells, {} sight lines",
            table.radius,
            table.entries.len(),
            table.slopes.len()
        );
        Ok(table)
    }

    fn build_unchecked(config: TableConfig) -> Result<Self, TableError> {
        let radius = config.radius;
        if !(1..=MAX_TABLE_RADIUS).contains(&radius) {
            return Err(TableError::InvalidRadius { radius });
        }

        let mut slopes: Vec<i64> = Vec::new();
        let mut cell_count = 0;
        for y in 0..=radius {
            for x in y..=radius {
                if distance(y, x) > radius {
                    continue;
                }
                cell_count += 1;
                if cell_count > config.expected_cells {
                    return Err(TableError::TooManyCells {
                        expected: config.expected_cells,
                    });
                }
                for slope in corner_slopes(y, x) {
                    if slope > 0 && slope <= SLOPE_SCALE && !slopes.contains(&slope) {
                        if slopes.len() == SightMask::CAPACITY {
                            return Err(TableError::TooManySlopes);
                        }
                        slopes.push(slope);
                    }
                }
            }
        }

        if cell_count != config.expected_cells {
            return Err(TableError::CellCountMismatch {
                expected: config.expected_cells,
                found: cell_count,
            });
        }
        if slopes.len() != config.expected_slopes {
            return Err(TableError::SlopeCountMismatch {
                expected: config.expected_slopes,
                found: slopes.len(),
            });
        }
        slopes.sort_unstable();

        let side = usize::try_from(radius + 1).unwrap_or(0);
        let mut lookup = vec![None; side * side];
        let mut entries = Vec::with_capacity(cell_count);
        entries.push(TableEntry::pending(0, 0));
        lookup[0] = Some(0);

        let mut head = 0;
        while head < entries.len() {
            let (y, x) = (entries[head].y(), entries[head].x());

            let mut mask = SightMask::EMPTY;
            if head != Self::ORIGIN {
                let (min, max) = slope_bounds(y, x);
                for (index, &slope) in slopes.iter().enumerate() {
                    if min < slope && slope < max {
                        mask.insert(index);
                    }
                }
            }

            let mut straight = Self::ORIGIN;
            if distance(y, x + 1) <= radius {
                straight = enqueue(&mut entries, &mut lookup, side, y, x + 1);
            }
            let mut diagonal = Self::ORIGIN;
            if distance(y + 1, x + 1) <= radius {
                diagonal = enqueue(&mut entries, &mut lookup, side, y + 1, x + 1);
            }
            if y == x {
                straight = diagonal;
            }

            let entry = &mut entries[head];
            entry.mask = mask;
            entry.fire = fire_slopes(&slopes, y, x);
            entry.straight = u16::try_from(straight).unwrap_or(0);
            entry.diagonal = u16::try_from(diagonal).unwrap_or(0);
            entry.ring = u8::try_from(ring(y, x)).unwrap_or(0);
            head += 1;
        }

        if entries.len() != cell_count {
            return Err(TableError::CellCountMismatch {
                expected: cell_count,
                found: entries.len(),
            });
        }

        let full_mask = SightMask::full(slopes.len());
        let covered = entries[Self::SEEDS[0]].mask | entries[Self::SEEDS[1]].mask;
        if covered != full_mask {
            return Err(TableError::IncompleteCoverage {
                missing: full_mask.without(covered).count(),
            });
        }

        Ok(Self {
            radius,
            slopes,
            entries,
            lookup,
            full_mask,
        })
    }

    /// Radius of the disc covered by the table.
    #[must_use]
    pub const fn radius(&self) -> i32 {
        self.radius
    }

    /// Sorted sight-line slopes, scaled by [`SLOPE_SCALE`].
    #[must_use]
    pub fn slopes(&self) -> &[i64] {
        &self.slopes
    }

    /// Entries in breadth-first order; index 0 is the origin.
    #[must_use]
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    /// Entry at the provided index.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&TableEntry> {
        self.entries.get(index)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the table holds no entries. Never true for a built table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mask holding every sight line of the table.
    #[must_use]
    pub const fn full_mask(&self) -> SightMask {
        self.full_mask
    }

    /// Index of the entry for the canonical cell `(y, x)`, `0 <= y <= x`.
    #[must_use]
    pub fn entry_index(&self, y: i32, x: i32) -> Option<usize> {
        if y < 0 || y > x || x > self.radius {
            return None;
        }
        let side = usize::try_from(self.radius + 1).ok()?;
        let slot = usize::try_from(y).ok()? * side + usize::try_from(x).ok()?;
        self.lookup.get(slot).copied().flatten().map(usize::from)
    }
}

static GLOBAL: OnceLock<VisibilityTable> = OnceLock::new();

/// Builds the process-wide table, or returns it if already built.
///
/// Must run once at startup before [`global`] is consulted.
pub fn init_global() -> Result<&'static VisibilityTable, TableError> {
    if let Some(table) = GLOBAL.get() {
        return Ok(table);
    }
    let table = VisibilityTable::build()?;
    Ok(GLOBAL.get_or_init(|| table))
}

/// Process-wide table installed by [`init_global`], if any.
#[must_use]
pub fn global() -> Option<&'static VisibilityTable> {
    GLOBAL.get()
}

fn enqueue(
    entries: &mut Vec<TableEntry>,
    lookup: &mut [Option<u16>],
    side: usize,
    y: i32,
    x: i32,
) -> usize {
    if let Some(last) = entries.last() {
        if last.y() == y && last.x() == x {
            return entries.len() - 1;
        }
    }
    let index = entries.len();
    entries.push(TableEntry::pending(y, x));
    let slot = usize::try_from(y).unwrap_or(0) * side + usize::try_from(x).unwrap_or(0);
    if let Some(cell) = lookup.get_mut(slot) {
        *cell = u16::try_from(index).ok();
    }
    index
}

/// Scaled slopes from the origin's centre to the four corners of `(y, x)`.
fn corner_slopes(y: i32, x: i32) -> [i64; 4] {
    let (y, x) = (i64::from(y), i64::from(x));
    [
        SLOPE_SCALE * (1000 * y - 500) / (1000 * x + 500),
        SLOPE_SCALE * (1000 * y - 500) / (1000 * x - 500),
        SLOPE_SCALE * (1000 * y + 500) / (1000 * x + 500),
        SLOPE_SCALE * (1000 * y + 500) / (1000 * x - 500),
    ]
}

fn slope_bounds(y: i32, x: i32) -> (i64, i64) {
    let corners = corner_slopes(y, x);
    let min = corners.iter().copied().min().unwrap_or(0);
    let max = corners.iter().copied().max().unwrap_or(0);
    (min, max)
}

fn fire_slopes(slopes: &[i64], y: i32, x: i32) -> FireSlopes {
    let centre = if x == 0 {
        0
    } else {
        SLOPE_SCALE * i64::from(y) / i64::from(x)
    };
    match slopes.binary_search(&centre) {
        Ok(index) => FireSlopes::exact(index),
        Err(0) => FireSlopes::exact(0),
        Err(index) if index == slopes.len() => FireSlopes::exact(index - 1),
        Err(index) => FireSlopes::between(index - 1, index),
    }
}

fn ring(y: i32, x: i32) -> i32 {
    if y == 0 {
        x
    } else if y == x {
        y
    } else {
        0
    }
}
