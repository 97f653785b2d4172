#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the dungeon sight engine.
//!
//! This crate defines the vocabulary that connects the authoritative dungeon
//! map, the visibility systems and adapters. Systems never mutate the map:
//! they read it through the [`WorldQuery`] trait and respond with plain values
//! ([`SeenChange`] reports, [`PathResult`] paths). Map mutations are expressed
//! as [`Command`] values that the world applies before broadcasting [`Event`]
//! values describing what changed.

pub mod geometry;

use serde::{Deserialize, Serialize};

pub use geometry::{distance, CanonicalOffset, Octant};

/// Maximum sight radius, measured with [`distance`].
pub const MAX_SIGHT: i32 = 20;

/// Maximum range of any traced projectile path, measured with [`distance`].
pub const MAX_RANGE: i32 = 18;

const _: () = assert!(MAX_RANGE <= MAX_SIGHT);

/// Location of a single dungeon cell expressed as row and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    row: i32,
    column: i32,
}

impl GridCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Returns the cell displaced by the provided offset, saturating at the
    /// edges of the coordinate range.
    #[must_use]
    pub const fn offset(self, offset: GridOffset) -> Self {
        Self::new(
            self.row.saturating_add(offset.dy()),
            self.column.saturating_add(offset.dx()),
        )
    }

    /// Computes the offset that leads from `self` to `other`, saturating when
    /// the cells are further apart than `i32` can express.
    #[must_use]
    pub const fn offset_to(self, other: Self) -> GridOffset {
        GridOffset::new(
            other.row.saturating_sub(self.row),
            other.column.saturating_sub(self.column),
        )
    }

    /// Approximate distance between two cells.
    #[must_use]
    pub const fn distance(self, other: Self) -> i32 {
        self.offset_to(other).distance()
    }
}

/// Relative displacement between two cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridOffset {
    dy: i32,
    dx: i32,
}

impl GridOffset {
    /// The zero displacement.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a new offset.
    #[must_use]
    pub const fn new(dy: i32, dx: i32) -> Self {
        Self { dy, dx }
    }

    /// Row component of the offset.
    #[must_use]
    pub const fn dy(&self) -> i32 {
        self.dy
    }

    /// Column component of the offset.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Approximate length of the offset.
    #[must_use]
    pub const fn distance(&self) -> i32 {
        distance(self.dy, self.dx)
    }
}

/// Terrain occupying a dungeon cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Open floor.
    #[default]
    Floor,
    /// Solid rock.
    Wall,
    /// A door that is shut.
    ClosedDoor,
    /// A door that stands open.
    OpenDoor,
    /// A transparent pane that stops projectiles.
    Glass,
    /// A hanging curtain that hides what lies behind it but stops nothing.
    Curtain,
}

impl Terrain {
    /// Reports whether the terrain stops sight lines.
    #[must_use]
    pub const fn blocks_sight(self) -> bool {
        matches!(self, Self::Wall | Self::ClosedDoor | Self::Curtain)
    }

    /// Reports whether the terrain stops projectiles.
    #[must_use]
    pub const fn blocks_projectiles(self) -> bool {
        matches!(self, Self::Wall | Self::ClosedDoor | Self::Glass)
    }
}

/// Read-only queries the visibility systems issue against the dungeon.
///
/// Implementations must answer consistently for the duration of a single
/// system call. Cells outside [`WorldQuery::dimensions`] are never passed to
/// the remaining predicates by the systems in this workspace.
pub trait WorldQuery {
    /// Number of rows and columns, in that order.
    fn dimensions(&self) -> (u32, u32);

    /// Reports whether the cell lies within the dungeon.
    fn is_in_bounds(&self, cell: GridCoord) -> bool {
        let (rows, columns) = self.dimensions();
        u32::try_from(cell.row()).is_ok_and(|row| row < rows)
            && u32::try_from(cell.column()).is_ok_and(|column| column < columns)
    }

    /// Reports whether the cell stops sight lines.
    fn is_opaque_to_sight(&self, cell: GridCoord) -> bool;

    /// Reports whether the cell stops projectiles.
    fn is_opaque_to_projectiles(&self, cell: GridCoord) -> bool;

    /// Reports whether the cell is illuminated independently of the observer.
    fn is_lit(&self, cell: GridCoord) -> bool;

    /// Reports whether an actor occupies the cell.
    fn has_actor(&self, cell: GridCoord) -> bool;

    /// Reports whether the actor occupying the cell is concealed.
    fn is_actor_concealed(&self, _cell: GridCoord) -> bool {
        false
    }
}

/// Light carried by an observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LightRadius {
    /// The observer carries no light.
    #[default]
    Dark,
    /// The observer carries a light reaching the provided distance.
    Torch(u8),
    /// Every visible cell counts as illuminated.
    FullyLit,
}

impl LightRadius {
    /// Reports whether a visible cell at `distance` is illuminated by the observer.
    #[must_use]
    pub const fn illuminates(self, distance: i32) -> bool {
        match self {
            Self::Dark => false,
            Self::Torch(radius) => distance <= radius as i32 && radius > 0,
            Self::FullyLit => true,
        }
    }
}

/// Describes the observer a field of view is computed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observer {
    /// Cell the observer stands in.
    pub cell: GridCoord,
    /// Light the observer carries.
    pub light: LightRadius,
    /// Whether the observer is blinded and therefore sees nothing.
    pub blind: bool,
}

impl Observer {
    /// Creates an observer who can see, carrying the provided light.
    #[must_use]
    pub const fn new(cell: GridCoord, light: LightRadius) -> Self {
        Self {
            cell,
            light,
            blind: false,
        }
    }
}

/// Rule deciding whether a lit wall beyond the observer's own light is seen.
///
/// A wall is lit from one side only, so it counts as seen when light reaches
/// the face turned towards the observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WallLighting {
    /// Only the single neighbour one step closer to the observer is checked.
    #[default]
    NearestNeighbor,
    /// Every neighbour facing the observer is checked.
    FacingNeighbors,
}

/// Reports a cell whose seen state flipped between two field of view updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeenChange {
    /// Cell whose state changed.
    pub cell: GridCoord,
    /// Whether the cell is seen after the update.
    pub seen: bool,
}

/// How actors standing on a traced path influence it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActorPolicy {
    /// Actors never influence the path.
    #[default]
    Ignore,
    /// The path ends on the first actor it meets.
    Stop,
    /// The path is marked impeded by the first actor but keeps going.
    SoftStop,
}

/// Behaviour flags for a traced path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathPolicy {
    /// Terrain never stops the path.
    pub pass_walls: bool,
    /// Treatment of actors standing on the path.
    pub actors: ActorPolicy,
    /// The first actor met is passed as if absent.
    pub first_actor_free: bool,
    /// Whether concealed actors count as actors.
    pub concealed_actors_block: bool,
    /// Only the candidate nearest the true line may be chosen at each step.
    pub strict_line_of_fire: bool,
    /// Diagonal moves are split so every step shares an edge with the last.
    pub orthogonal_steps: bool,
    /// The path continues past the destination until range runs out.
    pub extend_past_target: bool,
    /// A sight line through the destination is used when the line of fire is blocked.
    pub sight_fallback: bool,
}

impl PathPolicy {
    /// Policy of a bolt: stops on the first actor and on terrain.
    pub const BOLT: Self = Self {
        pass_walls: false,
        actors: ActorPolicy::Stop,
        first_actor_free: false,
        concealed_actors_block: true,
        strict_line_of_fire: false,
        orthogonal_steps: false,
        extend_past_target: false,
        sight_fallback: false,
    };

    /// Policy of a beam: passes through actors and continues to full range.
    pub const BEAM: Self = Self {
        actors: ActorPolicy::Ignore,
        extend_past_target: true,
        ..Self::BOLT
    };
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self {
            actors: ActorPolicy::Ignore,
            ..Self::BOLT
        }
    }
}

/// Describes a single path query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathRequest {
    /// Cell the effect originates from. Never part of the result.
    pub source: GridCoord,
    /// Cell the effect is aimed at.
    pub target: GridCoord,
    /// Maximum distance the effect travels, clamped to [`MAX_RANGE`].
    pub range: i32,
    /// Behaviour flags.
    pub policy: PathPolicy,
}

impl PathRequest {
    /// Creates a request using the default policy and [`MAX_RANGE`].
    #[must_use]
    pub fn new(source: GridCoord, target: GridCoord) -> Self {
        Self {
            source,
            target,
            range: MAX_RANGE,
            policy: PathPolicy::default(),
        }
    }

    /// Replaces the range of the request.
    #[must_use]
    pub const fn with_range(mut self, range: i32) -> Self {
        self.range = range;
        self
    }

    /// Replaces the policy of the request.
    #[must_use]
    pub const fn with_policy(mut self, policy: PathPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Outcome of a path query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PathResult {
    cells: Vec<GridCoord>,
    impeded: bool,
}

impl PathResult {
    /// Creates a result from an ordered list of cells.
    #[must_use]
    pub fn new(cells: Vec<GridCoord>, impeded: bool) -> Self {
        Self { cells, impeded }
    }

    /// Ordered cells traversed, excluding the source.
    #[must_use]
    pub fn cells(&self) -> &[GridCoord] {
        &self.cells
    }

    /// Whether an actor impeded the path.
    #[must_use]
    pub const fn impeded(&self) -> bool {
        self.impeded
    }

    /// Number of cells in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the path is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Final cell of the path, if any.
    #[must_use]
    pub fn last(&self) -> Option<GridCoord> {
        self.cells.last().copied()
    }

    /// Length of the path, negated when an actor impeded it.
    #[must_use]
    pub fn signed_len(&self) -> i32 {
        let length = i32::try_from(self.cells.len()).unwrap_or(i32::MAX);
        if self.impeded {
            -length
        } else {
            length
        }
    }
}

/// Commands that express all permissible dungeon mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Replaces the terrain of a cell.
    SetTerrain {
        /// Cell to modify.
        cell: GridCoord,
        /// Terrain to install.
        terrain: Terrain,
    },
    /// Turns the ambient light of a cell on or off.
    SetLit {
        /// Cell to modify.
        cell: GridCoord,
        /// Whether the cell is lit afterwards.
        lit: bool,
    },
    /// Places an actor on an empty cell.
    PlaceActor {
        /// Cell the actor appears on.
        cell: GridCoord,
        /// Whether the actor is concealed.
        concealed: bool,
    },
    /// Moves an actor to an empty cell.
    MoveActor {
        /// Cell the actor occupies.
        from: GridCoord,
        /// Cell the actor moves to.
        to: GridCoord,
    },
    /// Removes an actor from the dungeon.
    RemoveActor {
        /// Cell the actor occupies.
        cell: GridCoord,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// The terrain of a cell changed.
    TerrainChanged {
        /// Cell that changed.
        cell: GridCoord,
        /// Terrain before the change.
        from: Terrain,
        /// Terrain after the change.
        to: Terrain,
    },
    /// The ambient light of a cell changed.
    LightingChanged {
        /// Cell that changed.
        cell: GridCoord,
        /// Whether the cell is lit afterwards.
        lit: bool,
    },
    /// An actor appeared.
    ActorPlaced {
        /// Cell the actor occupies.
        cell: GridCoord,
    },
    /// An actor moved.
    ActorMoved {
        /// Cell the actor left.
        from: GridCoord,
        /// Cell the actor entered.
        to: GridCoord,
    },
    /// An actor disappeared.
    ActorRemoved {
        /// Cell the actor occupied.
        cell: GridCoord,
    },
    /// A command was rejected without modifying the dungeon.
    CommandRejected {
        /// Cell named by the rejected command.
        cell: GridCoord,
        /// Reason for the rejection.
        reason: RejectionReason,
    },
}

impl Event {
    /// Reports whether a previously computed field of view may be stale.
    #[must_use]
    pub const fn affects_sight(&self) -> bool {
        match self {
            Self::TerrainChanged { from, to, .. } => from.blocks_sight() != to.blocks_sight(),
            Self::LightingChanged { .. } => true,
            Self::ActorPlaced { .. }
            | Self::ActorMoved { .. }
            | Self::ActorRemoved { .. }
            | Self::CommandRejected { .. } => false,
        }
    }

    /// Reports whether a previously traced path may be stale.
    #[must_use]
    pub const fn affects_projectiles(&self) -> bool {
        match self {
            Self::TerrainChanged { from, to, .. } => {
                from.blocks_projectiles() != to.blocks_projectiles()
            }
            Self::ActorPlaced { .. } | Self::ActorMoved { .. } | Self::ActorRemoved { .. } => true,
            Self::LightingChanged { .. } | Self::CommandRejected { .. } => false,
        }
    }
}

/// Reasons a command may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The named cell lies outside the dungeon.
    OutOfBounds,
    /// The destination cell already holds an actor.
    Occupied,
    /// No actor stands on the named cell.
    MissingActor,
}
