#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative dungeon state consumed by the visibility systems.
//!
//! The world owns a dense row-major grid of cells. It is only ever mutated
//! through [`apply`], which reports every effective change as an [`Event`] so
//! callers can decide when a field of view or a traced path has gone stale.

mod ascii;

use dungeon_sight_core::{Command, Event, GridCoord, RejectionReason, Terrain, WorldQuery};

pub use ascii::{parse, to_ascii, MapParseError, ParsedMap};

const DEFAULT_ROWS: u32 = 21;
const DEFAULT_COLUMNS: u32 = 21;

/// Represents the authoritative dungeon level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct World {
    rows: u32,
    columns: u32,
    cells: Vec<Cell>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Cell {
    terrain: Terrain,
    lit: bool,
    actor: Option<Actor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Actor {
    concealed: bool,
}

impl World {
    /// Creates an open, unlit floor of the default dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_ROWS, DEFAULT_COLUMNS)
    }

    /// Creates an open, unlit floor with the provided dimensions.
    #[must_use]
    pub fn with_dimensions(rows: u32, columns: u32) -> Self {
        let capacity_u64 = u64::from(rows) * u64::from(columns);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            rows,
            columns,
            cells: vec![Cell::default(); capacity],
        }
    }

    fn index(&self, cell: GridCoord) -> Option<usize> {
        let row = u32::try_from(cell.row()).ok()?;
        let column = u32::try_from(cell.column()).ok()?;
        if row < self.rows && column < self.columns {
            let row = usize::try_from(row).ok()?;
            let column = usize::try_from(column).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    fn cell(&self, cell: GridCoord) -> Option<&Cell> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    fn cell_mut(&mut self, cell: GridCoord) -> Option<&mut Cell> {
        self.index(cell).and_then(|index| self.cells.get_mut(index))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldQuery for World {
    fn dimensions(&self) -> (u32, u32) {
        (self.rows, self.columns)
    }

    fn is_opaque_to_sight(&self, cell: GridCoord) -> bool {
        self.cell(cell)
            .map_or(true, |state| state.terrain.blocks_sight())
    }

    fn is_opaque_to_projectiles(&self, cell: GridCoord) -> bool {
        self.cell(cell)
            .map_or(true, |state| state.terrain.blocks_projectiles())
    }

    fn is_lit(&self, cell: GridCoord) -> bool {
        self.cell(cell).is_some_and(|state| state.lit)
    }

    fn has_actor(&self, cell: GridCoord) -> bool {
        self.cell(cell).is_some_and(|state| state.actor.is_some())
    }

    fn is_actor_concealed(&self, cell: GridCoord) -> bool {
        self.cell(cell)
            .and_then(|state| state.actor)
            .is_some_and(|actor| actor.concealed)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands that would not change anything emit no event; commands that
/// cannot be carried out emit [`Event::CommandRejected`].
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SetTerrain { cell, terrain } => {
            let Some(state) = world.cell_mut(cell) else {
                out_events.push(rejected(cell, RejectionReason::OutOfBounds));
                return;
            };
            if state.terrain != terrain {
                let from = state.terrain;
                state.terrain = terrain;
                out_events.push(Event::TerrainChanged {
                    cell,
                    from,
                    to: terrain,
                });
            }
        }
        Command::SetLit { cell, lit } => {
            let Some(state) = world.cell_mut(cell) else {
                out_events.push(rejected(cell, RejectionReason::OutOfBounds));
                return;
            };
            if state.lit != lit {
                state.lit = lit;
                out_events.push(Event::LightingChanged { cell, lit });
            }
        }
        Command::PlaceActor { cell, concealed } => {
            let Some(state) = world.cell_mut(cell) else {
                out_events.push(rejected(cell, RejectionReason::OutOfBounds));
                return;
            };
            if state.actor.is_some() {
                out_events.push(rejected(cell, RejectionReason::Occupied));
                return;
            }
            state.actor = Some(Actor { concealed });
            out_events.push(Event::ActorPlaced { cell });
        }
        Command::MoveActor { from, to } => {
            let Some(destination) = world.cell(to) else {
                out_events.push(rejected(to, RejectionReason::OutOfBounds));
                return;
            };
            if destination.actor.is_some() {
                out_events.push(rejected(to, RejectionReason::Occupied));
                return;
            }
            let Some(actor) = world.cell_mut(from).and_then(|state| state.actor.take()) else {
                out_events.push(rejected(from, RejectionReason::MissingActor));
                return;
            };
            if let Some(state) = world.cell_mut(to) {
                state.actor = Some(actor);
            }
            out_events.push(Event::ActorMoved { from, to });
        }
        Command::RemoveActor { cell } => {
            match world.cell_mut(cell).and_then(|state| state.actor.take()) {
                Some(_) => out_events.push(Event::ActorRemoved { cell }),
                None => out_events.push(rejected(cell, RejectionReason::MissingActor)),
            }
        }
    }
}

fn rejected(cell: GridCoord, reason: RejectionReason) -> Event {
    Event::CommandRejected { cell, reason }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use dungeon_sight_core::GridCoord;

    use super::World;

    /// Enumerates every cell currently holding an actor, in row-major order.
    #[must_use]
    pub fn actor_cells(world: &World) -> Vec<GridCoord> {
        cells(world)
            .filter(|cell| world.cell(*cell).is_some_and(|state| state.actor.is_some()))
            .collect()
    }

    /// Iterates over every cell coordinate in row-major order.
    pub fn cells(world: &World) -> impl Iterator<Item = GridCoord> {
        let rows = i32::try_from(world.rows).unwrap_or(i32::MAX);
        let columns = i32::try_from(world.columns).unwrap_or(i32::MAX);
        (0..rows).flat_map(move |row| (0..columns).map(move |column| GridCoord::new(row, column)))
    }
}
