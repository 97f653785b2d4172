#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Incremental field of view for a single observer.
//!
//! Every update floods the eight octants around the observer through the
//! shared [`VisibilityTable`], marking cells as visible (an unobstructed sight
//! line reaches them) and seen (visible and illuminated). The previous seen
//! set is kept so each update reports exactly the cells whose seen state
//! flipped.

use dungeon_sight_core::{GridCoord, Observer, Octant, SeenChange, WallLighting, WorldQuery};
use dungeon_sight_system_visibility_table::{TableWalk, VisibilityTable};
use log::debug;

/// Field of view state for one observer, patched on every update.
#[derive(Debug, Default)]
pub struct FieldOfView {
    wall_lighting: WallLighting,
    origin: Option<GridCoord>,
    rows: u32,
    columns: u32,
    visible: Vec<bool>,
    visible_cells: Vec<GridCoord>,
    seen: Vec<bool>,
    seen_cells: Vec<GridCoord>,
    was_seen: Vec<bool>,
    was_seen_cells: Vec<GridCoord>,
    walk: TableWalk,
}

impl FieldOfView {
    /// Creates an empty field of view using the provided lit-wall rule.
    #[must_use]
    pub fn new(wall_lighting: WallLighting) -> Self {
        Self {
            wall_lighting,
            ..Self::default()
        }
    }

    /// Rule applied to lit walls beyond the observer's own light.
    #[must_use]
    pub const fn wall_lighting(&self) -> WallLighting {
        self.wall_lighting
    }

    /// Cell the last update was computed from.
    #[must_use]
    pub const fn origin(&self) -> Option<GridCoord> {
        self.origin
    }

    /// Reports whether an unobstructed sight line reached the cell.
    #[must_use]
    pub fn is_visible(&self, cell: GridCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.visible.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Reports whether the cell is visible and illuminated.
    #[must_use]
    pub fn is_seen(&self, cell: GridCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.seen.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Visible cells in the order they were reached.
    #[must_use]
    pub fn visible_cells(&self) -> &[GridCoord] {
        &self.visible_cells
    }

    /// Seen cells in the order they were reached.
    #[must_use]
    pub fn seen_cells(&self) -> &[GridCoord] {
        &self.seen_cells
    }

    /// Recomputes the field of view and reports every seen-state flip.
    ///
    /// Cells that stopped being seen are reported first, followed by the cells
    /// that became seen. An observer standing outside the world sees nothing.
    pub fn update<W>(
        &mut self,
        table: &VisibilityTable,
        world: &W,
        observer: &Observer,
        out: &mut Vec<SeenChange>,
    ) where
        W: WorldQuery + ?Sized,
    {
        let (rows, columns) = world.dimensions();
        if (rows, columns) != (self.rows, self.columns) {
            self.forget(out);
            self.resize(rows, columns);
        }

        self.rotate();
        self.origin = Some(observer.cell);

        if world.is_in_bounds(observer.cell) {
            let seen = !observer.blind
                && (observer.light.illuminates(0) || world.is_lit(observer.cell));
            self.mark(observer.cell, seen);
            for octant in Octant::ALL {
                self.flood_octant(table, world, observer, octant);
            }
        } else {
            debug!(
                "observer at {:?} is outside the {rows}x{columns} map",
                observer.cell
            );
        }

        self.report(out);
    }

    /// Drops all state, reporting every seen cell as lost.
    pub fn forget(&mut self, out: &mut Vec<SeenChange>) {
        out.extend(
            self.seen_cells
                .iter()
                .map(|&cell| SeenChange { cell, seen: false }),
        );
        self.origin = None;
        self.reset_flags();
        self.was_seen_cells.clear();
        self.was_seen.iter_mut().for_each(|flag| *flag = false);
    }

    fn flood_octant<W>(
        &mut self,
        table: &VisibilityTable,
        world: &W,
        observer: &Observer,
        octant: Octant,
    ) where
        W: WorldQuery + ?Sized,
    {
        let mut live = table.full_mask();
        self.walk.restart(table);

        while let Some(index) = self.walk.next_entry() {
            let Some(entry) = table.entry(index) else {
                continue;
            };
            if !entry.mask().intersects(live) {
                continue;
            }

            let cell = observer.cell.offset(entry.offset(octant));
            if !world.is_in_bounds(cell) {
                live.clear(entry.mask());
                continue;
            }

            let lit_by_observer = observer.light.illuminates(entry.distance());
            if world.is_opaque_to_sight(cell) {
                if !self.is_visible(cell) {
                    let seen = !observer.blind
                        && (lit_by_observer
                            || (world.is_lit(cell)
                                && self.wall_faces_light(world, observer.cell, cell)));
                    self.mark(cell, seen);
                }
                live.clear(entry.mask());
            } else {
                self.walk.expand(table, index);
                if !self.is_visible(cell) {
                    let seen = !observer.blind && (lit_by_observer || world.is_lit(cell));
                    self.mark(cell, seen);
                }
            }
        }
    }

    /// Reports whether the face of a lit wall turned towards the observer is lit.
    fn wall_faces_light<W>(&self, world: &W, origin: GridCoord, wall: GridCoord) -> bool
    where
        W: WorldQuery + ?Sized,
    {
        let sy = (wall.row() - origin.row()).signum();
        let sx = (wall.column() - origin.column()).signum();
        let lights = |cell: GridCoord| world.is_lit(cell) && !world.is_opaque_to_sight(cell);

        let nearest = GridCoord::new(wall.row() - sy, wall.column() - sx);
        match self.wall_lighting {
            WallLighting::NearestNeighbor => lights(nearest),
            WallLighting::FacingNeighbors => {
                lights(nearest)
                    || (sy != 0 && lights(GridCoord::new(wall.row() - sy, wall.column())))
                    || (sx != 0 && lights(GridCoord::new(wall.row(), wall.column() - sx)))
            }
        }
    }

    fn mark(&mut self, cell: GridCoord, seen: bool) {
        let Some(index) = self.index(cell) else {
            return;
        };
        if let Some(flag) = self.visible.get_mut(index) {
            *flag = true;
            self.visible_cells.push(cell);
        }
        if seen {
            if let Some(flag) = self.seen.get_mut(index) {
                *flag = true;
                self.seen_cells.push(cell);
            }
        }
    }

    fn report(&self, out: &mut Vec<SeenChange>) {
        for &cell in &self.was_seen_cells {
            if !self.is_seen(cell) {
                out.push(SeenChange { cell, seen: false });
            }
        }
        for &cell in &self.seen_cells {
            let previously = self
                .index(cell)
                .and_then(|index| self.was_seen.get(index))
                .copied()
                .unwrap_or(false);
            if !previously {
                out.push(SeenChange { cell, seen: true });
            }
        }
    }

    /// Moves the current seen set into the previous slot and clears the current sets.
    fn rotate(&mut self) {
        for index in 0..self.was_seen_cells.len() {
            let cell = self.was_seen_cells[index];
            if let Some(flag) = self.index(cell).and_then(|slot| self.was_seen.get_mut(slot)) {
                *flag = false;
            }
        }
        self.was_seen_cells.clear();
        std::mem::swap(&mut self.seen, &mut self.was_seen);
        std::mem::swap(&mut self.seen_cells, &mut self.was_seen_cells);

        for index in 0..self.visible_cells.len() {
            let cell = self.visible_cells[index];
            if let Some(flag) = self.index(cell).and_then(|slot| self.visible.get_mut(slot)) {
                *flag = false;
            }
        }
        self.visible_cells.clear();
    }

    fn reset_flags(&mut self) {
        self.visible.iter_mut().for_each(|flag| *flag = false);
        self.seen.iter_mut().for_each(|flag| *flag = false);
        self.visible_cells.clear();
        self.seen_cells.clear();
    }

    fn resize(&mut self, rows: u32, columns: u32) {
        let capacity = usize::try_from(u64::from(rows) * u64::from(columns)).unwrap_or(0);
        self.rows = rows;
        self.columns = columns;
        self.visible = vec![false; capacity];
        self.seen = vec![false; capacity];
        self.was_seen = vec![false; capacity];
        self.was_seen_cells.clear();
        self.visible_cells.clear();
        self.seen_cells.clear();
    }

    fn index(&self, cell: GridCoord) -> Option<usize> {
        let row = u32::try_from(cell.row()).ok()?;
        let column = u32::try_from(cell.column()).ok()?;
        if row >= self.rows || column >= self.columns {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        Some(usize::try_from(row).ok()? * width + usize::try_from(column).ok()?)
    }
}
