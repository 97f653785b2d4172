#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Point-to-point line of sight that does not consult the visibility table.
//!
//! The line between two cell centres is stepped along its dominant axis with
//! an integer error term scaled by `2 * |dy| * |dx|`, so no fractions are
//! involved. Only the cells strictly between the endpoints are tested.

use dungeon_sight_core::{GridCoord, WorldQuery};

/// Reports whether an unobstructed straight line joins the centres of `a` and `b`.
///
/// Identical and adjacent cells always see each other. Cells outside the
/// world are opaque. The result does not depend on the order of the
/// endpoints.
#[must_use]
pub fn line_of_sight<W>(world: &W, a: GridCoord, b: GridCoord) -> bool
where
    W: WorldQuery + ?Sized,
{
    let (from, to) = if b < a { (b, a) } else { (a, b) };
    let clear = |row: i32, column: i32| {
        let cell = GridCoord::new(row, column);
        world.is_in_bounds(cell) && !world.is_opaque_to_sight(cell)
    };

    let (y1, x1) = (from.row(), from.column());
    let (y2, x2) = (to.row(), to.column());
    let dy = y2 - y1;
    let dx = x2 - x1;
    let ay = dy.abs();
    let ax = dx.abs();

    if ax < 2 && ay < 2 {
        return true;
    }

    if dx == 0 {
        let sy = dy.signum();
        return (1..ay).all(|step| clear(y1 + sy * step, x1));
    }
    if dy == 0 {
        let sx = dx.signum();
        return (1..ax).all(|step| clear(y1, x1 + sx * step));
    }

    let sy = dy.signum();
    let sx = dx.signum();

    // Knight's moves pass as soon as the cell beside the start is open.
    if ax == 1 && ay == 2 && clear(y1 + sy, x1) {
        return true;
    }
    if ay == 1 && ax == 2 && clear(y1, x1 + sx) {
        return true;
    }

    let half = ax * ay;
    let full = half << 1;

    if ax >= ay {
        let mut error = ay * ay;
        let slope = error << 1;
        let mut column = x1 + sx;
        let mut row = y1;
        // A unit slope starts on the diagonal neighbour.
        if error == half {
            row += sy;
            error -= full;
        }
        while column != x2 {
            if !clear(row, column) {
                return false;
            }
            error += slope;
            if error > half {
                row += sy;
                if !clear(row, column) {
                    return false;
                }
                error -= full;
            } else if error == half {
                // The line crosses exactly through a corner.
                row += sy;
                error -= full;
            }
            column += sx;
        }
    } else {
        let mut error = ax * ax;
        let slope = error << 1;
        let mut row = y1 + sy;
        let mut column = x1;
        if error == half {
            column += sx;
            error -= full;
        }
        while row != y2 {
            if !clear(row, column) {
                return false;
            }
            error += slope;
            if error > half {
                column += sx;
                if !clear(row, column) {
                    return false;
                }
                error -= full;
            } else if error == half {
                column += sx;
                error -= full;
            }
            row += sy;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::line_of_sight;
    use dungeon_sight_core::{GridCoord, WorldQuery};

    struct Walls(Vec<(i32, i32)>);

    impl WorldQuery for Walls {
        fn dimensions(&self) -> (u32, u32) {
            (21, 21)
        }

        fn is_opaque_to_sight(&self, cell: GridCoord) -> bool {
            self.0.contains(&(cell.row(), cell.column()))
        }

        fn is_opaque_to_projectiles(&self, cell: GridCoord) -> bool {
            self.is_opaque_to_sight(cell)
        }

        fn is_lit(&self, _cell: GridCoord) -> bool {
            false
        }

        fn has_actor(&self, _cell: GridCoord) -> bool {
            false
        }
    }

    fn los(walls: &[(i32, i32)], a: (i32, i32), b: (i32, i32)) -> bool {
        line_of_sight(
            &Walls(walls.to_vec()),
            GridCoord::new(a.0, a.1),
            GridCoord::new(b.0, b.1),
        )
    }

    #[test]
    fn neighbours_always_see_each_other() {
        let walls = [(4, 4), (4, 5), (5, 4), (5, 5)];
        assert!(los(&walls, (5, 5), (5, 5)));
        assert!(los(&walls, (4, 4), (5, 5)));
        assert!(los(&walls, (5, 4), (4, 5)));
    }

    #[test]
    fn cardinal_lines_ignore_their_endpoints() {
        assert!(!los(&[(5, 7)], (5, 5), (5, 9)));
        assert!(los(&[(5, 9), (5, 5)], (5, 5), (5, 9)));
        assert!(los(&[(4, 7)], (5, 5), (5, 9)));
        assert!(!los(&[(8, 3)], (10, 3), (2, 3)));
    }

    #[test]
    fn knights_move_needs_only_the_cell_beside_the_start() {
        assert!(los(&[(1, 1)], (0, 0), (2, 1)));
        assert!(!los(&[(1, 0)], (0, 0), (2, 1)));
        assert!(!los(&[(1, 0)], (2, 1), (0, 0)));
        assert!(los(&[(1, 1)], (0, 0), (1, 2)));
    }

    #[test]
    fn corner_crossings_step_diagonally() {
        assert!(los(&[(0, 3)], (0, 0), (2, 6)));
        assert!(!los(&[(1, 3)], (0, 0), (2, 6)));
        assert!(!los(&[(1, 2)], (0, 0), (2, 6)));
        assert!(!los(&[(2, 2)], (0, 0), (4, 4)));
        assert!(los(&[(1, 2), (2, 1)], (0, 0), (4, 4)));
    }

    #[test]
    fn cells_outside_the_world_are_opaque() {
        assert!(!los(&[], (0, 0), (0, 30)));
        assert!(los(&[], (0, 0), (0, 20)));
    }
}
