//! Text renderings of fields of view and traced paths.

use dungeon_sight_core::{GridCoord, PathResult};
use dungeon_sight_system_bootstrap::SightSystems;
use dungeon_sight_world::{to_ascii, World};

const OBSERVER: char = '@';
const VISIBLE_IN_DARK: char = ':';
const HIDDEN: char = ' ';
const PATH: char = '*';
const IMPEDED: char = 'X';

fn glyphs(world: &World) -> Vec<Vec<char>> {
    to_ascii(world)
        .lines()
        .map(|line| line.chars().collect())
        .collect()
}

fn slot(rows: &mut [Vec<char>], cell: GridCoord) -> Option<&mut char> {
    let row = usize::try_from(cell.row()).ok()?;
    let column = usize::try_from(cell.column()).ok()?;
    rows.get_mut(row)?.get_mut(column)
}

fn join(rows: Vec<Vec<char>>) -> String {
    let mut out = String::new();
    for row in rows {
        out.extend(row);
        out.push('\n');
    }
    out
}

/// Draws the map as the observer perceives it.
///
/// Seen cells show their map glyph, visible but unlit cells show `:` and
/// everything else is blank.
pub(crate) fn render_view(world: &World, systems: &SightSystems, observer: GridCoord) -> String {
    let fov = systems.field_of_view();
    let mut rows = glyphs(world);
    for (row_index, row) in rows.iter_mut().enumerate() {
        for (column_index, glyph) in row.iter_mut().enumerate() {
            let cell = GridCoord::new(
                i32::try_from(row_index).unwrap_or(i32::MAX),
                i32::try_from(column_index).unwrap_or(i32::MAX),
            );
            if !fov.is_seen(cell) {
                *glyph = if fov.is_visible(cell) {
                    VISIBLE_IN_DARK
                } else {
                    HIDDEN
                };
            }
        }
    }
    if let Some(glyph) = slot(&mut rows, observer) {
        *glyph = OBSERVER;
    }
    join(rows)
}

/// Draws the map with the path overlaid; an impeded path ends in `X`.
pub(crate) fn render_path(world: &World, source: GridCoord, result: &PathResult) -> String {
    let mut rows = glyphs(world);
    for &cell in result.cells() {
        if let Some(glyph) = slot(&mut rows, cell) {
            *glyph = PATH;
        }
    }
    if result.impeded() {
        if let Some(glyph) = result.last().and_then(|cell| slot(&mut rows, cell)) {
            *glyph = IMPEDED;
        }
    }
    if let Some(glyph) = slot(&mut rows, source) {
        *glyph = OBSERVER;
    }
    join(rows)
}

/// One-line summary of a path: signed length followed by the cells.
pub(crate) fn describe_path(result: &PathResult) -> String {
    let cells: Vec<String> = result
        .cells()
        .iter()
        .map(|cell| format!("({},{})", cell.row(), cell.column()))
        .collect();
    let status = if result.impeded() { "impeded" } else { "clear" };
    format!("{} {status}: {}", result.signed_len(), cells.join(" "))
}
