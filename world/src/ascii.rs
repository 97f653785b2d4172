//! Plain-text dungeon maps.
//!
//! | glyph | meaning                         |
//! |-------|---------------------------------|
//! | `.`   | floor                           |
//! | `,`   | lit floor                       |
//! | `#`   | wall                            |
//! | `%`   | lit wall                        |
//! | `+`   | closed door                     |
//! | `'`   | open door                       |
//! | `=`   | glass                           |
//! | `"`   | curtain                         |
//! | `@`   | observer standing on floor      |
//! | `a`   | actor standing on floor         |
//! | `h`   | concealed actor standing on floor |
//!
//! Blank lines before and after the map are ignored. Every remaining line must
//! have the same width.

use dungeon_sight_core::{GridCoord, Terrain, WorldQuery};
use thiserror::Error;

use crate::{Actor, World};

/// Map produced by [`parse`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMap {
    /// Dungeon described by the map.
    pub world: World,
    /// Cell marked with `@`, if any.
    pub observer: Option<GridCoord>,
}

/// Errors raised while parsing a plain-text map.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapParseError {
    /// The text contained no map rows.
    #[error("map contains no rows")]
    Empty,
    /// A row had a different width than the first row.
    #[error("row {row} is {found} cells wide, expected {expected}")]
    Ragged {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A glyph outside the legend was encountered.
    #[error("unknown glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph {
        /// Zero-based row of the glyph.
        row: usize,
        /// Zero-based column of the glyph.
        column: usize,
        /// The offending character.
        glyph: char,
    },
    /// More than one `@` was present.
    #[error("second observer marker at row {row}, column {column}")]
    DuplicateObserver {
        /// Zero-based row of the second marker.
        row: usize,
        /// Zero-based column of the second marker.
        column: usize,
    },
    /// The map does not fit the coordinate range.
    #[error("map dimensions exceed the supported coordinate range")]
    TooLarge,
}

/// Parses a plain-text map.
pub fn parse(text: &str) -> Result<ParsedMap, MapParseError> {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .skip_while(|line| line.trim().is_empty())
        .collect();
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .ok_or(MapParseError::Empty)?;
    let lines = &lines[..=end];

    let width = lines[0].chars().count();
    let rows = u32::try_from(lines.len()).map_err(|_| MapParseError::TooLarge)?;
    let columns = u32::try_from(width).map_err(|_| MapParseError::TooLarge)?;
    if i32::try_from(rows).is_err() || i32::try_from(columns).is_err() {
        return Err(MapParseError::TooLarge);
    }

    let mut world = World::with_dimensions(rows, columns);
    let mut observer = None;

    for (row, line) in lines.iter().enumerate() {
        let found = line.chars().count();
        if found != width {
            return Err(MapParseError::Ragged {
                row,
                expected: width,
                found,
            });
        }

        for (column, glyph) in line.chars().enumerate() {
            let cell = GridCoord::new(row as i32, column as i32);
            let (terrain, lit, actor) = match glyph {
                '.' => (Terrain::Floor, false, None),
                ',' => (Terrain::Floor, true, None),
                '#' => (Terrain::Wall, false, None),
                '%' => (Terrain::Wall, true, None),
                '+' => (Terrain::ClosedDoor, false, None),
                '\'' => (Terrain::OpenDoor, false, None),
                '=' => (Terrain::Glass, false, None),
                '"' => (Terrain::Curtain, false, None),
                'a' => (Terrain::Floor, false, Some(Actor { concealed: false })),
                'h' => (Terrain::Floor, false, Some(Actor { concealed: true })),
                '@' => {
                    if observer.is_some() {
                        return Err(MapParseError::DuplicateObserver { row, column });
                    }
                    observer = Some(cell);
                    (Terrain::Floor, false, None)
                }
                _ => return Err(MapParseError::UnknownGlyph { row, column, glyph }),
            };

            if let Some(state) = world.cell_mut(cell) {
                state.terrain = terrain;
                state.lit = lit;
                state.actor = actor;
            }
        }
    }

    Ok(ParsedMap { world, observer })
}

/// Renders the world back into the glyphs accepted by [`parse`].
///
/// Observer markers are not part of the world and are therefore not emitted.
#[must_use]
pub fn to_ascii(world: &World) -> String {
    let (rows, columns) = world.dimensions();
    let mut out = String::with_capacity((rows as usize) * (columns as usize + 1));
    for row in 0..rows as i32 {
        for column in 0..columns as i32 {
            out.push(glyph(world, GridCoord::new(row, column)));
        }
        out.push('\n');
    }
    out
}

fn glyph(world: &World, cell: GridCoord) -> char {
    let Some(state) = world.cell(cell) else {
        return ' ';
    };
    if let Some(actor) = state.actor {
        return if actor.concealed { 'h' } else { 'a' };
    }
    match (state.terrain, state.lit) {
        (Terrain::Floor, false) => '.',
        (Terrain::Floor, true) => ',',
        (Terrain::Wall, false) => '#',
        (Terrain::Wall, true) => '%',
        (Terrain::ClosedDoor, _) => '+',
        (Terrain::OpenDoor, _) => '\'',
        (Terrain::Glass, _) => '=',
        (Terrain::Curtain, _) => '"',
    }
}
