//! Parsers and value enums shared by the command line and scenario files.

use clap::ValueEnum;
use dungeon_sight_core::{ActorPolicy, GridCoord, LightRadius, WallLighting};
use log::LevelFilter;
use serde::Deserialize;

/// Lit-wall rule selectable from the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum WallLightingArg {
    /// Only the neighbour nearest the observer lights a wall.
    #[default]
    Nearest,
    /// Any neighbour facing the observer lights a wall.
    Facing,
}

impl From<WallLightingArg> for WallLighting {
    fn from(value: WallLightingArg) -> Self {
        match value {
            WallLightingArg::Nearest => Self::NearestNeighbor,
            WallLightingArg::Facing => Self::FacingNeighbors,
        }
    }
}

/// Actor policy selectable from the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ActorsArg {
    /// Paths end on the first actor.
    #[default]
    Stop,
    /// Paths are marked impeded by actors but continue.
    Soft,
    /// Actors are ignored.
    Ignore,
}

impl From<ActorsArg> for ActorPolicy {
    fn from(value: ActorsArg) -> Self {
        match value {
            ActorsArg::Stop => Self::Stop,
            ActorsArg::Soft => Self::SoftStop,
            ActorsArg::Ignore => Self::Ignore,
        }
    }
}

/// Parses a `ROW,COLUMN` pair.
pub(crate) fn parse_coord(value: &str) -> Result<GridCoord, String> {
    let (row, column) = value
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COLUMN, found `{value}`"))?;
    let row = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row `{}`", row.trim()))?;
    let column = column
        .trim()
        .parse()
        .map_err(|_| format!("invalid column `{}`", column.trim()))?;
    Ok(GridCoord::new(row, column))
}

/// Parses `dark`, `full` or a torch radius.
pub(crate) fn parse_light(value: &str) -> Result<LightRadius, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "dark" | "none" => Ok(LightRadius::Dark),
        "full" | "lit" => Ok(LightRadius::FullyLit),
        radius => radius
            .parse::<u8>()
            .map(LightRadius::Torch)
            .map_err(|_| format!("expected dark, full or a radius, found `{value}`")),
    }
}

/// Parses a log level name such as `warn` or `debug`.
pub(crate) fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("unknown log level `{value}`"))
}
