//! TOML scenario files: one map, one observer and any number of shots.

use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use dungeon_sight_core::{GridCoord, LightRadius, Observer, PathPolicy, PathRequest, MAX_RANGE};
use dungeon_sight_system_bootstrap::Bootstrap;
use dungeon_sight_world::{parse, ParsedMap};
use log::{debug, info};
use serde::Deserialize;

use crate::{
    options::{parse_light, ActorsArg, WallLightingArg},
    render::{describe_path, render_path, render_view},
};

const SUPPORTED_VERSION: u32 = 1;

/// Top-level layout of a scenario file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    version: u32,
    /// Inline map text.
    #[serde(default)]
    map: Option<String>,
    /// Map file, relative to the scenario file.
    #[serde(default)]
    map_file: Option<String>,
    #[serde(default)]
    wall_lighting: WallLightingArg,
    #[serde(default)]
    observer: ObserverEntry,
    #[serde(default)]
    shots: Vec<ShotEntry>,
    #[serde(default)]
    sight_checks: Vec<SightCheckEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObserverEntry {
    /// Overrides the `@` marker of the map.
    #[serde(default)]
    cell: Option<[i32; 2]>,
    #[serde(default)]
    light: Option<String>,
    #[serde(default)]
    blind: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ShotEntry {
    #[serde(default)]
    from: Option<[i32; 2]>,
    to: [i32; 2],
    #[serde(default = "default_range")]
    range: i32,
    #[serde(default)]
    actors: ActorsArg,
    #[serde(default)]
    pass_walls: bool,
    #[serde(default)]
    first_actor_free: bool,
    #[serde(default = "default_true")]
    concealed_actors_block: bool,
    #[serde(default)]
    strict: bool,
    #[serde(default)]
    orthogonal: bool,
    #[serde(default)]
    extend: bool,
    #[serde(default)]
    sight_fallback: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SightCheckEntry {
    #[serde(default)]
    from: Option<[i32; 2]>,
    to: [i32; 2],
}

const fn default_range() -> i32 {
    MAX_RANGE
}

const fn default_true() -> bool {
    true
}

fn coord([row, column]: [i32; 2]) -> GridCoord {
    GridCoord::new(row, column)
}

impl ShotEntry {
    fn request(&self, source: GridCoord) -> PathRequest {
        let policy = PathPolicy {
            pass_walls: self.pass_walls,
            actors: self.actors.into(),
            first_actor_free: self.first_actor_free,
            concealed_actors_block: self.concealed_actors_block,
            strict_line_of_fire: self.strict,
            orthogonal_steps: self.orthogonal,
            extend_past_target: self.extend,
            sight_fallback: self.sight_fallback,
        };
        PathRequest::new(source, coord(self.to))
            .with_range(self.range)
            .with_policy(policy)
    }
}

impl Scenario {
    /// Reads and validates a scenario file, resolving `map_file` against its directory.
    pub(crate) fn load(path: &Path) -> Result<(Self, ParsedMap)> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario = Self::parse(&contents)
            .with_context(|| format!("invalid scenario {}", path.display()))?;
        let map_text = match (&scenario.map, &scenario.map_file) {
            (Some(text), None) => text.clone(),
            (None, Some(file)) => {
                let map_path = path.parent().unwrap_or_else(|| Path::new(".")).join(file);
                fs::read_to_string(&map_path)
                    .with_context(|| format!("failed to read map {}", map_path.display()))?
            }
            (Some(_), Some(_)) => bail!("scenario sets both `map` and `map_file`"),
            (None, None) => bail!("scenario sets neither `map` nor `map_file`"),
        };
        let map = parse(&map_text).context("failed to parse scenario map")?;
        Ok((scenario, map))
    }

    /// Parses scenario text and checks its version.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(contents).context("failed to parse scenario TOML")?;
        if scenario.version != SUPPORTED_VERSION {
            bail!(
                "unsupported scenario version {}, expected {SUPPORTED_VERSION}",
                scenario.version
            );
        }
        Ok(scenario)
    }

    /// Runs the scenario against `map`, returning the printed report.
    pub(crate) fn run(&self, bootstrap: &Bootstrap, map: &ParsedMap) -> Result<String> {
        let cell = self
            .observer
            .cell
            .map(coord)
            .or(map.observer)
            .ok_or_else(|| anyhow!("scenario has no observer cell and the map has no `@`"))?;
        let light = match &self.observer.light {
            Some(text) => parse_light(text).map_err(|message| anyhow!(message))?,
            None => LightRadius::Dark,
        };
        let observer = Observer {
            cell,
            light,
            blind: self.observer.blind,
        };

        let mut systems = bootstrap.systems(self.wall_lighting.into());
        let mut changes = Vec::new();
        systems.observe(&map.world, &observer, &mut changes);
        info!(
            "scenario observer at {cell:?} sees {} cells",
            systems.field_of_view().seen_cells().len()
        );

        let mut report = String::from("view:\n");
        report.push_str(&render_view(&map.world, &systems, cell));

        for (index, shot) in self.shots.iter().enumerate() {
            let source = shot.from.map_or(cell, coord);
            let request = shot.request(source);
            debug!("shot {index}: {request:?}");
            let result = systems.trace(&map.world, &request);
            report.push_str(&format!("\nshot {}: {}\n", index + 1, describe_path(&result)));
            report.push_str(&render_path(&map.world, source, &result));
        }

        if !self.sight_checks.is_empty() {
            report.push('\n');
        }
        for check in &self.sight_checks {
            let from = check.from.map_or(cell, coord);
            let to = coord(check.to);
            let visible = systems.line_of_sight(&map.world, from, to);
            report.push_str(&format!(
                "sight ({},{}) -> ({},{}): {}\n",
                from.row(),
                from.column(),
                to.row(),
                to.column(),
                if visible { "clear" } else { "blocked" }
            ));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORRIDOR: &str = r#"
version = 1
map = """
@..a..
"""

[observer]
light = "full"

[[shots]]
to = [0, 5]
actors = "stop"

[[shots]]
to = [0, 5]
actors = "ignore"

[[sight_checks]]
to = [0, 5]
"#;

    #[test]
    fn rejects_unknown_versions() {
        let error = Scenario::parse("version = 7\nmap = \"@\"\n").expect_err("version 7");
        assert!(error.to_string().contains("unsupported scenario version 7"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Scenario::parse("version = 1\nmapp = \"@\"\n").is_err());
    }

    #[test]
    fn shot_defaults_match_a_plain_path() {
        let scenario = Scenario::parse("version = 1\n[[shots]]\nto = [1, 2]\n").expect("parses");
        let request = scenario.shots[0].request(GridCoord::new(0, 0));
        assert_eq!(
            request,
            PathRequest::new(GridCoord::new(0, 0), GridCoord::new(1, 2))
                .with_policy(PathPolicy::BOLT)
        );
    }

    #[test]
    fn runs_shots_and_sight_checks() {
        let scenario = Scenario::parse(CORRIDOR).expect("parses");
        let map = parse(scenario.map.as_deref().expect("inline map")).expect("map parses");
        let bootstrap = Bootstrap::initialise().expect("table builds");
        let report = scenario.run(&bootstrap, &map).expect("runs");
        assert_eq!(
            report,
            "view:\n@..a..\n\
             \nshot 1: -3 impeded: (0,1) (0,2) (0,3)\n@**X..\n\
             \nshot 2: 5 clear: (0,1) (0,2) (0,3) (0,4) (0,5)\n@*****\n\
             \nsight (0,0) -> (0,5): clear\n"
        );
    }

    #[test]
    fn bundled_scenario_loads_its_map_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/vault.toml");
        let (scenario, map) = Scenario::load(&path).expect("bundled scenario loads");
        assert_eq!(map.observer, Some(GridCoord::new(2, 3)));
        assert_eq!(scenario.shots.len(), 3);

        let bootstrap = Bootstrap::initialise().expect("table builds");
        let report = scenario.run(&bootstrap, &map).expect("runs");
        assert!(report.starts_with("view:\n"));
        assert_eq!(report.matches("\nshot ").count(), 3);
        assert_eq!(report.matches("\nsight (").count(), 2);
    }
}
