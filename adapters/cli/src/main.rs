#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that renders fields of view and projectile paths on
//! plain-text dungeon maps.

mod options;
mod render;
mod scenario;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use dungeon_sight_core::{
    GridCoord, LightRadius, Observer, PathPolicy, PathRequest, WallLighting, MAX_RANGE,
};
use dungeon_sight_system_bootstrap::Bootstrap;
use dungeon_sight_world::{parse, ParsedMap};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use crate::{
    options::{parse_coord, parse_level, parse_light, ActorsArg, WallLightingArg},
    render::{describe_path, render_path, render_view},
    scenario::Scenario,
};

/// Field of view and projectile paths on plain-text dungeon maps.
#[derive(Debug, Parser)]
#[command(name = "dungeon-sight", version)]
struct Cli {
    /// Log level: off, error, warn, info, debug or trace.
    #[arg(long, global = true, default_value = "warn", value_parser = parse_level)]
    verbose: LevelFilter,
    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Print what an observer standing on the map sees.
    View(ViewArgs),
    /// Trace a projectile path between two cells.
    Trace(TraceArgs),
    /// Report whether a straight line joins two cells.
    Los(LosArgs),
    /// Run a TOML scenario file.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct ViewArgs {
    /// Map file.
    #[arg(long)]
    map: PathBuf,
    /// Observer cell as ROW,COLUMN; defaults to the map's `@`.
    #[arg(long, value_parser = parse_coord)]
    observer: Option<GridCoord>,
    /// Light carried: dark, full or a torch radius.
    #[arg(long, default_value = "dark", value_parser = parse_light)]
    light: LightRadius,
    /// The observer is blind.
    #[arg(long)]
    blind: bool,
    /// Rule deciding which lit walls are seen.
    #[arg(long, value_enum, default_value_t = WallLightingArg::Nearest)]
    wall_lighting: WallLightingArg,
}

#[derive(Debug, Args)]
struct TraceArgs {
    /// Map file.
    #[arg(long)]
    map: PathBuf,
    /// Source cell as ROW,COLUMN; defaults to the map's `@`.
    #[arg(long, value_parser = parse_coord)]
    from: Option<GridCoord>,
    /// Target cell as ROW,COLUMN.
    #[arg(long, value_parser = parse_coord)]
    to: GridCoord,
    /// Maximum distance travelled.
    #[arg(long, default_value_t = MAX_RANGE)]
    range: i32,
    /// Treatment of actors on the path.
    #[arg(long, value_enum, default_value_t = ActorsArg::Stop)]
    actors: ActorsArg,
    /// Terrain never stops the path.
    #[arg(long)]
    pass_walls: bool,
    /// The first actor met is passed as if absent.
    #[arg(long)]
    first_actor_free: bool,
    /// Concealed actors do not count as actors.
    #[arg(long)]
    ignore_concealed: bool,
    /// Only the candidate nearest the true line may be chosen.
    #[arg(long)]
    strict: bool,
    /// Every step shares an edge with the previous one.
    #[arg(long)]
    orthogonal: bool,
    /// Continue past the target until range runs out.
    #[arg(long)]
    extend: bool,
    /// Fall back to a sight line when the line of fire is blocked.
    #[arg(long)]
    sight_fallback: bool,
}

#[derive(Debug, Args)]
struct LosArgs {
    /// Map file.
    #[arg(long)]
    map: PathBuf,
    /// First cell as ROW,COLUMN; defaults to the map's `@`.
    #[arg(long, value_parser = parse_coord)]
    from: Option<GridCoord>,
    /// Second cell as ROW,COLUMN.
    #[arg(long, value_parser = parse_coord)]
    to: GridCoord,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Scenario file.
    scenario: PathBuf,
}

impl TraceArgs {
    fn request(&self, source: GridCoord) -> PathRequest {
        let policy = PathPolicy {
            pass_walls: self.pass_walls,
            actors: self.actors.into(),
            first_actor_free: self.first_actor_free,
            concealed_actors_block: !self.ignore_concealed,
            strict_line_of_fire: self.strict,
            orthogonal_steps: self.orthogonal,
            extend_past_target: self.extend,
            sight_fallback: self.sight_fallback,
        };
        PathRequest::new(source, self.to)
            .with_range(self.range)
            .with_policy(policy)
    }
}

fn load_map(path: &Path) -> Result<ParsedMap> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read map {}", path.display()))?;
    parse(&contents).with_context(|| format!("failed to parse map {}", path.display()))
}

fn resolve(explicit: Option<GridCoord>, map: &ParsedMap, what: &str) -> Result<GridCoord> {
    explicit
        .or(map.observer)
        .ok_or_else(|| anyhow!("no {what} cell given and the map has no `@` marker"))
}

fn view(bootstrap: &Bootstrap, args: &ViewArgs) -> Result<()> {
    let map = load_map(&args.map)?;
    let cell = resolve(args.observer, &map, "observer")?;
    let observer = Observer {
        cell,
        light: args.light,
        blind: args.blind,
    };
    let mut systems = bootstrap.systems(args.wall_lighting.into());
    let mut changes = Vec::new();
    systems.observe(&map.world, &observer, &mut changes);
    info!(
        "{} cells visible, {} seen",
        systems.field_of_view().visible_cells().len(),
        systems.field_of_view().seen_cells().len()
    );
    print!("{}", render_view(&map.world, &systems, cell));
    Ok(())
}

fn trace(bootstrap: &Bootstrap, args: &TraceArgs) -> Result<()> {
    let map = load_map(&args.map)?;
    let source = resolve(args.from, &map, "source")?;
    let mut systems = bootstrap.systems(WallLighting::default());
    let result = systems.trace(&map.world, &args.request(source));
    println!("{}", describe_path(&result));
    print!("{}", render_path(&map.world, source, &result));
    Ok(())
}

fn los(bootstrap: &Bootstrap, args: &LosArgs) -> Result<()> {
    let map = load_map(&args.map)?;
    let from = resolve(args.from, &map, "first")?;
    let systems = bootstrap.systems(WallLighting::default());
    let clear = systems.line_of_sight(&map.world, from, args.to);
    println!("{clear}");
    Ok(())
}

fn run(bootstrap: &Bootstrap, args: &RunArgs) -> Result<()> {
    let (scenario, map) = Scenario::load(&args.scenario)?;
    print!("{}", scenario.run(bootstrap, &map)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    TermLogger::init(
        cli.verbose,
        ConfigBuilder::default()
            .set_time_level(LevelFilter::Trace)
            .build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("failed to install the terminal logger")?;

    let bootstrap = Bootstrap::initialise().context("failed to build the visibility table")?;

    match &cli.action {
        Action::View(args) => view(&bootstrap, args),
        Action::Trace(args) => trace(&bootstrap, args),
        Action::Los(args) => los(&bootstrap, args),
        Action::Run(args) => run(&bootstrap, args),
    }
}
