use dungeon_sight_core::{
    distance, ActorPolicy, Command, GridCoord, PathPolicy, PathRequest, PathResult, Terrain,
    MAX_RANGE,
};
use dungeon_sight_system_path_tracer::PathTracer;
use dungeon_sight_system_visibility_table::VisibilityTable;
use dungeon_sight_world::{self as world, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn table() -> VisibilityTable {
    VisibilityTable::build().expect("standard table builds")
}

fn cells(points: &[(i32, i32)]) -> Vec<GridCoord> {
    points
        .iter()
        .map(|&(row, column)| GridCoord::new(row, column))
        .collect()
}

fn open_world(commands: Vec<Command>) -> World {
    let mut map = World::new();
    let mut events = Vec::new();
    for command in commands {
        world::apply(&mut map, command, &mut events);
    }
    map
}

fn wall(row: i32, column: i32) -> Command {
    Command::SetTerrain {
        cell: GridCoord::new(row, column),
        terrain: Terrain::Wall,
    }
}

fn actor(row: i32, column: i32, concealed: bool) -> Command {
    Command::PlaceActor {
        cell: GridCoord::new(row, column),
        concealed,
    }
}

fn trace(
    map: &World,
    from: (i32, i32),
    to: (i32, i32),
    range: i32,
    policy: PathPolicy,
) -> PathResult {
    let table = table();
    let request = PathRequest::new(GridCoord::new(from.0, from.1), GridCoord::new(to.0, to.1))
        .with_range(range)
        .with_policy(policy);
    PathTracer::new().trace(&table, map, &request)
}

#[test]
fn wall_in_front_of_the_shooter_ends_the_path() {
    let map = open_world(vec![wall(10, 11)]);
    let result = trace(&map, (10, 10), (10, 15), 10, PathPolicy::BOLT);
    assert_eq!(result.cells(), cells(&[(10, 11)]).as_slice());
    assert!(!result.impeded());
    assert_eq!(result.signed_len(), 1);
}

#[test]
fn bolt_stops_on_the_first_actor() {
    let map = open_world(vec![actor(5, 8, false)]);
    let result = trace(&map, (5, 5), (5, 10), 10, PathPolicy::BOLT);
    assert_eq!(result.cells(), cells(&[(5, 6), (5, 7), (5, 8)]).as_slice());
    assert!(result.impeded());
    assert_eq!(result.signed_len(), -3);
}

#[test]
fn soft_stop_marks_the_path_but_keeps_going() {
    let map = open_world(vec![actor(5, 8, false)]);
    let policy = PathPolicy {
        actors: ActorPolicy::SoftStop,
        ..PathPolicy::BOLT
    };
    let result = trace(&map, (5, 5), (5, 10), 10, policy);
    assert_eq!(
        result.cells(),
        cells(&[(5, 6), (5, 7), (5, 8), (5, 9), (5, 10)]).as_slice()
    );
    assert!(result.impeded());
}

#[test]
fn first_actor_is_a_free_pass() {
    let map = open_world(vec![actor(5, 8, false)]);
    let policy = PathPolicy {
        first_actor_free: true,
        ..PathPolicy::BOLT
    };
    let result = trace(&map, (5, 5), (5, 10), 10, policy);
    assert_eq!(result.last(), Some(GridCoord::new(5, 10)));
    assert!(!result.impeded());

    let map = open_world(vec![actor(5, 7, false), actor(5, 9, false)]);
    let result = trace(&map, (5, 5), (5, 10), 10, policy);
    assert_eq!(
        result.cells(),
        cells(&[(5, 6), (5, 7), (5, 8), (5, 9)]).as_slice()
    );
    assert!(result.impeded());
}

#[test]
fn concealed_actors_block_only_when_asked() {
    let map = open_world(vec![actor(5, 8, true)]);
    let result = trace(&map, (5, 5), (5, 10), 10, PathPolicy::BOLT);
    assert_eq!(result.len(), 3);
    assert!(result.impeded());

    let policy = PathPolicy {
        concealed_actors_block: false,
        ..PathPolicy::BOLT
    };
    let result = trace(&map, (5, 5), (5, 10), 10, policy);
    assert_eq!(result.len(), 5);
    assert!(!result.impeded());
}

#[test]
fn actor_on_the_target_is_hit_without_impeding() {
    let map = open_world(vec![actor(10, 15, false)]);
    let result = trace(&map, (10, 10), (10, 15), MAX_RANGE, PathPolicy::BOLT);
    assert_eq!(result.last(), Some(GridCoord::new(10, 15)));
    assert!(!result.impeded());

    let extended = PathPolicy {
        extend_past_target: true,
        ..PathPolicy::BOLT
    };
    let result = trace(&map, (10, 10), (10, 15), 8, extended);
    assert_eq!(result.last(), Some(GridCoord::new(10, 15)));

    let piercing = PathPolicy {
        actors: ActorPolicy::SoftStop,
        ..extended
    };
    let result = trace(&map, (10, 10), (10, 15), 8, piercing);
    assert_eq!(result.len(), 8);
    assert_eq!(result.last(), Some(GridCoord::new(10, 18)));
    assert!(!result.impeded());
}

#[test]
fn diagonal_shot_follows_the_nearest_cells() {
    let map = World::new();
    let result = trace(&map, (5, 5), (7, 9), MAX_RANGE, PathPolicy::default());
    assert_eq!(
        result.cells(),
        cells(&[(5, 6), (6, 7), (6, 8), (7, 9)]).as_slice()
    );

    let result = trace(&map, (5, 5), (0, 0), MAX_RANGE, PathPolicy::default());
    assert_eq!(
        result.cells(),
        cells(&[(4, 4), (3, 3), (2, 2), (1, 1), (0, 0)]).as_slice()
    );
}

#[test]
fn orthogonal_steps_split_every_diagonal_move() {
    let map = World::new();
    let policy = PathPolicy {
        orthogonal_steps: true,
        ..PathPolicy::default()
    };
    let result = trace(&map, (5, 5), (7, 9), MAX_RANGE, policy);
    assert_eq!(
        result.cells(),
        cells(&[(5, 6), (5, 7), (6, 7), (6, 8), (6, 9), (7, 9)]).as_slice()
    );
}

#[test]
fn beam_extends_past_the_target_until_range_runs_out() {
    let map = World::new();
    let result = trace(&map, (0, 0), (1, 2), 10, PathPolicy::BEAM);
    assert_eq!(
        result.cells(),
        cells(&[(0, 1), (1, 2), (1, 3), (2, 4), (2, 5), (3, 6), (3, 7), (4, 8)]).as_slice()
    );
}

#[test]
fn glass_stops_bolts_unless_walls_are_passable() {
    let map = open_world(vec![Command::SetTerrain {
        cell: GridCoord::new(10, 12),
        terrain: Terrain::Glass,
    }]);
    let result = trace(&map, (10, 10), (10, 15), MAX_RANGE, PathPolicy::BOLT);
    assert_eq!(result.cells(), cells(&[(10, 11), (10, 12)]).as_slice());

    let policy = PathPolicy {
        pass_walls: true,
        ..PathPolicy::BOLT
    };
    let result = trace(&map, (10, 10), (10, 15), MAX_RANGE, policy);
    assert_eq!(result.last(), Some(GridCoord::new(10, 15)));
    assert_eq!(result.len(), 5);
}

#[test]
fn strict_line_of_fire_refuses_the_detour() {
    let map = open_world(vec![wall(12, 14)]);
    let loose = trace(&map, (10, 10), (12, 15), MAX_RANGE, PathPolicy::BOLT);
    assert_eq!(
        loose.cells(),
        cells(&[(10, 11), (11, 12), (11, 13), (11, 14)]).as_slice()
    );

    let policy = PathPolicy {
        strict_line_of_fire: true,
        ..PathPolicy::BOLT
    };
    let strict = trace(&map, (10, 10), (12, 15), MAX_RANGE, policy);
    assert_eq!(
        strict.cells(),
        cells(&[(10, 11), (11, 12), (11, 13), (12, 14)]).as_slice()
    );
}

#[test]
fn sight_fallback_curves_around_a_blocked_line_of_fire() {
    let map = open_world(vec![wall(11, 12)]);
    let blocked = trace(&map, (10, 10), (11, 13), MAX_RANGE, PathPolicy::BOLT);
    assert_eq!(blocked.cells(), cells(&[(10, 11), (11, 12)]).as_slice());

    let policy = PathPolicy {
        sight_fallback: true,
        ..PathPolicy::BOLT
    };
    let fallback = trace(&map, (10, 10), (11, 13), MAX_RANGE, policy);
    assert_eq!(
        fallback.cells(),
        cells(&[(10, 11), (10, 12), (11, 13)]).as_slice()
    );
}

#[test]
fn distant_targets_are_pulled_onto_the_sight_disc() {
    let map = World::with_dimensions(5, 41);
    let result = trace(&map, (0, 0), (4, 20), MAX_RANGE, PathPolicy::default());
    assert_eq!(result.len(), 17);
    assert_eq!(result.last(), Some(GridCoord::new(3, 17)));
}

#[test]
fn targets_at_the_coordinate_limits_are_clamped() {
    let map = World::with_dimensions(21, 41);
    let result = trace(
        &map,
        (10, 10),
        (10, 200_000_000),
        MAX_RANGE,
        PathPolicy::BOLT,
    );
    assert_eq!(result.len(), MAX_RANGE as usize);
    assert_eq!(result.cells()[0], GridCoord::new(10, 11));
    assert_eq!(result.last(), Some(GridCoord::new(10, 28)));
    assert!(!result.impeded());

    let result = trace(
        &map,
        (10, 20),
        (10, -200_000_000),
        MAX_RANGE,
        PathPolicy::BOLT,
    );
    assert_eq!(result.last(), Some(GridCoord::new(10, 2)));

    let result = trace(
        &map,
        (10, 20),
        (i32::MIN, i32::MAX),
        MAX_RANGE,
        PathPolicy::BOLT,
    );
    assert!(!result.is_empty());
    assert!(result.len() <= MAX_RANGE as usize);
    assert!(result
        .cells()
        .iter()
        .all(|cell| cell.row() < 10 && cell.column() > 20));
}

#[test]
fn range_limits_the_path() {
    let map = World::with_dimensions(5, 21);
    let result = trace(&map, (2, 0), (2, 20), 5, PathPolicy::default());
    assert_eq!(result.last(), Some(GridCoord::new(2, 5)));
    let result = trace(&map, (2, 0), (2, 20), 40, PathPolicy::default());
    assert_eq!(result.len(), MAX_RANGE as usize);
    let result = trace(&map, (2, 0), (2, 20), 0, PathPolicy::default());
    assert!(result.is_empty());
}

#[test]
fn identical_endpoints_yield_an_empty_path() {
    let map = World::new();
    let result = trace(&map, (10, 10), (10, 10), MAX_RANGE, PathPolicy::BOLT);
    assert!(result.is_empty());
    assert!(!result.impeded());
}

#[test]
fn random_open_paths_are_contiguous_and_bounded() {
    let table = table();
    let map = World::with_dimensions(41, 41);
    let mut tracer = PathTracer::new();
    let mut rng = ChaCha8Rng::seed_from_u64(0x11e5);

    for _ in 0..2_000 {
        let source = GridCoord::new(rng.gen_range(0..41), rng.gen_range(0..41));
        let target = GridCoord::new(rng.gen_range(0..41), rng.gen_range(0..41));
        if source == target {
            continue;
        }
        let policy = PathPolicy {
            extend_past_target: rng.gen_bool(0.3),
            orthogonal_steps: rng.gen_bool(0.3),
            ..PathPolicy::default()
        };
        let request = PathRequest::new(source, target).with_policy(policy);
        let result = tracer.trace(&table, &map, &request);

        let mut previous = source;
        for &cell in result.cells() {
            let offset = previous.offset_to(cell);
            if policy.orthogonal_steps {
                assert_eq!(offset.dy().abs() + offset.dx().abs(), 1, "{request:?}");
            } else {
                assert_eq!(offset.dy().abs().max(offset.dx().abs()), 1, "{request:?}");
            }
            previous = cell;
        }
        if let Some(last) = result.last() {
            assert!(source.distance(last) <= MAX_RANGE);
        }
        if !policy.orthogonal_steps {
            assert!(result.len() <= MAX_RANGE as usize);
        }
        if source.distance(target) <= MAX_RANGE {
            assert!(result.cells().contains(&target), "{request:?} missed");
        }
        assert!(!result.impeded());
    }
}

#[test]
fn tracing_is_deterministic_against_an_unchanged_world() {
    let table = table();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut map = World::new();
    let mut events = Vec::new();
    for _ in 0..60 {
        let cell = GridCoord::new(rng.gen_range(0..21), rng.gen_range(0..21));
        let command = if rng.gen_bool(0.5) {
            Command::SetTerrain {
                cell,
                terrain: Terrain::Wall,
            }
        } else {
            Command::PlaceActor {
                cell,
                concealed: rng.gen_bool(0.2),
            }
        };
        world::apply(&mut map, command, &mut events);
    }

    let mut first = PathTracer::new();
    let mut second = PathTracer::new();
    for _ in 0..500 {
        let source = GridCoord::new(rng.gen_range(0..21), rng.gen_range(0..21));
        let target = GridCoord::new(rng.gen_range(0..21), rng.gen_range(0..21));
        let policy = PathPolicy {
            actors: ActorPolicy::SoftStop,
            sight_fallback: rng.gen_bool(0.5),
            ..PathPolicy::BOLT
        };
        let request = PathRequest::new(source, target)
            .with_range(rng.gen_range(1..=MAX_RANGE))
            .with_policy(policy);
        let once = first.trace(&table, &map, &request);
        let again = first.trace(&table, &map, &request);
        let fresh = second.trace(&table, &map, &request);
        assert_eq!(once, again);
        assert_eq!(once, fresh);
        if let Some(last) = once.last() {
            let offset = source.offset_to(last);
            assert!(distance(offset.dy(), offset.dx()) <= request.range);
        }
    }
}

#[test]
fn projectable_follows_the_bolt() {
    let table = table();
    let map = open_world(vec![wall(10, 13), actor(8, 10, false)]);
    let mut tracer = PathTracer::new();
    let source = GridCoord::new(10, 10);
    assert!(tracer.projectable(&table, &map, source, source));
    assert!(tracer.projectable(&table, &map, source, GridCoord::new(10, 12)));
    assert!(!tracer.projectable(&table, &map, source, GridCoord::new(10, 13)));
    assert!(!tracer.projectable(&table, &map, source, GridCoord::new(10, 15)));
    assert!(tracer.projectable(&table, &map, source, GridCoord::new(6, 10)));
    assert!(!tracer.projectable(&table, &map, source, GridCoord::new(10, 10 + MAX_RANGE + 2)));
}
