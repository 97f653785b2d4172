use std::collections::BTreeSet;

use dungeon_sight_core::{
    distance, Command, GridCoord, LightRadius, Observer, SeenChange, Terrain, WallLighting,
    WorldQuery, MAX_SIGHT,
};
use dungeon_sight_system_field_of_view::FieldOfView;
use dungeon_sight_system_visibility_table::VisibilityTable;
use dungeon_sight_world::{self as world, query, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn table() -> VisibilityTable {
    VisibilityTable::build().expect("standard table builds")
}

fn random_world(rng: &mut ChaCha8Rng, rows: u32, columns: u32) -> World {
    let mut map = World::with_dimensions(rows, columns);
    let mut events = Vec::new();
    let cells: Vec<GridCoord> = query::cells(&map).collect();
    for cell in cells {
        if rng.gen_bool(0.2) {
            let terrain = match rng.gen_range(0..4) {
                0 => Terrain::ClosedDoor,
                1 => Terrain::Curtain,
                2 => Terrain::Glass,
                _ => Terrain::Wall,
            };
            world::apply(&mut map, Command::SetTerrain { cell, terrain }, &mut events);
        }
        if rng.gen_bool(0.3) {
            world::apply(&mut map, Command::SetLit { cell, lit: true }, &mut events);
        }
    }
    map
}

fn seen_set(fov: &FieldOfView) -> BTreeSet<GridCoord> {
    fov.seen_cells().iter().copied().collect()
}

#[test]
fn torch_in_an_open_room_lights_exactly_its_disc() {
    let table = table();
    let map = World::new();
    let observer = Observer::new(GridCoord::new(10, 10), LightRadius::Torch(3));
    let mut fov = FieldOfView::default();
    let mut changes = Vec::new();
    fov.update(&table, &map, &observer, &mut changes);

    let disc: BTreeSet<GridCoord> = query::cells(&map)
        .filter(|cell| observer.cell.distance(*cell) <= 3)
        .collect();
    assert_eq!(seen_set(&fov), disc);
    assert_eq!(fov.visible_cells().len(), 21 * 21);
    assert!(query::cells(&map).all(|cell| fov.is_visible(cell)));
    assert_eq!(changes.len(), disc.len());
}

#[test]
fn repeated_update_is_idempotent() {
    let table = table();
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    for _ in 0..20 {
        let map = random_world(&mut rng, 31, 31);
        let cell = GridCoord::new(rng.gen_range(0..31), rng.gen_range(0..31));
        let observer = Observer::new(cell, LightRadius::Torch(rng.gen_range(0..6)));
        let mut fov = FieldOfView::default();
        let mut changes = Vec::new();
        fov.update(&table, &map, &observer, &mut changes);
        let visible: BTreeSet<GridCoord> = fov.visible_cells().iter().copied().collect();
        let seen = seen_set(&fov);

        changes.clear();
        fov.update(&table, &map, &observer, &mut changes);
        assert!(changes.is_empty(), "second update reported {changes:?}");
        assert_eq!(fov.visible_cells().iter().copied().collect::<BTreeSet<_>>(), visible);
        assert_eq!(seen_set(&fov), seen);
    }
}

#[test]
fn larger_light_never_hides_a_seen_cell() {
    let table = table();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..20 {
        let map = random_world(&mut rng, 31, 31);
        let cell = GridCoord::new(15, 15);
        let mut previous = BTreeSet::new();
        for radius in 0..8 {
            let observer = Observer::new(cell, LightRadius::Torch(radius));
            let mut fov = FieldOfView::new(WallLighting::FacingNeighbors);
            let mut changes = Vec::new();
            fov.update(&table, &map, &observer, &mut changes);
            let seen = seen_set(&fov);
            assert!(previous.is_subset(&seen), "radius {radius} lost cells");
            previous = seen;
        }
    }
}

#[test]
fn visible_cells_stay_within_sight_range() {
    let table = table();
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let map = World::with_dimensions(61, 61);
    let observer = Observer::new(GridCoord::new(30, 30), LightRadius::FullyLit);
    let mut fov = FieldOfView::default();
    let mut changes = Vec::new();
    fov.update(&table, &map, &observer, &mut changes);
    assert!(fov
        .visible_cells()
        .iter()
        .all(|cell| observer.cell.distance(*cell) <= MAX_SIGHT));
    assert_eq!(fov.seen_cells().len(), fov.visible_cells().len());

    for _ in 0..10 {
        let map = random_world(&mut rng, 61, 61);
        let cell = GridCoord::new(rng.gen_range(0..61), rng.gen_range(0..61));
        let observer = Observer::new(cell, LightRadius::FullyLit);
        fov.update(&table, &map, &observer, &mut changes);
        for visible in fov.visible_cells() {
            let offset = cell.offset_to(*visible);
            assert!(distance(offset.dy(), offset.dx()) <= MAX_SIGHT);
            assert!(map.is_in_bounds(*visible));
        }
        assert!(fov.seen_cells().iter().all(|cell| fov.is_visible(*cell)));
    }
}

#[test]
fn seen_changes_track_the_set_difference() {
    let table = table();
    let mut rng = ChaCha8Rng::seed_from_u64(0xfeed);
    let map = random_world(&mut rng, 41, 41);
    let mut fov = FieldOfView::default();
    let mut seen = BTreeSet::new();
    let mut changes = Vec::new();

    for _ in 0..30 {
        let cell = GridCoord::new(rng.gen_range(0..41), rng.gen_range(0..41));
        let observer = Observer::new(cell, LightRadius::Torch(rng.gen_range(0..5)));
        changes.clear();
        fov.update(&table, &map, &observer, &mut changes);

        let mut reported = BTreeSet::new();
        for SeenChange { cell, seen: now } in &changes {
            assert!(reported.insert(*cell), "{cell:?} reported twice");
            if *now {
                assert!(seen.insert(*cell));
            } else {
                assert!(seen.remove(cell));
            }
        }
        assert_eq!(seen, seen_set(&fov));
    }
}

#[test]
fn deterministic_replay_matches_a_fresh_computation() {
    let table = table();
    let first = replay(&table);
    let second = replay(&table);
    assert_eq!(first, second, "replay diverged between runs");
}

fn replay(table: &VisibilityTable) -> Vec<(Vec<SeenChange>, Vec<GridCoord>)> {
    let mut map = World::new();
    let mut fov = FieldOfView::default();
    let mut log = Vec::new();
    let mut observer = Observer::new(GridCoord::new(10, 10), LightRadius::Torch(2));

    for command in scripted_commands() {
        let mut events = Vec::new();
        world::apply(&mut map, command, &mut events);
        if !events.iter().any(|event| event.affects_sight()) {
            continue;
        }
        observer.cell = GridCoord::new(observer.cell.row(), (observer.cell.column() + 1) % 21);

        let mut changes = Vec::new();
        fov.update(table, &map, &observer, &mut changes);

        let mut fresh = FieldOfView::default();
        let mut ignored = Vec::new();
        fresh.update(table, &map, &observer, &mut ignored);
        assert_eq!(seen_set(&fov), seen_set(&fresh));

        let mut seen: Vec<GridCoord> = fov.seen_cells().to_vec();
        seen.sort();
        log.push((changes, seen));
    }
    log
}

fn scripted_commands() -> Vec<Command> {
    vec![
        Command::SetTerrain {
            cell: GridCoord::new(10, 12),
            terrain: Terrain::Wall,
        },
        Command::SetLit {
            cell: GridCoord::new(4, 4),
            lit: true,
        },
        Command::PlaceActor {
            cell: GridCoord::new(3, 3),
            concealed: false,
        },
        Command::SetTerrain {
            cell: GridCoord::new(9, 14),
            terrain: Terrain::ClosedDoor,
        },
        Command::SetTerrain {
            cell: GridCoord::new(9, 14),
            terrain: Terrain::OpenDoor,
        },
        Command::SetLit {
            cell: GridCoord::new(12, 18),
            lit: true,
        },
        Command::SetTerrain {
            cell: GridCoord::new(10, 12),
            terrain: Terrain::Curtain,
        },
    ]
}
