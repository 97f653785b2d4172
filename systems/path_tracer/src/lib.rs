#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic line-of-fire tracing for ranged effects.
//!
//! A path follows the one or two sight lines of the [`VisibilityTable`] that
//! pass closest to the centre of the destination. Walking the table outward
//! yields one or two candidate cells per step along the dominant axis; the
//! tracer picks one per step according to the request's [`PathPolicy`].
//! Validating a shot and executing it use the same call, so identical inputs
//! against an unchanged world always produce the identical path.

use dungeon_sight_core::{
    ActorPolicy, CanonicalOffset, GridCoord, GridOffset, Octant, PathPolicy, PathRequest,
    PathResult, WorldQuery, MAX_RANGE, MAX_SIGHT,
};
use dungeon_sight_system_visibility_table::{SightMask, TableWalk, VisibilityTable};
use log::debug;

/// Traces projectile paths, reusing its scratch buffers between calls.
#[derive(Debug, Default)]
pub struct PathTracer {
    walk: TableWalk,
    collected: Vec<usize>,
}

/// How strongly a cell resists the path, in order of preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Block {
    Clear,
    Actor,
    Terrain,
}

/// Everything fixed for the duration of one trace.
struct Shot<'a, W: ?Sized> {
    world: &'a W,
    source: GridCoord,
    policy: PathPolicy,
    octant: Octant,
    target: CanonicalOffset,
    range: i32,
}

impl<W> Shot<'_, W>
where
    W: WorldQuery + ?Sized,
{
    fn cell(&self, at: CanonicalOffset) -> GridCoord {
        self.source.offset(self.octant.transform(at.y, at.x))
    }

    fn blocks_terrain(&self, cell: GridCoord) -> bool {
        !self.world.is_in_bounds(cell)
            || (!self.policy.pass_walls && self.world.is_opaque_to_projectiles(cell))
    }

    fn block(&self, at: CanonicalOffset) -> Block {
        let cell = self.cell(at);
        if self.blocks_terrain(cell) {
            return Block::Terrain;
        }
        let counts = self.policy.actors != ActorPolicy::Ignore
            && self.world.has_actor(cell)
            && (self.policy.concealed_actors_block || !self.world.is_actor_concealed(cell));
        if counts {
            Block::Actor
        } else {
            Block::Clear
        }
    }

    /// Twice the area between the true line and `at`; zero on the line.
    fn nearness(&self, at: CanonicalOffset) -> i64 {
        (i64::from(at.y) * i64::from(self.target.x) - i64::from(self.target.y) * i64::from(at.x))
            .abs()
    }
}

/// Outcome of following one fire mask.
struct Trace {
    result: PathResult,
    reached: bool,
    halted_by_terrain: bool,
}

/// Mutable progress of the step-by-step selection.
struct Progress {
    cells: Vec<GridCoord>,
    impeded: bool,
    reached: bool,
    halted_by_terrain: bool,
    free_pass: bool,
}

impl Progress {
    /// Appends a cell to the path, returning whether the path continues past it.
    fn visit<W>(&mut self, shot: &Shot<'_, W>, at: CanonicalOffset) -> bool
    where
        W: WorldQuery + ?Sized,
    {
        self.cells.push(shot.cell(at));
        let at_target = at == shot.target;
        if at_target {
            self.reached = true;
        }

        match shot.block(at) {
            Block::Terrain => {
                self.halted_by_terrain = !at_target;
                return false;
            }
            Block::Actor if at_target => {
                return shot.policy.extend_past_target
                    && shot.policy.actors == ActorPolicy::SoftStop;
            }
            Block::Actor if self.free_pass => self.free_pass = false,
            Block::Actor => {
                self.impeded = true;
                if shot.policy.actors == ActorPolicy::Stop {
                    return false;
                }
            }
            Block::Clear => {}
        }

        !at_target || shot.policy.extend_past_target
    }
}

impl PathTracer {
    /// Creates a tracer with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Traces the path described by `request`.
    ///
    /// Destinations beyond [`MAX_SIGHT`] are pulled in proportionally and the
    /// range is clamped to [`MAX_RANGE`]. The source never appears in the
    /// result. Lookup failures and broken geometry end the path early instead
    /// of failing.
    pub fn trace<W>(
        &mut self,
        table: &VisibilityTable,
        world: &W,
        request: &PathRequest,
    ) -> PathResult
    where
        W: WorldQuery + ?Sized,
    {
        let offset = rescale(
            i64::from(request.target.row()) - i64::from(request.source.row()),
            i64::from(request.target.column()) - i64::from(request.source.column()),
        );
        let Some((octant, target)) = Octant::classify(offset) else {
            return PathResult::default();
        };
        let Some(target_entry) = table
            .entry_index(target.y, target.x)
            .and_then(|index| table.entry(index))
        else {
            debug!(
                "no table entry for offset {offset:?} from {:?}",
                request.source
            );
            return PathResult::default();
        };

        let shot = Shot {
            world,
            source: request.source,
            policy: request.policy,
            octant,
            target,
            range: request.range.min(MAX_RANGE),
        };
        if shot.range <= 0 {
            return PathResult::default();
        }

        let fire = target_entry.fire();
        let trace = self.follow(table, &shot, fire.mask());
        if !shot.policy.sight_fallback || trace.reached || !trace.halted_by_terrain {
            return trace.result;
        }

        let blocked = table
            .entries()
            .iter()
            .filter(|entry| entry.x() < target.x && entry.mask().intersects(target_entry.mask()))
            .filter(|entry| shot.blocks_terrain(request.source.offset(entry.offset(octant))))
            .fold(SightMask::EMPTY, |blocked, entry| blocked | entry.mask());
        let surviving = target_entry.mask().without(blocked);
        if !surviving.any() {
            debug!("every sight line to {:?} is blocked", request.target);
            return trace.result;
        }
        let Some(line) = surviving.iter().min_by_key(|&line| {
            line.abs_diff(fire.low()).min(line.abs_diff(fire.high()))
        }) else {
            return trace.result;
        };

        let retrace = self.follow(table, &shot, SightMask::single(line));
        if retrace.reached {
            debug!(
                "line of fire to {:?} blocked, following sight line {line}",
                request.target
            );
            retrace.result
        } else {
            trace.result
        }
    }

    /// Reports whether a bolt fired from `source` reaches `target`.
    ///
    /// Actors are ignored; a target that itself blocks projectiles is never
    /// reachable.
    pub fn projectable<W>(
        &mut self,
        table: &VisibilityTable,
        world: &W,
        source: GridCoord,
        target: GridCoord,
    ) -> bool
    where
        W: WorldQuery + ?Sized,
    {
        if source == target {
            return true;
        }
        if world.is_opaque_to_projectiles(target) {
            return false;
        }
        let request = PathRequest::new(source, target);
        self.trace(table, world, &request).last() == Some(target)
    }

    fn follow<W>(&mut self, table: &VisibilityTable, shot: &Shot<'_, W>, fire: SightMask) -> Trace
    where
        W: WorldQuery + ?Sized,
    {
        self.collect(table, shot, fire);

        let mut progress = Progress {
            cells: Vec::new(),
            impeded: false,
            reached: false,
            halted_by_terrain: false,
            free_pass: shot.policy.first_actor_free,
        };
        let mut budget = usize::try_from(shot.range).unwrap_or(0);
        let mut previous = CanonicalOffset { y: 0, x: 0 };
        let mut start = 0;

        while start < self.collected.len() {
            let column = self.column_at(table, start);
            let end = (start..self.collected.len())
                .find(|&position| self.column_at(table, position) != column)
                .unwrap_or(self.collected.len());
            let step = &self.collected[start..end];
            start = end;

            if column != previous.x + 1 {
                debug!(
                    "path from {:?} skips from column {} to {column}",
                    shot.source, previous.x
                );
                break;
            }

            let Some(choice) = choose(table, shot, step, previous) else {
                debug!(
                    "path from {:?} has no candidate adjacent to {previous:?}",
                    shot.source
                );
                break;
            };

            if shot.policy.orthogonal_steps && choice.y != previous.y {
                let straight = CanonicalOffset {
                    y: previous.y,
                    x: choice.x,
                };
                let across = CanonicalOffset {
                    y: choice.y,
                    x: previous.x,
                };
                let corner = if shot.block(across) < shot.block(straight) {
                    across
                } else {
                    straight
                };
                budget += 1;
                if !progress.visit(shot, corner) {
                    break;
                }
            }

            if !progress.visit(shot, choice) || progress.cells.len() >= budget {
                break;
            }
            previous = choice;
        }

        Trace {
            result: PathResult::new(progress.cells, progress.impeded),
            reached: progress.reached,
            halted_by_terrain: progress.halted_by_terrain,
        }
    }

    /// Gathers the table entries lying on the fire mask, in walk order.
    fn collect<W>(&mut self, table: &VisibilityTable, shot: &Shot<'_, W>, fire: SightMask)
    where
        W: WorldQuery + ?Sized,
    {
        self.collected.clear();
        self.walk.restart(table);

        let mut live = fire;
        let mut blocked = SightMask::EMPTY;
        let mut column = 1;

        while let Some(index) = self.walk.next_entry() {
            let Some(entry) = table.entry(index) else {
                continue;
            };
            // Lines blocked in a column stay open for the rest of that column.
            if entry.x() != column {
                live.clear(blocked);
                blocked = SightMask::EMPTY;
                column = entry.x();
            }
            if !entry.mask().intersects(live)
                || entry.distance() > shot.range
                || (!shot.policy.extend_past_target && entry.x() > shot.target.x)
            {
                continue;
            }

            let cell = shot.source.offset(entry.offset(shot.octant));
            if !shot.world.is_in_bounds(cell) {
                blocked = blocked | entry.mask();
                continue;
            }
            self.collected.push(index);
            if shot.blocks_terrain(cell) {
                blocked = blocked | entry.mask();
                continue;
            }
            self.walk.expand(table, index);
        }
    }

    fn column_at(&self, table: &VisibilityTable, position: usize) -> i32 {
        self.collected
            .get(position)
            .and_then(|&index| table.entry(index))
            .map_or(-1, |entry| entry.x())
    }
}

/// Picks the cell the path moves into for one step.
fn choose<W>(
    table: &VisibilityTable,
    shot: &Shot<'_, W>,
    step: &[usize],
    previous: CanonicalOffset,
) -> Option<CanonicalOffset>
where
    W: WorldQuery + ?Sized,
{
    let candidates = || {
        step.iter()
            .filter_map(|&index| table.entry(index))
            .map(|entry| CanonicalOffset {
                y: entry.y(),
                x: entry.x(),
            })
            .filter(move |at| (at.y - previous.y).abs() <= 1)
    };

    if let Some(target) = candidates().find(|&at| at == shot.target) {
        return Some(target);
    }
    let nearest = candidates().map(|at| shot.nearness(at)).min()?;
    candidates()
        .filter(|&at| !shot.policy.strict_line_of_fire || shot.nearness(at) == nearest)
        .min_by_key(|&at| (shot.block(at), shot.nearness(at)))
}

/// Pulls an offset beyond [`MAX_SIGHT`] back onto the sight disc.
///
/// Works in `i64` so targets at the far ends of the coordinate range keep
/// their direction.
fn rescale(dy: i64, dx: i64) -> GridOffset {
    let (ay, ax) = (dy.abs(), dx.abs());
    let reach = ay.max(ax) + (ay.min(ax) >> 1);
    let sight = i64::from(MAX_SIGHT);
    let (dy, dx) = if reach <= sight {
        (dy, dx)
    } else {
        (dy * sight / reach, dx * sight / reach)
    };
    GridOffset::new(
        i32::try_from(dy).unwrap_or_default(),
        i32::try_from(dx).unwrap_or_default(),
    )
}
