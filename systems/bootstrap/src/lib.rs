#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! One-time initialisation of the shared sight table and the systems built on it.

use dungeon_sight_core::{
    GridCoord, Observer, PathRequest, PathResult, SeenChange, WallLighting, WorldQuery,
};
use dungeon_sight_system_field_of_view::FieldOfView;
use dungeon_sight_system_path_tracer::PathTracer;
use dungeon_sight_system_point_los::line_of_sight;
use dungeon_sight_system_visibility_table::{init_global, TableError, VisibilityTable};
use log::info;

/// Handle proving the process-wide visibility table has been built.
#[derive(Clone, Copy, Debug)]
pub struct Bootstrap {
    table: &'static VisibilityTable,
}

impl Bootstrap {
    /// Builds the process-wide table, or reuses it when already built.
    ///
    /// Fails when the table's self-checks reject the configured radius; no
    /// sight query can run in that case.
    pub fn initialise() -> Result<Self, TableError> {
        let table = init_global()?;
        Ok(Self { table })
    }

    /// Shared visibility table.
    #[must_use]
    pub const fn table(&self) -> &'static VisibilityTable {
        self.table
    }

    /// Creates the per-observer systems using the provided lit-wall rule.
    #[must_use]
    pub fn systems(&self, wall_lighting: WallLighting) -> SightSystems {
        info!("sight systems ready, lit walls use {wall_lighting:?}");
        SightSystems {
            table: self.table,
            field_of_view: FieldOfView::new(wall_lighting),
            path_tracer: PathTracer::new(),
        }
    }
}

/// Field of view and path tracing for one observer, sharing one table.
#[derive(Debug)]
pub struct SightSystems {
    table: &'static VisibilityTable,
    field_of_view: FieldOfView,
    path_tracer: PathTracer,
}

impl SightSystems {
    /// Recomputes the observer's field of view, reporting seen-state flips.
    pub fn observe<W>(&mut self, world: &W, observer: &Observer, out: &mut Vec<SeenChange>)
    where
        W: WorldQuery + ?Sized,
    {
        self.field_of_view.update(self.table, world, observer, out);
    }

    /// Drops the field of view, reporting every seen cell as lost.
    pub fn forget(&mut self, out: &mut Vec<SeenChange>) {
        self.field_of_view.forget(out);
    }

    /// Current field of view.
    #[must_use]
    pub const fn field_of_view(&self) -> &FieldOfView {
        &self.field_of_view
    }

    /// Traces a projectile path.
    pub fn trace<W>(&mut self, world: &W, request: &PathRequest) -> PathResult
    where
        W: WorldQuery + ?Sized,
    {
        self.path_tracer.trace(self.table, world, request)
    }

    /// Reports whether a bolt from `source` reaches `target`.
    pub fn projectable<W>(&mut self, world: &W, source: GridCoord, target: GridCoord) -> bool
    where
        W: WorldQuery + ?Sized,
    {
        self.path_tracer.projectable(self.table, world, source, target)
    }

    /// Reports whether a straight line joins the two cells.
    #[must_use]
    pub fn line_of_sight<W>(&self, world: &W, a: GridCoord, b: GridCoord) -> bool
    where
        W: WorldQuery + ?Sized,
    {
        line_of_sight(world, a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_sight_core::{LightRadius, PathPolicy, MAX_SIGHT};
    use dungeon_sight_world::World;

    #[test]
    fn initialise_is_idempotent() {
        let first = Bootstrap::initialise().expect("table builds");
        let second = Bootstrap::initialise().expect("table builds");
        assert!(std::ptr::eq(first.table(), second.table()));
        assert_eq!(first.table().radius(), MAX_SIGHT);
    }

    #[test]
    fn systems_share_the_table() {
        let bootstrap = Bootstrap::initialise().expect("table builds");
        let mut systems = bootstrap.systems(WallLighting::FacingNeighbors);
        let world = World::new();
        let observer = Observer::new(GridCoord::new(10, 10), LightRadius::Torch(1));

        let mut changes = Vec::new();
        systems.observe(&world, &observer, &mut changes);
        assert_eq!(changes.len(), 9);
        assert_eq!(
            systems.field_of_view().wall_lighting(),
            WallLighting::FacingNeighbors
        );

        let request = PathRequest::new(observer.cell, GridCoord::new(10, 14))
            .with_policy(PathPolicy::BOLT);
        assert_eq!(systems.trace(&world, &request).len(), 4);
        assert!(systems.projectable(&world, observer.cell, GridCoord::new(0, 0)));
        assert!(systems.line_of_sight(&world, observer.cell, GridCoord::new(0, 20)));

        changes.clear();
        systems.forget(&mut changes);
        assert_eq!(changes.len(), 9);
    }
}
