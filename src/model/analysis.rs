//! Population statistics for saved or running flocks.

use glam::DVec3;
use murmuration_core::cluster::ClusterTracker;
use murmuration_core::config::FlockConfig;
use murmuration_core::grid::Grid;
use murmuration_data::{InitialState, SimulationSummary};

/// Summarizes particles, rebuilding a grid and clusters from the positions
/// with the physical parameters of `config`.
#[must_use]
pub fn summarize(
    tick: u64,
    config: &FlockConfig,
    positions: &[DVec3],
    velocities: &[DVec3],
) -> SimulationSummary {
    let mut summary = SimulationSummary::from_particles(tick, positions, velocities);

    let mut grid = Grid::new(
        config.world.size,
        config.grid.divisions,
        config.world.dimensions,
    );
    grid.rebuild(positions);
    let mut clusters = ClusterTracker::new(config.grid.min_cells_per_cluster);
    clusters.compute(&grid);

    summary.occupied_cells = grid.occupied_count();
    summary.clusters = clusters.clusters().len();
    summary.largest_cluster_cells = clusters
        .clusters()
        .iter()
        .map(|c| c.cells.len())
        .max()
        .unwrap_or(0);
    summary
}

/// Summarizes a persisted state after checking it matches `config`.
pub fn summarize_state(
    tick: u64,
    config: &FlockConfig,
    state: &InitialState,
) -> anyhow::Result<SimulationSummary> {
    state.validate(config.world.count, config.world.dimensions)?;
    let (positions, velocities) = state.to_vectors(config.world.dimensions)?;
    Ok(summarize(tick, config, &positions, &velocities))
}

/// Markdown report for the `analyze` tool.
#[must_use]
pub fn render_report(summary: &SimulationSummary, config: &FlockConfig) -> String {
    format!(
        "# Murmuration Flock Report\n\n\
        ## Summary\n\
        - **Tick**: {}\n\
        - **Particles**: {} ({} non-finite)\n\
        - **World**: size {}, particle size {}, {:?}\n\
        - **Bounds**: [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]\n\
        - **Speed**: mean {:.4}, max {:.4}\n\n\
        ## Grid\n\
        - **Occupied cells**: {} of {}\n\
        - **Clusters**: {} (largest {} cells)\n",
        summary.tick,
        summary.particles,
        summary.non_finite,
        config.world.size,
        config.world.particle_size,
        config.world.dimensions,
        summary.min_position.x,
        summary.min_position.y,
        summary.min_position.z,
        summary.max_position.x,
        summary.max_position.y,
        summary.max_position.z,
        summary.mean_speed,
        summary.max_speed,
        summary.occupied_cells,
        cell_count(config),
        summary.clusters,
        summary.largest_cluster_cells,
    )
}

fn cell_count(config: &FlockConfig) -> usize {
    let d = config.grid.divisions;
    if config.world.dimensions.is_3d() {
        d * d * d
    } else {
        d * d
    }
}
