//! Connected-component tracking over occupied grid cells.
//!
//! Occupied cells sharing a face (6-connected in 3D, 4-connected in 2D) form
//! a component. Components with more than `min_cells_per_cluster` cells
//! become clusters; the rest belong to no cluster. Cohesion steers particles
//! toward their cluster's centroid.

use glam::DVec3;
use murmuration_data::ParticleId;

use crate::grid::{CellKey, Grid};

pub type ClusterId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Mean position of every particle in the cluster's cells.
    pub centroid: DVec3,
    pub cells: Vec<CellKey>,
    pub particles: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterTracker {
    min_cells_per_cluster: usize,
    visited: Vec<bool>,
    cell_clusters: Vec<Option<ClusterId>>,
    clusters: Vec<Cluster>,
    stack: Vec<CellKey>,
}

impl ClusterTracker {
    #[must_use]
    pub fn new(min_cells_per_cluster: usize) -> Self {
        Self {
            min_cells_per_cluster,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn min_cells_per_cluster(&self) -> usize {
        self.min_cells_per_cluster
    }

    pub fn set_min_cells_per_cluster(&mut self, min_cells: usize) {
        self.min_cells_per_cluster = min_cells;
    }

    /// Drops every cluster and cell assignment.
    pub fn clear(&mut self) {
        self.clusters.clear();
        self.cell_clusters.iter_mut().for_each(|c| *c = None);
        self.visited.iter_mut().for_each(|v| *v = false);
    }

    /// Recomputes clusters from the grid's current contents.
    ///
    /// Must run after [`Grid::rebuild`]. Cost is O(occupied cells + particles).
    pub fn compute(&mut self, grid: &Grid) {
        let cell_count = grid.cell_count();
        self.clusters.clear();
        self.visited.clear();
        self.visited.resize(cell_count, false);
        self.cell_clusters.clear();
        self.cell_clusters.resize(cell_count, None);

        let mut component: Vec<CellKey> = Vec::new();
        for start in grid.occupied_cells() {
            if self.visited[start.key] {
                continue;
            }

            component.clear();
            let mut sum = DVec3::ZERO;
            let mut count = 0usize;

            self.visited[start.key] = true;
            self.stack.clear();
            self.stack.push(start.key);
            while let Some(key) = self.stack.pop() {
                component.push(key);
                let index = grid.index_of(key);
                if let Some(cell) = grid.cell(index) {
                    for &id in cell.members {
                        sum += grid.position(id);
                    }
                    count += cell.members.len();
                }

                for neighbor in grid.face_neighbors(index) {
                    let nkey = grid.key(neighbor);
                    if grid.is_occupied(nkey) && !self.visited[nkey] {
                        self.visited[nkey] = true;
                        self.stack.push(nkey);
                    }
                }
            }

            if component.len() > self.min_cells_per_cluster {
                let id = self.clusters.len();
                for &key in &component {
                    self.cell_clusters[key] = Some(id);
                }
                self.clusters.push(Cluster {
                    id,
                    centroid: sum / count as f64,
                    cells: component.clone(),
                    particles: count,
                });
            }
        }
    }

    /// Clusters found by the last [`ClusterTracker::compute`], indexed by id.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id)
    }

    #[must_use]
    pub fn cluster_for_cell(&self, key: CellKey) -> Option<&Cluster> {
        self.cell_clusters
            .get(key)
            .copied()
            .flatten()
            .and_then(|id| self.clusters.get(id))
    }

    /// The cluster holding particle `id`, or `None` if its cell belongs to none.
    #[must_use]
    pub fn cluster_of(&self, grid: &Grid, id: ParticleId) -> Option<&Cluster> {
        self.cluster_for_cell(grid.cell_key_of(id))
    }
}
