use glam::DVec3;
use murmuration_data::{Dimensions, ParticleId};

/// Packed cell key: `x + y * width + z * width * height`.
pub type CellKey = usize;

/// Integer cell coordinates, each within `[0, divisions)` on its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl CellIndex {
    #[must_use]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }
}

/// Borrowed view of one grid cell and the particles inside it.
#[derive(Debug, Clone, Copy)]
pub struct CellRef<'a> {
    pub key: CellKey,
    pub index: CellIndex,
    pub members: &'a [ParticleId],
}

#[derive(Clone, Debug)]
/// Uniform spatial partition of a cube (or square) of edge `size` centred on the origin.
///
/// Implements a dense grid using offset-indexed particle lists, rebuilt from
/// scratch every tick. Enables O(1) cell lookup for any particle and range
/// queries whose cost depends on the number of cells spanned, not the
/// population.
///
/// # Performance Characteristics
/// - Rebuild: O(particle_count + cell_count), two passes (count, then scatter)
/// - Cell lookup for a particle: O(1) via the per-particle cell table
/// - Range query: O(cells spanned + candidates returned)
/// - Memory: O(particle_count) for indices + O(cell_count) for offsets
///
/// # Implementation Notes
/// - Uses the "offset array" pattern (like compressed sparse rows):
///   `cell_offsets[k]..cell_offsets[k + 1]` are the members of cell `k`
/// - Members of a cell are stored in ascending particle id order
/// - Positions outside the world are clamped into the nearest edge cell
/// - In 2D the depth axis has a single cell
///
/// # Examples
/// ```
/// use glam::DVec3;
/// use murmuration_core::grid::Grid;
/// use murmuration_data::Dimensions;
///
/// let mut grid = Grid::new(4.0, 8, Dimensions::Three);
/// grid.rebuild(&[DVec3::ZERO, DVec3::new(0.1, 0.0, 0.0), DVec3::splat(1.9)]);
///
/// let near = grid.range_query(0, 0.2);
/// assert!(near.contains(&1));
/// ```
pub struct Grid {
    size: f64,
    width: usize,
    height: usize,
    depth: usize,
    cell_offsets: Vec<usize>,
    entity_indices: Vec<ParticleId>,
    point_cells: Vec<CellKey>,
    positions: Vec<DVec3>,
    occupied: Vec<CellKey>,
}

impl Grid {
    /// Creates a grid with `divisions` cells per axis; the depth axis gets a
    /// single cell in 2D.
    #[must_use]
    pub fn new(size: f64, divisions: usize, dims: Dimensions) -> Self {
        let depth = if dims.is_3d() { divisions } else { 1 };
        Self::with_divisions(size, divisions, divisions, depth)
    }

    /// Creates a grid with an explicit number of cells on each axis.
    #[must_use]
    pub fn with_divisions(size: f64, width: usize, height: usize, depth: usize) -> Self {
        assert!(
            width > 0 && height > 0 && depth > 0,
            "grid needs at least one cell per axis, got {}x{}x{}",
            width,
            height,
            depth
        );
        assert!(size > 0.0, "grid size must be positive, got {}", size);
        let cell_count = width * height * depth;
        Self {
            size,
            width,
            height,
            depth,
            cell_offsets: vec![0; cell_count + 1],
            entity_indices: Vec::new(),
            point_cells: Vec::new(),
            positions: Vec::new(),
            occupied: Vec::new(),
        }
    }

    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Number of particles inserted by the last rebuild.
    #[must_use]
    pub fn len(&self) -> usize {
        self.point_cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.point_cells.is_empty()
    }

    /// Edge lengths of one cell on each axis.
    #[must_use]
    pub fn cell_size(&self) -> DVec3 {
        DVec3::new(
            self.size / self.width as f64,
            self.size / self.height as f64,
            self.size / self.depth as f64,
        )
    }

    #[inline]
    #[must_use]
    pub fn is_valid_index(&self, x: i64, y: i64, z: i64) -> bool {
        x >= 0
            && (x as usize) < self.width
            && y >= 0
            && (y as usize) < self.height
            && z >= 0
            && (z as usize) < self.depth
    }

    #[inline]
    #[must_use]
    pub fn key(&self, index: CellIndex) -> CellKey {
        index.x + index.y * self.width + index.z * self.width * self.height
    }

    #[inline]
    #[must_use]
    pub fn index_of(&self, key: CellKey) -> CellIndex {
        let plane = self.width * self.height;
        CellIndex {
            x: key % self.width,
            y: (key % plane) / self.width,
            z: key / plane,
        }
    }

    /// Continuous cell coordinate of `coord` on an axis with `divisions` cells.
    #[inline]
    fn axis_coordinate(&self, coord: f64, divisions: usize) -> f64 {
        (coord / self.size) * divisions as f64 + divisions as f64 / 2.0
    }

    /// Clamped cell index of a continuous cell coordinate.
    #[inline]
    fn clamp_axis(raw: f64, divisions: usize) -> usize {
        // `as` saturates, and maps NaN to 0.
        (raw.floor() as i64).clamp(0, divisions as i64 - 1) as usize
    }

    /// Maps a world position to the cell containing it, clamping positions
    /// outside the world into the nearest edge cell.
    #[inline]
    #[must_use]
    pub fn world_to_cell(&self, p: DVec3) -> CellIndex {
        CellIndex {
            x: Self::clamp_axis(self.axis_coordinate(p.x, self.width), self.width),
            y: Self::clamp_axis(self.axis_coordinate(p.y, self.height), self.height),
            z: Self::clamp_axis(self.axis_coordinate(p.z, self.depth), self.depth),
        }
    }

    /// World-space bounds `(min, max)` of a cell; the inverse of [`Grid::world_to_cell`].
    #[must_use]
    pub fn cell_bounds(&self, index: CellIndex) -> (DVec3, DVec3) {
        let cell = self.cell_size();
        let origin = DVec3::splat(-self.size / 2.0);
        let min = origin + cell * DVec3::new(index.x as f64, index.y as f64, index.z as f64);
        (min, min + cell)
    }

    /// Clears every cell and reinserts all particles. `positions[id]` is the
    /// position of particle `id`.
    pub fn rebuild(&mut self, positions: &[DVec3]) {
        let cell_count = self.cell_count();
        let entity_count = positions.len();

        let mut point_cells = std::mem::take(&mut self.point_cells);
        point_cells.clear();
        point_cells.extend(positions.iter().map(|&p| self.key(self.world_to_cell(p))));
        self.point_cells = point_cells;
        self.positions.clear();
        self.positions.extend_from_slice(positions);

        let mut counts = vec![0usize; cell_count];
        for &key in &self.point_cells {
            counts[key] += 1;
        }

        self.cell_offsets.resize(cell_count + 1, 0);
        self.occupied.clear();
        let mut total = 0;
        for (key, &count) in counts.iter().enumerate() {
            self.cell_offsets[key] = total;
            total += count;
            if count > 0 {
                self.occupied.push(key);
            }
        }
        self.cell_offsets[cell_count] = total;

        self.entity_indices.resize(entity_count, 0);
        let mut current_offsets = self.cell_offsets[..cell_count].to_vec();
        for (id, &key) in self.point_cells.iter().enumerate() {
            let write_idx = current_offsets[key];
            self.entity_indices[write_idx] = id;
            current_offsets[key] += 1;
        }
    }

    #[inline]
    fn members(&self, key: CellKey) -> &[ParticleId] {
        &self.entity_indices[self.cell_offsets[key]..self.cell_offsets[key + 1]]
    }

    #[inline]
    fn cell_ref(&self, key: CellKey) -> CellRef<'_> {
        CellRef {
            key,
            index: self.index_of(key),
            members: self.members(key),
        }
    }

    /// Position recorded for `id` by the last rebuild.
    #[must_use]
    pub fn position(&self, id: ParticleId) -> DVec3 {
        self.positions[self.checked_id(id)]
    }

    #[inline]
    fn checked_id(&self, id: ParticleId) -> ParticleId {
        assert!(
            id < self.point_cells.len(),
            "particle {} is not in the grid ({} particles inserted); rebuild must run first",
            id,
            self.point_cells.len()
        );
        id
    }

    /// The cell holding particle `id`.
    #[must_use]
    pub fn cell_containing(&self, id: ParticleId) -> CellRef<'_> {
        self.cell_ref(self.point_cells[self.checked_id(id)])
    }

    /// Cell key of particle `id`.
    #[inline]
    #[must_use]
    pub fn cell_key_of(&self, id: ParticleId) -> CellKey {
        self.point_cells[self.checked_id(id)]
    }

    /// The cell at `index`, or `None` when the cell is empty or out of bounds.
    #[must_use]
    pub fn cell(&self, index: CellIndex) -> Option<CellRef<'_>> {
        if !self.is_valid_index(index.x as i64, index.y as i64, index.z as i64) {
            return None;
        }
        let key = self.key(index);
        self.is_occupied(key).then(|| self.cell_ref(key))
    }

    #[inline]
    #[must_use]
    pub fn is_occupied(&self, key: CellKey) -> bool {
        key < self.cell_count() && self.cell_offsets[key + 1] > self.cell_offsets[key]
    }

    /// Occupied cells in ascending key order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = CellRef<'_>> + '_ {
        self.occupied.iter().map(move |&key| self.cell_ref(key))
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    /// Face-adjacent cells of `index` that lie inside the grid: up to 6 in
    /// 3D, up to 4 when the depth axis has a single cell.
    pub fn face_neighbors(&self, index: CellIndex) -> impl Iterator<Item = CellIndex> + '_ {
        const OFFSETS: [(i64, i64, i64); 6] = [
            (1, 0, 0),
            (-1, 0, 0),
            (0, 1, 0),
            (0, -1, 0),
            (0, 0, 1),
            (0, 0, -1),
        ];
        OFFSETS.iter().filter_map(move |&(dx, dy, dz)| {
            let x = index.x as i64 + dx;
            let y = index.y as i64 + dy;
            let z = index.z as i64 + dz;
            self.is_valid_index(x, y, z)
                .then(|| CellIndex::new(x as usize, y as usize, z as usize))
        })
    }

    /// Inclusive cell span covering `[center - radius, center + radius]`,
    /// clamped to the grid.
    fn span(&self, center: DVec3, radius: f64) -> (CellIndex, CellIndex) {
        let lo = center - DVec3::splat(radius);
        let hi = center + DVec3::splat(radius);
        (self.world_to_cell(lo), self.world_to_cell(hi))
    }

    /// Calls `callback` for every particle in the cells spanned by a box of
    /// half-width `radius` around `center`.
    pub fn query_callback<F>(&self, center: DVec3, radius: f64, mut callback: F)
    where
        F: FnMut(ParticleId),
    {
        let (lo, hi) = self.span(center, radius);
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let key = self.key(CellIndex::new(x, y, z));
                    for &id in self.members(key) {
                        callback(id);
                    }
                }
            }
        }
    }

    /// Candidate neighbors of `id` within `radius`, excluding `id` itself.
    ///
    /// This is a box query over whole cells: it never misses a particle whose
    /// Euclidean distance is at most `radius`, but may return particles
    /// farther away. Use [`Grid::range_query_exact`] to filter them out.
    #[must_use]
    pub fn range_query(&self, id: ParticleId, radius: f64) -> Vec<ParticleId> {
        let mut result = Vec::new();
        self.range_query_into(id, radius, &mut result);
        result
    }

    #[inline]
    pub fn range_query_into(&self, id: ParticleId, radius: f64, result: &mut Vec<ParticleId>) {
        result.clear();
        let center = self.position(id);
        self.query_callback(center, radius, |other| {
            if other != id {
                result.push(other);
            }
        });
    }

    /// Like [`Grid::range_query`], keeping only particles within `radius`.
    #[must_use]
    pub fn range_query_exact(&self, id: ParticleId, radius: f64) -> Vec<ParticleId> {
        let center = self.position(id);
        let r2 = radius * radius;
        let mut result = Vec::new();
        self.query_callback(center, radius, |other| {
            if other != id && self.positions[other].distance_squared(center) <= r2 {
                result.push(other);
            }
        });
        result
    }

    /// Number of particles in the cells spanned by a query, without collecting them.
    #[must_use]
    pub fn count_nearby(&self, center: DVec3, radius: f64) -> usize {
        let (lo, hi) = self.span(center, radius);
        let mut count = 0;
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let key = self.key(CellIndex::new(x, y, z));
                    count += self.cell_offsets[key + 1] - self.cell_offsets[key];
                }
            }
        }
        count
    }
}
