use glam::DVec3;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Stable particle identity in `[0, count)`.
pub type ParticleId = usize;

/// Number of spatial axes the simulation runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Dimensions {
    #[serde(rename = "2d")]
    Two,
    #[default]
    #[serde(rename = "3d")]
    Three,
}

impl Dimensions {
    #[must_use]
    pub fn count(self) -> usize {
        match self {
            Dimensions::Two => 2,
            Dimensions::Three => 3,
        }
    }

    #[must_use]
    pub fn is_3d(self) -> bool {
        matches!(self, Dimensions::Three)
    }

    /// Builds a vector from the first `count()` components of `values`.
    /// Missing axes are zero.
    #[must_use]
    pub fn vector_from(self, values: &[f64]) -> DVec3 {
        match self {
            Dimensions::Two => DVec3::new(values[0], values[1], 0.0),
            Dimensions::Three => DVec3::new(values[0], values[1], values[2]),
        }
    }

    /// Drops the inactive axis so 2D vectors stay in the XY plane.
    #[inline]
    #[must_use]
    pub fn project(self, v: DVec3) -> DVec3 {
        match self {
            Dimensions::Two => DVec3::new(v.x, v.y, 0.0),
            Dimensions::Three => v,
        }
    }
}

#[derive(
    Serialize, Deserialize, Debug, Clone, PartialEq, Default, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
/// Persisted particle state: three parallel arrays.
///
/// `indices[row]` names the particle whose position and velocity occupy
/// `positions[row * dims..(row + 1) * dims]` and the same slice of
/// `velocities`. The arrays carry no dimensionality of their own; callers
/// validate them against the dimensions they expect.
pub struct InitialState {
    pub indices: Vec<ParticleId>,
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
}

impl InitialState {
    /// Flattens per-particle vectors into the persisted layout.
    #[must_use]
    pub fn from_vectors(dims: Dimensions, positions: &[DVec3], velocities: &[DVec3]) -> Self {
        let n = dims.count();
        let mut flat_p = Vec::with_capacity(positions.len() * n);
        let mut flat_v = Vec::with_capacity(velocities.len() * n);
        for (p, v) in positions.iter().zip(velocities) {
            flat_p.extend_from_slice(&p.to_array()[..n]);
            flat_v.extend_from_slice(&v.to_array()[..n]);
        }
        Self {
            indices: (0..positions.len()).collect(),
            positions: flat_p,
            velocities: flat_v,
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    /// Checks the arrays describe exactly `count` particles in `dims` axes.
    ///
    /// Every id in `[0, count)` must appear exactly once and every value must
    /// be finite. Nothing is repaired: a state that fails here is rejected.
    pub fn validate(&self, count: usize, dims: Dimensions) -> anyhow::Result<()> {
        let n = dims.count();
        anyhow::ensure!(
            self.indices.len() == count,
            "State holds {} particle indices, expected {}",
            self.indices.len(),
            count
        );
        anyhow::ensure!(
            self.positions.len() == count * n,
            "State holds {} position values, expected {} ({} particles x {} axes)",
            self.positions.len(),
            count * n,
            count,
            n
        );
        anyhow::ensure!(
            self.velocities.len() == count * n,
            "State holds {} velocity values, expected {} ({} particles x {} axes)",
            self.velocities.len(),
            count * n,
            count,
            n
        );

        let mut seen = vec![false; count];
        for &id in &self.indices {
            anyhow::ensure!(id < count, "Particle index {} out of range [0, {})", id, count);
            anyhow::ensure!(!seen[id], "Particle index {} appears more than once", id);
            seen[id] = true;
        }

        anyhow::ensure!(
            self.positions.iter().all(|v| v.is_finite()),
            "State contains non-finite positions"
        );
        anyhow::ensure!(
            self.velocities.iter().all(|v| v.is_finite()),
            "State contains non-finite velocities"
        );
        Ok(())
    }

    /// Expands the arrays into per-particle vectors ordered by particle id.
    pub fn to_vectors(&self, dims: Dimensions) -> anyhow::Result<(Vec<DVec3>, Vec<DVec3>)> {
        let count = self.count();
        self.validate(count, dims)?;
        let n = dims.count();

        let mut positions = vec![DVec3::ZERO; count];
        let mut velocities = vec![DVec3::ZERO; count];
        for (row, &id) in self.indices.iter().enumerate() {
            let span = row * n..(row + 1) * n;
            positions[id] = dims.vector_from(&self.positions[span.clone()]);
            velocities[id] = dims.vector_from(&self.velocities[span]);
        }
        Ok((positions, velocities))
    }
}
