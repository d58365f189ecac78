//! Per-tick neighbor cache with attention-limited sampling.
//!
//! The cache is filled once per tick from grid range queries, before any
//! force rule runs. Rules never query the grid themselves, so every rule in
//! a tick sees the same neighbor snapshot.

use murmuration_data::ParticleId;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::grid::Grid;

/// Upper bound on neighbors a particle attends to per tick, whatever the local density.
pub const MAX_NOTICEABLE: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct NeighborManager {
    offsets: Vec<usize>,
    neighbor_indices: Vec<ParticleId>,
    radius: f64,
    exact: bool,
    scratch: Vec<ParticleId>,
}

impl NeighborManager {
    /// `exact` filters grid candidates by true distance instead of keeping
    /// the whole box query.
    #[must_use]
    pub fn new(exact: bool) -> Self {
        Self {
            exact,
            offsets: vec![0],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn set_exact(&mut self, exact: bool) {
        self.exact = exact;
    }

    /// Number of particles with a cached list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
        self.offsets.push(0);
        self.neighbor_indices.clear();
    }

    /// Caches the neighbor list of every particle in `grid` for this tick.
    pub fn update(&mut self, grid: &Grid, radius: f64) {
        self.clear();
        self.radius = radius;
        self.offsets.reserve(grid.len());

        for id in 0..grid.len() {
            if self.exact {
                self.neighbor_indices
                    .extend(grid.range_query_exact(id, radius));
            } else {
                grid.range_query_into(id, radius, &mut self.scratch);
                self.neighbor_indices.extend_from_slice(&self.scratch);
            }
            self.offsets.push(self.neighbor_indices.len());
        }
    }

    /// Full cached neighbor list of `id`.
    #[must_use]
    pub fn full_neighbors(&self, id: ParticleId) -> &[ParticleId] {
        assert!(
            id < self.len(),
            "particle {} has no cached neighbors ({} cached); update must run before rules",
            id,
            self.len()
        );
        &self.neighbor_indices[self.offsets[id]..self.offsets[id + 1]]
    }

    /// How many neighbors a particle with `available` candidates attends to.
    #[inline]
    #[must_use]
    pub fn sample_size(available: usize, attentiveness: f64) -> usize {
        let noticeable = available.min(MAX_NOTICEABLE);
        ((attentiveness.clamp(0.0, 1.0) * noticeable as f64).floor() as usize).min(noticeable)
    }

    /// Samples `attentiveness * min(MAX_NOTICEABLE, n)` neighbors of `id`
    /// without replacement.
    ///
    /// When the sample would cover the whole list, the cached list is
    /// returned unchanged and `rng` is not used. Otherwise a partial shuffle
    /// of a copy picks the sample, so the cache is never reordered.
    pub fn neighbors_of<R: Rng + ?Sized>(
        &self,
        id: ParticleId,
        attentiveness: f64,
        rng: &mut R,
    ) -> Vec<ParticleId> {
        let full = self.full_neighbors(id);
        let k = Self::sample_size(full.len(), attentiveness);
        if k >= full.len() {
            return full.to_vec();
        }
        let mut copy = full.to_vec();
        let (sample, _) = copy.partial_shuffle(rng, k);
        sample.to_vec()
    }

    /// Mean cached list length, for metrics.
    #[must_use]
    pub fn mean_neighbor_count(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.neighbor_indices.len() as f64 / self.len() as f64
        }
    }
}

/// Deterministic sampling stream for one particle in one tick.
///
/// Depends only on `(seed, tick, id)`, so the order particles are visited in
/// does not change what they notice.
#[must_use]
pub fn sampling_rng(seed: u64, tick: u64, id: ParticleId) -> ChaCha8Rng {
    let mixed = seed
        ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (id as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    ChaCha8Rng::seed_from_u64(mixed)
}
