//! Particle position/velocity storage.
//!
//! Velocities are double-buffered: during a tick new velocities are written
//! into a buffer taken from [`Particles::begin_velocity_update`] and only
//! become visible on [`Particles::commit_velocities`], so every rule evaluated
//! in the tick reads the pre-tick state.

use glam::DVec3;
use murmuration_data::{Dimensions, InitialState, ParticleId};
use rand::Rng;
use std::f64::consts::TAU;

#[derive(Debug, Clone, PartialEq)]
pub struct Particles {
    dims: Dimensions,
    positions: Vec<DVec3>,
    velocities: Vec<DVec3>,
    spare: Vec<DVec3>,
    updating: bool,
}

impl Particles {
    /// Places `count` particles uniformly in `[lower, upper]` on every active
    /// axis, each moving in a random direction at `speed`.
    pub fn random<R: Rng + ?Sized>(
        count: usize,
        dims: Dimensions,
        lower: f64,
        upper: f64,
        speed: f64,
        rng: &mut R,
    ) -> Self {
        let mut positions = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        for _ in 0..count {
            let p = DVec3::new(
                rng.gen_range(lower..=upper),
                rng.gen_range(lower..=upper),
                rng.gen_range(lower..=upper),
            );
            positions.push(dims.project(p));
            velocities.push(random_direction(dims, rng) * speed);
        }
        Self {
            dims,
            positions,
            velocities,
            spare: Vec::new(),
            updating: false,
        }
    }

    /// Restores particles from persisted state. Malformed state is rejected
    /// as a whole.
    pub fn from_state(state: &InitialState, dims: Dimensions) -> anyhow::Result<Self> {
        let (positions, velocities) = state.to_vectors(dims)?;
        Ok(Self {
            dims,
            positions,
            velocities,
            spare: Vec::new(),
            updating: false,
        })
    }

    #[must_use]
    pub fn from_vectors(dims: Dimensions, positions: Vec<DVec3>, velocities: Vec<DVec3>) -> Self {
        assert_eq!(
            positions.len(),
            velocities.len(),
            "positions and velocities must describe the same particles"
        );
        Self {
            dims,
            positions,
            velocities,
            spare: Vec::new(),
            updating: false,
        }
    }

    #[must_use]
    pub fn to_state(&self) -> InitialState {
        InitialState::from_vectors(self.dims, &self.positions, &self.velocities)
    }

    #[must_use]
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn ids(&self) -> std::ops::Range<ParticleId> {
        0..self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn position(&self, id: ParticleId) -> DVec3 {
        self.positions[id]
    }

    #[inline]
    #[must_use]
    pub fn velocity(&self, id: ParticleId) -> DVec3 {
        self.velocities[id]
    }

    #[must_use]
    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    #[must_use]
    pub fn velocities(&self) -> &[DVec3] {
        &self.velocities
    }

    pub fn set_position(&mut self, id: ParticleId, p: DVec3) {
        self.positions[id] = self.dims.project(p);
    }

    pub fn set_velocity(&mut self, id: ParticleId, v: DVec3) {
        self.velocities[id] = self.dims.project(v);
    }

    /// Hands out the empty velocity write buffer for a tick.
    ///
    /// # Panics
    /// If the previous tick never committed its buffer.
    #[must_use]
    pub fn begin_velocity_update(&mut self) -> Vec<DVec3> {
        assert!(
            !self.updating,
            "velocity write buffer must be empty at tick start"
        );
        self.updating = true;
        let mut buffer = std::mem::take(&mut self.spare);
        buffer.clear();
        buffer.reserve(self.velocities.len());
        buffer
    }

    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Publishes one new velocity per particle, in id order, and keeps the
    /// old storage as next tick's buffer.
    pub fn commit_velocities(&mut self, mut next: Vec<DVec3>) {
        assert!(self.updating, "begin_velocity_update must run before commit");
        assert_eq!(
            next.len(),
            self.velocities.len(),
            "expected one new velocity per particle"
        );
        for v in &mut next {
            *v = self.dims.project(*v);
        }
        std::mem::swap(&mut self.velocities, &mut next);
        next.clear();
        self.spare = next;
        self.updating = false;
    }

    /// Moves every particle by `velocity * dt`.
    pub fn advance(&mut self, dt: f64) {
        for (p, v) in self.positions.iter_mut().zip(&self.velocities) {
            *p += *v * dt;
        }
    }
}

/// Unit vector uniformly distributed on the circle (2D) or sphere (3D).
fn random_direction<R: Rng + ?Sized>(dims: Dimensions, rng: &mut R) -> DVec3 {
    let theta = rng.gen_range(0.0..TAU);
    match dims {
        Dimensions::Two => DVec3::new(theta.cos(), theta.sin(), 0.0),
        Dimensions::Three => {
            let z: f64 = rng.gen_range(-1.0..=1.0);
            let r = (1.0 - z * z).max(0.0).sqrt();
            DVec3::new(r * theta.cos(), r * theta.sin(), z)
        }
    }
}
