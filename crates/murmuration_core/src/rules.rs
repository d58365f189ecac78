//! The five steering rules.
//!
//! Every rule is a pure function of a read-only [`TickContext`] and a
//! particle id. Rules never touch shared state; the integrator sums their
//! outputs.

use std::collections::BTreeMap;

use glam::DVec3;
use murmuration_data::{ParticleId, RuleKind};

use crate::cluster::ClusterTracker;
use crate::config::FlockConfig;
use crate::grid::Grid;
use crate::particles::Particles;

/// Cap on the weight of a single contribution, so near-coincident particles
/// cannot produce unbounded force.
pub const MAX_INFLUENCE: f64 = 10.0;

/// Lower bound for squared distances and wall distances before inversion.
pub const EPSILON: f64 = 1e-9;

/// Frozen view of the flock for one tick.
pub struct TickContext<'a> {
    pub config: &'a FlockConfig,
    pub particles: &'a Particles,
    pub grid: &'a Grid,
    /// `None` when clustering is disabled.
    pub clusters: Option<&'a ClusterTracker>,
    pub attractors: &'a BTreeMap<String, DVec3>,
    /// Seconds since the previous tick.
    pub dt: f64,
}

#[inline]
fn influence(distance_squared: f64) -> f64 {
    (1.0 / distance_squared.max(EPSILON)).min(MAX_INFLUENCE)
}

/// Evaluates `rule` for particle `id`. `sampled` is the particle's neighbor
/// sample for this tick, shared by every neighbor-based rule.
#[must_use]
pub fn evaluate(
    rule: RuleKind,
    ctx: &TickContext<'_>,
    id: ParticleId,
    sampled: &[ParticleId],
) -> DVec3 {
    let sensitivity = ctx.config.effective_sensitivity(rule);
    match rule {
        RuleKind::Attraction => attraction(ctx, id, sensitivity),
        RuleKind::Obstacles => obstacles(ctx, id, sensitivity),
        RuleKind::Separation => separation(ctx, id, sampled, sensitivity),
        RuleKind::Alignment => alignment(ctx, id, sampled, sensitivity),
        RuleKind::Cohesion => cohesion(ctx, id, sensitivity),
    }
}

/// Steers toward every attractor closer than the awareness radius.
///
/// Unit directions weighted by `min(1/d², MAX_INFLUENCE)` are summed, then
/// the sum is normalized and scaled.
#[must_use]
pub fn attraction(ctx: &TickContext<'_>, id: ParticleId, sensitivity: f64) -> DVec3 {
    if ctx.attractors.is_empty() || sensitivity == 0.0 {
        return DVec3::ZERO;
    }
    let awareness = ctx.config.perception_radius();
    let p = ctx.particles.position(id);

    let mut sum = DVec3::ZERO;
    let mut seen = 0;
    for target in ctx.attractors.values() {
        let target = ctx.config.world.dimensions.project(*target);
        let to = target - p;
        let d2 = to.length_squared();
        if d2.sqrt() < awareness {
            sum += to.normalize_or_zero() * influence(d2);
            seen += 1;
        }
    }
    if seen == 0 {
        return DVec3::ZERO;
    }
    sum.normalize_or_zero() * sensitivity
}

/// Pushes away from the walls the predicted position is about to reach.
///
/// The prediction is `position + velocity * dt`. Each active axis is tested
/// against both walls at `±boundary`.
#[must_use]
pub fn obstacles(ctx: &TickContext<'_>, id: ParticleId, sensitivity: f64) -> DVec3 {
    if sensitivity == 0.0 {
        return DVec3::ZERO;
    }
    let awareness = ctx.config.perception_radius();
    let bound = ctx.config.boundary();
    let predicted = ctx.particles.position(id) + ctx.particles.velocity(id) * ctx.dt;

    let mut push = DVec3::ZERO;
    for axis in 0..ctx.config.world.dimensions.count() {
        let to_lower = predicted[axis] + bound;
        let to_upper = bound - predicted[axis];
        if to_lower < awareness {
            push[axis] += (1.0 / to_lower.abs().max(EPSILON)).min(MAX_INFLUENCE);
        }
        if to_upper < awareness {
            push[axis] -= (1.0 / to_upper.abs().max(EPSILON)).min(MAX_INFLUENCE);
        }
    }
    push.normalize_or_zero() * sensitivity
}

/// Steers away from sampled neighbors, nearest ones weighing most.
#[must_use]
pub fn separation(
    ctx: &TickContext<'_>,
    id: ParticleId,
    sampled: &[ParticleId],
    sensitivity: f64,
) -> DVec3 {
    if sensitivity == 0.0 || sampled.is_empty() {
        return DVec3::ZERO;
    }
    let p = ctx.particles.position(id);
    let sum: DVec3 = sampled
        .iter()
        .filter(|&&other| other != id)
        .map(|&other| {
            let away = p - ctx.particles.position(other);
            away.normalize_or_zero() * influence(away.length_squared())
        })
        .sum();
    sum.normalize_or_zero() * sensitivity
}

/// Steers toward the distance-weighted heading of sampled neighbors.
#[must_use]
pub fn alignment(
    ctx: &TickContext<'_>,
    id: ParticleId,
    sampled: &[ParticleId],
    sensitivity: f64,
) -> DVec3 {
    if sensitivity == 0.0 || sampled.is_empty() {
        return DVec3::ZERO;
    }
    let p = ctx.particles.position(id);
    let sum: DVec3 = sampled
        .iter()
        .filter(|&&other| other != id)
        .map(|&other| {
            let d2 = p.distance_squared(ctx.particles.position(other));
            ctx.particles.velocity(other) * influence(d2)
        })
        .sum();
    sum.normalize_or_zero() * sensitivity
}

/// Steers toward the centroid of the particle's cluster, damped by
/// `min(d², 1)` so nearby centroids pull gently.
#[must_use]
pub fn cohesion(ctx: &TickContext<'_>, id: ParticleId, sensitivity: f64) -> DVec3 {
    if sensitivity == 0.0 {
        return DVec3::ZERO;
    }
    let Some(cluster) = ctx.clusters.and_then(|c| c.cluster_of(ctx.grid, id)) else {
        return DVec3::ZERO;
    };
    let to = cluster.centroid - ctx.particles.position(id);
    let weight = to.length_squared().min(1.0);
    to.normalize_or_zero() * sensitivity * weight
}
