use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::state::ParticleId;

/// The five steering rules, in the order they are summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleKind {
    Attraction,
    Obstacles,
    Separation,
    Alignment,
    Cohesion,
}

impl RuleKind {
    pub const ALL: [RuleKind; 5] = [
        RuleKind::Attraction,
        RuleKind::Obstacles,
        RuleKind::Separation,
        RuleKind::Alignment,
        RuleKind::Cohesion,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RuleKind::Attraction => "Attraction",
            RuleKind::Obstacles => "Obstacles",
            RuleKind::Separation => "Separation",
            RuleKind::Alignment => "Alignment",
            RuleKind::Cohesion => "Cohesion",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One rule's steering vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceSample {
    pub rule: RuleKind,
    pub value: DVec3,
}

/// Per-tick inspection payload for a single particle of interest.
///
/// `forces` holds the particle's own rule outputs; `totals` holds each rule's
/// output summed over every particle in the same tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceReport {
    pub tick: u64,
    pub particle: ParticleId,
    pub position: DVec3,
    pub velocity: DVec3,
    pub forces: Vec<ForceSample>,
    pub totals: Vec<ForceSample>,
}

impl ForceReport {
    #[must_use]
    pub fn force(&self, rule: RuleKind) -> Option<DVec3> {
        self.forces.iter().find(|f| f.rule == rule).map(|f| f.value)
    }

    #[must_use]
    pub fn total(&self, rule: RuleKind) -> Option<DVec3> {
        self.totals.iter().find(|f| f.rule == rule).map(|f| f.value)
    }
}

/// Aggregate view of a particle population, used by the headless tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SimulationSummary {
    pub tick: u64,
    pub particles: usize,
    pub min_position: DVec3,
    pub max_position: DVec3,
    pub mean_speed: f64,
    pub max_speed: f64,
    pub occupied_cells: usize,
    pub clusters: usize,
    pub largest_cluster_cells: usize,
    pub non_finite: usize,
}

impl SimulationSummary {
    /// Summarises raw positions and velocities. Grid statistics are left at
    /// zero for the caller to fill in.
    #[must_use]
    pub fn from_particles(tick: u64, positions: &[DVec3], velocities: &[DVec3]) -> Self {
        let mut summary = Self {
            tick,
            particles: positions.len(),
            ..Self::default()
        };
        if positions.is_empty() {
            return summary;
        }

        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        let mut speed_sum = 0.0;
        for (p, v) in positions.iter().zip(velocities) {
            if !p.is_finite() || !v.is_finite() {
                summary.non_finite += 1;
                continue;
            }
            min = min.min(*p);
            max = max.max(*p);
            let speed = v.length();
            speed_sum += speed;
            summary.max_speed = summary.max_speed.max(speed);
        }

        let finite = positions.len() - summary.non_finite;
        if finite > 0 {
            summary.min_position = min;
            summary.max_position = max;
            summary.mean_speed = speed_sum / finite as f64;
        }
        summary
    }
}
