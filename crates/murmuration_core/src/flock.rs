//! The per-tick update loop.
//!
//! One call to [`Flock::update`] runs the whole pipeline to completion:
//!
//! ```text
//! Idle -> Rebuilding -> Querying -> Aggregating -> Integrating -> Idle
//! ```
//!
//! Rebuilding refreshes the grid (and clusters), Querying fills the neighbor
//! cache, Aggregating evaluates the enabled rules for every particle against
//! the frozen pre-tick state, and Integrating moves particles along their new
//! velocities.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use glam::DVec3;
use murmuration_data::{ForceReport, ForceSample, InitialState, ParticleId, RuleKind};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cluster::ClusterTracker;
use crate::config::{FlockConfig, GlobalSetting, SectionSetting, SettingEvent, SettingValue};
use crate::grid::Grid;
use crate::metrics::Metrics;
use crate::neighbors::{sampling_rng, NeighborManager};
use crate::particles::Particles;
use crate::rules::{self, TickContext};

/// Attractor registered at the origin when a flock is created.
pub const DEFAULT_ATTRACTOR: &str = "Central";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Rebuilding,
    Querying,
    Aggregating,
    Integrating,
}

impl Phase {
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Phase::Idle => Phase::Rebuilding,
            Phase::Rebuilding => Phase::Querying,
            Phase::Querying => Phase::Aggregating,
            Phase::Aggregating => Phase::Integrating,
            Phase::Integrating => Phase::Idle,
        }
    }
}

/// A flock of particles and everything needed to step it.
#[derive(Debug)]
pub struct Flock {
    config: FlockConfig,
    /// `[world]` and grid divisions of the current run.
    running: FlockConfig,
    particles: Particles,
    initial: InitialState,
    grid: Grid,
    clusters: ClusterTracker,
    neighbors: NeighborManager,
    attractors: BTreeMap<String, DVec3>,
    phase: Phase,
    tick: u64,
    elapsed: f64,
    started: Option<DateTime<Utc>>,
    debug_particle: Option<ParticleId>,
    report: Option<ForceReport>,
    metrics: Metrics,
}

impl Flock {
    /// Creates a flock with randomly placed particles.
    ///
    /// Fails if the configuration is invalid.
    pub fn new(config: FlockConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let particles = Self::random_particles(&config);
        Ok(Self::assemble(config, particles))
    }

    /// Creates a flock continuing from a persisted state.
    ///
    /// Fails if the configuration is invalid or the state does not describe
    /// `world.count` particles in the configured dimensions.
    pub fn from_state(config: FlockConfig, state: &InitialState) -> anyhow::Result<Self> {
        config.validate()?;
        state.validate(config.world.count, config.world.dimensions)?;
        let particles = Particles::from_state(state, config.world.dimensions)?;
        Ok(Self::assemble(config, particles))
    }

    fn random_particles(config: &FlockConfig) -> Particles {
        let mut rng = ChaCha8Rng::seed_from_u64(config.world.seed.unwrap_or(0));
        let bound = config.boundary();
        Particles::random(
            config.world.count,
            config.world.dimensions,
            -bound,
            bound,
            config.global.speed,
            &mut rng,
        )
    }

    fn assemble(config: FlockConfig, particles: Particles) -> Self {
        let grid = Grid::new(
            config.world.size,
            config.grid.divisions,
            config.world.dimensions,
        );
        let mut attractors = BTreeMap::new();
        attractors.insert(DEFAULT_ATTRACTOR.to_string(), DVec3::ZERO);

        tracing::info!(
            particles = particles.len(),
            dimensions = ?config.world.dimensions,
            size = config.world.size,
            divisions = config.grid.divisions,
            "Flock created"
        );

        Self {
            initial: particles.to_state(),
            clusters: ClusterTracker::new(config.grid.min_cells_per_cluster),
            neighbors: NeighborManager::new(config.grid.exact_range_queries),
            metrics: Metrics::new(config.log_interval),
            running: config.clone(),
            config,
            particles,
            grid,
            attractors,
            phase: Phase::Idle,
            tick: 0,
            elapsed: 0.0,
            started: None,
            debug_particle: None,
            report: None,
        }
    }

    /// Enables the per-tick [`ForceReport`] for `particle`.
    #[must_use]
    pub fn with_debug(mut self, particle: ParticleId) -> Self {
        self.set_debug_particle(Some(particle));
        self
    }

    pub fn set_debug_particle(&mut self, particle: Option<ParticleId>) {
        self.debug_particle = particle.filter(|&id| id < self.particles.len());
        self.report = None;
    }

    #[must_use]
    pub fn debug_particle(&self) -> Option<ParticleId> {
        self.debug_particle
    }

    /// Force breakdown from the most recent tick, if debugging is enabled.
    #[must_use]
    pub fn force_report(&self) -> Option<&ForceReport> {
        self.report.as_ref()
    }

    fn transition(&mut self, next: Phase) {
        assert_eq!(
            self.phase.next(),
            next,
            "phase {:?} cannot follow {:?}",
            next,
            self.phase
        );
        self.phase = next;
    }

    /// Advances the flock by one tick.
    ///
    /// `elapsed` is the absolute simulation time and `dt` the time since the
    /// previous tick.
    pub fn update(&mut self, elapsed: f64, dt: f64) {
        let started = Instant::now();
        if self.started.is_none() {
            self.started = Some(Utc::now());
        }

        let tick_config = self.effective_config();

        self.transition(Phase::Rebuilding);
        self.grid.rebuild(self.particles.positions());
        if tick_config.grid.clustering {
            self.clusters
                .set_min_cells_per_cluster(tick_config.grid.min_cells_per_cluster);
            self.clusters.compute(&self.grid);
        } else {
            self.clusters.clear();
        }

        self.transition(Phase::Querying);
        self.neighbors.set_exact(tick_config.grid.exact_range_queries);
        self.neighbors
            .update(&self.grid, tick_config.perception_radius());

        self.transition(Phase::Aggregating);
        self.aggregate(&tick_config, dt);

        self.transition(Phase::Integrating);
        self.particles.advance(dt);
        if let Some(report) = self.report.as_mut() {
            report.position = self.particles.position(report.particle);
        }

        self.transition(Phase::Idle);
        self.tick += 1;
        self.elapsed = elapsed;

        self.metrics.record_tick(
            started.elapsed(),
            self.particles.len(),
            self.clusters.clusters().len(),
            self.neighbors.mean_neighbor_count(),
        );
    }

    fn aggregate(&mut self, config: &FlockConfig, dt: f64) {
        let seed = config.world.seed.unwrap_or(0);
        let attentiveness = config.global.attentiveness;
        let speed = config.global.speed;
        let dims = config.world.dimensions;
        let enabled: Vec<RuleKind> = RuleKind::ALL
            .into_iter()
            .filter(|&rule| config.rule(rule).enabled)
            .collect();

        let mut next = self.particles.begin_velocity_update();
        let mut totals = [DVec3::ZERO; RuleKind::ALL.len()];
        let mut watched = Vec::new();

        let ctx = TickContext {
            config,
            particles: &self.particles,
            grid: &self.grid,
            clusters: config.grid.clustering.then_some(&self.clusters),
            attractors: &self.attractors,
            dt,
        };

        for id in self.particles.ids() {
            let mut rng = sampling_rng(seed, self.tick, id);
            let sampled = self.neighbors.neighbors_of(id, attentiveness, &mut rng);

            let mut steering = DVec3::ZERO;
            for &rule in &enabled {
                let force = rules::evaluate(rule, &ctx, id, &sampled);
                steering += force;
                if self.debug_particle.is_some() {
                    totals[rule as usize] += force;
                    if self.debug_particle == Some(id) {
                        watched.push(ForceSample { rule, value: force });
                    }
                }
            }

            let current = self.particles.velocity(id);
            next.push(dims.project(steering + current).normalize_or_zero() * speed);
        }

        self.particles.commit_velocities(next);

        self.report = self.debug_particle.map(|particle| ForceReport {
            tick: self.tick,
            particle,
            position: self.particles.position(particle),
            velocity: self.particles.velocity(particle),
            forces: watched,
            totals: enabled
                .iter()
                .map(|&rule| ForceSample {
                    rule,
                    value: totals[rule as usize],
                })
                .collect(),
        });
    }

    /// Replaces every particle, either randomly from the current config or
    /// from `state`.
    ///
    /// Physical parameters changed since the last run take effect here. On
    /// error nothing is changed.
    pub fn restart(&mut self, state: Option<InitialState>) -> anyhow::Result<()> {
        let checked = self.config.validate().and_then(|()| match &state {
            Some(state) => {
                state.validate(self.config.world.count, self.config.world.dimensions)?;
                Particles::from_state(state, self.config.world.dimensions)
            }
            None => Ok(Self::random_particles(&self.config)),
        });

        let particles = match checked {
            Ok(particles) => particles,
            Err(err) => {
                self.metrics.increment_counter("restarts_rejected");
                tracing::warn!(error = %err, "Restart rejected");
                return Err(err);
            }
        };

        self.running = self.config.clone();
        self.grid = Grid::new(
            self.running.world.size,
            self.running.grid.divisions,
            self.running.world.dimensions,
        );
        self.clusters = ClusterTracker::new(self.running.grid.min_cells_per_cluster);
        self.neighbors = NeighborManager::new(self.running.grid.exact_range_queries);
        self.initial = particles.to_state();
        self.particles = particles;
        self.phase = Phase::Idle;
        self.tick = 0;
        self.elapsed = 0.0;
        self.started = None;
        self.report = None;
        if self.debug_particle.is_some_and(|id| id >= self.particles.len()) {
            self.debug_particle = None;
        }

        self.metrics.increment_counter("restarts");
        tracing::info!(
            particles = self.particles.len(),
            from_state = state.is_some(),
            "Flock restarted"
        );
        Ok(())
    }

    /// Sets the tick counter of a flock continuing a saved run, so neighbor
    /// sampling draws the same streams it would have.
    pub fn resume_at(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Adds or moves a named attractor.
    pub fn set_attractor(&mut self, name: &str, position: DVec3) {
        self.attractors.insert(name.to_string(), position);
        self.metrics.increment_counter("attractor_changes");
        tracing::debug!(name, ?position, "Attractor set");
    }

    /// Removes a named attractor, returning its last position.
    pub fn remove_attractor(&mut self, name: &str) -> Option<DVec3> {
        let removed = self.attractors.remove(name);
        if removed.is_some() {
            self.metrics.increment_counter("attractor_changes");
            tracing::debug!(name, "Attractor removed");
        }
        removed
    }

    #[must_use]
    pub fn attractors(&self) -> &BTreeMap<String, DVec3> {
        &self.attractors
    }

    /// Replaces the whole configuration after validating it.
    pub fn set_config(&mut self, config: FlockConfig) -> anyhow::Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_global(
        &mut self,
        name: GlobalSetting,
        value: SettingValue,
    ) -> anyhow::Result<SettingEvent> {
        self.config.set_global(name, value)
    }

    pub fn set_section(
        &mut self,
        section: RuleKind,
        name: SectionSetting,
        value: SettingValue,
    ) -> anyhow::Result<SettingEvent> {
        self.config.set_section(section, name, value)
    }

    /// Live tunables combined with the physical parameters the particles
    /// were created with. This is what the next tick runs on.
    #[must_use]
    pub fn effective_config(&self) -> FlockConfig {
        let mut config = self.config.clone();
        config.world = self.running.world.clone();
        config.grid.divisions = self.running.grid.divisions;
        config
    }

    /// The live configuration. Physical parameters may differ from the
    /// running ones until [`Flock::restart`].
    #[must_use]
    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    #[must_use]
    pub fn position(&self, id: ParticleId) -> DVec3 {
        self.particles.position(id)
    }

    #[must_use]
    pub fn velocity(&self, id: ParticleId) -> DVec3 {
        self.particles.velocity(id)
    }

    #[must_use]
    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// State at the start of the current run.
    #[must_use]
    pub fn initial_state(&self) -> &InitialState {
        &self.initial
    }

    #[must_use]
    pub fn current_state(&self) -> InitialState {
        self.particles.to_state()
    }

    /// When the first tick of the current run happened, or now if none has.
    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.started.unwrap_or_else(Utc::now)
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn clusters(&self) -> &ClusterTracker {
        &self.clusters
    }

    #[must_use]
    pub fn neighbors(&self) -> &NeighborManager {
        &self.neighbors
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
