pub mod macros;

use glam::DVec3;
use murmuration_lib::model::config::FlockConfig;
use murmuration_lib::model::flock::Flock;
use murmuration_lib::model::state::{Dimensions, InitialState, ParticleId, RuleKind};

#[allow(dead_code)]
pub struct FlockBuilder {
    config: FlockConfig,
    particles: Vec<(DVec3, DVec3)>,
    attractors: Vec<(String, DVec3)>,
    debug: Option<ParticleId>,
}

#[allow(dead_code)]
impl FlockBuilder {
    /// 100 particles, seed 0, reference tunables.
    pub fn new() -> Self {
        let mut config = FlockConfig::default();
        config.world.count = 100;
        config.world.seed = Some(0);
        Self {
            config,
            particles: Vec::new(),
            attractors: Vec::new(),
            debug: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.world.seed = Some(seed);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.config.world.count = count;
        self
    }

    pub fn with_dimensions(mut self, dims: Dimensions) -> Self {
        self.config.world.dimensions = dims;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut FlockConfig),
    {
        modifier(&mut self.config);
        self
    }

    /// Disables every rule, so particles coast at `global.speed`.
    pub fn without_rules(mut self) -> Self {
        for rule in RuleKind::ALL {
            self.config.rule_mut(rule).enabled = false;
        }
        self
    }

    /// Enables exactly one rule.
    pub fn only_rule(self, rule: RuleKind) -> Self {
        let mut builder = self.without_rules();
        builder.config.rule_mut(rule).enabled = true;
        builder
    }

    /// Places particles explicitly instead of randomly.
    pub fn with_particle(mut self, position: DVec3, velocity: DVec3) -> Self {
        self.particles.push((position, velocity));
        self
    }

    pub fn with_attractor(mut self, name: &str, position: DVec3) -> Self {
        self.attractors.push((name.to_string(), position));
        self
    }

    pub fn with_debug(mut self, particle: ParticleId) -> Self {
        self.debug = Some(particle);
        self
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn build(mut self) -> Flock {
        let mut flock = if self.particles.is_empty() {
            Flock::new(self.config).expect("Failed to create flock in test builder")
        } else {
            self.config.world.count = self.particles.len();
            let dims = self.config.world.dimensions;
            let (positions, velocities): (Vec<_>, Vec<_>) = self.particles.into_iter().unzip();
            let state = InitialState::from_vectors(dims, &positions, &velocities);
            Flock::from_state(self.config, &state).expect("Failed to restore flock in test builder")
        };
        for (name, position) in self.attractors {
            flock.set_attractor(&name, position);
        }
        flock.set_debug_particle(self.debug);
        flock
    }
}

/// Runs `ticks` ticks of `dt` seconds, starting after the flock's current tick.
#[allow(dead_code)]
pub fn run(flock: &mut Flock, ticks: u64, dt: f64) {
    for _ in 0..ticks {
        let elapsed = (flock.tick() + 1) as f64 * dt;
        flock.update(elapsed, dt);
    }
}
