//! Tick metrics and logging setup.
//!
//! Provides structured logging and counters for monitoring flock
//! performance and health.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Metrics collector for flock statistics.
pub struct Metrics {
    tick_count: AtomicU64,
    particle_count: AtomicU64,
    cluster_count: AtomicU64,
    total_tick_nanos: AtomicU64,
    log_interval: u64,
    counters: Mutex<HashMap<String, AtomicU64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("tick_count", &self.tick_count())
            .field("particle_count", &self.particle_count())
            .field("cluster_count", &self.cluster_count())
            .field("log_interval", &self.log_interval)
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates a collector that logs a summary every `log_interval` ticks.
    #[must_use]
    pub fn new(log_interval: u64) -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            particle_count: AtomicU64::new(0),
            cluster_count: AtomicU64::new(0),
            total_tick_nanos: AtomicU64::new(0),
            log_interval: log_interval.max(1),
            counters: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick.
    pub fn record_tick(
        &self,
        duration: Duration,
        particles: usize,
        clusters: usize,
        mean_neighbors: f64,
    ) {
        self.tick_count.fetch_add(1, Ordering::Relaxed);
        self.particle_count.store(particles as u64, Ordering::Relaxed);
        self.cluster_count.store(clusters as u64, Ordering::Relaxed);
        self.total_tick_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);

        let tick = self.tick_count.load(Ordering::Relaxed);
        if tick % self.log_interval == 0 {
            tracing::info!(
                tick = tick,
                particles = particles,
                clusters = clusters,
                mean_neighbors = mean_neighbors,
                duration_us = duration.as_micros() as u64,
                mean_tick_us = self.mean_tick_duration().as_micros() as u64,
                "Flock tick"
            );
        }
    }

    /// Increments a named counter.
    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of a named counter (0 if never incremented).
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn particle_count(&self) -> u64 {
        self.particle_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn cluster_count(&self) -> u64 {
        self.cluster_count.load(Ordering::Relaxed)
    }

    /// Mean wall-clock duration of the recorded ticks.
    #[must_use]
    pub fn mean_tick_duration(&self) -> Duration {
        let ticks = self.tick_count();
        if ticks == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.total_tick_nanos.load(Ordering::Relaxed) / ticks)
    }

    /// Gets elapsed time since metrics creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Installs the global tracing subscriber.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. Later calls are no-ops.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok();
}
