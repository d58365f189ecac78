//! # Murmuration Core
//!
//! The flocking engine: a uniform spatial grid rebuilt every tick, connected
//! components over its occupied cells, a per-tick neighbor cache with
//! attention-limited sampling, five steering rules and the loop that ties
//! them together.
//!
//! ## Architecture
//!
//! - **Explicit configuration**: [`config::FlockConfig`] is passed into the
//!   flock and read every tick, so tunables can change between ticks
//! - **Frozen tick snapshot**: rules read a [`rules::TickContext`] and new
//!   velocities are double-buffered
//! - **Deterministic simulation**: seeded `ChaCha8Rng` for placement and
//!   per-particle neighbor sampling
//!
//! ## Example
//!
//! ```
//! use murmuration_core::config::FlockConfig;
//! use murmuration_core::flock::Flock;
//!
//! let mut config = FlockConfig::default();
//! config.world.count = 100;
//!
//! let mut flock = Flock::new(config).unwrap();
//! flock.update(0.016, 0.016);
//! assert_eq!(flock.tick(), 1);
//! ```

/// Connected groups of occupied grid cells
pub mod cluster;
/// Configuration management for flock parameters
pub mod config;
/// Per-tick update loop
pub mod flock;
/// Uniform spatial partition with range queries
pub mod grid;
/// Performance metrics collection and logging
pub mod metrics;
/// Cached neighbor lists and attention sampling
pub mod neighbors;
/// Particle position and velocity storage
pub mod particles;
/// Steering rules
pub mod rules;

pub use config::FlockConfig;
pub use flock::{Flock, Phase};
pub use metrics::{init_logging, Metrics};
