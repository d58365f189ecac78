//! # Murmuration Data
//!
//! Plain data shared by the simulation core, the persistence layer and the
//! headless runner. Nothing in here knows about grids or force rules; it only
//! describes particles, persisted state and inspection payloads.

pub mod data;

pub use data::report::{ForceReport, ForceSample, RuleKind, SimulationSummary};
pub use data::state::{Dimensions, InitialState, ParticleId};
