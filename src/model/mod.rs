//! Flock model, re-exported from the workspace crates for the binaries and
//! integration tests.

pub mod analysis;

pub mod cluster {
    pub use murmuration_core::cluster::*;
}
pub mod config {
    pub use murmuration_core::config::*;
}
pub mod flock {
    pub use murmuration_core::flock::*;
}
pub mod grid {
    pub use murmuration_core::grid::*;
}
pub mod metrics {
    pub use murmuration_core::metrics::*;
}
pub mod neighbors {
    pub use murmuration_core::neighbors::*;
}
pub mod particles {
    pub use murmuration_core::particles::*;
}
pub mod rules {
    pub use murmuration_core::rules::*;
}
pub mod persistence {
    pub use murmuration_io::persistence::*;
}
pub mod state {
    pub use murmuration_data::{
        Dimensions, ForceReport, ForceSample, InitialState, ParticleId, RuleKind,
        SimulationSummary,
    };
}
