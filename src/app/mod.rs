//! Headless driver around a [`Flock`](murmuration_core::flock::Flock).

pub mod state;

pub use state::App;
