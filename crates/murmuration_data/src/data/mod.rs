//! Core data structures for the Murmuration simulation.

pub mod report;
pub mod state;
