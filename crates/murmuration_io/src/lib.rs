//! # Murmuration IO
//!
//! Persistence layer for the flock.
//!
//! This crate provides:
//! - Structured error handling with custom error types
//! - JSON helpers with validation
//! - Saved simulations as JSON, gzip-compressed JSON or rkyv state archives

/// Error types and result aliases for I/O operations
pub mod error;
/// Saved simulation envelope and file formats
pub mod persistence;
/// Validated serialization helpers for JSON
pub mod serialization;

pub use error::{IoError, Result};
pub use persistence::{
    load_rkyv, load_simulation, save_rkyv, save_simulation, SaveFormat, SavedSimulation,
    SAVE_FORMAT_VERSION,
};
pub use serialization::{from_json, read_json_file, to_json, to_json_pretty, validate_json, write_json_file};
