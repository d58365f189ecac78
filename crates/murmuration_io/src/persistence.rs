//! Saved simulations.
//!
//! A [`SavedSimulation`] bundles the particle state with the configuration it
//! was produced under, so a run can continue exactly where it stopped. It is
//! stored as JSON, or as gzip-compressed JSON when the path ends in `.gz`.
//! Bare [`InitialState`] snapshots can also be archived with rkyv.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use murmuration_core::config::FlockConfig;
use murmuration_core::flock::Flock;
use murmuration_data::InitialState;
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::{Archive, Deserialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::{IoError, Result};
use crate::serialization::{from_json, to_json_pretty};

/// Newest envelope layout this crate writes and reads.
pub const SAVE_FORMAT_VERSION: u32 = 1;

#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq)]
pub struct SavedSimulation {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Ticks completed when the state was captured.
    pub tick: u64,
    /// [`FlockConfig::fingerprint`] of `config`, checked on restore.
    pub config_fingerprint: String,
    pub config: FlockConfig,
    pub state: InitialState,
}

impl SavedSimulation {
    /// Captures the live state of `flock`. Physical changes still waiting
    /// for a restart are not saved.
    #[must_use]
    pub fn capture(flock: &Flock) -> Self {
        let config = flock.effective_config();
        Self {
            version: SAVE_FORMAT_VERSION,
            saved_at: Utc::now(),
            tick: flock.tick(),
            config_fingerprint: config.fingerprint(),
            config,
            state: flock.current_state(),
        }
    }

    /// Checks version, fingerprint and state shape without building a flock.
    pub fn validate(&self) -> Result<()> {
        if self.version == 0 || self.version > SAVE_FORMAT_VERSION {
            return Err(IoError::validation(format!(
                "Unsupported save version {} (supported: 1..={})",
                self.version, SAVE_FORMAT_VERSION
            )));
        }
        let fingerprint = self.config.fingerprint();
        if fingerprint != self.config_fingerprint {
            return Err(IoError::validation(format!(
                "Config fingerprint mismatch: saved {}, computed {}",
                self.config_fingerprint, fingerprint
            )));
        }
        self.config
            .validate()
            .map_err(|e| IoError::validation(e.to_string()))?;
        self.state
            .validate(self.config.world.count, self.config.world.dimensions)
            .map_err(|e| IoError::validation(e.to_string()))
    }

    /// Builds a flock that continues from the saved state.
    pub fn restore(&self) -> Result<Flock> {
        self.validate()?;
        let mut flock = Flock::from_state(self.config.clone(), &self.state)
            .map_err(|e| IoError::validation(e.to_string()))?;
        flock.resume_at(self.tick);
        Ok(flock)
    }
}

/// On-disk encoding of a [`SavedSimulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Json,
    GzipJson,
}

impl SaveFormat {
    /// `.gz` selects gzip; anything else is plain JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => SaveFormat::GzipJson,
            _ => SaveFormat::Json,
        }
    }
}

pub fn save_simulation<P: AsRef<Path>>(saved: &SavedSimulation, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = to_json_pretty(saved)?;
    match SaveFormat::from_path(path) {
        SaveFormat::Json => std::fs::write(path, json)?,
        SaveFormat::GzipJson => {
            let file = File::create(path)?;
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(json.as_bytes())?;
            encoder
                .finish()
                .map_err(|e| IoError::compression(e.to_string()))?;
        }
    }
    tracing::info!(path = %path.display(), tick = saved.tick, "Simulation saved");
    Ok(())
}

/// Loads and validates a saved simulation.
pub fn load_simulation<P: AsRef<Path>>(path: P) -> Result<SavedSimulation> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::not_found(path.display().to_string()));
    }
    let json = match SaveFormat::from_path(path) {
        SaveFormat::Json => std::fs::read_to_string(path)?,
        SaveFormat::GzipJson => {
            let mut decoder = GzDecoder::new(File::open(path)?);
            let mut json = String::new();
            decoder
                .read_to_string(&mut json)
                .map_err(|e| IoError::compression(e.to_string()))?;
            json
        }
    };
    let saved: SavedSimulation =
        from_json(&json).map_err(|e| e.with_context(format!("loading {}", path.display())))?;
    saved.validate()?;
    tracing::info!(path = %path.display(), tick = saved.tick, "Simulation loaded");
    Ok(saved)
}

pub fn save_rkyv<T, P>(data: &T, path: P) -> Result<()>
where
    T: rkyv::Serialize<AllocSerializer<4096>>,
    T: Archive,
    P: AsRef<Path>,
{
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(data)
        .map_err(|e| IoError::rkyv(format!("serialization failed: {:?}", e)))?;
    let bytes = serializer.into_serializer().into_inner();
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

pub fn load_rkyv<T, P>(path: P) -> Result<T>
where
    T: Archive,
    T::Archived: Deserialize<T, SharedDeserializeMap>
        + for<'a> rkyv::CheckBytes<rkyv::validation::validators::DefaultValidator<'a>>,
    P: AsRef<Path>,
{
    let bytes = std::fs::read(path)?;
    let archived = rkyv::check_archived_root::<T>(&bytes)
        .map_err(|e| IoError::rkyv(format!("validation failed: {:?}", e)))?;
    let mut deserializer = SharedDeserializeMap::default();
    archived
        .deserialize(&mut deserializer)
        .map_err(|e| IoError::rkyv(format!("deserialization failed: {:?}", e)))
}
