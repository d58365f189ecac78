use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use glam::DVec3;
use murmuration_core::config::FlockConfig;
use murmuration_core::flock::Flock;
use murmuration_data::SimulationSummary;
use murmuration_io::persistence::{load_simulation, save_rkyv, save_simulation, SavedSimulation};

use crate::model::analysis;

/// Runs a flock without any rendering, at a fixed time step.
pub struct App {
    pub flock: Flock,
    pub dt: f64,
    pub config_path: Option<PathBuf>,
    config_last_modified: Option<SystemTime>,
}

impl App {
    /// Reads `path`, falling back to defaults when the file does not exist.
    ///
    /// A file that exists but does not parse or validate is an error.
    pub fn load_config(path: &Path) -> Result<FlockConfig> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(FlockConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        FlockConfig::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn new(config: FlockConfig, dt: f64) -> Result<Self> {
        anyhow::ensure!(dt.is_finite() && dt > 0.0, "Time step must be positive");
        Ok(Self {
            flock: Flock::new(config)?,
            dt,
            config_path: None,
            config_last_modified: None,
        })
    }

    /// Continues a saved simulation.
    pub fn from_save(path: &Path, dt: f64) -> Result<Self> {
        anyhow::ensure!(dt.is_finite() && dt > 0.0, "Time step must be positive");
        let saved = load_simulation(path)?;
        Ok(Self {
            flock: saved.restore()?,
            dt,
            config_path: None,
            config_last_modified: None,
        })
    }

    /// Watches `path` for tunable changes, see [`App::check_config_reload`].
    #[must_use]
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_last_modified = std::fs::metadata(&path)
            .ok()
            .and_then(|m| m.modified().ok());
        self.config_path = Some(path);
        self
    }

    pub fn step(&mut self) {
        let elapsed = (self.flock.tick() + 1) as f64 * self.dt;
        self.flock.update(elapsed, self.dt);
    }

    /// Runs `ticks` ticks, re-reading the watched config file every
    /// `log_interval` ticks.
    pub fn run(&mut self, ticks: u64) -> Result<SimulationSummary> {
        for _ in 0..ticks {
            self.step();
            if self.flock.tick() % self.flock.config().log_interval == 0 {
                self.check_config_reload()?;
            }
        }
        Ok(self.summary())
    }

    #[must_use]
    pub fn summary(&self) -> SimulationSummary {
        let particles = self.flock.particles();
        analysis::summarize(
            self.flock.tick(),
            &self.flock.effective_config(),
            particles.positions(),
            particles.velocities(),
        )
    }

    /// Parses `name=x,y,z` (or `name=x,y` in 2D) and places the attractor.
    pub fn set_attractor_spec(&mut self, spec: &str) -> Result<()> {
        let (name, coords) = spec
            .split_once('=')
            .with_context(|| format!("Attractor '{}' must look like name=x,y,z", spec))?;
        let values = coords
            .split(',')
            .map(|c| c.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Attractor '{}' has a non-numeric coordinate", spec))?;
        anyhow::ensure!(
            (2..=3).contains(&values.len()),
            "Attractor '{}' needs 2 or 3 coordinates",
            spec
        );
        let position = DVec3::new(values[0], values[1], values.get(2).copied().unwrap_or(0.0));
        self.flock.set_attractor(name.trim(), position);
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_simulation(&SavedSimulation::capture(&self.flock), path)?;
        Ok(())
    }

    /// Writes the current particle state as an rkyv archive.
    pub fn save_state_archive(&self, path: &Path) -> Result<()> {
        save_rkyv(&self.flock.current_state(), path)?;
        Ok(())
    }

    /// Saves into `dir` under a timestamped name and returns the path.
    pub fn backup(&self, dir: &Path) -> Result<PathBuf> {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("flock_{}_t{}.json.gz", timestamp, self.flock.tick()));
        self.save(&path)?;
        Ok(path)
    }

    /// Picks up edited tunables from the watched config file.
    ///
    /// Physical parameters in the file are kept for the next restart. Returns
    /// whether anything was reloaded.
    pub fn check_config_reload(&mut self) -> Result<bool> {
        let Some(path) = self.config_path.clone() else {
            return Ok(false);
        };
        let Ok(modified) = std::fs::metadata(&path).and_then(|m| m.modified()) else {
            return Ok(false);
        };
        if Some(modified) == self.config_last_modified {
            return Ok(false);
        }
        self.config_last_modified = Some(modified);

        match Self::load_config(&path) {
            Ok(config) => {
                self.flock.set_config(config)?;
                tracing::info!(path = %path.display(), "Configuration reloaded");
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Ignoring invalid configuration");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_app() -> App {
        let mut config = FlockConfig::default();
        config.world.count = 60;
        config.world.seed = Some(11);
        App::new(config, 0.05).unwrap()
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let path = std::env::temp_dir().join("murmuration_app_missing.toml");
        let _ = std::fs::remove_file(&path);
        assert_eq!(App::load_config(&path).unwrap(), FlockConfig::default());
    }

    #[test]
    fn test_invalid_config_file_is_error() {
        let path = std::env::temp_dir().join(format!("murmuration_app_bad_{}.toml", std::process::id()));
        std::fs::write(&path, "[world]\nsize = -1.0\n").unwrap();
        let result = App::load_config(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        assert!(App::new(FlockConfig::default(), 0.0).is_err());
    }

    #[test]
    fn test_run_advances_ticks() {
        let mut app = small_app();
        let summary = app.run(20).unwrap();
        assert_eq!(summary.tick, 20);
        assert_eq!(summary.particles, 60);
        assert_eq!(summary.non_finite, 0);
    }

    #[test]
    fn test_attractor_spec_parsing() {
        let mut app = small_app();
        app.set_attractor_spec("cursor=1,0.5,-0.25").unwrap();
        assert_eq!(
            app.flock.attractors().get("cursor"),
            Some(&DVec3::new(1.0, 0.5, -0.25))
        );
        app.set_attractor_spec("flat = 0.5, 0.5").unwrap();
        assert_eq!(app.flock.attractors().get("flat"), Some(&DVec3::new(0.5, 0.5, 0.0)));

        assert!(app.set_attractor_spec("nope").is_err());
        assert!(app.set_attractor_spec("bad=1,x,2").is_err());
        assert!(app.set_attractor_spec("short=1").is_err());
    }

    #[test]
    fn test_save_and_continue() {
        let mut app = small_app();
        app.run(5).unwrap();
        let path = std::env::temp_dir().join(format!("murmuration_app_{}.json", std::process::id()));
        app.save(&path).unwrap();

        let resumed = App::from_save(&path, 0.05).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(resumed.flock.current_state(), app.flock.current_state());
        assert_eq!(resumed.flock.config(), app.flock.config());
    }
}
