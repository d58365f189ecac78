//! Configuration management for flock parameters.
//!
//! Strongly-typed configuration structures that map to a `flock.toml` file.
//! Every table is optional; missing keys fall back to the reference defaults.
//!
//! ## Configuration Hierarchy
//!
//! 1. Default values (hardcoded in `Default` impls)
//! 2. `flock.toml` file (overrides defaults)
//! 3. Runtime changes through [`FlockConfig::set_global`] / [`FlockConfig::set_section`]
//!
//! ## Example `flock.toml`
//!
//! ```toml
//! [world]
//! size = 4.0
//! count = 4000
//! particle_size = 0.08
//! dimensions = "3d"
//!
//! [global]
//! perception = 3.0
//! attentiveness = 0.8
//! speed = 0.3
//!
//! [separation]
//! sensitivity = 0.0075
//! ```
//!
//! Physical parameters (`[world]` and `[grid]`) are read when a run starts or
//! restarts. Tunables (`[global]` and the per-rule tables) are read every tick.

use chrono::{DateTime, Utc};
use murmuration_data::{Dimensions, RuleKind};
use serde::{Deserialize, Serialize};

/// Shape and population of the simulated volume.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of the cubical (or square) world, centred on the origin.
    pub size: f64,
    pub count: usize,
    pub particle_size: f64,
    pub dimensions: Dimensions,
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: 4.0,
            count: 4000,
            particle_size: 0.08,
            dimensions: Dimensions::Three,
            seed: None,
        }
    }
}

/// Uniform grid and cluster tracking parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Cells per axis. The depth axis always has a single cell in 2D.
    pub divisions: usize,
    /// Connected components need strictly more cells than this to count as a cluster.
    pub min_cells_per_cluster: usize,
    pub clustering: bool,
    /// Filter range-query candidates by true Euclidean distance.
    pub exact_range_queries: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            divisions: 16,
            min_cells_per_cluster: 1,
            clustering: true,
            exact_range_queries: false,
        }
    }
}

/// Tunables shared by every rule.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Perception radius in multiples of `particle_size`.
    pub perception: f64,
    /// Fraction of noticeable neighbors a particle actually attends to.
    pub attentiveness: f64,
    /// Multiplier applied on top of every rule's own sensitivity.
    pub sensitivity: f64,
    pub speed: f64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            perception: 3.0,
            attentiveness: 0.8,
            sensitivity: 1.0,
            speed: 0.3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RuleConfig {
    pub enabled: bool,
    pub sensitivity: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitivity: 0.0,
        }
    }
}

impl RuleConfig {
    fn with_sensitivity(sensitivity: f64) -> Self {
        Self {
            enabled: true,
            sensitivity,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FlockConfig {
    pub world: WorldConfig,
    pub grid: GridConfig,
    pub global: GlobalConfig,
    pub attraction: RuleConfig,
    pub obstacles: RuleConfig,
    pub separation: RuleConfig,
    pub alignment: RuleConfig,
    pub cohesion: RuleConfig,
    /// Ticks between periodic metrics log lines.
    pub log_interval: u64,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            grid: GridConfig::default(),
            global: GlobalConfig::default(),
            attraction: RuleConfig::with_sensitivity(0.05),
            obstacles: RuleConfig::with_sensitivity(2.0),
            separation: RuleConfig::with_sensitivity(0.0075),
            alignment: RuleConfig::with_sensitivity(0.75),
            cohesion: RuleConfig::with_sensitivity(0.05),
            log_interval: 1000,
        }
    }
}

/// Names accepted by [`FlockConfig::global`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalSetting {
    Perception,
    Attentiveness,
    Sensitivity,
    Speed,
    Is3D,
    Size,
    ParticleSize,
    Count,
}

/// Names accepted by [`FlockConfig::section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionSetting {
    Sensitivity,
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Number(f64),
    Flag(bool),
}

impl SettingValue {
    #[must_use]
    pub fn as_f64(self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(n),
            SettingValue::Flag(_) => None,
        }
    }

    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            SettingValue::Flag(b) => Some(b),
            SettingValue::Number(_) => None,
        }
    }
}

/// Record of a single accepted setting change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingEvent {
    pub timestamp: DateTime<Utc>,
    pub section: Option<RuleKind>,
    pub setting: String,
    pub value: SettingValue,
}

impl FlockConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    ///
    /// # Validation Rules
    /// - World size and particle size must be positive, with particles smaller than the world
    /// - Particle count must be positive and reasonable (<= 1,000,000)
    /// - Grid divisions must be in `[1, 512]`
    /// - Attentiveness must be in `[0.0, 1.0]`; other tunables must be non-negative and finite
    pub fn validate(&self) -> anyhow::Result<()> {
        // World validation
        anyhow::ensure!(
            self.world.size.is_finite() && self.world.size > 0.0,
            "World size must be positive"
        );
        anyhow::ensure!(
            self.world.particle_size.is_finite() && self.world.particle_size > 0.0,
            "Particle size must be positive"
        );
        anyhow::ensure!(
            self.world.particle_size < self.world.size,
            "Particle size ({}) must be less than world size ({})",
            self.world.particle_size,
            self.world.size
        );
        anyhow::ensure!(self.world.count > 0, "Particle count must be positive");
        anyhow::ensure!(
            self.world.count <= 1_000_000,
            "Particle count too large (max 1000000)"
        );

        // Grid validation
        anyhow::ensure!(self.grid.divisions >= 1, "Grid divisions must be at least 1");
        anyhow::ensure!(
            self.grid.divisions <= 512,
            "Grid divisions too large (max 512)"
        );

        // Global validation
        anyhow::ensure!(
            self.global.perception.is_finite() && self.global.perception >= 0.0,
            "Perception must be non-negative"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.global.attentiveness),
            "Attentiveness must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.global.sensitivity.is_finite() && self.global.sensitivity >= 0.0,
            "Global sensitivity must be non-negative"
        );
        anyhow::ensure!(
            self.global.speed.is_finite() && self.global.speed >= 0.0,
            "Speed must be non-negative"
        );

        // Rule validation
        for rule in RuleKind::ALL {
            let s = self.rule(rule).sensitivity;
            anyhow::ensure!(
                s.is_finite() && s >= 0.0,
                "{} sensitivity must be non-negative",
                rule
            );
        }

        anyhow::ensure!(self.log_interval > 0, "Log interval must be positive");

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Digest of the physical parameters. Two runs with equal fingerprints
    /// can exchange persisted state.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.world).as_bytes());
        hasher.update(format!("{:?}", self.grid).as_bytes());
        hex::encode(hasher.finalize())
    }

    #[must_use]
    pub fn rule(&self, rule: RuleKind) -> &RuleConfig {
        match rule {
            RuleKind::Attraction => &self.attraction,
            RuleKind::Obstacles => &self.obstacles,
            RuleKind::Separation => &self.separation,
            RuleKind::Alignment => &self.alignment,
            RuleKind::Cohesion => &self.cohesion,
        }
    }

    pub fn rule_mut(&mut self, rule: RuleKind) -> &mut RuleConfig {
        match rule {
            RuleKind::Attraction => &mut self.attraction,
            RuleKind::Obstacles => &mut self.obstacles,
            RuleKind::Separation => &mut self.separation,
            RuleKind::Alignment => &mut self.alignment,
            RuleKind::Cohesion => &mut self.cohesion,
        }
    }

    /// Rule sensitivity scaled by the global multiplier.
    #[inline]
    #[must_use]
    pub fn effective_sensitivity(&self, rule: RuleKind) -> f64 {
        self.global.sensitivity * self.rule(rule).sensitivity
    }

    /// Perception radius in world units.
    #[inline]
    #[must_use]
    pub fn perception_radius(&self) -> f64 {
        self.global.perception * self.world.particle_size
    }

    /// Distance from the origin to the walls on every active axis.
    #[inline]
    #[must_use]
    pub fn boundary(&self) -> f64 {
        self.world.size / 2.0 - self.world.particle_size / 2.0
    }

    /// Reads a global setting.
    #[must_use]
    pub fn global(&self, name: GlobalSetting) -> SettingValue {
        match name {
            GlobalSetting::Perception => SettingValue::Number(self.global.perception),
            GlobalSetting::Attentiveness => SettingValue::Number(self.global.attentiveness),
            GlobalSetting::Sensitivity => SettingValue::Number(self.global.sensitivity),
            GlobalSetting::Speed => SettingValue::Number(self.global.speed),
            GlobalSetting::Is3D => SettingValue::Flag(self.world.dimensions.is_3d()),
            GlobalSetting::Size => SettingValue::Number(self.world.size),
            GlobalSetting::ParticleSize => SettingValue::Number(self.world.particle_size),
            GlobalSetting::Count => SettingValue::Number(self.world.count as f64),
        }
    }

    /// Reads a per-rule setting.
    #[must_use]
    pub fn section(&self, section: RuleKind, name: SectionSetting) -> SettingValue {
        let rule = self.rule(section);
        match name {
            SectionSetting::Sensitivity => SettingValue::Number(rule.sensitivity),
            SectionSetting::Enabled => SettingValue::Flag(rule.enabled),
        }
    }

    /// Changes a global setting.
    ///
    /// The change is applied to a copy and validated first; on error the
    /// configuration is left untouched.
    pub fn set_global(
        &mut self,
        name: GlobalSetting,
        value: SettingValue,
    ) -> anyhow::Result<SettingEvent> {
        let mut next = self.clone();
        match (name, value) {
            (GlobalSetting::Perception, SettingValue::Number(n)) => next.global.perception = n,
            (GlobalSetting::Attentiveness, SettingValue::Number(n)) => {
                next.global.attentiveness = n;
            }
            (GlobalSetting::Sensitivity, SettingValue::Number(n)) => next.global.sensitivity = n,
            (GlobalSetting::Speed, SettingValue::Number(n)) => next.global.speed = n,
            (GlobalSetting::Is3D, SettingValue::Flag(b)) => {
                next.world.dimensions = if b {
                    Dimensions::Three
                } else {
                    Dimensions::Two
                };
            }
            (GlobalSetting::Size, SettingValue::Number(n)) => next.world.size = n,
            (GlobalSetting::ParticleSize, SettingValue::Number(n)) => next.world.particle_size = n,
            (GlobalSetting::Count, SettingValue::Number(n)) => {
                anyhow::ensure!(
                    n.is_finite() && n >= 0.0 && n.fract() == 0.0,
                    "Particle count must be a whole non-negative number, got {}",
                    n
                );
                next.world.count = n as usize;
            }
            (name, value) => anyhow::bail!("Setting {:?} does not accept {:?}", name, value),
        }
        next.validate()?;
        *self = next;

        let event = SettingEvent {
            timestamp: Utc::now(),
            section: None,
            setting: format!("{:?}", name),
            value,
        };
        tracing::debug!(setting = %event.setting, value = ?value, "Global setting changed");
        Ok(event)
    }

    /// Changes a per-rule setting with the same validate-then-commit policy
    /// as [`FlockConfig::set_global`].
    pub fn set_section(
        &mut self,
        section: RuleKind,
        name: SectionSetting,
        value: SettingValue,
    ) -> anyhow::Result<SettingEvent> {
        let mut next = self.clone();
        let rule = next.rule_mut(section);
        match (name, value) {
            (SectionSetting::Sensitivity, SettingValue::Number(n)) => rule.sensitivity = n,
            (SectionSetting::Enabled, SettingValue::Flag(b)) => rule.enabled = b,
            (name, value) => anyhow::bail!(
                "Setting {:?} of {} does not accept {:?}",
                name,
                section,
                value
            ),
        }
        next.validate()?;
        *self = next;

        let event = SettingEvent {
            timestamp: Utc::now(),
            section: Some(section),
            setting: format!("{:?}", name),
            value,
        };
        tracing::debug!(section = %section, setting = %event.setting, value = ?value, "Rule setting changed");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        FlockConfig::default().validate().unwrap();
    }

    #[test]
    fn test_particle_size_must_be_smaller_than_world() {
        let mut config = FlockConfig::default();
        config.world.particle_size = config.world.size;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must be less than world size"));
    }

    #[test]
    fn test_zero_count_rejected() {
        let mut config = FlockConfig::default();
        config.world.count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FlockConfig::from_toml(
            r#"
            [world]
            count = 12
            dimensions = "2d"

            [separation]
            sensitivity = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.world.count, 12);
        assert_eq!(config.world.dimensions, Dimensions::Two);
        assert_eq!(config.world.size, 4.0);
        assert_eq!(config.separation.sensitivity, 0.5);
        assert!(config.separation.enabled);
        assert_eq!(config.alignment.sensitivity, 0.75);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = FlockConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = FlockConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(FlockConfig::from_toml("[global]\nattentiveness = 2.0").is_err());
    }

    #[test]
    fn test_settings_accessors() {
        let config = FlockConfig::default();
        assert_eq!(
            config.global(GlobalSetting::Speed).as_f64(),
            Some(config.global.speed)
        );
        assert_eq!(config.global(GlobalSetting::Is3D).as_bool(), Some(true));
        assert_eq!(
            config
                .section(RuleKind::Alignment, SectionSetting::Sensitivity)
                .as_f64(),
            Some(0.75)
        );
    }

    #[test]
    fn test_set_global_validates_before_commit() {
        let mut config = FlockConfig::default();
        let before = config.clone();
        assert!(config
            .set_global(GlobalSetting::Attentiveness, SettingValue::Number(1.5))
            .is_err());
        assert_eq!(config, before);

        let event = config
            .set_global(GlobalSetting::Speed, SettingValue::Number(0.5))
            .unwrap();
        assert_eq!(config.global.speed, 0.5);
        assert_eq!(event.section, None);
        assert_eq!(event.setting, "Speed");
    }

    #[test]
    fn test_set_section_rejects_wrong_type() {
        let mut config = FlockConfig::default();
        assert!(config
            .set_section(
                RuleKind::Cohesion,
                SectionSetting::Enabled,
                SettingValue::Number(1.0)
            )
            .is_err());
        config
            .set_section(
                RuleKind::Cohesion,
                SectionSetting::Enabled,
                SettingValue::Flag(false),
            )
            .unwrap();
        assert!(!config.cohesion.enabled);
    }

    #[test]
    fn test_effective_sensitivity_uses_global_multiplier() {
        let mut config = FlockConfig::default();
        config.global.sensitivity = 2.0;
        assert_eq!(config.effective_sensitivity(RuleKind::Alignment), 1.5);
    }

    #[test]
    fn test_fingerprint_ignores_tunables() {
        let a = FlockConfig::default();
        let mut b = a.clone();
        b.global.speed = 1.0;
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.world.count = 10;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
