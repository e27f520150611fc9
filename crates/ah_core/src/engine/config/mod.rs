//! # Engine Configuration
//!
//! Every tuning constant of the decision loop lives here, grouped by the
//! stage that consumes it. Defaults reproduce the reference table; presets
//! cover match play and the offline simulator.
//!
//! ## Usage
//! ```rust
//! use ah_core::engine::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! let competition = EngineConfig::competition();
//! let from_env = EngineConfig::from_env_or_default();
//! ```
//!
//! ## Environment Variables
//!
//! - `AH_PROFILE`: Select preset (competition, simulation, default)

mod limits_config;
mod planner_config;
mod strategy_config;
mod table_config;
mod tracking_config;

pub use limits_config::MotionLimits;
pub use planner_config::PlannerConfig;
pub use strategy_config::{ControlMode, DefenseVariant, OffenseVariant, StrategyConfig};
pub use table_config::{PhysicsConfig, TableConfig};
pub use tracking_config::TrackingConfig;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use validator::Validate;

use crate::engine::table::Table;
use crate::engine::timestep::FRAME_INTERVAL_US;
use crate::error::{CoreError, Result};

/// Control loop cadence
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ControlConfig {
    /// Fixed tick period (µs)
    #[validate(range(min = 1000, max = 1_000_000))]
    pub tick_period_us: u64,
    /// Consecutive recoverable faults before the loop escalates its logging
    #[validate(range(min = 1, max = 10_000))]
    pub fault_escalation_ticks: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self { tick_period_us: FRAME_INTERVAL_US, fault_escalation_ticks: 30 }
    }
}

/// Complete decision loop configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    #[validate]
    pub table: TableConfig,
    #[validate]
    pub physics: PhysicsConfig,
    #[validate]
    pub limits: MotionLimits,
    #[validate]
    pub tracking: TrackingConfig,
    #[validate]
    pub planner: PlannerConfig,
    #[validate]
    pub strategy: StrategyConfig,
    #[validate]
    pub control: ControlConfig,
}

impl EngineConfig {
    /// Match play: slightly softer motion, wider safety margin, steadier posture
    pub fn competition() -> Self {
        let mut cfg = Self::default();
        cfg.limits.max_speed_mps = 2.5;
        cfg.limits.max_accel_mps2 = 20.0;
        cfg.planner.safety_epsilon_m = 0.03;
        cfg.strategy.min_dwell_s = 0.3;
        cfg
    }

    /// Offline simulator: stiffer mechanics, tight margins
    pub fn simulation() -> Self {
        let mut cfg = Self::default();
        cfg.limits.max_speed_mps = 4.0;
        cfg.limits.max_accel_mps2 = 40.0;
        cfg.planner.safety_epsilon_m = 0.01;
        cfg.strategy.min_dwell_s = 0.15;
        cfg
    }

    pub fn from_profile(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::default()),
            "competition" => Some(Self::competition()),
            "simulation" => Some(Self::simulation()),
            _ => None,
        }
    }

    /// Load preset from `AH_PROFILE`, falling back to default
    pub fn from_env_or_default() -> Self {
        let profile = env::var("AH_PROFILE").unwrap_or_default();
        Self::from_profile(&profile).unwrap_or_default()
    }

    /// Parse YAML; missing keys take their defaults. Not validated.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read, parse and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let cfg = Self::from_yaml_str(&text)?;
        cfg.validate_all()?;
        Ok(cfg)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn table_geometry(&self) -> Table {
        Table::from_config(&self.table)
    }

    /// Field ranges plus the cross-section constraints the ranges can't express
    pub fn validate_all(&self) -> Result<()> {
        self.validate()?;

        let table = self.table_geometry();
        table.validate()?;

        let puck_r = self.physics.puck_radius_m;
        let mallet_r = self.physics.mallet_radius_m;
        if self.table.goal_width_m <= 2.0 * puck_r {
            return Err(CoreError::InvalidTableGeometry(format!(
                "goal width {} does not admit a puck of radius {}",
                self.table.goal_width_m, puck_r
            )));
        }
        if 2.0 * mallet_r >= table.height.min(table.width / 2.0) {
            return Err(CoreError::InvalidTableGeometry(format!(
                "mallet radius {} does not fit the controlled half",
                mallet_r
            )));
        }
        let home_x = self.strategy.home_x_ratio * table.width;
        if home_x > table.width - mallet_r || home_x < table.midline_x() + mallet_r {
            return Err(CoreError::InvalidConfig(format!(
                "home x {:.3} outside the reachable part of the controlled half",
                home_x
            )));
        }
        Ok(())
    }
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = EngineConfig::default();
        cfg.validate_all().unwrap();
        assert!((cfg.table.width_m - 2.5).abs() < 1e-6);
        assert_eq!(cfg.tracking.stale_timeout_us(), 3 * FRAME_INTERVAL_US);
        assert!(cfg.planner.own_half_only);
    }

    #[test]
    fn test_presets_are_valid_and_distinct() {
        let default = EngineConfig::default();
        let competition = EngineConfig::competition();
        let simulation = EngineConfig::simulation();
        competition.validate_all().unwrap();
        simulation.validate_all().unwrap();

        assert!(competition.planner.safety_epsilon_m > default.planner.safety_epsilon_m);
        assert!(simulation.limits.max_speed_mps > default.limits.max_speed_mps);
    }

    #[test]
    fn test_profile_lookup() {
        assert!(EngineConfig::from_profile("Competition").is_some());
        assert!(EngineConfig::from_profile("arcade").is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "limits:\n  max_speed_mps: 1.5\nplanner:\n  own_half_only: false\n";
        let cfg = EngineConfig::from_yaml_str(yaml).unwrap();
        assert!((cfg.limits.max_speed_mps - 1.5).abs() < 1e-6);
        assert!(!cfg.planner.own_half_only);
        assert!((cfg.limits.max_accel_mps2 - MotionLimits::default().max_accel_mps2).abs() < 1e-6);
        assert_eq!(cfg.strategy.defense, DefenseVariant::TriangleDefense);
    }

    #[test]
    fn test_variant_names_in_yaml() {
        let yaml = "strategy:\n  mode: user_controlled\n  defense: hybrid_defense\n";
        let cfg = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.strategy.mode, ControlMode::UserControlled);
        assert_eq!(cfg.strategy.defense, DefenseVariant::HybridDefense);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.limits.max_speed_mps = -1.0;
        assert!(matches!(cfg.validate_all(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_goal_wider_than_table_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.table.goal_width_m = 2.0;
        assert!(matches!(
            cfg.validate_all(),
            Err(CoreError::InvalidTableGeometry(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "control:\n  tick_period_us: 10000").unwrap();
        let cfg = EngineConfig::load(file.path()).unwrap();
        assert_eq!(cfg.control.tick_period_us, 10_000);
    }

    #[test]
    fn test_load_garbage_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "limits: [not, a, map").unwrap();
        assert!(matches!(
            EngineConfig::load(file.path()),
            Err(CoreError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let cfg = EngineConfig::competition();
        let text = cfg.to_yaml_string().unwrap();
        let parsed = EngineConfig::from_yaml_str(&text).unwrap();
        assert!((parsed.planner.safety_epsilon_m - 0.03).abs() < 1e-6);
    }
}
