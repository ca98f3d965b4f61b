//! Configuration loading and management
//!
//! Handles parsing of `shiftpoints.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Point rule constants
    #[serde(default)]
    pub points: PointsConfig,

    /// Goal thresholds
    #[serde(default)]
    pub goals: GoalsConfig,

    /// Maintenance retention windows
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            points: PointsConfig::default(),
            goals: GoalsConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

/// Point rule constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    /// Bonus for completing before the due date (granted at most once)
    #[serde(default = "default_deadline_bonus")]
    pub deadline_bonus: i64,

    /// Bonus for a `very_good` quality rating
    #[serde(default = "default_very_good_bonus")]
    pub very_good_bonus: i64,

    /// Penalty per reopen, applied at approval time
    #[serde(default = "default_reopen_penalty_step")]
    pub reopen_penalty_step: i64,

    /// Provisional points for an on-time check-in
    #[serde(default = "default_checkin_on_time_bonus")]
    pub checkin_on_time_bonus: i64,

    /// Minutes per lateness penalty step for check-ins
    #[serde(default = "default_late_step_minutes")]
    pub late_step_minutes: u32,
}

fn default_deadline_bonus() -> i64 {
    2
}

fn default_very_good_bonus() -> i64 {
    2
}

fn default_reopen_penalty_step() -> i64 {
    1
}

fn default_checkin_on_time_bonus() -> i64 {
    5
}

fn default_late_step_minutes() -> u32 {
    5
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            deadline_bonus: default_deadline_bonus(),
            very_good_bonus: default_very_good_bonus(),
            reopen_penalty_step: default_reopen_penalty_step(),
            checkin_on_time_bonus: default_checkin_on_time_bonus(),
            late_step_minutes: default_late_step_minutes(),
        }
    }
}

/// Goal thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalsConfig {
    /// Percentage at which the personal bonus / team event unlocks
    #[serde(default = "default_unlock_percent")]
    pub unlock_percent: u32,
}

fn default_unlock_percent() -> u32 {
    90
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            unlock_percent: default_unlock_percent(),
        }
    }
}

/// Maintenance retention windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Days after completion before a task/check-in is archived
    #[serde(default = "default_archive_after_days")]
    pub archive_after_days: u32,

    /// Days a recorded notification is kept before the purge
    #[serde(default = "default_notification_retention_days")]
    pub notification_retention_days: u32,
}

fn default_archive_after_days() -> u32 {
    7
}

fn default_notification_retention_days() -> u32 {
    30
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            archive_after_days: default_archive_after_days(),
            notification_retention_days: default_notification_retention_days(),
        }
    }
}

impl Config {
    /// Load configuration from a `shiftpoints.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the data directory, or return defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.points.deadline_bonus < 0 {
            return Err(Error::InvalidConfig(
                "points.deadline_bonus must be >= 0".to_string(),
            ));
        }
        if self.points.very_good_bonus < 0 {
            return Err(Error::InvalidConfig(
                "points.very_good_bonus must be >= 0".to_string(),
            ));
        }
        if self.points.reopen_penalty_step < 0 {
            return Err(Error::InvalidConfig(
                "points.reopen_penalty_step must be >= 0 (applied as a deduction)".to_string(),
            ));
        }
        if self.points.late_step_minutes == 0 {
            return Err(Error::InvalidConfig(
                "points.late_step_minutes must be > 0".to_string(),
            ));
        }
        if self.goals.unlock_percent == 0 || self.goals.unlock_percent > 100 {
            return Err(Error::InvalidConfig(
                "goals.unlock_percent must be in 1..=100".to_string(),
            ));
        }
        if self.maintenance.archive_after_days == 0 {
            return Err(Error::InvalidConfig(
                "maintenance.archive_after_days must be > 0".to_string(),
            ));
        }
        if self.maintenance.notification_retention_days == 0 {
            return Err(Error::InvalidConfig(
                "maintenance.notification_retention_days must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.points.deadline_bonus, 2);
        assert_eq!(cfg.points.very_good_bonus, 2);
        assert_eq!(cfg.points.reopen_penalty_step, 1);
        assert_eq!(cfg.points.checkin_on_time_bonus, 5);
        assert_eq!(cfg.points.late_step_minutes, 5);
        assert_eq!(cfg.goals.unlock_percent, 90);
        assert_eq!(cfg.maintenance.archive_after_days, 7);
        assert_eq!(cfg.maintenance.notification_retention_days, 30);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shiftpoints.toml");
        let content = r#"
[points]
deadline_bonus = 3
very_good_bonus = 1
checkin_on_time_bonus = 10
late_step_minutes = 10

[goals]
unlock_percent = 80

[maintenance]
archive_after_days = 14
notification_retention_days = 60
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.points.deadline_bonus, 3);
        assert_eq!(cfg.points.very_good_bonus, 1);
        assert_eq!(cfg.points.reopen_penalty_step, 1);
        assert_eq!(cfg.points.checkin_on_time_bonus, 10);
        assert_eq!(cfg.points.late_step_minutes, 10);
        assert_eq!(cfg.goals.unlock_percent, 80);
        assert_eq!(cfg.maintenance.archive_after_days, 14);
        assert_eq!(cfg.maintenance.notification_retention_days, 60);
    }

    #[test]
    fn invalid_unlock_percent_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shiftpoints.toml");
        fs::write(&path, "[goals]\nunlock_percent = 0").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_late_step_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shiftpoints.toml");
        fs::write(&path, "[points]\nlate_step_minutes = 0").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_or_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_or_default(&dir.path().join("shiftpoints.toml")).expect("defaults");
        assert_eq!(cfg.points.deadline_bonus, 2);
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.toml");
        let cfg = Config::default();
        cfg.save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("deadline_bonus = 2"));
    }
}
