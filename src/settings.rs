//! World Configuration
//!
//! Plain-data settings consumed when a [`World`](crate::world::World) or a
//! [`TaskSystem`](crate::tasks::TaskSystem) is created. Every struct is
//! `serde`-(de)serializable and fills missing fields from its `Default`, so
//! partial JSON documents are valid:
//!
//! ```rust,ignore
//! let settings = WorldSettings::from_json(r#"{ "name": "Level01", "max_hierarchy_levels": 64 }"#)?;
//! let world = World::new(settings)?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WorldError};
use crate::utils::clock::is_valid_speed;

/// Settings for a single world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Name used in log output.
    pub name: String,

    /// Upper bound on live objects. Exceeding it is a fatal allocation failure.
    pub max_objects: u32,

    /// Maximum number of hierarchy levels (root level included).
    pub max_hierarchy_levels: u32,

    /// Log an error whenever a static object's transform changes after creation.
    pub report_error_when_static_object_moves: bool,

    /// Update blocks of one hierarchy level on the task system in parallel.
    pub parallel_propagation: bool,

    /// Levels with fewer blocks than this are updated on the calling thread.
    pub min_blocks_for_parallel_level: usize,

    /// Seed of the generator behind per-object stable random seeds.
    pub random_seed: u32,

    pub clock: ClockSettings,

    /// Only used when the world creates its own task system.
    pub tasks: TaskSystemSettings,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            name: String::from("World"),
            max_objects: 1 << 24,
            max_hierarchy_levels: 1024,
            report_error_when_static_object_moves: false,
            parallel_propagation: true,
            min_blocks_for_parallel_level: 2,
            random_seed: 0x5EED_1234,
            clock: ClockSettings::default(),
            tasks: TaskSystemSettings::default(),
        }
    }
}

impl WorldSettings {
    /// Parses settings from JSON text and validates them.
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the world cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.max_objects == 0 {
            return Err(WorldError::InvalidSettings("max_objects must be at least 1".into()));
        }
        if self.max_hierarchy_levels == 0 {
            return Err(WorldError::InvalidSettings(
                "max_hierarchy_levels must be at least 1".into(),
            ));
        }
        if self.min_blocks_for_parallel_level == 0 {
            return Err(WorldError::InvalidSettings(
                "min_blocks_for_parallel_level must be at least 1".into(),
            ));
        }
        self.clock.validate()
    }
}

/// Settings for the world [`Clock`](crate::utils::Clock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    /// When set, every tick advances by exactly this amount (before speed scaling).
    pub fixed_time_step: Option<Duration>,
    pub min_time_step: Duration,
    pub max_time_step: Duration,
    pub speed: f64,
    pub paused: bool,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            fixed_time_step: None,
            min_time_step: Duration::from_micros(100),
            max_time_step: Duration::from_millis(100),
            speed: 1.0,
            paused: false,
        }
    }
}

impl ClockSettings {
    pub fn validate(&self) -> Result<()> {
        if !is_valid_speed(self.speed) {
            return Err(WorldError::InvalidSettings(format!(
                "clock speed must be positive, got {}",
                self.speed
            )));
        }
        if self.min_time_step > self.max_time_step {
            return Err(WorldError::InvalidSettings(
                "min_time_step must not exceed max_time_step".into(),
            ));
        }
        Ok(())
    }
}

/// Thread counts for the [`TaskSystem`](crate::tasks::TaskSystem).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSystemSettings {
    /// Workers for short tasks. `0` uses the available parallelism.
    pub short_task_threads: usize,
    /// Workers shared by long-running and file-access tasks.
    pub long_task_threads: usize,
}

impl Default for TaskSystemSettings {
    fn default() -> Self {
        Self {
            short_task_threads: 0,
            long_task_threads: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let settings = WorldSettings::from_json(r#"{ "name": "Arena", "max_hierarchy_levels": 8 }"#)
            .expect("valid settings");

        assert_eq!(settings.name, "Arena");
        assert_eq!(settings.max_hierarchy_levels, 8);
        assert_eq!(settings.max_objects, WorldSettings::default().max_objects);
        assert_eq!(settings.clock, ClockSettings::default());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let result = WorldSettings::from_json(r#"{ "max_objects": 0 }"#);
        assert!(matches!(result, Err(WorldError::InvalidSettings(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = WorldSettings::from_json("{ not json");
        assert!(matches!(result, Err(WorldError::SettingsParse(_))));
    }

    #[test]
    fn negative_speed_is_rejected() {
        let settings = WorldSettings {
            clock: ClockSettings {
                speed: -1.0,
                ..ClockSettings::default()
            },
            ..WorldSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
