//! Configuration management
//!
//! All classifier thresholds are tunables rather than literals: they were calibrated
//! against one generation of trackpad hardware and may need adjusting on another.

use crate::dispatch::GestureBinding;
use crate::engine::{GestureError, GestureResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Tap classifier thresholds
    pub classifier: ClassifierConfig,
    /// Channel runtime settings
    pub engine: EngineConfig,
    /// Gesture bindings; when empty, gestures are only logged
    pub bindings: Vec<GestureBinding>,
}

/// Tap classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// Longest episode (first down to last up) still counted as a tap, seconds
    pub max_tap_duration_secs: f64,
    /// Largest per-finger travel still counted as a tap, normalized units
    pub max_tap_displacement: f32,
    /// Spread/travel limit applied to up-only bursts, normalized units
    pub phantom_strict_displacement: f32,
    /// Frames of per-finger history kept for the phantom-tap filter
    pub phantom_trajectory_window: usize,
    /// Fastest average finger speed accepted in an up-only burst, units per second
    pub phantom_max_speed: f32,
    /// Directions closer than this (degrees) are treated as a synchronized swipe
    pub phantom_sync_angle_deg: f32,
    /// Same-count phantom taps inside this window are suppressed, seconds
    pub phantom_debounce_secs: f64,
    /// Episodes idle for longer than this are discarded, seconds
    pub stuck_episode_timeout_secs: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_tap_duration_secs: 0.25,
            max_tap_displacement: 0.2,
            phantom_strict_displacement: 0.07,
            phantom_trajectory_window: 7,
            phantom_max_speed: 1.2,
            phantom_sync_angle_deg: 20.0,
            phantom_debounce_secs: 0.3,
            stuck_episode_timeout_secs: 1.0,
        }
    }
}

impl ClassifierConfig {
    /// Falls back to the default window when the configured value is unusable
    pub fn phantom_debounce(&self) -> Duration {
        secs_or(self.phantom_debounce_secs, Self::default().phantom_debounce_secs)
    }

    /// Falls back to the default timeout when the configured value is unusable
    pub fn stuck_episode_timeout(&self) -> Duration {
        secs_or(
            self.stuck_episode_timeout_secs,
            Self::default().stuck_episode_timeout_secs,
        )
    }

    /// Validate values are within acceptable ranges.
    pub fn validate(&self) -> GestureResult<()> {
        positive_secs("maxTapDurationSecs", self.max_tap_duration_secs)?;
        positive_secs("phantomDebounceSecs", self.phantom_debounce_secs)?;
        positive_secs("stuckEpisodeTimeoutSecs", self.stuck_episode_timeout_secs)?;

        for (name, value) in [
            ("maxTapDisplacement", self.max_tap_displacement),
            ("phantomStrictDisplacement", self.phantom_strict_displacement),
            ("phantomMaxSpeed", self.phantom_max_speed),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GestureError::ConfigurationError(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=180.0).contains(&self.phantom_sync_angle_deg) {
            return Err(GestureError::ConfigurationError(format!(
                "phantomSyncAngleDeg must be in [0, 180], got {}",
                self.phantom_sync_angle_deg
            )));
        }
        if self.phantom_trajectory_window < 2 {
            return Err(GestureError::ConfigurationError(format!(
                "phantomTrajectoryWindow must hold at least 2 frames, got {}",
                self.phantom_trajectory_window
            )));
        }
        Ok(())
    }
}

/// Channel runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Cadence of the stuck-episode recovery tick, milliseconds
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> GestureResult<()> {
        self.classifier.validate()?;
        if self.engine.tick_interval_ms == 0 {
            return Err(GestureError::ConfigurationError(
                "tickIntervalMs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load config from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> GestureResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> GestureResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_json(&self) -> GestureResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn secs_or(value: f64, fallback: f64) -> Duration {
    if !value.is_finite() || value <= 0.0 {
        return Duration::from_secs_f64(fallback);
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

fn positive_secs(name: &str, value: f64) -> GestureResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(GestureError::ConfigurationError(format!(
            "{} must be a positive number of seconds, got {}",
            name, value
        )));
    }
    Ok(())
}
