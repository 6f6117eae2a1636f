//! Tracker configuration with named, validated fields.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be > 0 (got {value})")]
    NonPositive { name: &'static str, value: f32 },
    #[error("{name} must be within [0, 1] (got {value})")]
    OutOfRange { name: &'static str, value: f32 },
    #[error("lock_timeout_frames must be >= 1")]
    ZeroTimeout,
}

/// Construction-time tracker configuration. All fields have defaults;
/// [`TrackerConfig::validate`] is called by the tracker before any session
/// is created.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Identity-distance threshold consumed by the external recognizer,
    /// carried here so one record configures the whole pipeline.
    pub distance_threshold: f32,
    /// Consecutive lost frames tolerated before abandoning the lock.
    /// A frame count, not a duration — invariant to frame-rate jitter.
    pub lock_timeout_frames: u32,
    /// Minimum recognition confidence required to acquire or re-acquire.
    pub min_lock_confidence: f32,
    /// Fractional eye-openness drop (vs. baseline) that counts as closing.
    pub blink_threshold: f32,
    /// Fractional mouth-spread increase (vs. baseline) that counts as a smile.
    pub smile_threshold: f32,
    /// Horizontal nose displacement (pixels) that counts as head movement.
    pub movement_threshold_px: f32,
    /// Fractional distance-estimate change that counts as closer/farther.
    pub scale_change_threshold: f32,
    /// Directory for per-session history files (created if absent).
    pub history_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.40,
            lock_timeout_frames: 30,
            min_lock_confidence: 0.85,
            blink_threshold: 0.15,
            smile_threshold: 0.08,
            movement_threshold_px: 8.0,
            scale_change_threshold: 0.12,
            history_dir: default_history_dir(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("blink_threshold", self.blink_threshold),
            ("smile_threshold", self.smile_threshold),
            ("movement_threshold_px", self.movement_threshold_px),
            ("scale_change_threshold", self.scale_change_threshold),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        for (name, value) in [
            ("min_lock_confidence", self.min_lock_confidence),
            ("distance_threshold", self.distance_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        if self.lock_timeout_frames == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Default history directory: `$XDG_DATA_HOME/facelock/history`, falling
/// back to `~/.local/share/facelock/history`.
fn default_history_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facelock/history")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TrackerConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_threshold() {
        let config = TrackerConfig {
            movement_threshold_px: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::NonPositive {
                name: "movement_threshold_px",
                ..
            }
        ));
    }

    #[test]
    fn rejects_nan_threshold() {
        let config = TrackerConfig {
            blink_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_confidence_above_one() {
        let config = TrackerConfig {
            min_lock_confidence: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::OutOfRange {
                name: "min_lock_confidence",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = TrackerConfig {
            lock_timeout_frames: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::ZeroTimeout
        ));
    }
}
