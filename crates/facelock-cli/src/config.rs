//! CLI configuration, loaded from `FACELOCK_*` environment variables with
//! defaults. Command-line flags override the environment.

use std::path::PathBuf;

use facelock_core::TrackerConfig;

pub struct Settings {
    /// Path to the enrollment registry database.
    pub db_path: PathBuf,
    /// Tracker configuration (thresholds, timeout, history directory).
    pub tracker: TrackerConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("facelock");

        let db_path = std::env::var("FACELOCK_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("registry.db"));

        let defaults = TrackerConfig::default();
        let tracker = TrackerConfig {
            distance_threshold: env_f32("FACELOCK_DISTANCE_THRESHOLD", defaults.distance_threshold),
            lock_timeout_frames: env_u32(
                "FACELOCK_LOCK_TIMEOUT_FRAMES",
                defaults.lock_timeout_frames,
            ),
            min_lock_confidence: env_f32(
                "FACELOCK_MIN_LOCK_CONFIDENCE",
                defaults.min_lock_confidence,
            ),
            blink_threshold: env_f32("FACELOCK_BLINK_THRESHOLD", defaults.blink_threshold),
            smile_threshold: env_f32("FACELOCK_SMILE_THRESHOLD", defaults.smile_threshold),
            movement_threshold_px: env_f32(
                "FACELOCK_MOVEMENT_THRESHOLD_PX",
                defaults.movement_threshold_px,
            ),
            scale_change_threshold: env_f32(
                "FACELOCK_SCALE_CHANGE_THRESHOLD",
                defaults.scale_change_threshold,
            ),
            history_dir: std::env::var("FACELOCK_HISTORY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_dir),
        };

        Self { db_path, tracker }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
