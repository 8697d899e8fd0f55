use crate::cooldown::DEFAULT_COOLDOWN_SECS;
use crate::types::DEFAULT_MATCH_THRESHOLD;
use std::path::PathBuf;

/// Runtime configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory of labelled known-face photos.
    pub gallery_dir: PathBuf,
    /// SeetaFace cascade model file.
    pub model_path: PathBuf,
    /// Path to the SQLite visits database.
    pub db_path: PathBuf,
    /// L2 distance above which a face is reported as unknown.
    pub match_threshold: f64,
    /// Minimum seconds between two accepted sightings of one person.
    pub cooldown_secs: i64,
    /// Frames discarded after opening the camera (exposure settling).
    pub warmup_frames: usize,
}

impl Config {
    /// Load configuration from `ROSTER_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("roster");

        Self {
            camera_device: std::env::var("ROSTER_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            gallery_dir: env_path("ROSTER_GALLERY_DIR", PathBuf::from("known_faces")),
            model_path: env_path(
                "ROSTER_MODEL_PATH",
                PathBuf::from("models/seeta_fd_frontal_v1.0.bin"),
            ),
            db_path: env_path("ROSTER_DB_PATH", data_dir.join("people_detection.db")),
            match_threshold: env_parse("ROSTER_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD),
            cooldown_secs: env_parse("ROSTER_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS),
            warmup_frames: env_parse("ROSTER_WARMUP_FRAMES", 4),
        }
    }

    pub fn model_path_str(&self) -> String {
        self.model_path.to_string_lossy().into_owned()
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
