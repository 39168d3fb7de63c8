use mien_core::calibration::PROFILE_FILE_NAME;
use mien_core::session::DEFAULT_SAMPLES_PER_EMOTION;
use mien_core::warp::DEFAULT_MAX_WIDTH;
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
pub struct Config {
    /// Where training samples and the calibration profile live.
    pub data_dir: PathBuf,
    /// Calibration profile read by `detect` and written by `train`.
    pub calibration_path: PathBuf,
    /// Whether `detect` applies the calibration profile.
    pub use_calibration: bool,
    /// Samples captured per emotion in a training session.
    pub samples_per_emotion: usize,
    /// Widest image the warper processes at full size.
    pub warp_max_width: u32,
    /// Print a reading every this many frames.
    pub report_every: u64,
}

impl Config {
    /// Load configuration from `MIEN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("MIEN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let calibration_path = std::env::var("MIEN_CALIBRATION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join(PROFILE_FILE_NAME));

        Self {
            data_dir,
            calibration_path,
            use_calibration: std::env::var("MIEN_USE_CALIBRATION")
                .map(|v| v != "0")
                .unwrap_or(true),
            samples_per_emotion: env_usize("MIEN_SAMPLES_PER_EMOTION", DEFAULT_SAMPLES_PER_EMOTION),
            warp_max_width: env_u32("MIEN_WARP_MAX_WIDTH", DEFAULT_MAX_WIDTH),
            report_every: env_u64("MIEN_REPORT_EVERY", 30).max(1),
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("mien")
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
