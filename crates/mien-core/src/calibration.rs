//! Per-user calibration: averaged metrics per emotion, and their persistence.
//!
//! A training session captures a few [`TrainingSample`]s per emotion. The raw
//! samples are written out first (one snapshot file per session), then
//! averaged into a [`CalibrationProfile`] that the scorer reads at startup.

use crate::metrics::{GeometryMetrics, Metric};
use crate::scorer::{CALIBRATION_HAPPY_SMILE, CALIBRATION_SAD_SMILE, CALIBRATION_SLEEPY_EYE};
use crate::types::Emotion;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default file name of the calibration profile.
pub const PROFILE_FILE_NAME: &str = "emotion_calibration_profile.json";

const SAMPLES_FILE_PREFIX: &str = "emotion_training_data_";
const NEUTRAL_SMILE_DEFAULT: f32 = 0.000;
const NEUTRAL_SMILE_BAND: f32 = 0.003;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed calibration data in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no training samples to calibrate from")]
    NoSamples,
}

/// One captured expression during a training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub emotion: Emotion,
    pub metrics: GeometryMetrics,
    /// Local wall-clock time, written without a UTC offset.
    #[serde(with = "local_timestamp")]
    pub timestamp: NaiveDateTime,
}

impl TrainingSample {
    pub fn new(emotion: Emotion, metrics: GeometryMetrics) -> Self {
        Self {
            emotion,
            metrics,
            timestamp: Local::now().naive_local(),
        }
    }
}

/// ISO-8601 local timestamps with microseconds and no offset. Reading also
/// accepts RFC 3339 values carrying an offset, keeping their wall-clock time.
mod local_timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<NaiveDateTime>()
            .or_else(|_| DateTime::parse_from_rfc3339(&raw).map(|dt| dt.naive_local()))
            .map_err(serde::de::Error::custom)
    }
}

/// Averaged metrics per emotion. Any emotion, or any metric within an
/// emotion, may be missing; lookups then fall back to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationProfile {
    entries: BTreeMap<Emotion, BTreeMap<Metric, f32>>,
}

/// Threshold suggestions printed after a training session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Recommendations {
    /// Smile curve above which a face reads as happy.
    pub happy_smile_min: f32,
    /// Smile curve below which a face reads as sad.
    pub sad_smile_max: f32,
    /// Eye aspect ratio below which a face reads as sleepy.
    pub sleepy_eye_max: f32,
    pub neutral_smile_range: (f32, f32),
}

impl CalibrationProfile {
    /// Average every metric per emotion. Emotions without samples stay absent.
    pub fn build(samples: &[TrainingSample]) -> Result<Self, CalibrationError> {
        if samples.is_empty() {
            return Err(CalibrationError::NoSamples);
        }

        let mut sums: BTreeMap<Emotion, ([f32; 6], usize)> = BTreeMap::new();
        for sample in samples {
            let (acc, count) = sums.entry(sample.emotion).or_insert(([0.0; 6], 0));
            for (slot, metric) in acc.iter_mut().zip(Metric::ALL) {
                *slot += sample.metrics.get(metric);
            }
            *count += 1;
        }

        let entries = sums
            .into_iter()
            .map(|(emotion, (acc, count))| {
                let averages = Metric::ALL
                    .iter()
                    .zip(acc)
                    .map(|(&metric, sum)| (metric, sum / count as f32))
                    .collect();
                (emotion, averages)
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn value(&self, emotion: Emotion, metric: Metric) -> Option<f32> {
        self.entries.get(&emotion)?.get(&metric).copied()
    }

    pub fn insert(&mut self, emotion: Emotion, metric: Metric, value: f32) {
        self.entries.entry(emotion).or_default().insert(metric, value);
    }

    pub fn averages(&self, emotion: Emotion) -> Option<&BTreeMap<Metric, f32>> {
        self.entries.get(&emotion)
    }

    /// Calibrated emotions in enumeration order.
    pub fn emotions(&self) -> Vec<Emotion> {
        self.entries.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn recommend(&self) -> Recommendations {
        let happy = self
            .value(Emotion::Happy, Metric::SmileCurve)
            .unwrap_or(CALIBRATION_HAPPY_SMILE);
        let sad = self
            .value(Emotion::Sad, Metric::SmileCurve)
            .unwrap_or(CALIBRATION_SAD_SMILE);
        let sleepy = self
            .value(Emotion::Sleepy, Metric::EyeAspectRatio)
            .unwrap_or(CALIBRATION_SLEEPY_EYE);
        let neutral = self
            .value(Emotion::Neutral, Metric::SmileCurve)
            .unwrap_or(NEUTRAL_SMILE_DEFAULT);

        Recommendations {
            happy_smile_min: happy * 0.8,
            sad_smile_max: sad * 0.8,
            sleepy_eye_max: sleepy * 1.05,
            neutral_smile_range: (neutral - NEUTRAL_SMILE_BAND, neutral + NEUTRAL_SMILE_BAND),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let raw = fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CalibrationError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the profile if one exists. Any failure means "use defaults".
    pub fn load_or_default(path: &Path) -> Option<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no calibration profile; using default thresholds");
            return None;
        }

        match Self::load(path) {
            Ok(profile) => {
                tracing::info!(
                    path = %path.display(),
                    emotions = ?profile.emotions(),
                    "loaded calibration profile"
                );
                Some(profile)
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not load calibration; using default thresholds");
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CalibrationError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| CalibrationError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        write_file(path, &json)?;
        tracing::info!(path = %path.display(), emotions = self.entries.len(), "saved calibration profile");
        Ok(())
    }
}

/// Write one session's samples to `dir/emotion_training_data_<timestamp>.json`.
pub fn save_samples(dir: &Path, samples: &[TrainingSample]) -> Result<PathBuf, CalibrationError> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{SAMPLES_FILE_PREFIX}{stamp}.json"));

    let json = serde_json::to_string_pretty(samples).map_err(|source| CalibrationError::Parse {
        path: path.clone(),
        source,
    })?;
    write_file(&path, &json)?;
    tracing::info!(path = %path.display(), count = samples.len(), "saved training samples");
    Ok(path)
}

pub fn load_samples(path: &Path) -> Result<Vec<TrainingSample>, CalibrationError> {
    let raw = fs::read_to_string(path).map_err(|source| CalibrationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CalibrationError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), CalibrationError> {
    let io_err = |source| CalibrationError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}
