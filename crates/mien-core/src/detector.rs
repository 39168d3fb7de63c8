//! Landmarks in, emotion reading out.

use crate::calibration::CalibrationProfile;
use crate::metrics::{GeometryMetrics, MetricsError};
use crate::scorer::{EmotionScore, EmotionScorer, Thresholds};
use crate::types::{Emotion, LandmarkSet};
use serde::Serialize;
use std::path::Path;

/// Result of reading one face.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reading {
    /// The landmark set was too short to measure.
    Unknown,
    Scored {
        metrics: GeometryMetrics,
        #[serde(flatten)]
        score: EmotionScore,
    },
}

impl Reading {
    pub fn emotion(&self) -> Option<Emotion> {
        match self {
            Reading::Unknown => None,
            Reading::Scored { score, .. } => Some(score.emotion),
        }
    }

    pub fn label(&self) -> &'static str {
        self.emotion().map_or("Unknown", Emotion::as_str)
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Reading::Unknown => 0.0,
            Reading::Scored { score, .. } => score.confidence,
        }
    }
}

/// Scores faces with thresholds resolved from an optional calibration profile.
pub struct EmotionDetector {
    scorer: EmotionScorer,
    profile: Option<CalibrationProfile>,
}

impl EmotionDetector {
    pub fn new(profile: Option<CalibrationProfile>) -> Self {
        let scorer = EmotionScorer::new(profile.as_ref());
        tracing::debug!(thresholds = ?scorer.thresholds(), calibrated = profile.is_some(), "emotion detector ready");
        Self { scorer, profile }
    }

    /// Use the profile at `path` when it loads cleanly, defaults otherwise.
    pub fn from_calibration_file(path: &Path) -> Self {
        Self::new(CalibrationProfile::load_or_default(path))
    }

    pub fn is_calibrated(&self) -> bool {
        self.profile.is_some()
    }

    pub fn profile(&self) -> Option<&CalibrationProfile> {
        self.profile.as_ref()
    }

    pub fn thresholds(&self) -> &Thresholds {
        self.scorer.thresholds()
    }

    pub fn detect(&self, landmarks: &LandmarkSet) -> Reading {
        match GeometryMetrics::extract(landmarks) {
            Ok(metrics) => Reading::Scored {
                metrics,
                score: self.scorer.score(&metrics),
            },
            Err(MetricsError::InsufficientLandmarks { required, actual }) => {
                tracing::debug!(required, actual, "too few landmarks to score");
                Reading::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;
    use crate::test_support::{synthetic_face, FaceShape};
    use crate::types::Landmark;

    #[test]
    fn test_short_landmark_set_is_unknown() {
        let detector = EmotionDetector::new(None);
        for n in [0usize, 120, 467] {
            let reading = detector.detect(&LandmarkSet::new(vec![Landmark::new(0.5, 0.5); n]));
            assert_eq!(reading, Reading::Unknown);
            assert_eq!(reading.label(), "Unknown");
            assert_eq!(reading.confidence(), 0.0);
        }
    }

    #[test]
    fn test_detects_happy_face() {
        let detector = EmotionDetector::new(None);
        let face = synthetic_face(&FaceShape {
            smile_curve: 0.008,
            mouth_aspect_ratio: 0.33,
            ..Default::default()
        });
        let reading = detector.detect(&face);
        assert_eq!(reading.emotion(), Some(Emotion::Happy));
        assert_eq!(reading.label(), "Happy");
        assert!(reading.confidence() >= 0.5);
    }

    #[test]
    fn test_calibration_shifts_detection() {
        // 0.007 scores as happy by default but sits below a calibrated 0.02 * 0.6.
        let face = synthetic_face(&FaceShape {
            smile_curve: 0.007,
            mouth_aspect_ratio: 0.2,
            ..Default::default()
        });
        let uncalibrated = EmotionDetector::new(None).detect(&face);

        let mut profile = CalibrationProfile::default();
        profile.insert(Emotion::Happy, Metric::SmileCurve, 0.02);
        let calibrated = EmotionDetector::new(Some(profile));
        assert!(calibrated.is_calibrated());
        let reading = calibrated.detect(&face);

        let happy = |r: &Reading| match r {
            Reading::Scored { score, .. } => score.scores.get(Emotion::Happy),
            Reading::Unknown => f32::NAN,
        };
        assert!(happy(&uncalibrated) > 0.0);
        assert_eq!(happy(&reading), 0.0);
    }

    #[test]
    fn test_missing_calibration_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let detector = EmotionDetector::from_calibration_file(&dir.path().join("none.json"));
        assert!(!detector.is_calibrated());
        assert_eq!(*detector.thresholds(), Thresholds::default());
    }

    #[test]
    fn test_reading_json() {
        let reading = EmotionDetector::new(None).detect(&synthetic_face(&FaceShape::default()));
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["status"], "scored");
        assert!(json["emotion"].is_string());
        assert!(json["metrics"]["smile_curve"].is_number());
        assert_eq!(json["scores"].as_object().unwrap().len(), 7);

        let unknown = serde_json::to_value(&Reading::Unknown).unwrap();
        assert_eq!(unknown["status"], "unknown");
    }
}
