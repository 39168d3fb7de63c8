//! Landmark geometry: the handful of normalized ratios the scorer reads.

use crate::landmarks::*;
use crate::types::LandmarkSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Added to the mouth width so a collapsed mouth never divides by zero.
const MOUTH_WIDTH_EPSILON: f32 = 0.001;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("insufficient landmarks: need {required}, got {actual}")]
    InsufficientLandmarks { required: usize, actual: usize },
}

/// Names of the geometry metrics, as used in calibration profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    SmileCurve,
    MouthAspectRatio,
    EyeAspectRatio,
    EyebrowRaise,
    LeftBrowAngle,
    RightBrowAngle,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::SmileCurve,
        Metric::MouthAspectRatio,
        Metric::EyeAspectRatio,
        Metric::EyebrowRaise,
        Metric::LeftBrowAngle,
        Metric::RightBrowAngle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::SmileCurve => "smile_curve",
            Metric::MouthAspectRatio => "mouth_aspect_ratio",
            Metric::EyeAspectRatio => "eye_aspect_ratio",
            Metric::EyebrowRaise => "eyebrow_raise",
            Metric::LeftBrowAngle => "left_brow_angle",
            Metric::RightBrowAngle => "right_brow_angle",
        }
    }
}

/// Scalar ratios derived from one landmark set.
///
/// Sign conventions follow image space (y down): a positive `smile_curve`
/// means the lower-lip centre sits below the mouth corners, i.e. the corners
/// are raised. The scorer's thresholds are tuned to exactly this convention.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometryMetrics {
    pub smile_curve: f32,
    pub mouth_aspect_ratio: f32,
    pub eye_aspect_ratio: f32,
    pub eyebrow_raise: f32,
    pub left_brow_angle: f32,
    pub right_brow_angle: f32,
}

/// Scaled copies of the metrics for human-readable panels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayMetrics {
    pub smile_curve: f32,
    pub mouth_open: f32,
    pub eye_open: f32,
    pub brow_raise: f32,
}

impl GeometryMetrics {
    /// Derive the metrics from a face-mesh landmark set.
    pub fn extract(landmarks: &LandmarkSet) -> Result<Self, MetricsError> {
        if landmarks.len() < REQUIRED_LANDMARKS {
            return Err(MetricsError::InsufficientLandmarks {
                required: REQUIRED_LANDMARKS,
                actual: landmarks.len(),
            });
        }

        let lm = landmarks;

        let mouth_height = lm[UPPER_LIP_INNER].distance(&lm[LOWER_LIP_INNER]);
        let mouth_width = lm[MOUTH_LEFT].distance(&lm[MOUTH_RIGHT]);
        let mouth_aspect_ratio = mouth_height / (mouth_width + MOUTH_WIDTH_EPSILON);

        let corner_avg_y = (lm[MOUTH_LEFT].y + lm[MOUTH_RIGHT].y) / 2.0;
        let smile_curve = lm[LOWER_LIP_CENTER].y - corner_avg_y;

        let left_eye = lm[LEFT_EYE_TOP].distance(&lm[LEFT_EYE_BOTTOM]);
        let right_eye = lm[RIGHT_EYE_TOP].distance(&lm[RIGHT_EYE_BOTTOM]);
        let eye_aspect_ratio = (left_eye + right_eye) / 2.0;

        let left_raise = lm[LEFT_EYE_TOP].y - lm[LEFT_BROW_INNER].y;
        let right_raise = lm[RIGHT_EYE_TOP].y - lm[RIGHT_BROW_INNER].y;
        let eyebrow_raise = (left_raise + right_raise) / 2.0;

        // Kept per side: one furrowed brow is enough for the anger rule.
        let left_brow_angle = lm[LEFT_BROW_INNER].y - lm[LEFT_BROW_OUTER].y;
        let right_brow_angle = lm[RIGHT_BROW_INNER].y - lm[RIGHT_BROW_OUTER].y;

        Ok(Self {
            smile_curve,
            mouth_aspect_ratio,
            eye_aspect_ratio,
            eyebrow_raise,
            left_brow_angle,
            right_brow_angle,
        })
    }

    pub fn get(&self, metric: Metric) -> f32 {
        match metric {
            Metric::SmileCurve => self.smile_curve,
            Metric::MouthAspectRatio => self.mouth_aspect_ratio,
            Metric::EyeAspectRatio => self.eye_aspect_ratio,
            Metric::EyebrowRaise => self.eyebrow_raise,
            Metric::LeftBrowAngle => self.left_brow_angle,
            Metric::RightBrowAngle => self.right_brow_angle,
        }
    }

    pub fn display(&self) -> DisplayMetrics {
        DisplayMetrics {
            smile_curve: self.smile_curve * 1000.0,
            mouth_open: self.mouth_aspect_ratio * 100.0,
            eye_open: self.eye_aspect_ratio * 100.0,
            brow_raise: self.eyebrow_raise * 100.0,
        }
    }
}
