//! mien-core — facial-expression scoring and expression warping.
//!
//! Turns a 468-point face mesh into a handful of geometry metrics, scores
//! them against a fixed rule table (optionally shifted by a per-user
//! calibration profile), and re-poses one face after another with a
//! Delaunay-based piecewise affine warp.

pub mod calibration;
pub mod delaunay;
pub mod detector;
pub mod landmarks;
pub mod metrics;
pub mod scorer;
pub mod session;
pub mod types;
pub mod warp;

#[cfg(test)]
mod test_support;

pub use calibration::{CalibrationError, CalibrationProfile, TrainingSample};
pub use detector::{EmotionDetector, Reading};
pub use metrics::{GeometryMetrics, Metric};
pub use scorer::{EmotionScore, EmotionScorer, Thresholds};
pub use types::{Emotion, Landmark, LandmarkSet};
pub use warp::{ExpressionWarper, WarpConfig, WarpError, Warped};
