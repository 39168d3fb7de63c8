//! Session bookkeeping: the training capture quota and the rolling
//! emotion history of a detection run.

use crate::calibration::TrainingSample;
use crate::detector::Reading;
use crate::metrics::{GeometryMetrics, MetricsError};
use crate::types::{Emotion, LandmarkSet};
use std::collections::VecDeque;

/// Samples captured per emotion before moving on.
pub const DEFAULT_SAMPLES_PER_EMOTION: usize = 3;

/// Order in which a training session asks for expressions.
pub const TRAINING_ORDER: [Emotion; Emotion::COUNT] = [
    Emotion::Neutral,
    Emotion::Happy,
    Emotion::Sad,
    Emotion::Angry,
    Emotion::Surprised,
    Emotion::Disgusted,
    Emotion::Sleepy,
];

/// Order used when reporting a session's emotion distribution.
pub const REPORT_ORDER: [Emotion; Emotion::COUNT] = [
    Emotion::Happy,
    Emotion::Sad,
    Emotion::Surprised,
    Emotion::Angry,
    Emotion::Disgusted,
    Emotion::Sleepy,
    Emotion::Neutral,
];

/// Labels kept by [`EmotionHistory`].
pub const HISTORY_WINDOW: usize = 30;

/// What a capture did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureProgress {
    /// Sample stored; `count` of `quota` captured for `emotion`.
    Captured { emotion: Emotion, count: usize, quota: usize },
    /// Quota met; the session now asks for the given emotion.
    NextEmotion(Emotion),
    /// Every emotion has its quota.
    Complete,
}

/// Append-only sample collection cycling through [`TRAINING_ORDER`].
#[derive(Debug, Clone)]
pub struct TrainingSession {
    quota: usize,
    position: usize,
    captured: usize,
    samples: Vec<TrainingSample>,
}

impl Default for TrainingSession {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLES_PER_EMOTION)
    }
}

impl TrainingSession {
    /// A quota of zero is treated as one.
    pub fn new(quota: usize) -> Self {
        Self {
            quota: quota.max(1),
            position: 0,
            captured: 0,
            samples: Vec::new(),
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Emotion currently being captured, or `None` once complete.
    pub fn current(&self) -> Option<Emotion> {
        TRAINING_ORDER.get(self.position).copied()
    }

    /// Samples captured so far for the current emotion.
    pub fn captured(&self) -> usize {
        self.captured
    }

    pub fn is_complete(&self) -> bool {
        self.position >= TRAINING_ORDER.len()
    }

    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    /// Extract metrics from one face and record them for the current emotion.
    ///
    /// A face with too few landmarks is not captured and leaves the session
    /// unchanged.
    pub fn capture(&mut self, landmarks: &LandmarkSet) -> Result<CaptureProgress, MetricsError> {
        let metrics = GeometryMetrics::extract(landmarks)?;
        Ok(self.record(metrics))
    }

    pub fn record(&mut self, metrics: GeometryMetrics) -> CaptureProgress {
        let Some(emotion) = self.current() else {
            return CaptureProgress::Complete;
        };

        self.samples.push(TrainingSample::new(emotion, metrics));
        self.captured += 1;
        tracing::debug!(%emotion, count = self.captured, quota = self.quota, "captured sample");

        if self.captured < self.quota {
            return CaptureProgress::Captured {
                emotion,
                count: self.captured,
                quota: self.quota,
            };
        }

        self.captured = 0;
        self.position += 1;
        match self.current() {
            Some(next) => CaptureProgress::NextEmotion(next),
            None => CaptureProgress::Complete,
        }
    }

    pub fn into_samples(self) -> Vec<TrainingSample> {
        self.samples
    }
}

/// Rolling window of recent readings plus a frame counter.
///
/// The window holds one entry per frame that had a face; `None` marks an
/// `Unknown` reading. Unknown entries count toward the distribution's total
/// but are not listed in it.
#[derive(Debug, Clone, Default)]
pub struct EmotionHistory {
    window: VecDeque<Option<Emotion>>,
    frames: u64,
}

impl EmotionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a frame, with its reading if a face was found.
    pub fn record_frame(&mut self, reading: Option<&Reading>) {
        self.frames += 1;
        if let Some(r) = reading {
            self.window.push_back(r.emotion());
            if self.window.len() > HISTORY_WINDOW {
                self.window.pop_front();
            }
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Share of the window per emotion, in percent, skipping zero counts.
    pub fn distribution(&self) -> Vec<(Emotion, f32)> {
        if self.window.is_empty() {
            return Vec::new();
        }
        let total = self.window.len() as f32;
        REPORT_ORDER
            .iter()
            .filter_map(|&emotion| {
                let count = self.window.iter().filter(|&&e| e == Some(emotion)).count();
                (count > 0).then(|| (emotion, count as f32 / total * 100.0))
            })
            .collect()
    }
}
