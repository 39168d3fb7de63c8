//! Additive rule-based emotion scoring over geometry metrics.
//!
//! Every emotion's rules run on every call and only ever add to that
//! emotion's own score, so rule order is irrelevant. Neutral starts with a
//! bias and is then refined against the strongest competing score.

use crate::calibration::CalibrationProfile;
use crate::metrics::{GeometryMetrics, Metric};
use crate::types::Emotion;
use serde::{Serialize, Serializer};

// --- Threshold defaults without a calibration profile ---
const DEFAULT_HAPPY_LOW: f32 = 0.004;
const DEFAULT_HAPPY_HIGH: f32 = 0.007;
const DEFAULT_SAD: f32 = -0.003;
const DEFAULT_SLEEPY: f32 = 0.021;

// --- Fallbacks for emotions a calibration profile does not cover ---
pub(crate) const CALIBRATION_HAPPY_SMILE: f32 = 0.007;
pub(crate) const CALIBRATION_SAD_SMILE: f32 = -0.003;
pub(crate) const CALIBRATION_SLEEPY_EYE: f32 = 0.020;

// --- Fixed multipliers applied to calibrated values ---
const HAPPY_LOW_FACTOR: f32 = 0.6;
const HAPPY_HIGH_FACTOR: f32 = 0.9;
const SAD_FACTOR: f32 = 0.8;
const SLEEPY_FACTOR: f32 = 1.05;

const NEUTRAL_BIAS: f32 = 0.4;
const NEUTRAL_BOOST: f32 = 0.8;
const NEUTRAL_PENALTY: f32 = 0.3;
const NEUTRAL_BROW_REST: f32 = 0.020;
const MIN_CONFIDENCE: f32 = 0.4;
const FALLBACK_CONFIDENCE: f32 = 0.5;
const MAX_CONFIDENCE: f32 = 0.99;

/// Look up `metric` for `emotion` in the profile, or return `default`.
///
/// Falls back when there is no profile, the emotion was never calibrated,
/// or the metric is missing from that emotion's entry.
pub fn resolve_threshold(
    profile: Option<&CalibrationProfile>,
    emotion: Emotion,
    metric: Metric,
    default: f32,
) -> f32 {
    profile
        .and_then(|p| p.value(emotion, metric))
        .unwrap_or(default)
}

/// The four thresholds the scorer derives from calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub happy_low: f32,
    pub happy_high: f32,
    pub sad: f32,
    pub sleepy: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            happy_low: DEFAULT_HAPPY_LOW,
            happy_high: DEFAULT_HAPPY_HIGH,
            sad: DEFAULT_SAD,
            sleepy: DEFAULT_SLEEPY,
        }
    }
}

impl Thresholds {
    /// Resolve thresholds once, at scorer construction.
    pub fn resolve(profile: Option<&CalibrationProfile>) -> Self {
        let Some(profile) = profile else {
            return Self::default();
        };
        let p = Some(profile);

        let happy = resolve_threshold(p, Emotion::Happy, Metric::SmileCurve, CALIBRATION_HAPPY_SMILE);
        let sad = resolve_threshold(p, Emotion::Sad, Metric::SmileCurve, CALIBRATION_SAD_SMILE);
        let sleepy =
            resolve_threshold(p, Emotion::Sleepy, Metric::EyeAspectRatio, CALIBRATION_SLEEPY_EYE);

        Self {
            happy_low: happy * HAPPY_LOW_FACTOR,
            happy_high: happy * HAPPY_HIGH_FACTOR,
            sad: sad * SAD_FACTOR,
            sleepy: sleepy * SLEEPY_FACTOR,
        }
    }
}

/// One score per emotion, in enumeration order. Not normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreVector([f32; Emotion::COUNT]);

impl ScoreVector {
    fn initial() -> Self {
        let mut scores = [0.0f32; Emotion::COUNT];
        scores[Emotion::Neutral.index()] = NEUTRAL_BIAS;
        Self(scores)
    }

    pub fn get(&self, emotion: Emotion) -> f32 {
        self.0[emotion.index()]
    }

    fn add(&mut self, emotion: Emotion, amount: f32) {
        self.0[emotion.index()] += amount;
    }

    fn set(&mut self, emotion: Emotion, value: f32) {
        self.0[emotion.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.0[e.index()]))
    }

    /// Highest-scoring emotion; ties go to the earlier label.
    pub fn argmax(&self) -> (Emotion, f32) {
        let mut best = (Emotion::ALL[0], self.0[0]);
        for (emotion, score) in self.iter().skip(1) {
            if score > best.1 {
                best = (emotion, score);
            }
        }
        best
    }

    /// Scores sorted high to low, for debug listings.
    pub fn ranked(&self) -> Vec<(Emotion, f32)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// Written as `{label: score}` with scores rounded to two decimals.
impl Serialize for ScoreVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(e, s)| (e.as_str(), (s * 100.0).round() / 100.0)))
    }
}

/// Outcome of scoring one set of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmotionScore {
    pub emotion: Emotion,
    /// In [0, 0.99].
    pub confidence: f32,
    pub scores: ScoreVector,
}

/// Scores metrics against thresholds fixed at construction.
#[derive(Debug, Clone)]
pub struct EmotionScorer {
    thresholds: Thresholds,
}

impl Default for EmotionScorer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EmotionScorer {
    pub fn new(profile: Option<&CalibrationProfile>) -> Self {
        Self {
            thresholds: Thresholds::resolve(profile),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn score(&self, m: &GeometryMetrics) -> EmotionScore {
        let mut scores = raw_scores(&self.thresholds, m);
        refine_neutral(&mut scores, m);

        let (mut emotion, best) = scores.argmax();
        let mut confidence = best.min(MAX_CONFIDENCE);
        if confidence < MIN_CONFIDENCE {
            emotion = Emotion::Neutral;
            confidence = FALLBACK_CONFIDENCE;
        }

        EmotionScore {
            emotion,
            confidence,
            scores,
        }
    }
}

/// Apply every per-emotion rule. Neutral keeps its initial bias.
fn raw_scores(t: &Thresholds, m: &GeometryMetrics) -> ScoreVector {
    let smile = m.smile_curve;
    let mar = m.mouth_aspect_ratio;
    let ear = m.eye_aspect_ratio;
    let brow = m.eyebrow_raise;

    let mut s = ScoreVector::initial();

    // Happy
    if smile > t.happy_high {
        s.add(Emotion::Happy, 0.5);
        if smile > t.happy_high * 1.3 {
            s.add(Emotion::Happy, 0.3);
        }
    } else if smile > t.happy_low && mar < 0.35 {
        s.add(Emotion::Happy, 0.3);
    }

    // Sad
    if smile < t.sad {
        s.add(Emotion::Sad, 0.5);
        if smile < -0.006 {
            s.add(Emotion::Sad, 0.3);
        }
    }
    if brow < 0.02 && smile < -0.002 {
        s.add(Emotion::Sad, 0.2);
    }

    // Surprised: the eye and mouth checks count again when they co-occur.
    let wide_eyes = ear > 0.026;
    let open_mouth = mar > 0.5;
    if wide_eyes {
        s.add(Emotion::Surprised, 0.3);
    }
    if open_mouth {
        s.add(Emotion::Surprised, 0.3);
    }
    if brow > 0.025 {
        s.add(Emotion::Surprised, 0.3);
    }
    if wide_eyes && open_mouth {
        s.add(Emotion::Surprised, 0.2);
    }

    // Angry
    if brow < 0.020 {
        s.add(Emotion::Angry, 0.4);
    }
    if smile < 0.000 && ear < 0.023 {
        s.add(Emotion::Angry, 0.4);
    }
    if m.left_brow_angle < -0.001 || m.right_brow_angle < -0.001 {
        s.add(Emotion::Angry, 0.3);
    }
    if mar < 0.30 && smile.abs() < 0.003 {
        s.add(Emotion::Angry, 0.2);
    }

    // Disgusted
    if mar < 0.28 && smile > -0.002 {
        s.add(Emotion::Disgusted, 0.4);
    }
    if ear < 0.021 && smile > -0.001 {
        s.add(Emotion::Disgusted, 0.3);
    }
    if 0.15 < mar && mar < 0.32 && brow < 0.021 {
        s.add(Emotion::Disgusted, 0.3);
    }

    // Sleepy
    if ear < t.sleepy {
        s.add(Emotion::Sleepy, 0.5);
        if ear < 0.019 {
            s.add(Emotion::Sleepy, 0.3);
        }
    }
    if smile.abs() < 0.004 && mar < 0.38 {
        s.add(Emotion::Sleepy, 0.3);
    }
    if 0.017 < brow && brow < 0.024 {
        s.add(Emotion::Sleepy, 0.2);
    }

    s
}

/// Boost Neutral when nothing else is strong, then penalize it when the
/// face shows clear movement. Both steps may apply.
fn refine_neutral(s: &mut ScoreVector, m: &GeometryMetrics) {
    let max_other = s
        .iter()
        .filter(|(e, _)| *e != Emotion::Neutral)
        .map(|(_, score)| score)
        .fold(f32::NEG_INFINITY, f32::max);
    if max_other < 0.4 {
        s.set(Emotion::Neutral, NEUTRAL_BOOST);
    }

    if m.smile_curve.abs() > 0.003 || (m.eyebrow_raise - NEUTRAL_BROW_REST).abs() > 0.006 {
        let neutral = s.get(Emotion::Neutral);
        s.set(Emotion::Neutral, neutral * NEUTRAL_PENALTY);
    }
}
