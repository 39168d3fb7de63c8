//! Face-mesh landmark indices with fixed semantic meaning.
//!
//! Indices follow the 468-point MediaPipe face mesh topology. "Left" and
//! "right" are the subject's sides as seen in a mirrored selfie frame.

/// Minimum number of points a landmark set needs before any index below is valid.
pub const REQUIRED_LANDMARKS: usize = 468;

// Mouth
pub const MOUTH_LEFT: usize = 61;
pub const MOUTH_RIGHT: usize = 291;
pub const UPPER_LIP_INNER: usize = 13;
pub const LOWER_LIP_INNER: usize = 14;
pub const LOWER_LIP_CENTER: usize = 17;

// Eyes
pub const LEFT_EYE_TOP: usize = 159;
pub const LEFT_EYE_BOTTOM: usize = 145;
pub const RIGHT_EYE_TOP: usize = 386;
pub const RIGHT_EYE_BOTTOM: usize = 374;

// Eyebrows
pub const LEFT_BROW_INNER: usize = 55;
pub const LEFT_BROW_OUTER: usize = 46;
pub const RIGHT_BROW_INNER: usize = 285;
pub const RIGHT_BROW_OUTER: usize = 276;

/// Points driving the expression warp: outline, eyes, brows, nose, mouth.
pub const WARP_KEY_POINTS: [usize; 44] = [
    // outline
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288,
    152, 234, 127, 162, 21, 54, 103, 67,
    // eyes
    33, 133, 159, 145, 362, 263, 386, 374,
    // eyebrows
    70, 107, 336, 296,
    // nose
    1, 195,
    // mouth
    61, 291, 0, 17, 84, 314,
    78, 308, 13, 14,
];
