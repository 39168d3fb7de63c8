//! Synthetic face-mesh builders shared by the unit tests.

use crate::landmarks::*;
use crate::types::{Landmark, LandmarkSet};

/// Target metric values for [`synthetic_face`].
#[derive(Debug, Clone, Copy)]
pub struct FaceShape {
    pub smile_curve: f32,
    pub mouth_aspect_ratio: f32,
    pub eye_aspect_ratio: f32,
    pub eyebrow_raise: f32,
    pub left_brow_angle: f32,
    pub right_brow_angle: f32,
}

impl Default for FaceShape {
    /// A relaxed face: every metric inside the neutral band.
    fn default() -> Self {
        Self {
            smile_curve: 0.0,
            mouth_aspect_ratio: 0.1,
            eye_aspect_ratio: 0.024,
            eyebrow_raise: 0.0205,
            left_brow_angle: 0.0,
            right_brow_angle: 0.0,
        }
    }
}

/// 468 points spread over an ellipse so triangulation has real geometry.
pub fn base_face() -> Vec<Landmark> {
    (0..REQUIRED_LANDMARKS)
        .map(|i| {
            let t = i as f32 * 2.399_963; // golden angle
            let r = 0.05 + 0.25 * ((i % 97) as f32 / 97.0);
            Landmark::new(0.5 + r * 0.8 * t.cos(), 0.5 + r * t.sin())
        })
        .collect()
}

/// Build a landmark set whose extracted metrics equal `shape`.
pub fn synthetic_face(shape: &FaceShape) -> LandmarkSet {
    let mut p = base_face();

    let mouth_y = 0.70;
    let mouth_width = 0.10;
    p[MOUTH_LEFT] = Landmark::new(0.45, mouth_y);
    p[MOUTH_RIGHT] = Landmark::new(0.45 + mouth_width, mouth_y);
    p[LOWER_LIP_CENTER] = Landmark::new(0.50, mouth_y + shape.smile_curve);
    let mouth_height = shape.mouth_aspect_ratio * (mouth_width + 0.001);
    p[UPPER_LIP_INNER] = Landmark::new(0.50, 0.68);
    p[LOWER_LIP_INNER] = Landmark::new(0.50, 0.68 + mouth_height);

    let eye_y = 0.40;
    p[LEFT_EYE_TOP] = Landmark::new(0.40, eye_y);
    p[LEFT_EYE_BOTTOM] = Landmark::new(0.40, eye_y + shape.eye_aspect_ratio);
    p[RIGHT_EYE_TOP] = Landmark::new(0.60, eye_y);
    p[RIGHT_EYE_BOTTOM] = Landmark::new(0.60, eye_y + shape.eye_aspect_ratio);

    let brow_y = eye_y - shape.eyebrow_raise;
    p[LEFT_BROW_INNER] = Landmark::new(0.44, brow_y);
    p[LEFT_BROW_OUTER] = Landmark::new(0.34, brow_y - shape.left_brow_angle);
    p[RIGHT_BROW_INNER] = Landmark::new(0.56, brow_y);
    p[RIGHT_BROW_OUTER] = Landmark::new(0.66, brow_y - shape.right_brow_angle);

    LandmarkSet::new(p)
}
