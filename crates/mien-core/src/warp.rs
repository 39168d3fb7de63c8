//! Landmark-driven piecewise-affine expression warp.
//!
//! Moves a target face so its key landmarks take on the source face's
//! relative layout. The target image is triangulated over its own landmarks
//! plus eight fixed border points, and each triangle is mapped by its own
//! 3-point affine transform onto the displaced landmarks.

use crate::delaunay::{self, Triangle};
use crate::landmarks::{REQUIRED_LANDMARKS, WARP_KEY_POINTS};
use crate::types::LandmarkSet;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use thiserror::Error;

/// Widest image warped at full resolution.
pub const DEFAULT_MAX_WIDTH: u32 = 800;

const DEGENERATE_EPSILON: f32 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WarpError {
    #[error("insufficient {which} landmarks: need {required}, got {actual}")]
    InsufficientLandmarks {
        which: &'static str,
        required: usize,
        actual: usize,
    },
    #[error("source landmarks have zero extent; cannot normalize")]
    DegenerateSource,
    #[error("target image is empty")]
    EmptyImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpConfig {
    /// Images wider than this are warped at reduced size and scaled back up.
    /// Zero disables downscaling.
    pub max_width: u32,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

/// Why a triangle was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyRect,
    OutOfBounds,
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleOutcome {
    Applied,
    Skipped(SkipReason),
}

/// Warped image plus per-triangle bookkeeping.
#[derive(Debug, Clone)]
pub struct Warped {
    pub image: RgbImage,
    pub applied: usize,
    pub skipped: usize,
}

/// Integer pixel rectangle, inclusive of both floor-ed extremes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

/// Interleaved RGB working buffer with values in 0–255.
#[derive(Clone)]
struct Canvas {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Canvas {
    fn from_rgb(img: &RgbImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().iter().map(|&v| v as f32).collect(),
        }
    }

    fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let i = (y as usize * self.width + x as usize) * 3;
            let q = |v: f32| v.round().clamp(0.0, 255.0) as u8;
            Rgb([q(self.data[i]), q(self.data[i + 1]), q(self.data[i + 2])])
        })
    }

    fn contains(&self, r: &Rect) -> bool {
        r.x >= 0
            && r.y >= 0
            && (r.x + r.width) as usize <= self.width
            && (r.y + r.height) as usize <= self.height
    }

    fn pixel(&self, x: i32, y: i32) -> [f32; 3] {
        let i = (y as usize * self.width + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// Centroid and extent of the key points of one face, normalized coordinates.
#[derive(Debug, Clone, Copy)]
struct FaceFrame {
    center: (f32, f32),
    extent: (f32, f32),
}

impl FaceFrame {
    fn of(landmarks: &LandmarkSet) -> Self {
        let n = WARP_KEY_POINTS.len() as f32;
        let (mut sum_x, mut sum_y) = (0.0f32, 0.0f32);
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for &i in WARP_KEY_POINTS.iter() {
            let p = landmarks[i];
            sum_x += p.x;
            sum_y += p.y;
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self {
            center: (sum_x / n, sum_y / n),
            extent: (max_x - min_x, max_y - min_y),
        }
    }
}

/// Re-poses a target face after a source face's landmark layout.
#[derive(Debug, Clone, Default)]
pub struct ExpressionWarper {
    config: WarpConfig,
}

impl ExpressionWarper {
    pub fn new(config: WarpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WarpConfig {
        &self.config
    }

    /// Warp `target_image` (whose face has `target` landmarks) so the face
    /// adopts the relative landmark offsets of `source`.
    pub fn warp(
        &self,
        source: &LandmarkSet,
        target_image: &RgbImage,
        target: &LandmarkSet,
    ) -> Result<Warped, WarpError> {
        check_landmarks("source", source)?;
        check_landmarks("target", target)?;
        let (width, height) = target_image.dimensions();
        if width == 0 || height == 0 {
            return Err(WarpError::EmptyImage);
        }

        let src_frame = FaceFrame::of(source);
        if src_frame.extent.0.abs() < DEGENERATE_EPSILON || src_frame.extent.1.abs() < DEGENERATE_EPSILON {
            return Err(WarpError::DegenerateSource);
        }
        let dst_frame = FaceFrame::of(target);

        let scaled = self.config.max_width > 0 && width > self.config.max_width;
        let working = if scaled {
            let scale = self.config.max_width as f32 / width as f32;
            let new_w = self.config.max_width;
            let new_h = ((height as f32 * scale) as u32).max(1);
            tracing::debug!(width, height, new_w, new_h, "downscaling target for warp");
            imageops::resize(target_image, new_w, new_h, FilterType::Triangle)
        } else {
            target_image.clone()
        };
        let (w, h) = (working.width() as f32, working.height() as f32);

        let mut unwarped: Vec<(f32, f32)> = Vec::with_capacity(WARP_KEY_POINTS.len() + 8);
        let mut warped: Vec<(f32, f32)> = Vec::with_capacity(WARP_KEY_POINTS.len() + 8);
        for &i in WARP_KEY_POINTS.iter() {
            let t = target[i];
            unwarped.push((t.x * w, t.y * h));

            let s = source[i];
            let norm_x = (s.x - src_frame.center.0) / src_frame.extent.0;
            let norm_y = (s.y - src_frame.center.1) / src_frame.extent.1;
            warped.push((
                (norm_x * dst_frame.extent.0 + dst_frame.center.0) * w,
                (norm_y * dst_frame.extent.1 + dst_frame.center.1) * h,
            ));
        }

        let border = border_points(working.width(), working.height());
        unwarped.extend_from_slice(&border);
        warped.extend_from_slice(&border);

        let triangles = delaunay::triangulate_within(&unwarped, w, h);

        let source_canvas = Canvas::from_rgb(&working);
        let mut output = source_canvas.clone();
        let (mut applied, mut skipped) = (0usize, 0usize);

        for tri in &triangles {
            let t1 = corners(&unwarped, tri);
            let t2 = corners(&warped, tri);
            match warp_triangle(&source_canvas, &mut output, &t1, &t2) {
                TriangleOutcome::Applied => applied += 1,
                TriangleOutcome::Skipped(reason) => {
                    tracing::debug!(?tri, ?reason, "skipped triangle");
                    skipped += 1;
                }
            }
        }

        let mut image = output.to_rgb();
        if scaled {
            image = imageops::resize(&image, width, height, FilterType::Triangle);
        }

        tracing::debug!(triangles = triangles.len(), applied, skipped, "expression warp complete");

        Ok(Warped {
            image,
            applied,
            skipped,
        })
    }
}

fn check_landmarks(which: &'static str, set: &LandmarkSet) -> Result<(), WarpError> {
    if set.len() < REQUIRED_LANDMARKS {
        return Err(WarpError::InsufficientLandmarks {
            which,
            required: REQUIRED_LANDMARKS,
            actual: set.len(),
        });
    }
    Ok(())
}

/// Corners and edge midpoints; anchors the background during the warp.
fn border_points(width: u32, height: u32) -> [(f32, f32); 8] {
    let right = width.saturating_sub(1) as f32;
    let bottom = height.saturating_sub(1) as f32;
    let mid_x = (width / 2) as f32;
    let mid_y = (height / 2) as f32;
    [
        (0.0, 0.0),
        (right, 0.0),
        (0.0, bottom),
        (right, bottom),
        (mid_x, 0.0),
        (mid_x, bottom),
        (0.0, mid_y),
        (right, mid_y),
    ]
}

fn corners(points: &[(f32, f32)], tri: &Triangle) -> [(f32, f32); 3] {
    [points[tri[0]], points[tri[1]], points[tri[2]]]
}

fn bounding_rect(tri: &[(f32, f32); 3]) -> Rect {
    let min_x = tri.iter().map(|p| p.0).fold(f32::INFINITY, f32::min).floor() as i32;
    let min_y = tri.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).floor() as i32;
    let max_x = tri.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max).floor() as i32;
    let max_y = tri.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max).floor() as i32;
    Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}

/// Exact 2×3 affine transform taking `src` triangle onto `dst`.
///
/// Returns `[a, b, c, d, e, f]` for `x' = a·x + b·y + c`, `y' = d·x + e·y + f`,
/// or `None` when `src` is collinear.
fn estimate_affine(src: &[(f32, f32); 3], dst: &[(f32, f32); 3]) -> Option<[f32; 6]> {
    let (x0, y0) = src[0];
    let (u1, v1) = (src[1].0 - x0, src[1].1 - y0);
    let (u2, v2) = (src[2].0 - x0, src[2].1 - y0);
    let det = u1 * v2 - u2 * v1;
    if !det.is_finite() || det.abs() < DEGENERATE_EPSILON {
        return None;
    }

    let solve = |t0: f32, t1: f32, t2: f32| -> (f32, f32, f32) {
        let (p1, p2) = (t1 - t0, t2 - t0);
        let a = (p1 * v2 - p2 * v1) / det;
        let b = (u1 * p2 - u2 * p1) / det;
        (a, b, t0 - a * x0 - b * y0)
    };

    let (a, b, c) = solve(dst[0].0, dst[1].0, dst[2].0);
    let (d, e, f) = solve(dst[0].1, dst[1].1, dst[2].1);
    Some([a, b, c, d, e, f])
}

fn invert_affine(m: &[f32; 6]) -> Option<[f32; 6]> {
    let [a, b, c, d, e, f] = *m;
    let det = a * e - b * d;
    if !det.is_finite() || det.abs() < DEGENERATE_EPSILON {
        return None;
    }
    let inv = 1.0 / det;
    let (ia, ib, id, ie) = (e * inv, -b * inv, -d * inv, a * inv);
    Some([ia, ib, -(ia * c + ib * f), id, ie, -(id * c + ie * f)])
}

fn apply_affine(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[1] * y + m[2], m[3] * x + m[4] * y + m[5])
}

/// Mirror an index into `[0, n)` without repeating the edge pixel.
fn reflect_101(i: i32, n: i32) -> i32 {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    if m >= n {
        period - m
    } else {
        m
    }
}

/// Bilinear sample at crop-local `(sx, sy)`, reflecting at the crop edges.
fn sample_bilinear(src: &Canvas, crop: &Rect, sx: f32, sy: f32) -> [f32; 3] {
    let x0f = sx.floor();
    let y0f = sy.floor();
    let fx = sx - x0f;
    let fy = sy - y0f;
    let (x0, y0) = (x0f as i32, y0f as i32);

    let xa = crop.x + reflect_101(x0, crop.width);
    let xb = crop.x + reflect_101(x0 + 1, crop.width);
    let ya = crop.y + reflect_101(y0, crop.height);
    let yb = crop.y + reflect_101(y0 + 1, crop.height);

    let (tl, tr, bl, br) = (src.pixel(xa, ya), src.pixel(xb, ya), src.pixel(xa, yb), src.pixel(xb, yb));
    let mut out = [0.0f32; 3];
    for ch in 0..3 {
        out[ch] = tl[ch] * (1.0 - fx) * (1.0 - fy)
            + tr[ch] * fx * (1.0 - fy)
            + bl[ch] * (1.0 - fx) * fy
            + br[ch] * fx * fy;
    }
    out
}

/// Anti-aliased coverage of pixel `(px, py)` by a non-degenerate triangle.
fn coverage(tri: &[(f32, f32); 3], px: f32, py: f32) -> f32 {
    let [a, b, c] = *tri;
    let orient = ((b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)).signum();

    let mut inner = f32::INFINITY;
    for (p, q) in [(a, b), (b, c), (c, a)] {
        let (ex, ey) = (q.0 - p.0, q.1 - p.1);
        let len = (ex * ex + ey * ey).sqrt();
        let dist = (ex * (py - p.1) - ey * (px - p.0)) / len * orient;
        inner = inner.min(dist);
    }
    (inner + 0.5).clamp(0.0, 1.0)
}

/// Map triangle `t1` of `src` onto triangle `t2` of `dst`, blending through
/// a soft mask. Never panics on bad geometry; such triangles are skipped.
fn warp_triangle(
    src: &Canvas,
    dst: &mut Canvas,
    t1: &[(f32, f32); 3],
    t2: &[(f32, f32); 3],
) -> TriangleOutcome {
    let r1 = bounding_rect(t1);
    let r2 = bounding_rect(t2);

    if r1.width <= 0 || r1.height <= 0 || r2.width <= 0 || r2.height <= 0 {
        return TriangleOutcome::Skipped(SkipReason::EmptyRect);
    }
    if !src.contains(&r1) || !dst.contains(&r2) {
        return TriangleOutcome::Skipped(SkipReason::OutOfBounds);
    }

    let local = |t: &[(f32, f32); 3], r: &Rect| -> [(f32, f32); 3] {
        t.map(|(x, y)| (x - r.x as f32, y - r.y as f32))
    };
    let t1_local = local(t1, &r1);
    let t2_local = local(t2, &r2);

    let Some(forward) = estimate_affine(&t1_local, &t2_local) else {
        return TriangleOutcome::Skipped(SkipReason::Degenerate);
    };
    let Some(inverse) = invert_affine(&forward) else {
        return TriangleOutcome::Skipped(SkipReason::Degenerate);
    };

    for y in 0..r2.height {
        for x in 0..r2.width {
            let mask = coverage(&t2_local, x as f32, y as f32);
            if mask <= 0.0 {
                continue;
            }

            let (sx, sy) = apply_affine(&inverse, x as f32, y as f32);
            let sample = sample_bilinear(src, &r1, sx, sy);

            let i = ((r2.y + y) as usize * dst.width + (r2.x + x) as usize) * 3;
            for ch in 0..3 {
                dst.data[i + ch] = dst.data[i + ch] * (1.0 - mask) + sample[ch] * mask;
            }
        }
    }

    TriangleOutcome::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{LOWER_LIP_INNER, UPPER_LIP_INNER};
    use crate::test_support::{synthetic_face, FaceShape};
    use crate::types::Landmark;

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + 2 * y) % 256) as u8])
        })
    }

    fn max_diff(a: &RgbImage, b: &RgbImage) -> u8 {
        a.as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&p, &q)| p.abs_diff(q))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_estimate_affine_identity() {
        let tri = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)];
        let m = estimate_affine(&tri, &tri).unwrap();
        let expected = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        for (got, want) in m.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "m = {m:?}");
        }
    }

    #[test]
    fn test_estimate_affine_maps_vertices() {
        let src = [(2.0, 3.0), (12.0, 5.0), (4.0, 15.0)];
        let dst = [(7.0, 1.0), (20.0, 9.0), (3.0, 18.0)];
        let m = estimate_affine(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let (x, y) = apply_affine(&m, s.0, s.1);
            assert!((x - d.0).abs() < 1e-4 && (y - d.1).abs() < 1e-4, "({x}, {y}) vs {d:?}");
        }

        let inv = invert_affine(&m).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let (x, y) = apply_affine(&inv, d.0, d.1);
            assert!((x - s.0).abs() < 1e-3 && (y - s.1).abs() < 1e-3);
        }
    }

    #[test]
    fn test_estimate_affine_rejects_collinear() {
        let src = [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)];
        let dst = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        assert!(estimate_affine(&src, &dst).is_none());
        let nan = [(f32::NAN, 0.0), (1.0, 0.0), (0.0, 1.0)];
        assert!(estimate_affine(&nan, &dst).is_none());
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 3), 1);
        assert_eq!(reflect_101(-2, 3), 2);
        assert_eq!(reflect_101(3, 3), 1);
        assert_eq!(reflect_101(4, 3), 0);
        assert_eq!(reflect_101(1, 3), 1);
        assert_eq!(reflect_101(5, 1), 0);
    }

    #[test]
    fn test_bounding_rect() {
        let r = bounding_rect(&[(1.2, 3.7), (5.9, 2.1), (3.0, 8.0)]);
        assert_eq!(r, Rect { x: 1, y: 2, width: 5, height: 7 });
    }

    #[test]
    fn test_coverage_inside_outside_edge() {
        let tri = [(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)];
        assert_eq!(coverage(&tri, 5.0, 5.0), 1.0);
        assert_eq!(coverage(&tri, 30.0, 30.0), 0.0);
        let edge = coverage(&tri, 10.0, 0.0);
        assert!((edge - 0.5).abs() < 1e-6, "edge = {edge}");
        // Winding order does not matter.
        let flipped = [tri[0], tri[2], tri[1]];
        assert_eq!(coverage(&flipped, 5.0, 5.0), 1.0);
    }

    #[test]
    fn test_warp_triangle_out_of_bounds_is_skipped() {
        let src = Canvas::from_rgb(&gradient_image(50, 50));
        let mut dst = src.clone();
        let t1 = [(5.0, 5.0), (20.0, 5.0), (5.0, 20.0)];
        let t2 = [(40.0, 40.0), (60.0, 40.0), (40.0, 60.0)];

        let outcome = warp_triangle(&src, &mut dst, &t1, &t2);
        assert_eq!(outcome, TriangleOutcome::Skipped(SkipReason::OutOfBounds));
        assert_eq!(dst.data, src.data);
    }

    #[test]
    fn test_warp_triangle_degenerate_is_skipped() {
        let src = Canvas::from_rgb(&gradient_image(50, 50));
        let mut dst = src.clone();
        let t1 = [(5.0, 5.0), (10.0, 10.0), (15.0, 15.0)];
        let t2 = [(5.0, 5.0), (20.0, 5.0), (5.0, 20.0)];
        assert_eq!(
            warp_triangle(&src, &mut dst, &t1, &t2),
            TriangleOutcome::Skipped(SkipReason::Degenerate)
        );
        assert_eq!(dst.data, src.data);
    }

    #[test]
    fn test_warp_triangle_translation() {
        // A bright block inside t1 should land inside t2, shifted by (10, 0).
        let mut img = RgbImage::new(60, 40);
        for y in 8..12 {
            for x in 8..12 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let src = Canvas::from_rgb(&img);
        let mut dst = Canvas::from_rgb(&RgbImage::new(60, 40));
        let t1 = [(2.0, 2.0), (30.0, 2.0), (2.0, 30.0)];
        let t2 = [(12.0, 2.0), (40.0, 2.0), (12.0, 30.0)];

        assert_eq!(warp_triangle(&src, &mut dst, &t1, &t2), TriangleOutcome::Applied);
        let out = dst.to_rgb();
        assert_eq!(out.get_pixel(19, 9)[0], 255);
        assert_eq!(out.get_pixel(9, 9)[0], 0);
    }

    #[test]
    fn test_border_points() {
        let pts = border_points(101, 51);
        assert_eq!(pts[0], (0.0, 0.0));
        assert_eq!(pts[3], (100.0, 50.0));
        assert_eq!(pts[4], (50.0, 0.0));
        assert_eq!(pts[6], (0.0, 25.0));
    }

    #[test]
    fn test_identical_faces_leave_image_nearly_unchanged() {
        let face = synthetic_face(&FaceShape::default());
        let image = gradient_image(200, 160);
        let warped = ExpressionWarper::default().warp(&face, &image, &face).unwrap();

        assert_eq!(warped.image.dimensions(), (200, 160));
        assert!(warped.applied > 0);
        let diff = max_diff(&warped.image, &image);
        assert!(diff <= 1, "max diff {diff}");
    }

    #[test]
    fn test_expression_moves_pixels() {
        let target = synthetic_face(&FaceShape::default());
        let source = synthetic_face(&FaceShape {
            mouth_aspect_ratio: 0.6,
            ..Default::default()
        });
        let src_gap = source[LOWER_LIP_INNER].y - source[UPPER_LIP_INNER].y;
        let dst_gap = target[LOWER_LIP_INNER].y - target[UPPER_LIP_INNER].y;
        assert!(src_gap > dst_gap);

        let image = gradient_image(200, 160);
        let warped = ExpressionWarper::default().warp(&source, &image, &target).unwrap();
        assert!(max_diff(&warped.image, &image) > 0);
    }

    #[test]
    fn test_warp_is_deterministic() {
        let target = synthetic_face(&FaceShape::default());
        let source = synthetic_face(&FaceShape {
            smile_curve: 0.01,
            mouth_aspect_ratio: 0.4,
            eyebrow_raise: 0.03,
            ..Default::default()
        });
        let image = gradient_image(180, 140);
        let warper = ExpressionWarper::default();

        let a = warper.warp(&source, &image, &target).unwrap();
        let b = warper.warp(&source, &image, &target).unwrap();
        assert_eq!(a.image, b.image);
        assert_eq!((a.applied, a.skipped), (b.applied, b.skipped));
    }

    #[test]
    fn test_point_outside_image_leaves_rest_of_mesh_intact() {
        let (width, height) = (160u32, 160u32);
        let image = gradient_image(width, height);
        let warper = ExpressionWarper::default();

        let face = synthetic_face(&FaceShape::default());
        let moved_index = WARP_KEY_POINTS[0];
        let original = face[moved_index];
        let mut moved = face.clone();
        moved.points[moved_index] = Landmark::new(1.3, 0.5);

        let baseline = warper.warp(&face, &image, &face).unwrap();
        let result = warper.warp(&moved, &image, &moved).unwrap();
        assert_eq!(result.image.dimensions(), (width, height));
        assert!(result.applied > 0);
        assert!(max_diff(&result.image, &image) <= 1);

        // Away from the dropped landmark the two meshes warp identically.
        let (ox, oy) = (original.x * width as f32, original.y * height as f32);
        for (x, y, px) in result.image.enumerate_pixels() {
            let (dx, dy) = (x as f32 - ox, y as f32 - oy);
            if (dx * dx + dy * dy).sqrt() > 40.0 {
                assert_eq!(px, baseline.image.get_pixel(x, y), "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_warped_points_outside_image_are_skipped() {
        let source = synthetic_face(&FaceShape::default());
        let mut target = source.clone();
        // A far-off target point stretches the target extent, so most warped
        // points land outside the image.
        target.points[WARP_KEY_POINTS[0]] = Landmark::new(5.0, 0.5);
        let image = gradient_image(160, 160);

        let warped = ExpressionWarper::default().warp(&source, &image, &target).unwrap();
        assert_eq!(warped.image.dimensions(), (160, 160));
        assert!(warped.skipped > 0);
    }

    #[test]
    fn test_far_off_target_point_skips_without_panicking() {
        let source = synthetic_face(&FaceShape::default());
        let mut target = source.clone();
        target.points[WARP_KEY_POINTS[0]] = Landmark::new(1e7, 0.5);
        let image = gradient_image(120, 120);

        let warped = ExpressionWarper::default().warp(&source, &image, &target).unwrap();
        assert_eq!(warped.image.dimensions(), (120, 120));
        assert!(warped.skipped > warped.applied, "{} / {}", warped.applied, warped.skipped);
    }

    #[test]
    fn test_wide_image_is_downscaled_and_restored() {
        let face = synthetic_face(&FaceShape::default());
        let image = gradient_image(1000, 400);
        let warper = ExpressionWarper::new(WarpConfig { max_width: 800 });
        let warped = warper.warp(&face, &image, &face).unwrap();
        assert_eq!(warped.image.dimensions(), (1000, 400));
        assert!(warped.applied > 0);
    }

    #[test]
    fn test_rejects_short_landmark_sets() {
        let face = synthetic_face(&FaceShape::default());
        let short = LandmarkSet::new(vec![Landmark::new(0.5, 0.5); 100]);
        let image = gradient_image(20, 20);
        let warper = ExpressionWarper::default();

        assert!(matches!(
            warper.warp(&short, &image, &face),
            Err(WarpError::InsufficientLandmarks { which: "source", actual: 100, .. })
        ));
        assert!(matches!(
            warper.warp(&face, &image, &short),
            Err(WarpError::InsufficientLandmarks { which: "target", .. })
        ));
    }

    #[test]
    fn test_rejects_degenerate_source_and_empty_image() {
        let face = synthetic_face(&FaceShape::default());
        let flat = LandmarkSet::new(vec![Landmark::new(0.5, 0.5); 468]);
        let warper = ExpressionWarper::default();

        assert_eq!(
            warper.warp(&flat, &gradient_image(20, 20), &face).unwrap_err(),
            WarpError::DegenerateSource
        );
        assert_eq!(
            warper.warp(&face, &RgbImage::new(0, 0), &face).unwrap_err(),
            WarpError::EmptyImage
        );
    }
}
