//! Delaunay triangulation via incremental Bowyer–Watson insertion.
//!
//! Sized for the few dozen points of a warp mesh: every insertion scans all
//! triangles, so the cost is quadratic in the point count.

/// Three indices into the caller's point slice.
pub type Triangle = [usize; 3];

/// Points closer than this (in input units) are inserted only once.
const COINCIDENT_EPSILON: f64 = 1e-3;

/// Triangulate the points lying inside `[0, width) × [0, height)`.
///
/// Points outside the rectangle are left out of the mesh; coincident points
/// are inserted once and the first occurrence wins. Returned indices refer
/// to `points`. Output order is deterministic for a given input.
pub fn triangulate_within(points: &[(f32, f32)], width: f32, height: f32) -> Vec<Triangle> {
    let inside: Vec<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, &(x, y))| x >= 0.0 && y >= 0.0 && x < width && y < height)
        .map(|(i, _)| i)
        .collect();

    let mut chosen: Vec<usize> = Vec::with_capacity(inside.len());
    for i in inside {
        let (x, y) = points[i];
        let duplicate = chosen.iter().any(|&j| {
            let (px, py) = points[j];
            let dx = (x - px) as f64;
            let dy = (y - py) as f64;
            dx * dx + dy * dy < COINCIDENT_EPSILON * COINCIDENT_EPSILON
        });
        if !duplicate {
            chosen.push(i);
        }
    }

    let local: Vec<(f64, f64)> = chosen
        .iter()
        .map(|&i| (points[i].0 as f64, points[i].1 as f64))
        .collect();

    triangulate(&local)
        .into_iter()
        .map(|[a, b, c]| [chosen[a], chosen[b], chosen[c]])
        .collect()
}

/// Triangulate distinct points. Collinear or fewer than three points yield
/// no triangles.
pub fn triangulate(points: &[(f64, f64)]) -> Vec<Triangle> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(1.0);
    let mid_x = (min_x + max_x) / 2.0;
    let mid_y = (min_y + max_y) / 2.0;

    // Super-triangle vertices live at indices n, n+1, n+2.
    let mut vertices: Vec<(f64, f64)> = points.to_vec();
    vertices.push((mid_x - 20.0 * span, mid_y - span));
    vertices.push((mid_x, mid_y + 20.0 * span));
    vertices.push((mid_x + 20.0 * span, mid_y - span));

    let mut triangles: Vec<Triangle> = vec![[n, n + 1, n + 2]];

    for p in 0..n {
        let point = vertices[p];

        let (bad, good): (Vec<Triangle>, Vec<Triangle>) = triangles
            .into_iter()
            .partition(|t| in_circumcircle(vertices[t[0]], vertices[t[1]], vertices[t[2]], point));

        // Cavity boundary: edges used by exactly one bad triangle.
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for t in &bad {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let shared = bad
                    .iter()
                    .filter(|other| has_edge(other, a, b))
                    .count()
                    > 1;
                if !shared {
                    edges.push((a, b));
                }
            }
        }

        triangles = good;
        triangles.extend(edges.into_iter().map(|(a, b)| [a, b, p]));
    }

    triangles.retain(|t| t.iter().all(|&v| v < n));
    triangles
}

fn has_edge(t: &Triangle, a: usize, b: usize) -> bool {
    t.contains(&a) && t.contains(&b)
}

/// Whether `p` lies strictly inside the circumcircle of `a, b, c`.
fn in_circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64), p: (f64, f64)) -> bool {
    let (ax, ay) = (a.0 - p.0, a.1 - p.1);
    let (bx, by) = (b.0 - p.0, b.1 - p.1);
    let (cx, cy) = (c.0 - p.0, c.1 - p.1);

    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);

    let orientation = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
    if orientation > 0.0 {
        det > 0.0
    } else {
        det < 0.0
    }
}
