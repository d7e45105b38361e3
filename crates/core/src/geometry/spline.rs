//! Centripetal Catmull-Rom interpolation.
//!
//! Knot spacing uses the square root of the chord length measured in the
//! X/Y plane only, so Z behaves as a linear channel: scaling every control
//! Z scales every sampled Z by the same factor.

use crate::scene::Point3;

const KNOT_EPSILON: f64 = 1e-6;

/// Closed curve through `points`. The first control point is not repeated
/// at the end. Fewer than three controls are returned unchanged.
pub fn sample_closed(points: &[Point3], per_span: usize) -> Vec<Point3> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let per_span = per_span.max(1);

    let mut out = Vec::with_capacity(n * per_span);
    for i in 0..n {
        let p0 = points[(i + n - 1) % n];
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        let p3 = points[(i + 2) % n];
        for step in 0..per_span {
            out.push(segment(p0, p1, p2, p3, step as f64 / per_span as f64));
        }
    }
    out
}

/// Open curve from the first to the last control point, with mirrored
/// phantom end points.
pub fn sample_open(points: &[Point3], per_span: usize) -> Vec<Point3> {
    let n = points.len();
    if n < 2 {
        return points.to_vec();
    }
    let per_span = per_span.max(1);

    let head = mirror(points[1], points[0]);
    let tail = mirror(points[n - 2], points[n - 1]);
    let at = |i: isize| -> Point3 {
        if i < 0 {
            head
        } else if i as usize >= n {
            tail
        } else {
            points[i as usize]
        }
    };

    let mut out = Vec::with_capacity((n - 1) * per_span + 1);
    for i in 0..(n - 1) as isize {
        let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
        for step in 0..per_span {
            out.push(segment(p0, p1, p2, p3, step as f64 / per_span as f64));
        }
    }
    out.push(points[n - 1]);
    out
}

/// Reflection of `a` through `b`.
fn mirror(a: Point3, b: Point3) -> Point3 {
    [2.0 * b[0] - a[0], 2.0 * b[1] - a[1], 2.0 * b[2] - a[2]]
}

fn knot(a: Point3, b: Point3) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt().sqrt().max(KNOT_EPSILON)
}

fn blend(a: Point3, wa: f64, b: Point3, wb: f64) -> Point3 {
    [
        a[0] * wa + b[0] * wb,
        a[1] * wa + b[1] * wb,
        a[2] * wa + b[2] * wb,
    ]
}

/// Barry-Goldman evaluation of the span between `p1` and `p2`, `u` in `[0, 1)`.
fn segment(p0: Point3, p1: Point3, p2: Point3, p3: Point3, u: f64) -> Point3 {
    let t0 = 0.0;
    let t1 = t0 + knot(p0, p1);
    let t2 = t1 + knot(p1, p2);
    let t3 = t2 + knot(p2, p3);
    let t = t1 + (t2 - t1) * u;

    let a1 = blend(p0, (t1 - t) / (t1 - t0), p1, (t - t0) / (t1 - t0));
    let a2 = blend(p1, (t2 - t) / (t2 - t1), p2, (t - t1) / (t2 - t1));
    let a3 = blend(p2, (t3 - t) / (t3 - t2), p3, (t - t2) / (t3 - t2));

    let b1 = blend(a1, (t2 - t) / (t2 - t0), a2, (t - t0) / (t2 - t0));
    let b2 = blend(a2, (t3 - t) / (t3 - t1), a3, (t - t1) / (t3 - t1));

    blend(b1, (t2 - t) / (t2 - t1), b2, (t - t1) / (t2 - t1))
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use super::*;

    fn close(a: Point3, b: Point3) -> bool {
        (0..3).all(|i| (a[i] - b[i]).abs() < 1e-9)
    }

    fn circle(n: usize) -> Vec<Point3> {
        (0..n)
            .map(|i| {
                let angle = i as f64 / n as f64 * TAU;
                [angle.cos(), angle.sin(), 0.0]
            })
            .collect()
    }

    #[test]
    fn closed_curve_passes_through_controls() {
        let controls = circle(8);
        let curve = sample_closed(&controls, 4);
        assert_eq!(curve.len(), 32);
        for (i, control) in controls.iter().enumerate() {
            assert!(close(curve[i * 4], *control));
        }
    }

    #[test]
    fn open_curve_ends_at_last_control() {
        let controls = vec![[0.0, 0.0, 0.0], [1.0, 0.2, 0.0], [2.0, -0.1, 0.0], [3.0, 0.0, 1.0]];
        let curve = sample_open(&controls, 5);
        assert_eq!(curve.len(), 16);
        assert!(close(curve[0], controls[0]));
        assert!(close(*curve.last().unwrap(), controls[3]));
    }

    #[test]
    fn z_channel_scales_linearly() {
        let mut controls = circle(6);
        for (i, point) in controls.iter_mut().enumerate() {
            point[2] = (i as f64).sin();
        }
        let scaled: Vec<Point3> = controls.iter().map(|p| [p[0], p[1], p[2] * 3.0]).collect();

        let a = sample_closed(&controls, 6);
        let b = sample_closed(&scaled, 6);
        for (p, q) in a.iter().zip(&b) {
            assert!((p[0] - q[0]).abs() < 1e-12);
            assert!((p[2] * 3.0 - q[2]).abs() < 1e-9);
        }
    }

    #[test]
    fn coincident_points_stay_finite() {
        let controls = vec![[1.0, 1.0, 0.0]; 4];
        let curve = sample_closed(&controls, 3);
        assert!(curve.iter().flatten().all(|v| v.is_finite()));
    }
}
