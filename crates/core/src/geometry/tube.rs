use std::f64::consts::TAU;

use crate::scene::{Point3, TubeGeometry};

const DEGENERATE: f64 = 1e-9;

impl TubeGeometry {
    /// Vertex rings of the constant-radius tube around `path`, one ring of
    /// `radial_segments` vertices per path point, oriented with
    /// parallel-transported frames.
    pub fn extrude(&self) -> Vec<Vec<Point3>> {
        let segments = self.radial_segments.max(3) as usize;
        let tangents = tangents(&self.path, self.closed);

        let mut rings = Vec::with_capacity(self.path.len());
        let mut normal: Option<Point3> = None;

        for (point, tangent) in self.path.iter().zip(&tangents) {
            let n = match normal {
                Some(previous) => transport(previous, *tangent),
                None => perpendicular(*tangent),
            };
            let b = cross(*tangent, n);
            normal = Some(n);

            rings.push(
                (0..segments)
                    .map(|s| {
                        let phi = s as f64 / segments as f64 * TAU;
                        let (sin, cos) = phi.sin_cos();
                        [
                            point[0] + self.radius * (cos * n[0] + sin * b[0]),
                            point[1] + self.radius * (cos * n[1] + sin * b[1]),
                            point[2] + self.radius * (cos * n[2] + sin * b[2]),
                        ]
                    })
                    .collect(),
            );
        }

        rings
    }

    /// Arc length of the centre line.
    pub fn length(&self) -> f64 {
        let open: f64 = self
            .path
            .windows(2)
            .map(|pair| norm(sub(pair[1], pair[0])))
            .sum();
        match (self.closed, self.path.first(), self.path.last()) {
            (true, Some(first), Some(last)) if self.path.len() > 2 => {
                open + norm(sub(*first, *last))
            }
            _ => open,
        }
    }
}

fn tangents(path: &[Point3], closed: bool) -> Vec<Point3> {
    let n = path.len();
    let mut previous = [0.0, 0.0, 1.0];
    (0..n)
        .map(|i| {
            let (before, after) = if closed && n > 2 {
                (path[(i + n - 1) % n], path[(i + 1) % n])
            } else {
                (path[i.saturating_sub(1)], path[(i + 1).min(n - 1)])
            };
            let tangent = normalize(sub(after, before)).unwrap_or(previous);
            previous = tangent;
            tangent
        })
        .collect()
}

/// Carries the previous normal onto the plane perpendicular to `tangent`.
fn transport(normal: Point3, tangent: Point3) -> Point3 {
    let along = dot(normal, tangent);
    let projected = sub(normal, scale(tangent, along));
    normalize(projected).unwrap_or_else(|| perpendicular(tangent))
}

fn perpendicular(tangent: Point3) -> Point3 {
    let axis = if tangent[2].abs() < 0.9 {
        [0.0, 0.0, 1.0]
    } else {
        [1.0, 0.0, 0.0]
    };
    normalize(cross(tangent, axis)).unwrap_or([1.0, 0.0, 0.0])
}

fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale(a: Point3, s: f64) -> Point3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: Point3, b: Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Point3, b: Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: Point3) -> f64 {
    dot(a, a).sqrt()
}

fn normalize(a: Point3) -> Option<Point3> {
    let length = norm(a);
    (length > DEGENERATE && length.is_finite()).then(|| scale(a, 1.0 / length))
}
