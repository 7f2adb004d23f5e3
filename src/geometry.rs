//! Image clip rectangles and ground bounding polygons.

use crate::point::{GeographicPoint, PlanarPoint};

/// Axis-aligned image rectangle with inclusive bounds (`ul` to `lr`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageRect {
    pub ul: PlanarPoint,
    pub lr: PlanarPoint,
}

impl ImageRect {
    pub fn new(ul: PlanarPoint, lr: PlanarPoint) -> Self {
        Self { ul, lr }
    }

    /// `[0, 0]` to `[samples - 1, lines - 1]`.
    pub fn from_size(samples: f64, lines: f64) -> Self {
        Self::new(
            PlanarPoint::new(0.0, 0.0),
            PlanarPoint::new(samples - 1.0, lines - 1.0),
        )
    }

    pub fn undefined() -> Self {
        Self::new(PlanarPoint::undefined(), PlanarPoint::undefined())
    }

    pub fn has_nans(&self) -> bool {
        self.ul.has_nans() || self.lr.has_nans()
    }

    pub fn width(&self) -> f64 {
        self.lr.x - self.ul.x + 1.0
    }

    pub fn height(&self) -> f64 {
        self.lr.y - self.ul.y + 1.0
    }

    pub fn midpoint(&self) -> PlanarPoint {
        (self.ul + self.lr) / 2.0
    }

    pub fn contains(&self, p: PlanarPoint) -> bool {
        p.x >= self.ul.x && p.x <= self.lr.x && p.y >= self.ul.y && p.y <= self.lr.y
    }

    /// Clip the segment `p0 -> p1` to the rectangle (Liang-Barsky).
    /// `None` when the segment misses the rectangle entirely.
    pub fn clip_segment(
        &self,
        p0: PlanarPoint,
        p1: PlanarPoint,
    ) -> Option<(PlanarPoint, PlanarPoint)> {
        let d = p1 - p0;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        let checks = [
            (-d.x, p0.x - self.ul.x),
            (d.x, self.lr.x - p0.x),
            (-d.y, p0.y - self.ul.y),
            (d.y, self.lr.y - p0.y),
        ];
        for (p, q) in checks {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
        Some((p0 + d * t0, p0 + d * t1))
    }
}

/// Convex ground footprint; vertices are `x = lon`, `y = lat` in degrees.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroundPolygon {
    vertices: Vec<PlanarPoint>,
}

impl GroundPolygon {
    pub fn new(vertices: Vec<PlanarPoint>) -> Self {
        Self { vertices }
    }

    /// Footprint from the four image corners, in UL, UR, LR, LL order.
    pub fn from_corners(corners: &[GeographicPoint; 4]) -> Self {
        Self::new(
            corners
                .iter()
                .map(|g| PlanarPoint::new(g.lon(), g.lat()))
                .collect(),
        )
    }

    pub fn vertices(&self) -> &[PlanarPoint] {
        &self.vertices
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn has_nans(&self) -> bool {
        self.vertices.iter().any(PlanarPoint::has_nans)
    }

    /// Shoelace area; positive for counter-clockwise vertex order.
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| {
                let (a, b) = (self.vertices[i], self.vertices[(i + 1) % n]);
                a.x * b.y - b.x * a.y
            })
            .sum::<f64>()
            / 2.0
    }

    /// Point-in-polygon by ray crossing. Points on an edge count as inside.
    pub fn contains(&self, p: PlanarPoint) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            if on_segment(p, a, b) {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Clip the segment `p0 -> p1` to this convex polygon (Cyrus-Beck).
    pub fn clip_segment(
        &self,
        p0: PlanarPoint,
        p1: PlanarPoint,
    ) -> Option<(PlanarPoint, PlanarPoint)> {
        let n = self.vertices.len();
        if n < 3 {
            return None;
        }
        let ccw = self.signed_area() > 0.0;
        let d = p1 - p0;
        let mut t_enter = 0.0_f64;
        let mut t_exit = 1.0_f64;
        for i in 0..n {
            let a = self.vertices[i];
            let edge = self.vertices[(i + 1) % n] - a;
            // Inward normal
            let normal = if ccw {
                PlanarPoint::new(-edge.y, edge.x)
            } else {
                PlanarPoint::new(edge.y, -edge.x)
            };
            let num = dot(normal, p0 - a);
            let den = dot(normal, d);
            if den == 0.0 {
                if num < 0.0 {
                    return None;
                }
                continue;
            }
            let t = -num / den;
            if den > 0.0 {
                t_enter = t_enter.max(t);
            } else {
                t_exit = t_exit.min(t);
            }
            if t_enter > t_exit {
                return None;
            }
        }
        Some((p0 + d * t_enter, p0 + d * t_exit))
    }
}

fn dot(a: PlanarPoint, b: PlanarPoint) -> f64 {
    a.x * b.x + a.y * b.y
}

fn on_segment(p: PlanarPoint, a: PlanarPoint, b: PlanarPoint) -> bool {
    let ab = b - a;
    let ap = p - a;
    let cross = ab.x * ap.y - ab.y * ap.x;
    let scale = ab.length().max(f64::MIN_POSITIVE);
    if (cross / scale).abs() > 1e-12 {
        return false;
    }
    let t = dot(ap, ab) / dot(ab, ab);
    (0.0..=1.0).contains(&t)
}
