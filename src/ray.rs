//! Imaging rays in WGS 84 earth-centred coordinates.

use nalgebra::Vector3;

use crate::point::{EcefPoint, GeographicPoint};
use crate::proj::datum::WGS84_DATUM;
use crate::proj::ellipsoid::Ellipsoid;

/// A half-line: origin plus unit direction, both in WGS 84 ECEF metres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EcefRay {
    origin: EcefPoint,
    direction: Vector3<f64>,
}

impl EcefRay {
    /// `None` when `direction` has zero length.
    pub fn new(origin: EcefPoint, direction: Vector3<f64>) -> Option<Self> {
        let direction = direction.try_normalize(f64::EPSILON)?;
        Some(Self { origin, direction })
    }

    pub fn from_points(from: &EcefPoint, to: &EcefPoint) -> Option<Self> {
        Self::new(*from, to.as_vector() - from.as_vector())
    }

    /// Ray starting at `start` and passing through `end`.
    pub fn from_ground_points(start: &GeographicPoint, end: &GeographicPoint) -> Option<Self> {
        if start.has_nans() || end.has_nans() {
            return None;
        }
        let from = start.on_datum(&WGS84_DATUM).to_ecef();
        let to = end.on_datum(&WGS84_DATUM).to_ecef();
        Self::from_points(&from, &to)
    }

    pub fn origin(&self) -> &EcefPoint {
        &self.origin
    }

    pub fn direction(&self) -> &Vector3<f64> {
        &self.direction
    }

    pub fn point_at(&self, t: f64) -> EcefPoint {
        EcefPoint::from_vector(self.origin.as_vector() + self.direction * t)
    }

    /// First intersection (nearest non-negative range) with `ellipsoid`
    /// inflated by `height` metres along both axes.
    pub fn intersect_ellipsoid(&self, ellipsoid: &Ellipsoid, height: f64) -> Option<EcefPoint> {
        let a = ellipsoid.a() + height;
        let b = ellipsoid.b() + height;
        let scale = Vector3::new(1.0 / a, 1.0 / a, 1.0 / b);
        let o = self.origin.as_vector().component_mul(&scale);
        let d = self.direction.component_mul(&scale);

        let qa = d.dot(&d);
        let qb = 2.0 * o.dot(&d);
        let qc = o.dot(&o) - 1.0;
        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 || qa == 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let near = (-qb - root) / (2.0 * qa);
        let far = (-qb + root) / (2.0 * qa);
        let t = if near >= 0.0 {
            near
        } else if far >= 0.0 {
            far
        } else {
            return None;
        };
        Some(self.point_at(t))
    }
}
