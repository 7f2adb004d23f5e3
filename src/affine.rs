use crate::error::ProjError;
use crate::point::PlanarPoint;

/// A 2D affine transform relating image pixels to map coordinates.
///
/// Maps image coordinates (sample, line) to planar coordinates (x, y):
///   x = a * sample + b * line + c
///   y = d * sample + e * line + f
///
/// Image lines increase downwards while northing increases upwards, so a
/// north-up calibration has `e < 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up calibration: `tie` is the planar coordinate of image (0, 0)
    /// and `scale` the (positive) size of one pixel along x and y.
    pub fn from_tie_point(tie: PlanarPoint, scale: PlanarPoint) -> Self {
        Self::new(scale.x, 0.0, tie.x, 0.0, -scale.y, tie.y)
    }

    /// Apply the forward transform: image -> planar.
    pub fn forward(&self, p: PlanarPoint) -> PlanarPoint {
        PlanarPoint::new(
            self.a * p.x + self.b * p.y + self.c,
            self.d * p.x + self.e * p.y + self.f,
        )
    }

    /// Compute the inverse affine transform.
    pub fn inverse(&self) -> Result<Affine, ProjError> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return Err(ProjError::InvalidParameter(
                "Singular affine transform (determinant is zero)".into(),
            ));
        }
        let inv_det = 1.0 / det;
        Ok(Affine {
            a: self.e * inv_det,
            b: -self.b * inv_det,
            c: (self.b * self.f - self.e * self.c) * inv_det,
            d: -self.d * inv_det,
            e: self.a * inv_det,
            f: (self.d * self.c - self.a * self.f) * inv_det,
        })
    }
}
