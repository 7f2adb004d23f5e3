//! Geodetic value types: planar/image points, geographic points and ECEF points.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use nalgebra::Vector3;

use crate::proj::datum::{Datum, WGS84_DATUM};

/// A 2-D Cartesian point.
///
/// Depending on context this is easting/northing (metres), longitude/latitude
/// deltas (degrees), or an image coordinate (`x` = sample, `y` = line).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

/// Image-space point: `x` is the sample (column), `y` is the line (row).
pub type ImagePoint = PlanarPoint;

impl PlanarPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The "not yet computed" value. Only used for internal calibration
    /// fields; public transforms express undefined results with `None`.
    pub const fn undefined() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    pub const fn from_line_sample(line: f64, samp: f64) -> Self {
        Self::new(samp, line)
    }

    pub fn line(&self) -> f64 {
        self.y
    }

    pub fn samp(&self) -> f64 {
        self.x
    }

    pub fn has_nans(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl fmt::Display for PlanarPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add for PlanarPoint {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for PlanarPoint {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for PlanarPoint {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for PlanarPoint {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for PlanarPoint {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl AddAssign for PlanarPoint {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for PlanarPoint {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// Latitude/longitude in decimal degrees with an optional ellipsoid height.
///
/// Latitude is clamped to [-90, 90] and longitude wrapped into [-180, 180]
/// whenever they are assigned. `height == None` means the height is unknown,
/// which is not the same thing as zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeographicPoint {
    lat: f64,
    lon: f64,
    pub height: Option<f64>,
    datum: Datum,
}

impl GeographicPoint {
    /// A point on WGS 84.
    pub fn new(lat: f64, lon: f64, height: Option<f64>) -> Self {
        Self::with_datum(lat, lon, height, WGS84_DATUM)
    }

    pub fn with_datum(lat: f64, lon: f64, height: Option<f64>, datum: Datum) -> Self {
        Self {
            lat: clamp_lat(lat),
            lon: wrap_lon(lon),
            height,
            datum,
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn set_lat(&mut self, lat: f64) {
        self.lat = clamp_lat(lat);
    }

    pub fn set_lon(&mut self, lon: f64) {
        self.lon = wrap_lon(lon);
    }

    pub fn datum(&self) -> &Datum {
        &self.datum
    }

    /// Height, or 0 when unknown.
    pub fn height_or_zero(&self) -> f64 {
        self.height.unwrap_or(0.0)
    }

    /// True if latitude or longitude is NaN. An unknown height does not count.
    pub fn has_nans(&self) -> bool {
        self.lat.is_nan() || self.lon.is_nan()
    }

    /// Re-express the point against `target`. No-op if already on it.
    ///
    /// An unknown height stays unknown after the shift.
    pub fn change_datum(&mut self, target: &Datum) {
        if self.datum.same_as(target) || self.has_nans() {
            return;
        }
        let wgs84 = self.datum.to_wgs84(&self.to_ecef());
        let shifted = target.from_wgs84(&wgs84).to_geographic(target);
        self.lat = shifted.lat;
        self.lon = shifted.lon;
        if self.height.is_some() {
            self.height = shifted.height;
        }
        self.datum = *target;
    }

    /// Copy of this point re-expressed against `target`.
    pub fn on_datum(&self, target: &Datum) -> Self {
        let mut p = *self;
        p.change_datum(target);
        p
    }

    /// Geocentric coordinates on this point's own datum. An unknown height is
    /// treated as zero.
    pub fn to_ecef(&self) -> EcefPoint {
        let ell = self.datum.ellipsoid();
        let phi = self.lat.to_radians();
        let lam = self.lon.to_radians();
        let h = self.height_or_zero();
        let n = ell.prime_vertical_radius(phi);
        let (sin_phi, cos_phi) = phi.sin_cos();
        EcefPoint::new(
            (n + h) * cos_phi * lam.cos(),
            (n + h) * cos_phi * lam.sin(),
            (n * (1.0 - ell.e2()) + h) * sin_phi,
        )
    }

    /// Straight-line (chord) distance in metres.
    pub fn distance_to(&self, other: &GeographicPoint) -> f64 {
        let a = self.datum.to_wgs84(&self.to_ecef());
        let b = other.datum.to_wgs84(&other.to_ecef());
        a.distance_to(&b)
    }

    /// Metres spanned by one degree at this latitude: `x` along the parallel,
    /// `y` along the meridian.
    pub fn meters_per_degree(&self) -> PlanarPoint {
        let ell = self.datum.ellipsoid();
        let phi = self.lat.to_radians();
        let rad = std::f64::consts::PI / 180.0;
        PlanarPoint::new(
            ell.prime_vertical_radius(phi) * phi.cos() * rad,
            ell.meridional_radius(phi) * rad,
        )
    }
}

impl Default for GeographicPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0, None)
    }
}

impl fmt::Display for GeographicPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.height {
            Some(h) => write!(f, "({}, {}, {}, {})", self.lat, self.lon, h, self.datum.code()),
            None => write!(f, "({}, {}, nan, {})", self.lat, self.lon, self.datum.code()),
        }
    }
}

fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-90.0, 90.0)
}

fn wrap_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) || lon.is_nan() {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Earth-centred, earth-fixed Cartesian point (metres).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EcefPoint(Vector3<f64>);

impl EcefPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    pub fn from_vector(v: Vector3<f64>) -> Self {
        Self(v)
    }

    pub fn as_vector(&self) -> &Vector3<f64> {
        &self.0
    }

    pub fn x(&self) -> f64 {
        self.0.x
    }

    pub fn y(&self) -> f64 {
        self.0.y
    }

    pub fn z(&self) -> f64 {
        self.0.z
    }

    pub fn has_nans(&self) -> bool {
        self.0.iter().any(|c| c.is_nan())
    }

    pub fn distance_to(&self, other: &EcefPoint) -> f64 {
        (self.0 - other.0).norm()
    }

    /// Geodetic coordinates on `datum` (Bowring's method, one pass).
    pub fn to_geographic(&self, datum: &Datum) -> GeographicPoint {
        let ell = datum.ellipsoid();
        let (a, b, e2, ep2) = (ell.a(), ell.b(), ell.e2(), ell.ep2());
        let (x, y, z) = (self.0.x, self.0.y, self.0.z);

        let p = x.hypot(y);
        let theta = (z * a).atan2(p * b);
        let (sin_t, cos_t) = theta.sin_cos();
        let phi = (z + ep2 * b * sin_t.powi(3)).atan2(p - e2 * a * cos_t.powi(3));
        let lam = y.atan2(x);

        let (sin_phi, cos_phi) = phi.sin_cos();
        let h = p * cos_phi + z * sin_phi - a * (1.0 - e2 * sin_phi * sin_phi).sqrt();

        GeographicPoint::with_datum(phi.to_degrees(), lam.to_degrees(), Some(h), *datum)
    }
}

impl From<Vector3<f64>> for EcefPoint {
    fn from(v: Vector3<f64>) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proj::datum::{NAD27_CONUS, OSGB_1936};
    use approx::assert_relative_eq;

    #[test]
    fn test_lat_clamped_lon_wrapped() {
        let p = GeographicPoint::new(95.0, 190.0, None);
        assert_eq!(p.lat(), 90.0);
        assert_relative_eq!(p.lon(), -170.0);

        let mut q = GeographicPoint::default();
        q.set_lat(-100.0);
        q.set_lon(-540.0);
        assert_eq!(q.lat(), -90.0);
        assert_relative_eq!(q.lon(), -180.0);

        let edge = GeographicPoint::new(0.0, 180.0, None);
        assert_eq!(edge.lon(), 180.0);
    }

    #[test]
    fn test_nan_is_preserved() {
        let p = GeographicPoint::new(f64::NAN, 10.0, None);
        assert!(p.has_nans());
        assert!(PlanarPoint::undefined().has_nans());
        assert!(!PlanarPoint::new(1.0, 2.0).has_nans());
    }

    #[test]
    fn test_unknown_height_is_not_nan() {
        let p = GeographicPoint::new(10.0, 20.0, None);
        assert!(!p.has_nans());
        assert_eq!(p.height_or_zero(), 0.0);
    }

    #[test]
    fn test_ecef_roundtrip() {
        let p = GeographicPoint::new(43.6, 1.48, Some(152.0));
        let back = p.to_ecef().to_geographic(p.datum());
        assert_relative_eq!(back.lat(), 43.6, epsilon = 1e-9);
        assert_relative_eq!(back.lon(), 1.48, epsilon = 1e-9);
        assert_relative_eq!(back.height.unwrap(), 152.0, epsilon = 1e-4);
    }

    #[test]
    fn test_ecef_equator() {
        let p = GeographicPoint::new(0.0, 0.0, Some(0.0));
        let e = p.to_ecef();
        assert_relative_eq!(e.x(), 6_378_137.0, epsilon = 1e-6);
        assert_relative_eq!(e.y(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(e.z(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_change_datum_roundtrip() {
        let orig = GeographicPoint::new(40.0, -100.0, Some(500.0));
        let mut p = orig;
        p.change_datum(&NAD27_CONUS);
        assert_eq!(p.datum().code(), "NAS-C");
        // NAD27 differs from WGS84 by tens of metres in CONUS
        assert!((p.lat() - orig.lat()).abs() > 1e-6 || (p.lon() - orig.lon()).abs() > 1e-6);
        p.change_datum(&WGS84_DATUM);
        assert_relative_eq!(p.lat(), orig.lat(), epsilon = 1e-8);
        assert_relative_eq!(p.lon(), orig.lon(), epsilon = 1e-8);
        assert_relative_eq!(p.height.unwrap(), 500.0, epsilon = 1e-3);
    }

    #[test]
    fn test_change_datum_keeps_unknown_height() {
        let mut p = GeographicPoint::new(52.0, -1.0, None);
        p.change_datum(&OSGB_1936);
        assert!(p.height.is_none());
    }

    #[test]
    fn test_change_datum_same_is_noop() {
        let mut p = GeographicPoint::new(12.3456789, 45.6789, None);
        let before = p;
        p.change_datum(&WGS84_DATUM);
        assert_eq!(p, before);
    }

    #[test]
    fn test_meters_per_degree_equator() {
        let mpd = GeographicPoint::new(0.0, 0.0, None).meters_per_degree();
        assert_relative_eq!(mpd.x, 111_319.49, epsilon = 0.01);
        assert_relative_eq!(mpd.y, 110_574.27, epsilon = 0.01);
    }

    #[test]
    fn test_planar_ops() {
        let a = PlanarPoint::new(1.0, 2.0);
        let b = PlanarPoint::from_line_sample(4.0, 3.0);
        assert_eq!(b.samp(), 3.0);
        assert_eq!(b.line(), 4.0);
        assert_eq!(a + b, PlanarPoint::new(4.0, 6.0));
        assert_eq!(b - a, PlanarPoint::new(2.0, 2.0));
        assert_eq!(a * 2.0, PlanarPoint::new(2.0, 4.0));
        assert_eq!(-a, PlanarPoint::new(-1.0, -2.0));
        assert_relative_eq!((b - a).length(), 8.0_f64.sqrt());
    }
}
