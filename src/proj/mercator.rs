//! Mercator on the ellipsoid, plus the spherical Web Mercator (EPSG:3857).
//!
//! Northing is the isometric latitude ψ = asinh(tan φ) − e·atanh(e·sin φ)
//! scaled by a·k₀; sinh ψ is the conformal tangent, which is how the inverse
//! gets back to φ.

use std::f64::consts::FRAC_PI_2;

use crate::error::ProjError;
use crate::keywords::{keys, KeywordList};
use crate::proj::common::{geodetic_tangent, msfn};
use crate::proj::ellipsoid::{Ellipsoid, WGS84};
use crate::proj::{finite, save_common, Projection};

/// Web Mercator's square extent: atan(sinh π), about 85.0511°.
const WEB_MERCATOR_MAX_LAT: f64 = 1.484_422_229_745_332_4;

/// Ellipsoidal Mercator with a standard parallel.
#[derive(Clone, Debug)]
pub struct Mercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    lat_ts: f64,
    /// a·k₀, with k₀ the parallel radius ratio at `lat_ts`.
    radius: f64,
    false_easting: f64,
    false_northing: f64,
}

impl Mercator {
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat_ts: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            radius: ellipsoid.a() * msfn(lat_ts, ellipsoid.e2()),
            ellipsoid,
            lon0,
            lat_ts,
            false_easting,
            false_northing,
        }
    }

    fn isometric_latitude(&self, lat: f64) -> f64 {
        let e = self.ellipsoid.eccentricity();
        lat.tan().asinh() - e * (e * lat.sin()).atanh()
    }
}

impl Projection for Mercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        if lat.abs() >= FRAC_PI_2 {
            return Err(ProjError::OutOfDomain(format!(
                "mercator forward: latitude {lat} rad at or beyond a pole"
            )));
        }
        finite(
            self.radius * (lon - self.lon0) + self.false_easting,
            self.radius * self.isometric_latitude(lat) + self.false_northing,
            "mercator forward",
        )
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let psi = (y - self.false_northing) / self.radius;
        let tau = geodetic_tangent(psi.sinh(), self.ellipsoid.eccentricity());
        finite(
            self.lon0 + (x - self.false_easting) / self.radius,
            tau.atan(),
            "mercator inverse",
        )
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn name(&self) -> &'static str {
        "mercator"
    }

    fn origin(&self) -> (f64, f64) {
        (self.lon0, 0.0)
    }

    fn false_easting_northing(&self) -> (f64, f64) {
        (self.false_easting, self.false_northing)
    }

    fn save_state(&self, kwl: &mut KeywordList, prefix: &str) {
        save_common(self, kwl, prefix);
        kwl.add(prefix, keys::STD_PARALLEL_1, self.lat_ts.to_degrees());
    }
}

/// Spherical Mercator on the WGS 84 semi-major axis. Latitudes past the
/// square extent are clamped to it.
#[derive(Clone, Debug, Default)]
pub struct WebMercator;

impl WebMercator {
    pub fn new() -> Self {
        Self
    }
}

impl Projection for WebMercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
        let a = WGS84.a();
        finite(a * lon, a * lat.tan().asinh(), "web mercator forward")
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let a = WGS84.a();
        finite(x / a, (y / a).sinh().atan(), "web mercator inverse")
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &WGS84
    }

    fn name(&self) -> &'static str {
        "web_mercator"
    }

    fn origin(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    fn false_easting_northing(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    fn epsg_code(&self) -> Option<u16> {
        Some(3857)
    }

    fn save_state(&self, kwl: &mut KeywordList, prefix: &str) {
        save_common(self, kwl, prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_web_mercator_extent() {
        let proj = WebMercator::new();
        let (x, y) = proj.forward(PI, WEB_MERCATOR_MAX_LAT).unwrap();
        assert_relative_eq!(x, 20_037_508.342_789_244, epsilon = 0.01);
        assert_relative_eq!(y, x, epsilon = 0.01);
        let (_, clamped) = proj.forward(0.0, FRAC_PI_2).unwrap();
        assert_relative_eq!(clamped, y, epsilon = 1e-6);
        assert_eq!(proj.epsg_code(), Some(3857));
    }

    #[test]
    fn test_web_mercator_roundtrip() {
        let proj = WebMercator::new();
        for &(lon_deg, lat_deg) in &[(1.48_f64, 43.6_f64), (-122.4, 37.8), (151.2, -33.9), (0.0, 0.0)] {
            let (lon, lat) = (lon_deg.to_radians(), lat_deg.to_radians());
            let (x, y) = proj.forward(lon, lat).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert_relative_eq!(lon2, lon, epsilon = 1e-12);
            assert_relative_eq!(lat2, lat, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ellipsoidal_northing_below_spherical() {
        // The ellipsoid's isometric latitude is smaller than the sphere's
        let lat = 43.6_f64.to_radians();
        let (_, ellipsoidal) = Mercator::new(WGS84, 0.0, 0.0, 0.0, 0.0).forward(0.0, lat).unwrap();
        let (_, spherical) = WebMercator::new().forward(0.0, lat).unwrap();
        assert!(ellipsoidal < spherical);
        assert!(spherical - ellipsoidal < 40_000.0);
    }

    #[test]
    fn test_ellipsoidal_roundtrip_with_false_origin() {
        let proj = Mercator::new(WGS84, 0.2, 0.0, 1_000_000.0, -500_000.0);
        for &(lon_deg, lat_deg) in &[(1.48_f64, 43.6_f64), (-70.0, -55.0), (30.0, 84.0)] {
            let (lon, lat) = (lon_deg.to_radians(), lat_deg.to_radians());
            let (x, y) = proj.forward(lon, lat).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert_relative_eq!(lon2, lon, epsilon = 1e-10);
            assert_relative_eq!(lat2, lat, epsilon = 1e-10);
        }
        let (x, y) = proj.forward(0.2, 0.0).unwrap();
        assert_relative_eq!(x, 1_000_000.0, epsilon = 1e-6);
        assert_relative_eq!(y, -500_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pole_is_out_of_domain() {
        let proj = Mercator::new(WGS84, 0.0, 0.0, 0.0, 0.0);
        assert!(matches!(proj.forward(0.0, -FRAC_PI_2), Err(ProjError::OutOfDomain(_))));
        assert!(proj.forward(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_standard_parallel_shrinks_scale() {
        let lat_ts = 30.0_f64.to_radians();
        let proj = Mercator::new(WGS84, 0.0, lat_ts, 0.0, 0.0);
        let (x, _) = proj.forward(1.0_f64.to_radians(), 0.0).unwrap();
        let expected = WGS84.a() * msfn(lat_ts, WGS84.e2()) * 1.0_f64.to_radians();
        assert_relative_eq!(x, expected, epsilon = 1e-6);
        assert!(x < WGS84.a() * 1.0_f64.to_radians());
        assert_eq!(proj.name(), "mercator");
    }
}
