//! Equidistant cylindrical (Plate Carrée) projection.
//!
//! forward: x = a·(λ - λ₀)·cos(φ₁), y = a·(φ - φ₀)
//! inverse: λ = λ₀ + x/(a·cos(φ₁)), φ = φ₀ + y/a
//!
//! Map projections built on this are calibrated in decimal degrees, so it
//! reports itself as geographic.

use crate::error::ProjError;
use crate::keywords::{keys, KeywordList};
use crate::proj::ellipsoid::{Ellipsoid, WGS84};
use crate::proj::{finite, save_common, Projection};

#[derive(Clone, Debug)]
pub struct EquidistantCylindrical {
    ellipsoid: Ellipsoid,
    lon0: f64,
    lat0: f64,
    lat_ts: f64,
    cos_lat_ts: f64,
    false_easting: f64,
    false_northing: f64,
}

impl EquidistantCylindrical {
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat0: f64,
        lat_ts: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            ellipsoid,
            lon0,
            lat0,
            lat_ts,
            cos_lat_ts: lat_ts.cos(),
            false_easting,
            false_northing,
        }
    }

    /// Plain lat/lon on WGS 84 (EPSG:4326).
    pub fn epsg_4326() -> Self {
        Self::new(WGS84, 0.0, 0.0, 0.0, 0.0, 0.0)
    }
}

impl Projection for EquidistantCylindrical {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let a = self.ellipsoid.a();
        let x = a * (lon - self.lon0) * self.cos_lat_ts + self.false_easting;
        let y = a * (lat - self.lat0) + self.false_northing;
        finite(x, y, "equidistant cylindrical forward")
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let a = self.ellipsoid.a();
        let lon = self.lon0 + (x - self.false_easting) / (a * self.cos_lat_ts);
        let lat = self.lat0 + (y - self.false_northing) / a;
        finite(lon, lat, "equidistant cylindrical inverse")
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn name(&self) -> &'static str {
        "equidistant_cylindrical"
    }

    fn origin(&self) -> (f64, f64) {
        (self.lon0, self.lat0)
    }

    fn false_easting_northing(&self) -> (f64, f64) {
        (self.false_easting, self.false_northing)
    }

    fn is_geographic(&self) -> bool {
        true
    }

    fn epsg_code(&self) -> Option<u16> {
        let plain = self.lon0 == 0.0
            && self.lat0 == 0.0
            && self.false_easting == 0.0
            && self.false_northing == 0.0;
        (plain && self.ellipsoid == WGS84).then_some(4326)
    }

    fn save_state(&self, kwl: &mut KeywordList, prefix: &str) {
        save_common(self, kwl, prefix);
        kwl.add(prefix, keys::STD_PARALLEL_1, self.lat_ts.to_degrees());
    }
}
