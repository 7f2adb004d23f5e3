pub mod common;
pub mod datum;
pub mod ellipsoid;
pub mod equidistant;
pub mod factory;
pub mod mercator;
pub mod transverse_mercator;

use std::fmt::Debug;

use crate::error::ProjError;
use crate::keywords::KeywordList;

/// Trait for analytic map projections supporting forward and inverse transforms.
///
/// Angles are radians. Implementations report coordinates they cannot
/// represent with [`ProjError::OutOfDomain`] rather than returning
/// non-finite values.
pub trait Projection: Send + Sync + Debug {
    /// Forward: (lon_rad, lat_rad) -> (easting, northing)
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError>;

    /// Inverse: (easting, northing) -> (lon_rad, lat_rad)
    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError>;

    fn ellipsoid(&self) -> &ellipsoid::Ellipsoid;

    /// Keyword `type` value this projection persists under.
    fn name(&self) -> &'static str;

    /// Projection origin: (lon_rad, lat_rad)
    fn origin(&self) -> (f64, f64);

    fn false_easting_northing(&self) -> (f64, f64);

    /// Geographic projections are calibrated in degrees rather than metres.
    fn is_geographic(&self) -> bool {
        false
    }

    /// EPSG code of the projected coordinate system, when it has one.
    fn epsg_code(&self) -> Option<u16> {
        None
    }

    /// Write the projection-specific parameters (type, origin, false
    /// easting/northing and friends). Ellipsoid and datum keys are written by
    /// the owning map projection.
    fn save_state(&self, kwl: &mut KeywordList, prefix: &str);
}

/// Map a non-finite result to `OutOfDomain`.
pub(crate) fn finite(x: f64, y: f64, what: &str) -> Result<(f64, f64), ProjError> {
    if x.is_finite() && y.is_finite() {
        Ok((x, y))
    } else {
        Err(ProjError::OutOfDomain(format!("{what}: ({x}, {y})")))
    }
}

/// Common keyword output shared by every projection.
pub(crate) fn save_common(proj: &dyn Projection, kwl: &mut KeywordList, prefix: &str) {
    use crate::keywords::keys;
    use crate::point::PlanarPoint;

    let (lon0, lat0) = proj.origin();
    let (fe, fn_) = proj.false_easting_northing();
    kwl.add(prefix, keys::TYPE, proj.name());
    kwl.add(prefix, keys::CENTRAL_MERIDIAN, lon0.to_degrees());
    kwl.add(prefix, keys::ORIGIN_LATITUDE, lat0.to_degrees());
    kwl.add_point(prefix, keys::FALSE_EASTING_NORTHING, PlanarPoint::new(fe, fn_));
    kwl.add(prefix, keys::FALSE_EASTING_NORTHING_UNITS, "meters");
}
