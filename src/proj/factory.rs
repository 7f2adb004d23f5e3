//! Construct concrete projections from keyword lists or EPSG codes.

use std::sync::Arc;

use crate::error::{GeoError, ProjError};
use crate::keywords::{keys, KeywordList, Unit};
use crate::point::PlanarPoint;
use crate::proj::ellipsoid::Ellipsoid;
use crate::proj::equidistant::EquidistantCylindrical;
use crate::proj::mercator::{Mercator, WebMercator};
use crate::proj::transverse_mercator::{TransverseMercator, UtmZone};
use crate::proj::Projection;

/// Build the projection named by the `type` keyword on `ellipsoid`.
///
/// Angles are read in degrees. Missing origin parameters default to zero,
/// a missing UTM zone is taken from the central meridian.
pub fn from_keywords(
    kwl: &KeywordList,
    prefix: &str,
    ellipsoid: Ellipsoid,
) -> Result<Arc<dyn Projection>, GeoError> {
    let name = kwl
        .find(prefix, keys::TYPE)
        .ok_or_else(|| GeoError::MissingKeyword(format!("{prefix}{}", keys::TYPE)))?
        .to_ascii_lowercase();

    let lon0_deg = kwl.get_f64(prefix, keys::CENTRAL_MERIDIAN)?.unwrap_or(0.0);
    let lat0_deg = kwl.get_f64(prefix, keys::ORIGIN_LATITUDE)?.unwrap_or(0.0);
    let lat_ts = kwl
        .get_f64(prefix, keys::STD_PARALLEL_1)?
        .unwrap_or(lat0_deg)
        .to_radians();
    let (lon0, lat0) = (lon0_deg.to_radians(), lat0_deg.to_radians());
    let (fe, fn_) = false_easting_northing(kwl, prefix)?;

    let proj: Arc<dyn Projection> = match name.as_str() {
        "utm" => {
            let default = UtmZone::containing(lon0_deg, lat0_deg);
            let zone = kwl.get::<u8>(prefix, keys::ZONE)?.unwrap_or(default.zone);
            if !(1..=60).contains(&zone) {
                return Err(GeoError::InvalidValue {
                    key: format!("{prefix}{}", keys::ZONE),
                    value: zone.to_string(),
                });
            }
            let north = match kwl.find(prefix, keys::HEMISPHERE) {
                None => default.north,
                Some(h) => !h.eq_ignore_ascii_case("s"),
            };
            Arc::new(TransverseMercator::utm_zone_on(ellipsoid, zone, north))
        }
        "transverse_mercator" => {
            let k0 = kwl.get_f64(prefix, keys::SCALE_FACTOR)?.unwrap_or(1.0);
            Arc::new(TransverseMercator::new(ellipsoid, lon0, lat0, k0, fe, fn_))
        }
        "mercator" => Arc::new(Mercator::new(ellipsoid, lon0, lat_ts, fe, fn_)),
        "web_mercator" => Arc::new(WebMercator::new()),
        "equidistant_cylindrical" | "geographic" => Arc::new(EquidistantCylindrical::new(
            ellipsoid, lon0, lat0, lat_ts, fe, fn_,
        )),
        _ => return Err(ProjError::UnknownProjection(name).into()),
    };
    Ok(proj)
}

fn false_easting_northing(kwl: &KeywordList, prefix: &str) -> Result<(f64, f64), GeoError> {
    let fen = kwl
        .get_point(prefix, keys::FALSE_EASTING_NORTHING)?
        .unwrap_or(PlanarPoint::new(0.0, 0.0));
    let units = kwl
        .get_unit(prefix, keys::FALSE_EASTING_NORTHING_UNITS)?
        .unwrap_or(Unit::Meters);
    match (units.to_meters(fen.x), units.to_meters(fen.y)) {
        (Some(e), Some(n)) => Ok((e, n)),
        _ => Err(GeoError::UnknownUnit(units.to_string())),
    }
}

/// Projection for a supported EPSG code: 4326, 3857 and the WGS 84 UTM zones.
pub fn from_epsg(code: u16) -> Result<Arc<dyn Projection>, ProjError> {
    match code {
        4326 => Ok(Arc::new(EquidistantCylindrical::epsg_4326())),

        3857 => Ok(Arc::new(WebMercator::new())),

        // UTM North: EPSG:326XX (zone 1–60)
        32601..=32660 => Ok(Arc::new(TransverseMercator::utm_zone(
            (code - 32600) as u8,
            true,
        ))),

        // UTM South: EPSG:327XX (zone 1–60)
        32701..=32760 => Ok(Arc::new(TransverseMercator::utm_zone(
            (code - 32700) as u8,
            false,
        ))),

        _ => Err(ProjError::UnknownProjection(format!("EPSG:{code}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proj::ellipsoid::{CLARKE_1866, WGS84};
    use approx::assert_relative_eq;

    #[test]
    fn test_utm_from_keywords() {
        let kwl: KeywordList = "type: UTM\nzone: 31\nhemisphere: N\n".parse().unwrap();
        let proj = from_keywords(&kwl, "", WGS84).unwrap();
        assert_eq!(proj.name(), "utm");
        assert_eq!(proj.epsg_code(), Some(32631));
        assert_relative_eq!(proj.origin().0, 3.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_utm_zone_from_central_meridian() {
        let kwl: KeywordList = "type: utm\ncentral_meridian: -75\norigin_latitude: -10\n"
            .parse()
            .unwrap();
        let proj = from_keywords(&kwl, "", WGS84).unwrap();
        assert_eq!(proj.epsg_code(), Some(32718));
    }

    #[test]
    fn test_bad_zone() {
        let kwl: KeywordList = "type: utm\nzone: 61\n".parse().unwrap();
        assert!(matches!(
            from_keywords(&kwl, "", WGS84),
            Err(GeoError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_false_easting_in_feet() {
        let kwl: KeywordList = "type: transverse_mercator\ncentral_meridian: -99\n\
            scale_factor: 0.9999\nfalse_easting_northing: 1000 0\n\
            false_easting_northing_units: feet\n"
            .parse()
            .unwrap();
        let proj = from_keywords(&kwl, "", CLARKE_1866).unwrap();
        assert_relative_eq!(proj.false_easting_northing().0, 304.8, epsilon = 1e-9);
        assert_eq!(proj.ellipsoid(), &CLARKE_1866);
    }

    #[test]
    fn test_angular_false_easting_units_rejected() {
        let kwl: KeywordList = "type: mercator\nfalse_easting_northing: 1 1\n\
            false_easting_northing_units: degrees\n"
            .parse()
            .unwrap();
        assert!(matches!(
            from_keywords(&kwl, "", WGS84),
            Err(GeoError::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_unknown_and_missing_type() {
        let kwl: KeywordList = "type: polyconic\n".parse().unwrap();
        assert!(matches!(
            from_keywords(&kwl, "", WGS84),
            Err(GeoError::Projection(ProjError::UnknownProjection(_)))
        ));
        assert!(matches!(
            from_keywords(&KeywordList::new(), "", WGS84),
            Err(GeoError::MissingKeyword(_))
        ));
    }

    #[test]
    fn test_save_then_rebuild() {
        let kwl: KeywordList = "type: mercator\ncentral_meridian: 20\nstd_parallel_1: 40\n"
            .parse()
            .unwrap();
        let proj = from_keywords(&kwl, "", WGS84).unwrap();
        let mut saved = KeywordList::new();
        proj.save_state(&mut saved, "p.");
        let again = from_keywords(&saved, "p.", WGS84).unwrap();
        let a = proj.forward(0.4, 0.7).unwrap();
        let b = again.forward(0.4, 0.7).unwrap();
        assert_relative_eq!(a.0, b.0, epsilon = 1e-6);
        assert_relative_eq!(a.1, b.1, epsilon = 1e-6);
    }

    #[test]
    fn test_from_epsg() {
        assert!(from_epsg(4326).unwrap().is_geographic());
        assert_eq!(from_epsg(3857).unwrap().name(), "web_mercator");
        assert_eq!(from_epsg(32733).unwrap().epsg_code(), Some(32733));
        assert!(from_epsg(2154).is_err());
    }
}
