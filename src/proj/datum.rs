//! Geodetic datums: an ellipsoid plus a three-parameter geocentric shift to WGS 84.

use nalgebra::Vector3;

use crate::point::EcefPoint;
use crate::proj::ellipsoid::{
    Ellipsoid, AIRY_1830, BESSEL_1841, CLARKE_1866, GRS80, INTERNATIONAL_1924, WGS72, WGS84,
};

/// A datum is immutable once constructed.
///
/// `shift` is the translation (metres) that takes geocentric coordinates on
/// this datum to WGS 84: `wgs84 = local + shift`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Datum {
    code: &'static str,
    name: &'static str,
    ellipsoid: Ellipsoid,
    shift: [f64; 3],
}

impl Datum {
    pub const fn new(
        code: &'static str,
        name: &'static str,
        ellipsoid: Ellipsoid,
        shift: [f64; 3],
    ) -> Self {
        Self {
            code,
            name,
            ellipsoid,
            shift,
        }
    }

    /// Look up a well-known datum by code (e.g. `"WGE"`, `"NAS-C"`).
    pub fn from_code(code: &str) -> Option<Self> {
        DATUMS
            .iter()
            .find(|d| d.code.eq_ignore_ascii_case(code.trim()))
            .copied()
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn shift(&self) -> [f64; 3] {
        self.shift
    }

    /// Two datums describe the same frame when their codes match.
    pub fn same_as(&self, other: &Datum) -> bool {
        self.code == other.code
    }

    pub fn to_wgs84(&self, local: &EcefPoint) -> EcefPoint {
        EcefPoint::from_vector(local.as_vector() + Vector3::from(self.shift))
    }

    pub fn from_wgs84(&self, wgs84: &EcefPoint) -> EcefPoint {
        EcefPoint::from_vector(wgs84.as_vector() - Vector3::from(self.shift))
    }
}

impl Default for Datum {
    fn default() -> Self {
        WGS84_DATUM
    }
}

pub const WGS84_DATUM: Datum = Datum::new("WGE", "World Geodetic System 1984", WGS84, [0.0; 3]);
pub const WGS72_DATUM: Datum =
    Datum::new("WGD", "World Geodetic System 1972", WGS72, [0.0, 0.0, 4.5]);
pub const NAD83_CONUS: Datum =
    Datum::new("NAR-C", "North American 1983, CONUS", GRS80, [0.0; 3]);
pub const NAD27_CONUS: Datum = Datum::new(
    "NAS-C",
    "North American 1927, CONUS",
    CLARKE_1866,
    [-8.0, 160.0, 176.0],
);
pub const EUROPEAN_1950: Datum = Datum::new(
    "EUR-M",
    "European 1950, mean",
    INTERNATIONAL_1924,
    [-87.0, -98.0, -121.0],
);
pub const OSGB_1936: Datum = Datum::new(
    "OGB-M",
    "Ordnance Survey of Great Britain 1936, mean",
    AIRY_1830,
    [375.0, -111.0, 431.0],
);
pub const TOKYO: Datum = Datum::new("TOY-M", "Tokyo, mean", BESSEL_1841, [-148.0, 507.0, 685.0]);

const DATUMS: &[Datum] = &[
    WGS84_DATUM,
    WGS72_DATUM,
    NAD83_CONUS,
    NAD27_CONUS,
    EUROPEAN_1950,
    OSGB_1936,
    TOKYO,
];

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_code() {
        assert_eq!(Datum::from_code("WGE"), Some(WGS84_DATUM));
        assert_eq!(Datum::from_code(" nas-c "), Some(NAD27_CONUS));
        assert!(Datum::from_code("BOGUS").is_none());
    }

    #[test]
    fn test_default_is_wgs84() {
        let d = Datum::default();
        assert_eq!(d.code(), "WGE");
        assert_eq!(d.ellipsoid(), &WGS84);
    }

    #[test]
    fn test_shift_roundtrip() {
        let p = EcefPoint::new(4_000_000.0, 1_000_000.0, 4_800_000.0);
        let there = NAD27_CONUS.to_wgs84(&p);
        assert_relative_eq!(there.x(), p.x() - 8.0);
        let back = NAD27_CONUS.from_wgs84(&there);
        assert_relative_eq!(back.x(), p.x());
        assert_relative_eq!(back.y(), p.y());
        assert_relative_eq!(back.z(), p.z());
    }
}
