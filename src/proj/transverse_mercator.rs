//! Transverse Mercator (Krüger series to n⁶, Karney 2011) and its UTM
//! specialisation.
//!
//! Geodetic latitude is mapped to the conformal sphere, projected with the
//! spherical transverse Mercator, then corrected onto the ellipsoid with the
//! α series. The inverse runs the β series and undoes the conformal step.

use crate::error::ProjError;
use crate::keywords::{keys, KeywordList};
use crate::proj::common::{
    conformal_tangent, geodetic_tangent, rectifying_latitude, rectifying_radius,
};
use crate::proj::ellipsoid::{Ellipsoid, WGS84};
use crate::proj::{finite, save_common, Projection};

const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_SOUTH_FALSE_NORTHING: f64 = 10_000_000.0;

/// α_j as polynomials in n: row j holds the coefficients of n¹..n⁶.
const ALPHA: [[f64; 6]; 6] = [
    [1.0 / 2.0, -2.0 / 3.0, 5.0 / 16.0, 41.0 / 180.0, -127.0 / 288.0, 7891.0 / 37800.0],
    [0.0, 13.0 / 48.0, -3.0 / 5.0, 557.0 / 1440.0, 281.0 / 630.0, -1983433.0 / 1935360.0],
    [0.0, 0.0, 61.0 / 240.0, -103.0 / 140.0, 15061.0 / 26880.0, 167603.0 / 181440.0],
    [0.0, 0.0, 0.0, 49561.0 / 161280.0, -179.0 / 168.0, 6601661.0 / 7257600.0],
    [0.0, 0.0, 0.0, 0.0, 34729.0 / 80640.0, -3418889.0 / 1995840.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 212378941.0 / 319334400.0],
];

/// β_j, same layout as [`ALPHA`].
const BETA: [[f64; 6]; 6] = [
    [1.0 / 2.0, -2.0 / 3.0, 37.0 / 96.0, -1.0 / 360.0, -81.0 / 512.0, 96199.0 / 604800.0],
    [0.0, 1.0 / 48.0, 1.0 / 15.0, -437.0 / 1440.0, 46.0 / 105.0, -1118711.0 / 3870720.0],
    [0.0, 0.0, 17.0 / 480.0, -37.0 / 840.0, -209.0 / 4480.0, 5569.0 / 90720.0],
    [0.0, 0.0, 0.0, 4397.0 / 161280.0, -11.0 / 504.0, -830251.0 / 7257600.0],
    [0.0, 0.0, 0.0, 0.0, 4583.0 / 161280.0, -108847.0 / 3991680.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 20648693.0 / 638668800.0],
];

/// UTM zone number (1..=60) and hemisphere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UtmZone {
    pub zone: u8,
    pub north: bool,
}

impl UtmZone {
    /// Central meridian of the zone (radians).
    pub fn central_meridian(&self) -> f64 {
        (6.0 * self.zone as f64 - 183.0).to_radians()
    }

    /// The zone containing `lon_deg`; the hemisphere follows `lat_deg`.
    pub fn containing(lon_deg: f64, lat_deg: f64) -> Self {
        let zone = (((lon_deg + 180.0) / 6.0).floor() as i32).rem_euclid(60) + 1;
        Self {
            zone: zone as u8,
            north: lat_deg >= 0.0,
        }
    }

    fn false_northing(&self) -> f64 {
        if self.north {
            0.0
        } else {
            UTM_SOUTH_FALSE_NORTHING
        }
    }
}

/// Evaluate c₀n + c₁n² + … + c₅n⁶.
fn series(n: f64, coeffs: &[f64; 6]) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * n + c) * n
}

/// Apply ζ ± Σ c_j sin(2jζ) to ζ = ξ + iη, split into real and imaginary parts.
fn krueger(xi: f64, eta: f64, coeffs: &[f64; 6], sign: f64) -> (f64, f64) {
    coeffs
        .iter()
        .zip(1..)
        .fold((xi, eta), |(x, y), (&c, j)| {
            let k = 2.0 * j as f64;
            (
                x + sign * c * (k * xi).sin() * (k * eta).cosh(),
                y + sign * c * (k * xi).cos() * (k * eta).sinh(),
            )
        })
}

#[derive(Clone, Debug)]
pub struct TransverseMercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    lat0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    /// k₀·A, metres per unit of ξ/η.
    scale: f64,
    /// Rectifying latitude of the origin.
    xi0: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
    utm: Option<UtmZone>,
}

impl TransverseMercator {
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let n = ellipsoid.n();
        Self {
            ellipsoid,
            lon0,
            lat0,
            k0,
            false_easting,
            false_northing,
            scale: k0 * rectifying_radius(&ellipsoid),
            xi0: rectifying_latitude(&ellipsoid, lat0),
            alpha: ALPHA.map(|row| series(n, &row)),
            beta: BETA.map(|row| series(n, &row)),
            utm: None,
        }
    }

    /// WGS 84 UTM zone.
    pub fn utm_zone(zone: u8, north: bool) -> Self {
        Self::utm_zone_on(WGS84, zone, north)
    }

    /// UTM zone on an arbitrary ellipsoid.
    pub fn utm_zone_on(ellipsoid: Ellipsoid, zone: u8, north: bool) -> Self {
        let utm = UtmZone { zone, north };
        Self {
            utm: Some(utm),
            ..Self::new(
                ellipsoid,
                utm.central_meridian(),
                0.0,
                UTM_SCALE,
                UTM_FALSE_EASTING,
                utm.false_northing(),
            )
        }
    }

    pub fn utm(&self) -> Option<UtmZone> {
        self.utm
    }

    pub fn scale_factor(&self) -> f64 {
        self.k0
    }
}

impl Projection for TransverseMercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let e = self.ellipsoid.eccentricity();
        let tau_prime = conformal_tangent(lat.tan(), e);
        let (sin_dlam, cos_dlam) = (lon - self.lon0).sin_cos();

        // Spherical TM on the conformal sphere
        let xi_prime = tau_prime.atan2(cos_dlam);
        let eta_prime = (sin_dlam / tau_prime.hypot(cos_dlam)).asinh();

        let (xi, eta) = krueger(xi_prime, eta_prime, &self.alpha, 1.0);
        finite(
            self.scale * eta + self.false_easting,
            self.scale * (xi - self.xi0) + self.false_northing,
            "transverse mercator forward",
        )
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let xi = (y - self.false_northing) / self.scale + self.xi0;
        let eta = (x - self.false_easting) / self.scale;
        let (xi_prime, eta_prime) = krueger(xi, eta, &self.beta, -1.0);

        let sinh_eta = eta_prime.sinh();
        let (sin_xi, cos_xi) = xi_prime.sin_cos();
        let tau_prime = sin_xi / sinh_eta.hypot(cos_xi);
        let tau = geodetic_tangent(tau_prime, self.ellipsoid.eccentricity());

        finite(
            self.lon0 + sinh_eta.atan2(cos_xi),
            tau.atan(),
            "transverse mercator inverse",
        )
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn name(&self) -> &'static str {
        match self.utm {
            Some(_) => "utm",
            None => "transverse_mercator",
        }
    }

    fn origin(&self) -> (f64, f64) {
        (self.lon0, self.lat0)
    }

    fn false_easting_northing(&self) -> (f64, f64) {
        (self.false_easting, self.false_northing)
    }

    fn epsg_code(&self) -> Option<u16> {
        let utm = self.utm.filter(|_| self.ellipsoid == WGS84)?;
        let base = if utm.north { 32600 } else { 32700 };
        Some(base + utm.zone as u16)
    }

    fn save_state(&self, kwl: &mut KeywordList, prefix: &str) {
        save_common(self, kwl, prefix);
        kwl.add(prefix, keys::SCALE_FACTOR, self.k0);
        if let Some(utm) = self.utm {
            kwl.add(prefix, keys::ZONE, utm.zone);
            kwl.add(prefix, keys::HEMISPHERE, if utm.north { "N" } else { "S" });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proj::common::meridional_arc;
    use crate::proj::ellipsoid::AIRY_1830;
    use approx::assert_relative_eq;

    fn deg(lon: f64, lat: f64) -> (f64, f64) {
        (lon.to_radians(), lat.to_radians())
    }

    #[test]
    fn test_roundtrip_across_zone_31() {
        let tm = TransverseMercator::utm_zone(31, true);
        for &(lon_deg, lat_deg) in &[
            (1.48, 43.6),
            (0.0, 43.6),
            (6.0, 43.6),
            (3.0, 0.0),
            (2.2, 71.0),
            (4.9, 52.37),
        ] {
            let (lon, lat) = deg(lon_deg, lat_deg);
            let (x, y) = tm.forward(lon, lat).unwrap();
            let (lon2, lat2) = tm.inverse(x, y).unwrap();
            assert_relative_eq!(lon2, lon, epsilon = 1e-9);
            assert_relative_eq!(lat2, lat, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_equator_on_central_meridian() {
        let (lon, lat) = deg(3.0, 0.0);
        let (e, n) = TransverseMercator::utm_zone(31, true).forward(lon, lat).unwrap();
        assert_relative_eq!(e, 500_000.0, epsilon = 1e-6);
        assert_relative_eq!(n, 0.0, epsilon = 1e-6);

        let (e, n) = TransverseMercator::utm_zone(31, false).forward(lon, lat).unwrap();
        assert_relative_eq!(e, 500_000.0, epsilon = 1e-6);
        assert_relative_eq!(n, 10_000_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_central_meridian_northing_is_scaled_arc() {
        let tm = TransverseMercator::utm_zone(31, true);
        let (lon, lat) = deg(3.0, 43.6);
        let (_, n) = tm.forward(lon, lat).unwrap();
        assert_relative_eq!(n, 0.9996 * meridional_arc(&WGS84, lat), epsilon = 1e-3);
    }

    #[test]
    fn test_eastings_mirror_about_central_meridian() {
        let tm = TransverseMercator::utm_zone(31, true);
        let (west, lat) = deg(1.0, 48.0);
        let (east, _) = deg(5.0, 48.0);
        let (xw, yw) = tm.forward(west, lat).unwrap();
        let (xe, ye) = tm.forward(east, lat).unwrap();
        assert_relative_eq!(xe - 500_000.0, 500_000.0 - xw, epsilon = 1e-6);
        assert_relative_eq!(ye, yw, epsilon = 1e-6);
    }

    #[test]
    fn test_origin_latitude_maps_to_false_origin() {
        // Ordnance Survey national grid parameters on Airy 1830
        let tm = TransverseMercator::new(
            AIRY_1830,
            (-2.0_f64).to_radians(),
            49.0_f64.to_radians(),
            0.999_601_271_7,
            400_000.0,
            -100_000.0,
        );
        let (x, y) = tm.forward((-2.0_f64).to_radians(), 49.0_f64.to_radians()).unwrap();
        assert_relative_eq!(x, 400_000.0, epsilon = 1e-6);
        assert_relative_eq!(y, -100_000.0, epsilon = 1e-6);

        let (lon, lat) = tm.inverse(651_409.903, 313_177.270).unwrap();
        assert!(lon > (-2.0_f64).to_radians() && lat > 49.0_f64.to_radians());
        let (x, y) = tm.forward(lon, lat).unwrap();
        assert_relative_eq!(x, 651_409.903, epsilon = 1e-4);
        assert_relative_eq!(y, 313_177.270, epsilon = 1e-4);
    }

    #[test]
    fn test_matches_proj4rs_zone31() {
        use proj4rs::Proj;
        let src = Proj::from_proj_string("+proj=longlat +ellps=WGS84").unwrap();
        let dst = Proj::from_proj_string("+proj=utm +zone=31 +ellps=WGS84").unwrap();
        let tm = TransverseMercator::utm_zone(31, true);
        for &(lon_deg, lat_deg) in &[(1.48_f64, 43.6_f64), (3.0, 50.0), (5.5, 10.0)] {
            let (lon, lat) = deg(lon_deg, lat_deg);
            let mut point = (lon, lat);
            proj4rs::transform::transform(&src, &dst, &mut point).unwrap();
            let (e, n) = tm.forward(lon, lat).unwrap();
            assert_relative_eq!(e, point.0, epsilon = 1e-2);
            assert_relative_eq!(n, point.1, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_epsg_and_name() {
        assert_eq!(TransverseMercator::utm_zone(31, true).epsg_code(), Some(32631));
        assert_eq!(TransverseMercator::utm_zone(60, false).epsg_code(), Some(32760));
        let clarke = TransverseMercator::utm_zone_on(crate::proj::ellipsoid::CLARKE_1866, 14, true);
        assert_eq!(clarke.epsg_code(), None);
        assert_eq!(clarke.name(), "utm");
        assert_eq!(clarke.scale_factor(), 0.9996);
        let plain = TransverseMercator::new(WGS84, 0.0, 0.0, 1.0, 0.0, 0.0);
        assert_eq!(plain.name(), "transverse_mercator");
        assert_eq!(plain.epsg_code(), None);
    }

    #[test]
    fn test_zone_containing() {
        assert_eq!(UtmZone::containing(1.48, 43.6), UtmZone { zone: 31, north: true });
        assert_eq!(UtmZone::containing(-180.0, -1.0), UtmZone { zone: 1, north: false });
        assert_eq!(UtmZone::containing(179.9, 0.0).zone, 60);
        let z = UtmZone { zone: 31, north: true };
        assert_relative_eq!(z.central_meridian(), 3.0_f64.to_radians(), epsilon = 1e-15);
    }

    #[test]
    fn test_nan_is_out_of_domain() {
        let tm = TransverseMercator::utm_zone(31, true);
        assert!(matches!(tm.forward(f64::NAN, 0.5), Err(ProjError::OutOfDomain(_))));
        assert!(tm.inverse(500_000.0, f64::NAN).is_err());
    }
}
