/// Reference ellipsoid of revolution.
///
/// The semi-major axis `a` and semi-minor axis `b` are authoritative; the
/// flattening and eccentricities are re-derived whenever either axis changes.
/// Axes must satisfy `a >= b > 0`; this is not checked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    code: &'static str,
    name: &'static str,
    /// Semi-major axis (metres)
    a: f64,
    /// Semi-minor axis (metres)
    b: f64,
    /// Flattening: (a - b) / a
    f: f64,
    /// First eccentricity squared
    e2: f64,
    /// Second eccentricity squared: e^2 / (1 - e^2)
    ep2: f64,
    /// Third flattening: f / (2 - f)
    n: f64,
}

impl Ellipsoid {
    /// Build from semi-major axis and flattening.
    pub const fn new(code: &'static str, name: &'static str, a: f64, f: f64) -> Self {
        Self::derive(code, name, a, a * (1.0 - f))
    }

    /// Build from both axes.
    pub const fn from_axes(code: &'static str, name: &'static str, a: f64, b: f64) -> Self {
        Self::derive(code, name, a, b)
    }

    const fn derive(code: &'static str, name: &'static str, a: f64, b: f64) -> Self {
        let f = (a - b) / a;
        let e2 = 2.0 * f - f * f;
        // Can't use .sqrt() in const fn; the eccentricity is computed on demand.
        let ep2 = e2 / (1.0 - e2);
        let n = f / (2.0 - f);
        Self {
            code,
            name,
            a,
            b,
            f,
            e2,
            ep2,
            n,
        }
    }

    /// Look up a well-known ellipsoid by its two-letter code.
    pub fn from_code(code: &str) -> Option<Self> {
        ELLIPSOIDS
            .iter()
            .find(|e| e.code.eq_ignore_ascii_case(code))
            .copied()
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn flattening(&self) -> f64 {
        self.f
    }

    pub fn e2(&self) -> f64 {
        self.e2
    }

    pub fn ep2(&self) -> f64 {
        self.ep2
    }

    pub fn n(&self) -> f64 {
        self.n
    }

    /// Get the first eccentricity (computed at runtime).
    pub fn eccentricity(&self) -> f64 {
        self.e2.sqrt()
    }

    /// Replace the semi-major axis and re-derive the flattening.
    pub fn set_a(&mut self, a: f64) {
        *self = Self::derive(self.code, self.name, a, self.b);
    }

    /// Replace the semi-minor axis and re-derive the flattening.
    pub fn set_b(&mut self, b: f64) {
        *self = Self::derive(self.code, self.name, self.a, b);
    }

    /// Prime-vertical radius of curvature at geodetic latitude `phi` (radians).
    pub fn prime_vertical_radius(&self, phi: f64) -> f64 {
        let s = phi.sin();
        self.a / (1.0 - self.e2 * s * s).sqrt()
    }

    /// Meridional radius of curvature at geodetic latitude `phi` (radians).
    pub fn meridional_radius(&self, phi: f64) -> f64 {
        let s = phi.sin();
        self.a * (1.0 - self.e2) / (1.0 - self.e2 * s * s).powf(1.5)
    }
}

pub const WGS84: Ellipsoid = Ellipsoid::new("WE", "WGS 84", 6_378_137.0, 1.0 / 298.257_223_563);
pub const GRS80: Ellipsoid = Ellipsoid::new("RF", "GRS 80", 6_378_137.0, 1.0 / 298.257_222_101);
pub const WGS72: Ellipsoid = Ellipsoid::new("WD", "WGS 72", 6_378_135.0, 1.0 / 298.26);
pub const CLARKE_1866: Ellipsoid =
    Ellipsoid::from_axes("CC", "Clarke 1866", 6_378_206.4, 6_356_583.8);
pub const INTERNATIONAL_1924: Ellipsoid =
    Ellipsoid::new("IN", "International 1924", 6_378_388.0, 1.0 / 297.0);
pub const AIRY_1830: Ellipsoid =
    Ellipsoid::from_axes("AA", "Airy 1830", 6_377_563.396, 6_356_256.909);
pub const BESSEL_1841: Ellipsoid =
    Ellipsoid::new("BR", "Bessel 1841", 6_377_397.155, 1.0 / 299.152_812_8);

const ELLIPSOIDS: &[Ellipsoid] = &[
    WGS84,
    GRS80,
    WGS72,
    CLARKE_1866,
    INTERNATIONAL_1924,
    AIRY_1830,
    BESSEL_1841,
];
