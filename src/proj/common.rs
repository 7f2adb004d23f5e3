//! Shared ellipsoid series and latitude helpers for the projections.

use super::ellipsoid::Ellipsoid;

/// Rectifying radius A: a meridian quadrant is A·π/2.
pub fn rectifying_radius(ellipsoid: &Ellipsoid) -> f64 {
    let n2 = ellipsoid.n().powi(2);
    ellipsoid.a() / (1.0 + ellipsoid.n()) * (1.0 + n2 * (0.25 + n2 / 64.0))
}

/// Rectifying latitude μ for geodetic latitude `phi`, 4th order in n.
pub fn rectifying_latitude(ellipsoid: &Ellipsoid, phi: f64) -> f64 {
    let n = ellipsoid.n();
    let (n2, n3, n4) = (n * n, n * n * n, n * n * n * n);
    let terms = [
        -1.5 * n + 9.0 / 16.0 * n3,
        15.0 / 16.0 * n2 - 15.0 / 32.0 * n4,
        -35.0 / 48.0 * n3,
        315.0 / 512.0 * n4,
    ];
    terms
        .iter()
        .zip(1..)
        .fold(phi, |mu, (&c, k)| mu + c * (2.0 * k as f64 * phi).sin())
}

/// Distance along the meridian from the equator to latitude `phi`.
pub fn meridional_arc(ellipsoid: &Ellipsoid, phi: f64) -> f64 {
    rectifying_radius(ellipsoid) * rectifying_latitude(ellipsoid, phi)
}

/// m = cos(φ) / sqrt(1 - e²·sin²(φ)): parallel radius over `a`.
pub fn msfn(phi: f64, e2: f64) -> f64 {
    let (s, c) = phi.sin_cos();
    c / (1.0 - e2 * s * s).sqrt()
}

/// Conformal tangent τ' = tan χ for the geodetic tangent τ = tan φ.
pub fn conformal_tangent(tau: f64, e: f64) -> f64 {
    let sec = tau.hypot(1.0);
    let sig = (e * (e * tau / sec).atanh()).sinh();
    tau * sig.hypot(1.0) - sig * sec
}

/// Geodetic tangent from the conformal one (inverse of [`conformal_tangent`]),
/// by Newton iteration.
pub fn geodetic_tangent(tau_prime: f64, e: f64) -> f64 {
    let e2m = 1.0 - e * e;
    let mut tau = tau_prime / e2m;
    for _ in 0..15 {
        let estimate = conformal_tangent(tau, e);
        let step = (tau_prime - estimate) * (1.0 + e2m * tau * tau)
            / (e2m * tau.hypot(1.0) * estimate.hypot(1.0));
        tau += step;
        if step.abs() < 1e-12 * tau.abs().max(1.0) {
            break;
        }
    }
    tau
}
