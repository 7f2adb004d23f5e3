//! Elevation lookup: the terrain surface imaging rays are intersected with.
//!
//! Sources are owned by the caller and shared with sensor models through an
//! `Arc<dyn ElevationSource>`. Nothing here caches lookups.

use std::fmt::Debug;

use ndarray::Array2;

use crate::point::{GeographicPoint, PlanarPoint};
use crate::proj::datum::WGS84_DATUM;
use crate::proj::ellipsoid::WGS84;
use crate::ray::EcefRay;

const RAY_TOLERANCE_M: f64 = 1e-3;
const RAY_MAX_ITERATIONS: usize = 10;

pub trait ElevationSource: Send + Sync + Debug {
    /// Height above the WGS 84 ellipsoid (metres), `None` where no data.
    fn height_above_ellipsoid(&self, gpt: &GeographicPoint) -> Option<f64>;

    /// Intersect `ray` with the terrain.
    ///
    /// Alternates between intersecting the ray with the ellipsoid raised to
    /// the current height estimate and looking up the terrain height under
    /// that intersection, until the height changes by less than a millimetre.
    /// Missing terrain counts as height zero. Returns `None` if the ray
    /// misses the earth.
    fn intersect_ray(&self, ray: &EcefRay) -> Option<GeographicPoint> {
        let ellipsoid = &WGS84;
        let mut h = 0.0;
        let mut gpt = ray
            .intersect_ellipsoid(ellipsoid, h)?
            .to_geographic(&WGS84_DATUM);
        for i in 0..RAY_MAX_ITERATIONS {
            let next = self.height_above_ellipsoid(&gpt).unwrap_or(0.0);
            let settled = (next - h).abs() < RAY_TOLERANCE_M;
            h = next;
            if settled {
                log::trace!("ray intersection settled after {i} iterations");
                break;
            }
            gpt = ray
                .intersect_ellipsoid(ellipsoid, h)?
                .to_geographic(&WGS84_DATUM);
        }
        gpt.height = Some(h);
        Some(gpt)
    }
}

/// Constant height everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatElevation {
    pub height: f64,
}

impl FlatElevation {
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

impl ElevationSource for FlatElevation {
    fn height_above_ellipsoid(&self, gpt: &GeographicPoint) -> Option<f64> {
        if gpt.has_nans() {
            None
        } else {
            Some(self.height)
        }
    }
}

/// Regular lat/lon grid of ellipsoid heights.
///
/// `ul` is the geographic position (lon, lat) of the outer corner of the
/// first cell and `spacing` the cell size in degrees. Posts are sampled at
/// cell centres.
#[derive(Clone, Debug)]
pub struct GridElevation {
    heights: Array2<f64>,
    ul: PlanarPoint,
    spacing: PlanarPoint,
    nodata: Option<f64>,
}

impl GridElevation {
    pub fn new(heights: Array2<f64>, ul: PlanarPoint, spacing: PlanarPoint) -> Self {
        Self {
            heights,
            ul,
            spacing,
            nodata: None,
        }
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Bilinear sample at corner-based grid coordinates (`x` column, `y` row).
    ///
    /// `None` when any of the four neighbours is outside the grid, NaN or
    /// nodata.
    fn sample(&self, x: f64, y: f64) -> Option<f64> {
        // Convert from corner-based to center-based coordinates
        let cx = x - 0.5;
        let cy = y - 0.5;

        let x0 = cx.floor() as isize;
        let y0 = cy.floor() as isize;
        let x1 = x0 + 1;
        let y1 = y0 + 1;

        let (rows, cols) = (self.heights.nrows() as isize, self.heights.ncols() as isize);
        if x0 < 0 || x1 >= cols || y0 < 0 || y1 >= rows {
            return None;
        }

        let (x0u, y0u, x1u, y1u) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);
        let v00 = self.heights[(y0u, x0u)];
        let v10 = self.heights[(y0u, x1u)];
        let v01 = self.heights[(y1u, x0u)];
        let v11 = self.heights[(y1u, x1u)];

        let bad = |v: f64| v.is_nan() || self.nodata == Some(v);
        if bad(v00) || bad(v10) || bad(v01) || bad(v11) {
            return None;
        }

        let dx = cx - x0 as f64;
        let dy = cy - y0 as f64;

        Some(
            v00 * (1.0 - dx) * (1.0 - dy)
                + v10 * dx * (1.0 - dy)
                + v01 * (1.0 - dx) * dy
                + v11 * dx * dy,
        )
    }
}

impl ElevationSource for GridElevation {
    fn height_above_ellipsoid(&self, gpt: &GeographicPoint) -> Option<f64> {
        if gpt.has_nans() {
            return None;
        }
        let g = gpt.on_datum(&WGS84_DATUM);
        let x = (g.lon() - self.ul.x) / self.spacing.x;
        let y = (self.ul.y - g.lat()) / self.spacing.y;
        self.sample(x, y)
    }
}
