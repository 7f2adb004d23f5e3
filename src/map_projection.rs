//! Map projections calibrated to an image grid.
//!
//! A [`MapProjection`] wraps one analytic [`Projection`] and an affine
//! calibration: the ground position of pixel (0, 0) (the tie point, held both
//! as a geographic point and as easting/northing) and the ground sample
//! distance (held both in metres and in decimal degrees per pixel). One of each
//! pair is authoritative and every mutator re-derives the other before
//! returning.
//!
//! The tie point is the centre of pixel (0, 0).

use std::sync::Arc;

use crate::affine::Affine;
use crate::elevation::ElevationSource;
use crate::error::GeoError;
use crate::keywords::{keys, KeywordList, Unit};
use crate::point::{GeographicPoint, ImagePoint, PlanarPoint};
use crate::proj::datum::{Datum, WGS84_DATUM};
use crate::proj::{factory, Projection};
use crate::transform::GeodeticTransform;

const ORIGIN_TOLERANCE_DEG: f64 = 1e-12;

#[derive(Clone, Debug)]
pub struct MapProjection {
    projection: Arc<dyn Projection>,
    datum: Datum,
    origin: GeographicPoint,
    meters_per_pixel: PlanarPoint,
    /// `x` along longitude, `y` along latitude.
    degrees_per_pixel: PlanarPoint,
    ul_gpt: GeographicPoint,
    ul_easting_northing: PlanarPoint,
    pcs_code: u32,
    elevation_lookup: bool,
    elevation: Option<Arc<dyn ElevationSource>>,
}

impl MapProjection {
    /// Uncalibrated projection on `datum`: tie point at the projection origin,
    /// one metre per pixel (one equatorial metre's worth of degrees for
    /// geographic projections).
    pub fn new(projection: Arc<dyn Projection>, datum: Datum) -> Self {
        let (a, b) = (projection.ellipsoid().a(), projection.ellipsoid().b());
        if a != datum.ellipsoid().a() || b != datum.ellipsoid().b() {
            log::warn!(
                "{} projection ellipsoid ({a}, {b}) differs from datum {} ellipsoid",
                projection.name(),
                datum.code()
            );
        }
        let (lon0, lat0) = projection.origin();
        let origin =
            GeographicPoint::with_datum(lat0.to_degrees(), lon0.to_degrees(), None, datum);
        let mut mp = Self {
            projection,
            datum,
            origin,
            meters_per_pixel: PlanarPoint::undefined(),
            degrees_per_pixel: PlanarPoint::undefined(),
            ul_gpt: GeographicPoint::with_datum(f64::NAN, f64::NAN, None, datum),
            ul_easting_northing: PlanarPoint::undefined(),
            pcs_code: 0,
            elevation_lookup: false,
            elevation: None,
        };
        mp.update();
        mp
    }

    /// Rebuild a calibrated projection from a keyword list.
    ///
    /// The datum (default `WGE`) supplies the ellipsoid. Calibration comes from
    /// `tie_point_xy`/`pixel_scale_xy` with their units, falling back to the
    /// legacy per-axis keys.
    pub fn from_keywords(kwl: &KeywordList, prefix: &str) -> Result<Self, GeoError> {
        let datum = match kwl.find(prefix, keys::DATUM) {
            None => WGS84_DATUM,
            Some(code) => {
                Datum::from_code(code).ok_or_else(|| GeoError::UnknownDatum(code.to_string()))?
            }
        };
        if let (Some(a), Some(b)) = (
            kwl.get_f64(prefix, keys::MAJOR_AXIS)?,
            kwl.get_f64(prefix, keys::MINOR_AXIS)?,
        ) {
            let ell = datum.ellipsoid();
            if (a - ell.a()).abs() > 1e-3 || (b - ell.b()).abs() > 1e-3 {
                log::warn!(
                    "ellipsoid axes ({a}, {b}) ignored, datum {} uses {}",
                    datum.code(),
                    ell.code()
                );
            }
        }

        let projection = factory::from_keywords(kwl, prefix, *datum.ellipsoid())?;
        let mut mp = Self::new(projection, datum);
        mp.elevation_lookup = kwl
            .get_bool(prefix, keys::ELEVATION_LOOKUP_FLAG)?
            .unwrap_or(false);

        let (mpp, dpp) = load_pixel_scale(kwl, prefix)?;
        let geographic = mp.is_geographic();
        if !dpp.has_nans() && (geographic || mpp.has_nans()) {
            mp.set_decimal_degrees_per_pixel(dpp);
        } else if !mpp.has_nans() {
            mp.set_meters_per_pixel(mpp);
        }

        let area = kwl
            .find(prefix, keys::PIXEL_TYPE)
            .is_some_and(|t| t.to_ascii_lowercase().contains("area"));
        let (tie_en, tie_gpt) = load_tie_point(kwl, prefix, datum)?;
        match (tie_en, tie_gpt) {
            (en, Some(mut gpt)) if geographic || en.is_none() => {
                if area {
                    // Outer corner to centre of the first pixel
                    gpt.set_lat(gpt.lat() - mp.degrees_per_pixel.y / 2.0);
                    gpt.set_lon(gpt.lon() + mp.degrees_per_pixel.x / 2.0);
                }
                mp.set_ul_gpt(gpt);
            }
            (Some(mut en), _) => {
                if area {
                    en.x += mp.meters_per_pixel.x / 2.0;
                    en.y -= mp.meters_per_pixel.y / 2.0;
                }
                mp.set_ul_easting_northing(en);
            }
            _ => {}
        }

        if let Some(code) = kwl.get::<u32>(prefix, keys::PCS_CODE)? {
            mp.set_pcs_code(code);
        }
        Ok(mp)
    }

    pub fn save_state(&self, kwl: &mut KeywordList, prefix: &str) {
        self.projection.save_state(kwl, prefix);

        let ell = self.datum.ellipsoid();
        kwl.add(prefix, keys::MAJOR_AXIS, ell.a());
        kwl.add(prefix, keys::MINOR_AXIS, ell.b());
        kwl.add(prefix, keys::ELLIPSE_CODE, ell.code());
        kwl.add(prefix, keys::DATUM, self.datum.code());
        if self.pcs_code != 0 {
            kwl.add(prefix, keys::PCS_CODE, self.pcs_code);
        }

        if self.is_geographic() {
            kwl.add_point(
                prefix,
                keys::TIE_POINT_XY,
                PlanarPoint::new(self.ul_gpt.lon(), self.ul_gpt.lat()),
            );
            kwl.add(prefix, keys::TIE_POINT_UNITS, Unit::Degrees);
            kwl.add_point(prefix, keys::PIXEL_SCALE_XY, self.degrees_per_pixel);
            kwl.add(prefix, keys::PIXEL_SCALE_UNITS, Unit::Degrees);
        } else {
            kwl.add_point(prefix, keys::TIE_POINT_XY, self.ul_easting_northing);
            kwl.add(prefix, keys::TIE_POINT_UNITS, Unit::Meters);
            kwl.add_point(prefix, keys::PIXEL_SCALE_XY, self.meters_per_pixel);
            kwl.add(prefix, keys::PIXEL_SCALE_UNITS, Unit::Meters);
        }
        kwl.add(prefix, keys::ELEVATION_LOOKUP_FLAG, self.elevation_lookup);
    }

    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    pub fn datum(&self) -> &Datum {
        &self.datum
    }

    pub fn origin(&self) -> &GeographicPoint {
        &self.origin
    }

    pub fn is_geographic(&self) -> bool {
        self.projection.is_geographic()
    }

    pub fn false_easting_northing(&self) -> PlanarPoint {
        let (fe, fn_) = self.projection.false_easting_northing();
        PlanarPoint::new(fe, fn_)
    }

    /// `x` along longitude, `y` along latitude.
    pub fn decimal_degrees_per_pixel(&self) -> PlanarPoint {
        self.degrees_per_pixel
    }

    pub fn ul_gpt(&self) -> &GeographicPoint {
        &self.ul_gpt
    }

    pub fn ul_easting_northing(&self) -> PlanarPoint {
        self.ul_easting_northing
    }

    pub fn pcs_code(&self) -> u32 {
        self.pcs_code
    }

    /// Set the EPSG projected coordinate system code. A code that does not
    /// describe this projection on this datum is dropped (reset to 0).
    pub fn set_pcs_code(&mut self, code: u32) {
        self.pcs_code = code;
        self.verify_pcs_code();
    }

    pub fn elevation_lookup(&self) -> bool {
        self.elevation_lookup
    }

    /// When enabled, [`line_sample_to_world`](GeodeticTransform::line_sample_to_world)
    /// fills the height from the elevation source.
    pub fn set_elevation_lookup(&mut self, enabled: bool) {
        self.elevation_lookup = enabled;
    }

    pub fn set_elevation_source(&mut self, source: Option<Arc<dyn ElevationSource>>) {
        self.elevation = source;
    }

    /// Geographic -> easting/northing, after shifting `gpt` to this datum.
    pub fn forward(&self, gpt: &GeographicPoint) -> Option<PlanarPoint> {
        if gpt.has_nans() {
            return None;
        }
        let g = gpt.on_datum(&self.datum);
        match self
            .projection
            .forward(g.lon().to_radians(), g.lat().to_radians())
        {
            Ok((x, y)) => Some(PlanarPoint::new(x, y)),
            Err(e) => {
                log::trace!("{} forward failed: {e}", self.projection.name());
                None
            }
        }
    }

    /// Easting/northing -> geographic on this datum, height unknown.
    pub fn inverse(&self, en: PlanarPoint) -> Option<GeographicPoint> {
        if en.has_nans() {
            return None;
        }
        match self.projection.inverse(en.x, en.y) {
            Ok((lon, lat)) => Some(GeographicPoint::with_datum(
                lat.to_degrees(),
                lon.to_degrees(),
                None,
                self.datum,
            )),
            Err(e) => {
                log::trace!("{} inverse failed: {e}", self.projection.name());
                None
            }
        }
    }

    fn calibration(&self) -> Affine {
        Affine::from_tie_point(self.ul_easting_northing, self.meters_per_pixel)
    }

    pub fn line_sample_to_easting_northing(&self, image: ImagePoint) -> Option<PlanarPoint> {
        let en = self.calibration().forward(image);
        (!en.has_nans()).then_some(en)
    }

    pub fn easting_northing_to_line_sample(&self, en: PlanarPoint) -> Option<ImagePoint> {
        let ip = self.calibration().inverse().ok()?.forward(en);
        (!ip.has_nans()).then_some(ip)
    }

    pub fn easting_northing_to_world(&self, en: PlanarPoint) -> Option<GeographicPoint> {
        let ip = self.easting_northing_to_line_sample(en)?;
        self.line_sample_to_world(ip)
    }

    /// Image -> ground with the height left unknown.
    fn image_to_ground(&self, image: ImagePoint) -> Option<GeographicPoint> {
        if image.has_nans() {
            return None;
        }
        let gpt = if self.is_geographic() {
            let lat = self.ul_gpt.lat() - image.line() * self.degrees_per_pixel.y;
            let lon = self.ul_gpt.lon() + image.samp() * self.degrees_per_pixel.x;
            GeographicPoint::with_datum(lat, lon, None, self.datum)
        } else {
            self.inverse(self.line_sample_to_easting_northing(image)?)?
        };
        (!gpt.has_nans()).then_some(gpt)
    }

    /// Set the ground sample distance in metres and derive degrees per pixel
    /// at the origin.
    pub fn set_meters_per_pixel(&mut self, gsd: PlanarPoint) {
        self.meters_per_pixel = gsd;
        self.degrees_per_pixel = self.compute_degrees_per_pixel(&self.origin, gsd);
    }

    /// Set the ground sample distance in degrees (`x` longitude, `y` latitude)
    /// and derive metres per pixel at the origin.
    pub fn set_decimal_degrees_per_pixel(&mut self, gsd: PlanarPoint) {
        self.degrees_per_pixel = gsd;
        self.meters_per_pixel = self.compute_meters_per_pixel(&self.origin, gsd);
    }

    /// Degrees spanned by one pixel around `ground`, probed one pixel east and
    /// one pixel south in projected space.
    pub fn compute_degrees_per_pixel(
        &self,
        ground: &GeographicPoint,
        meters_per_pixel: PlanarPoint,
    ) -> PlanarPoint {
        let probe = || {
            let en = self.forward(ground)?;
            let centre = self.inverse(en)?;
            let right = self.inverse(en + PlanarPoint::new(meters_per_pixel.x, 0.0))?;
            let down = self.inverse(en - PlanarPoint::new(0.0, meters_per_pixel.y))?;
            let delta = |g: GeographicPoint| {
                PlanarPoint::new(g.lon() - centre.lon(), g.lat() - centre.lat()).length()
            };
            Some(PlanarPoint::new(delta(right), delta(down)))
        };
        probe().unwrap_or_else(PlanarPoint::undefined)
    }

    /// Metres spanned by one pixel around `ground`, probed by offsetting it
    /// by the longitude and latitude step and measuring in projected space.
    pub fn compute_meters_per_pixel(
        &self,
        ground: &GeographicPoint,
        degrees_per_pixel: PlanarPoint,
    ) -> PlanarPoint {
        let probe = || {
            let mut east = *ground;
            east.set_lon(ground.lon() + degrees_per_pixel.x);
            let mut north = *ground;
            north.set_lat(ground.lat() + degrees_per_pixel.y);
            let centre = self.forward(ground)?;
            Some(PlanarPoint::new(
                (self.forward(&east)? - centre).length(),
                (self.forward(&north)? - centre).length(),
            ))
        };
        probe().unwrap_or_else(PlanarPoint::undefined)
    }

    /// Place the centre of pixel (0, 0) at `gpt` and re-derive its
    /// easting/northing.
    pub fn set_ul_gpt(&mut self, gpt: GeographicPoint) {
        self.ul_gpt = gpt.on_datum(&self.datum);
        self.ul_easting_northing = self
            .forward(&self.ul_gpt)
            .unwrap_or_else(PlanarPoint::undefined);
    }

    /// Place the centre of pixel (0, 0) at `en` and re-derive its geographic
    /// position.
    pub fn set_ul_easting_northing(&mut self, en: PlanarPoint) {
        self.ul_easting_northing = en;
        self.ul_gpt = self
            .inverse(en)
            .unwrap_or_else(|| GeographicPoint::with_datum(f64::NAN, f64::NAN, None, self.datum));
    }

    /// Multiply the pixel size by `scale`.
    ///
    /// Without `recenter` the tie point stays put, so the centre of pixel
    /// (0, 0) keeps its ground position. With `recenter` the outer corner of
    /// the image stays put instead: the tie point moves half an old pixel out
    /// and half a new pixel back in, as when resampling to a new resolution.
    pub fn apply_scale(&mut self, scale: PlanarPoint, recenter: bool) {
        let old_mpp = self.meters_per_pixel;
        let old_dpp = self.degrees_per_pixel;
        let new_mpp = PlanarPoint::new(old_mpp.x * scale.x, old_mpp.y * scale.y);
        let new_dpp = PlanarPoint::new(old_dpp.x * scale.x, old_dpp.y * scale.y);
        self.meters_per_pixel = new_mpp;
        self.degrees_per_pixel = new_dpp;
        if !recenter {
            return;
        }

        if self.is_geographic() {
            let mut tie = self.ul_gpt;
            if tie.has_nans() {
                return;
            }
            let shift = (new_dpp - old_dpp) / 2.0;
            tie.set_lon(tie.lon() + shift.x);
            tie.set_lat(tie.lat() - shift.y);
            self.set_ul_gpt(tie);
        } else {
            let tie = self.ul_easting_northing;
            if tie.has_nans() {
                return;
            }
            let shift = (new_mpp - old_mpp) / 2.0;
            self.set_ul_easting_northing(tie + PlanarPoint::new(shift.x, -shift.y));
        }
    }

    /// Round the tie point to a multiple of `multiple` `unit`s, in degrees for
    /// geographic projections and in metres from the false origin otherwise.
    /// Conversions between linear and angular units use the origin's metres
    /// per degree of latitude.
    pub fn snap_tie_point_to(&mut self, multiple: f64, unit: Unit) {
        let mpd = self.origin.meters_per_degree().y;
        let step = if self.is_geographic() {
            unit.to_degrees(multiple)
                .or_else(|| unit.to_meters(multiple).map(|m| m / mpd))
        } else {
            unit.to_meters(multiple)
                .or_else(|| unit.to_degrees(multiple).map(|d| d * mpd))
        };
        let Some(step) = step.filter(|s| s.is_finite() && *s > 0.0) else {
            log::warn!("cannot snap tie point to {multiple} {unit}");
            return;
        };

        if self.is_geographic() {
            let ul = self.ul_gpt;
            if ul.has_nans() {
                return;
            }
            let snapped = GeographicPoint::with_datum(
                snap(ul.lat(), step),
                snap(ul.lon(), step),
                ul.height,
                self.datum,
            );
            self.set_ul_gpt(snapped);
        } else {
            let ul = self.ul_easting_northing;
            if ul.has_nans() {
                return;
            }
            let false_en = self.false_easting_northing();
            let snapped = PlanarPoint::new(
                snap(ul.x - false_en.x, step) + false_en.x,
                snap(ul.y - false_en.y, step) + false_en.y,
            );
            self.set_ul_easting_northing(snapped);
        }
    }

    /// Fill whatever is still undefined from what is defined.
    fn update(&mut self) {
        let mpp_set = !self.meters_per_pixel.has_nans();
        let dpp_set = !self.degrees_per_pixel.has_nans();
        match (mpp_set, dpp_set) {
            (true, false) => self.set_meters_per_pixel(self.meters_per_pixel),
            (false, true) => self.set_decimal_degrees_per_pixel(self.degrees_per_pixel),
            (false, false) => {
                if self.is_geographic() {
                    let equator = GeographicPoint::with_datum(0.0, 0.0, None, self.datum);
                    let dpp = 1.0 / equator.meters_per_degree().y;
                    self.set_decimal_degrees_per_pixel(PlanarPoint::new(dpp, dpp));
                } else {
                    self.set_meters_per_pixel(PlanarPoint::new(1.0, 1.0));
                }
            }
            (true, true) => {}
        }

        if self.ul_gpt.has_nans() {
            self.set_ul_gpt(self.origin);
        } else if self.ul_easting_northing.has_nans() {
            self.set_ul_gpt(self.ul_gpt);
        }
        self.verify_pcs_code();
    }

    fn verify_pcs_code(&mut self) {
        if self.pcs_code == 0 {
            return;
        }
        let expected = if self.datum.same_as(&WGS84_DATUM) {
            self.projection.epsg_code().map(u32::from)
        } else {
            None
        };
        if expected != Some(self.pcs_code) {
            log::warn!(
                "pcs code {} does not match {} projection on datum {}, resetting",
                self.pcs_code,
                self.projection.name(),
                self.datum.code()
            );
            self.pcs_code = 0;
        }
    }
}

impl GeodeticTransform for MapProjection {
    fn world_to_line_sample(&self, world: &GeographicPoint) -> Option<ImagePoint> {
        if world.has_nans() {
            return None;
        }
        let ip = if self.is_geographic() {
            let g = world.on_datum(&self.datum);
            ImagePoint::from_line_sample(
                (self.ul_gpt.lat() - g.lat()) / self.degrees_per_pixel.y,
                (g.lon() - self.ul_gpt.lon()) / self.degrees_per_pixel.x,
            )
        } else {
            if self.ul_easting_northing.has_nans() {
                return None;
            }
            self.easting_northing_to_line_sample(self.forward(world)?)?
        };
        (!ip.has_nans()).then_some(ip)
    }

    fn line_sample_to_world(&self, image: ImagePoint) -> Option<GeographicPoint> {
        let mut gpt = self.image_to_ground(image)?;
        if self.elevation_lookup {
            if let Some(source) = &self.elevation {
                gpt.height = source.height_above_ellipsoid(&gpt);
            }
        }
        Some(gpt)
    }

    fn line_sample_height_to_world(
        &self,
        image: ImagePoint,
        height: f64,
    ) -> Option<GeographicPoint> {
        let mut gpt = self.image_to_ground(image)?;
        gpt.height = Some(height);
        Some(gpt)
    }

    fn meters_per_pixel(&self) -> PlanarPoint {
        self.meters_per_pixel
    }

    fn is_affected_by_elevation(&self) -> bool {
        false
    }
}

/// Same datum, same kind of projection with the same origin, and the same
/// calibration in the projection's native unit.
impl PartialEq for MapProjection {
    fn eq(&self, other: &Self) -> bool {
        if !self.datum.same_as(&other.datum)
            || self.projection.name() != other.projection.name()
            || self.is_geographic() != other.is_geographic()
            || self.false_easting_northing() != other.false_easting_northing()
            || (self.origin.lat() - other.origin.lat()).abs() > ORIGIN_TOLERANCE_DEG
            || (self.origin.lon() - other.origin.lon()).abs() > ORIGIN_TOLERANCE_DEG
        {
            return false;
        }
        if self.is_geographic() {
            self.degrees_per_pixel == other.degrees_per_pixel
                && self.ul_gpt.lat() == other.ul_gpt.lat()
                && self.ul_gpt.lon() == other.ul_gpt.lon()
        } else {
            self.meters_per_pixel == other.meters_per_pixel
                && self.ul_easting_northing == other.ul_easting_northing
        }
    }
}

fn snap(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Pixel scale as (metres, degrees); whichever is absent is undefined.
fn load_pixel_scale(
    kwl: &KeywordList,
    prefix: &str,
) -> Result<(PlanarPoint, PlanarPoint), GeoError> {
    let mut mpp = PlanarPoint::undefined();
    let mut dpp = PlanarPoint::undefined();

    if let Some(units) = lenient_unit(kwl, prefix, keys::PIXEL_SCALE_UNITS) {
        if let Some(scale) = kwl.get_point(prefix, keys::PIXEL_SCALE_XY)? {
            match convert(scale, units) {
                Converted::Meters(p) => mpp = p,
                Converted::Degrees(p) => dpp = p,
            }
        }
        return Ok((mpp, dpp));
    }

    if let (Some(x), Some(y)) = (
        kwl.get_f64(prefix, keys::METERS_PER_PIXEL_X)?,
        kwl.get_f64(prefix, keys::METERS_PER_PIXEL_Y)?,
    ) {
        mpp = PlanarPoint::new(x.abs(), y.abs());
    }
    if let (Some(lat), Some(lon)) = (
        kwl.get_f64(prefix, keys::DECIMAL_DEGREES_PER_PIXEL_LAT)?,
        kwl.get_f64(prefix, keys::DECIMAL_DEGREES_PER_PIXEL_LON)?,
    ) {
        dpp = PlanarPoint::new(lon.abs(), lat.abs());
    }
    Ok((mpp, dpp))
}

/// Tie point as (easting/northing, geographic), either or both may be absent.
fn load_tie_point(
    kwl: &KeywordList,
    prefix: &str,
    datum: Datum,
) -> Result<(Option<PlanarPoint>, Option<GeographicPoint>), GeoError> {
    let to_gpt = |p: PlanarPoint| GeographicPoint::with_datum(p.y, p.x, None, datum);

    if let Some(units) = lenient_unit(kwl, prefix, keys::TIE_POINT_UNITS) {
        let Some(tie) = kwl.get_point(prefix, keys::TIE_POINT_XY)? else {
            return Ok((None, None));
        };
        return Ok(match convert(tie, units) {
            Converted::Meters(p) => (Some(p), None),
            Converted::Degrees(p) => (None, Some(to_gpt(p))),
        });
    }

    let en = match (
        kwl.get_f64(prefix, keys::TIE_POINT_EASTING)?,
        kwl.get_f64(prefix, keys::TIE_POINT_NORTHING)?,
    ) {
        (Some(e), Some(n)) => Some(PlanarPoint::new(e, n)),
        _ => None,
    };
    let gpt = match (
        kwl.get_f64(prefix, keys::TIE_POINT_LAT)?,
        kwl.get_f64(prefix, keys::TIE_POINT_LON)?,
    ) {
        (Some(lat), Some(lon)) => Some(to_gpt(PlanarPoint::new(lon, lat))),
        _ => None,
    };
    Ok((en, gpt))
}

/// Unknown unit names are reported and treated as absent, so the legacy keys
/// get a chance.
fn lenient_unit(kwl: &KeywordList, prefix: &str, key: &str) -> Option<Unit> {
    match kwl.get_unit(prefix, key) {
        Ok(unit) => unit,
        Err(e) => {
            log::warn!("{prefix}{key}: {e}, ignoring");
            None
        }
    }
}

enum Converted {
    Meters(PlanarPoint),
    Degrees(PlanarPoint),
}

fn convert(p: PlanarPoint, unit: Unit) -> Converted {
    if unit.is_angular() {
        let deg = |v| unit.to_degrees(v).unwrap_or(f64::NAN);
        Converted::Degrees(PlanarPoint::new(deg(p.x), deg(p.y)))
    } else {
        let m = |v| unit.to_meters(v).unwrap_or(f64::NAN);
        Converted::Meters(PlanarPoint::new(m(p.x), m(p.y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::FlatElevation;
    use crate::proj::datum::NAD27_CONUS;
    use crate::proj::equidistant::EquidistantCylindrical;
    use crate::proj::transverse_mercator::TransverseMercator;
    use approx::assert_relative_eq;

    fn utm31() -> MapProjection {
        let mut mp = MapProjection::new(
            Arc::new(TransverseMercator::utm_zone(31, true)),
            WGS84_DATUM,
        );
        mp.set_meters_per_pixel(PlanarPoint::new(10.0, 10.0));
        mp.set_ul_gpt(GeographicPoint::new(43.6, 1.48, None));
        mp
    }

    fn geographic() -> MapProjection {
        let mut mp = MapProjection::new(Arc::new(EquidistantCylindrical::epsg_4326()), WGS84_DATUM);
        mp.set_decimal_degrees_per_pixel(PlanarPoint::new(0.001, 0.001));
        mp.set_ul_gpt(GeographicPoint::new(45.0, 10.0, None));
        mp
    }

    #[test]
    fn test_utm_tie_point_scenario() {
        let mp = utm31();
        let tie = mp.line_sample_to_world(ImagePoint::new(0.0, 0.0)).unwrap();
        assert_relative_eq!(tie.lat(), 43.6, epsilon = 1e-9);
        assert_relative_eq!(tie.lon(), 1.48, epsilon = 1e-9);
        assert_eq!(tie.height, None);

        let next = mp.line_sample_to_world(ImagePoint::new(1.0, 0.0)).unwrap();
        let en = mp.forward(&next).unwrap();
        assert_relative_eq!(en.x, mp.ul_easting_northing().x + 10.0, epsilon = 1e-6);
        assert_relative_eq!(en.y, mp.ul_easting_northing().y, epsilon = 1e-6);
    }

    #[test]
    fn test_world_to_line_sample_roundtrip() {
        let mp = utm31();
        let ip = ImagePoint::new(1234.5, 678.25);
        let g = mp.line_sample_to_world(ip).unwrap();
        let back = mp.world_to_line_sample(&g).unwrap();
        assert_relative_eq!(back.x, ip.x, epsilon = 1e-6);
        assert_relative_eq!(back.y, ip.y, epsilon = 1e-6);
    }

    #[test]
    fn test_line_increases_southward() {
        let mp = utm31();
        let en = mp
            .line_sample_to_easting_northing(ImagePoint::new(0.0, 3.0))
            .unwrap();
        assert_relative_eq!(en.y, mp.ul_easting_northing().y - 30.0, epsilon = 1e-9);
        let ip = mp.easting_northing_to_line_sample(en).unwrap();
        assert_relative_eq!(ip.line(), 3.0, epsilon = 1e-9);
        let g = mp.easting_northing_to_world(en).unwrap();
        assert!(g.lat() < 43.6);
    }

    #[test]
    fn test_height_forced_or_looked_up() {
        let mut mp = utm31();
        let g = mp
            .line_sample_height_to_world(ImagePoint::new(5.0, 5.0), 120.0)
            .unwrap();
        assert_eq!(g.height, Some(120.0));

        mp.set_elevation_source(Some(Arc::new(FlatElevation::new(42.0))));
        assert_eq!(
            mp.line_sample_to_world(ImagePoint::new(5.0, 5.0)).unwrap().height,
            None
        );
        mp.set_elevation_lookup(true);
        assert_eq!(
            mp.line_sample_to_world(ImagePoint::new(5.0, 5.0)).unwrap().height,
            Some(42.0)
        );
        // An explicit height still wins
        let g = mp
            .line_sample_height_to_world(ImagePoint::new(5.0, 5.0), 7.0)
            .unwrap();
        assert_eq!(g.height, Some(7.0));
    }

    #[test]
    fn test_nan_propagation() {
        let mp = utm31();
        let nan = f64::NAN;
        assert!(mp.line_sample_to_world(ImagePoint::new(nan, 0.0)).is_none());
        assert!(mp.line_sample_height_to_world(ImagePoint::new(0.0, nan), 0.0).is_none());
        assert!(mp
            .world_to_line_sample(&GeographicPoint::new(nan, 1.0, None))
            .is_none());
        assert!(mp
            .world_to_line_sample(&GeographicPoint::new(43.0, nan, None))
            .is_none());
        assert!(mp.forward(&GeographicPoint::new(nan, nan, None)).is_none());
        assert!(mp.inverse(PlanarPoint::undefined()).is_none());
        assert!(mp
            .easting_northing_to_line_sample(PlanarPoint::new(nan, 4_800_000.0))
            .is_none());
        assert!(mp
            .line_sample_to_easting_northing(ImagePoint::new(3.0, nan))
            .is_none());
        assert!(mp
            .easting_northing_to_world(PlanarPoint::new(380_000.0, nan))
            .is_none());

        let geo = geographic();
        assert!(geo.line_sample_to_world(ImagePoint::new(0.0, nan)).is_none());
        assert!(geo
            .world_to_line_sample(&GeographicPoint::new(nan, 0.0, None))
            .is_none());
    }

    #[test]
    fn test_missing_tie_point_is_undefined() {
        let mut mp = utm31();
        mp.set_ul_easting_northing(PlanarPoint::undefined());
        assert!(mp.ul_gpt().has_nans());
        assert!(mp.line_sample_to_world(ImagePoint::new(0.0, 0.0)).is_none());
        assert!(mp
            .world_to_line_sample(&GeographicPoint::new(43.6, 1.48, None))
            .is_none());
    }

    #[test]
    fn test_gsd_derivation_symmetry() {
        let mut mp = MapProjection::new(
            Arc::new(TransverseMercator::utm_zone(31, true)),
            WGS84_DATUM,
        );
        mp.set_meters_per_pixel(PlanarPoint::new(10.0, 10.0));
        let dpp = mp.decimal_degrees_per_pixel();
        assert!(dpp.x > 8.9e-5 && dpp.x < 9.1e-5);

        mp.set_decimal_degrees_per_pixel(dpp);
        let mpp = mp.meters_per_pixel();
        assert_relative_eq!(mpp.x, 10.0, max_relative = 1e-6);
        assert_relative_eq!(mpp.y, 10.0, max_relative = 1e-6);
    }

    #[test]
    fn test_defaults_when_uncalibrated() {
        let mp = MapProjection::new(
            Arc::new(TransverseMercator::utm_zone(31, true)),
            WGS84_DATUM,
        );
        assert_eq!(mp.meters_per_pixel(), PlanarPoint::new(1.0, 1.0));
        assert_relative_eq!(mp.ul_gpt().lon(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(mp.ul_easting_northing().x, 500_000.0, epsilon = 1e-6);

        let geo = MapProjection::new(Arc::new(EquidistantCylindrical::epsg_4326()), WGS84_DATUM);
        assert_relative_eq!(
            geo.decimal_degrees_per_pixel().y,
            1.0 / 110_574.3,
            max_relative = 1e-5
        );
    }

    #[test]
    fn test_apply_scale_without_recenter_keeps_first_pixel() {
        let mut mp = utm31();
        let before = mp.line_sample_to_world(ImagePoint::new(0.0, 0.0)).unwrap();
        mp.apply_scale(PlanarPoint::new(2.0, 2.0), false);
        assert_eq!(mp.meters_per_pixel(), PlanarPoint::new(20.0, 20.0));
        let after = mp.line_sample_to_world(ImagePoint::new(0.0, 0.0)).unwrap();
        assert_relative_eq!(after.lat(), before.lat(), epsilon = 1e-12);
        assert_relative_eq!(after.lon(), before.lon(), epsilon = 1e-12);
    }

    #[test]
    fn test_apply_scale_with_recenter_keeps_outer_corner() {
        let mut mp = utm31();
        let corner = ImagePoint::new(-0.5, -0.5);
        let before = mp.line_sample_to_easting_northing(corner).unwrap();
        let first = mp.ul_easting_northing();
        mp.apply_scale(PlanarPoint::new(2.0, 2.0), true);
        let after = mp.line_sample_to_easting_northing(corner).unwrap();
        assert_relative_eq!(after.x, before.x, epsilon = 1e-6);
        assert_relative_eq!(after.y, before.y, epsilon = 1e-6);
        // The new first pixel centre moved half an old pixel in
        assert_relative_eq!(mp.ul_easting_northing().x, first.x + 5.0, epsilon = 1e-6);
        assert_relative_eq!(mp.ul_easting_northing().y, first.y - 5.0, epsilon = 1e-6);
        assert!(!mp.ul_gpt().has_nans());
    }

    #[test]
    fn test_apply_scale_geographic_recenter() {
        let mut mp = geographic();
        mp.apply_scale(PlanarPoint::new(0.5, 0.5), true);
        assert_relative_eq!(mp.decimal_degrees_per_pixel().x, 0.0005);
        assert_relative_eq!(mp.ul_gpt().lat(), 45.0 + 0.00025, epsilon = 1e-12);
        assert_relative_eq!(mp.ul_gpt().lon(), 10.0 - 0.00025, epsilon = 1e-12);
    }

    #[test]
    fn test_snap_tie_point_planar() {
        let mut mp = utm31();
        mp.set_ul_easting_northing(PlanarPoint::new(376_543.2, 4_828_456.7));
        mp.snap_tie_point_to(10.0, Unit::Meters);
        assert_relative_eq!(mp.ul_easting_northing().x, 376_540.0, epsilon = 1e-6);
        assert_relative_eq!(mp.ul_easting_northing().y, 4_828_460.0, epsilon = 1e-6);
        let back = mp.forward(mp.ul_gpt()).unwrap();
        assert_relative_eq!(back.x, 376_540.0, epsilon = 1e-5);

        // Feet are converted before rounding
        mp.snap_tie_point_to(100.0, Unit::Feet);
        let step = 30.48;
        let x = mp.ul_easting_northing().x - 500_000.0;
        assert_relative_eq!((x / step).round() * step, x, epsilon = 1e-6);
    }

    #[test]
    fn test_snap_tie_point_geographic() {
        let mut mp = geographic();
        mp.set_ul_gpt(GeographicPoint::new(45.01234, 10.04321, None));
        mp.snap_tie_point_to(0.01, Unit::Degrees);
        assert_relative_eq!(mp.ul_gpt().lat(), 45.01, epsilon = 1e-9);
        assert_relative_eq!(mp.ul_gpt().lon(), 10.04, epsilon = 1e-9);
        mp.snap_tie_point_to(36.0, Unit::Seconds);
        assert_relative_eq!(mp.ul_gpt().lat(), 45.01, epsilon = 1e-9);
    }

    #[test]
    fn test_geographic_branch() {
        let mp = geographic();
        let g = mp.line_sample_to_world(ImagePoint::new(100.0, 200.0)).unwrap();
        assert_relative_eq!(g.lat(), 44.8, epsilon = 1e-9);
        assert_relative_eq!(g.lon(), 10.1, epsilon = 1e-9);
        let ip = mp.world_to_line_sample(&g).unwrap();
        assert_relative_eq!(ip.samp(), 100.0, epsilon = 1e-6);
        assert_relative_eq!(ip.line(), 200.0, epsilon = 1e-6);

        let a = WGS84_DATUM.ellipsoid().a();
        assert_relative_eq!(
            mp.meters_per_pixel().y,
            a * 0.001_f64.to_radians(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_equality() {
        let a = utm31();
        let mut b = utm31();
        assert!(a == b);
        b.apply_scale(PlanarPoint::new(2.0, 2.0), false);
        assert!(a != b);

        let south = {
            let mut mp = MapProjection::new(
                Arc::new(TransverseMercator::utm_zone(31, false)),
                WGS84_DATUM,
            );
            mp.set_meters_per_pixel(PlanarPoint::new(10.0, 10.0));
            mp.set_ul_easting_northing(a.ul_easting_northing());
            mp
        };
        assert!(a != south);
        assert!(a != geographic());
    }

    #[test]
    fn test_pcs_code_verified() {
        let mut mp = utm31();
        mp.set_pcs_code(32631);
        assert_eq!(mp.pcs_code(), 32631);
        mp.set_pcs_code(32632);
        assert_eq!(mp.pcs_code(), 0);

        let mut nad = MapProjection::new(
            Arc::new(TransverseMercator::utm_zone_on(
                *NAD27_CONUS.ellipsoid(),
                31,
                true,
            )),
            NAD27_CONUS,
        );
        nad.set_pcs_code(32631);
        assert_eq!(nad.pcs_code(), 0);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut mp = utm31();
        mp.set_pcs_code(32631);
        mp.set_elevation_lookup(true);
        let mut kwl = KeywordList::new();
        mp.save_state(&mut kwl, "proj.");
        assert_eq!(kwl.find("proj.", keys::TYPE), Some("utm"));
        assert_eq!(kwl.find("proj.", keys::PIXEL_SCALE_UNITS), Some("meters"));

        let text = kwl.to_string();
        let reparsed: KeywordList = text.parse().unwrap();
        let loaded = MapProjection::from_keywords(&reparsed, "proj.").unwrap();
        assert!(loaded == mp);
        assert_eq!(loaded.pcs_code(), 32631);
        assert!(loaded.elevation_lookup());
    }

    #[test]
    fn test_save_load_geographic() {
        let mp = geographic();
        let mut kwl = KeywordList::new();
        mp.save_state(&mut kwl, "");
        assert_eq!(kwl.find("", keys::TIE_POINT_UNITS), Some("degrees"));
        let loaded = MapProjection::from_keywords(&kwl, "").unwrap();
        assert!(loaded == mp);
    }

    #[test]
    fn test_load_pixel_is_area() {
        let kwl: KeywordList = "type: utm\nzone: 31\n\
            tie_point_xy: 500000 4800000\ntie_point_units: meters\n\
            pixel_scale_xy: 10 10\npixel_scale_units: meters\n\
            pixel_type: pixel_is_area\n"
            .parse()
            .unwrap();
        let mp = MapProjection::from_keywords(&kwl, "").unwrap();
        assert_eq!(mp.ul_easting_northing(), PlanarPoint::new(500_005.0, 4_799_995.0));
    }

    #[test]
    fn test_load_legacy_keys_and_feet() {
        let kwl: KeywordList = "type: utm\nzone: 31\n\
            meters_per_pixel_x: -5\nmeters_per_pixel_y: 5\n\
            tie_point_easting: 400000\ntie_point_northing: 4800000\n"
            .parse()
            .unwrap();
        let mp = MapProjection::from_keywords(&kwl, "").unwrap();
        assert_eq!(mp.meters_per_pixel(), PlanarPoint::new(5.0, 5.0));
        assert_eq!(mp.ul_easting_northing(), PlanarPoint::new(400_000.0, 4_800_000.0));
        assert!(!mp.decimal_degrees_per_pixel().has_nans());

        let feet: KeywordList = "type: utm\nzone: 31\n\
            pixel_scale_xy: 10 10\npixel_scale_units: feet\n"
            .parse()
            .unwrap();
        let mp = MapProjection::from_keywords(&feet, "").unwrap();
        assert_relative_eq!(mp.meters_per_pixel().x, 3.048, epsilon = 1e-12);
    }

    #[test]
    fn test_load_defaults_and_errors() {
        let kwl: KeywordList = "type: utm\nzone: 31\n".parse().unwrap();
        let mp = MapProjection::from_keywords(&kwl, "").unwrap();
        assert_eq!(mp.meters_per_pixel(), PlanarPoint::new(1.0, 1.0));
        assert_eq!(mp.pcs_code(), 0);
        assert_eq!(mp.datum().code(), "WGE");
        assert!(!mp.elevation_lookup());

        let bad: KeywordList = "type: utm\ndatum: XYZ\n".parse().unwrap();
        assert!(matches!(
            MapProjection::from_keywords(&bad, ""),
            Err(GeoError::UnknownDatum(_))
        ));
        let missing = KeywordList::new();
        assert!(matches!(
            MapProjection::from_keywords(&missing, ""),
            Err(GeoError::MissingKeyword(_))
        ));
    }
}
