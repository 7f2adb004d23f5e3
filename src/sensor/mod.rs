//! Ray-based sensor models.
//!
//! A [`SensorModel`] owns the state every physical sensor shares: image size,
//! the reference image/ground seed pair, the ground footprint, the clip
//! rectangle and the adjustable parameters. The sensor-specific ray
//! geometry is supplied through [`SensorGeometry`].
//!
//! Coordinates passed to and returned from the public transform methods are
//! relative to the sub-image; everything stored (reference point, clip
//! rectangle) is in full-image coordinates.

pub mod adjustable;
pub mod frame;

use std::fmt::Debug;
use std::sync::Arc;

use crate::elevation::ElevationSource;
use crate::error::GeoError;
use crate::geometry::{GroundPolygon, ImageRect};
use crate::keywords::{keys, KeywordList};
use crate::point::{GeographicPoint, ImagePoint, PlanarPoint};
use crate::proj::datum::WGS84_DATUM;
use crate::ray::EcefRay;
use crate::transform::GeodeticTransform;

pub use adjustable::{AdjustableParameter, AdjustableParameters};
pub use frame::FrameCamera;

/// Height (metres) of the upper point used to build imaging rays.
pub const RAY_ORIGIN_HEIGHT: f64 = 10_000.0;

/// Degrees per metre at the equator. Ground extrapolation steps use it at
/// every latitude.
pub const DEG_PER_MTR: f64 = 8.983152841e-06;

const MAX_ITERATIONS: usize = 20;
const CONVERGENCE_PIXELS: f64 = 0.1;

/// The sensor-specific part of a model: where the line of sight through a
/// full-image point meets a given height.
pub trait SensorGeometry: Send + Sync + Debug {
    fn line_sample_height_to_world(
        &self,
        image: ImagePoint,
        height: f64,
    ) -> Option<GeographicPoint>;

    /// Line of sight through `image`, built from its ground points at
    /// [`RAY_ORIGIN_HEIGHT`] and at zero height. Geometries that cannot
    /// answer at that height (a camera flying lower) override this.
    fn imaging_ray(&self, image: ImagePoint) -> Option<EcefRay> {
        let top = self.line_sample_height_to_world(image, RAY_ORIGIN_HEIGHT)?;
        let bottom = self.line_sample_height_to_world(image, 0.0)?;
        EcefRay::from_ground_points(&top, &bottom)
    }

    /// Parameters a fresh model of this kind starts with.
    fn default_parameters(&self) -> AdjustableParameters {
        AdjustableParameters::default()
    }

    /// Apply adjusted parameter values to the geometry.
    fn update_model(&mut self, _params: &AdjustableParameters) {}

    /// Keyword `type` value.
    fn type_name(&self) -> &'static str;

    fn save_state(&self, kwl: &mut KeywordList, prefix: &str);
}

/// Result of the ground-to-image solve with its convergence record.
///
/// Extrapolated results are not iterated: they report zero iterations, a zero
/// residual and count as converged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InverseSolution {
    pub image: ImagePoint,
    pub iterations: usize,
    /// Length of the final Newton step, in pixels.
    pub residual: f64,
    pub converged: bool,
    pub extrapolated: bool,
}

#[derive(Debug)]
pub struct SensorModel {
    geometry: Box<dyn SensorGeometry>,
    elevation: Arc<dyn ElevationSource>,
    image_id: String,
    sensor_id: String,
    samples: u32,
    lines: u32,
    sub_image_offset: PlanarPoint,
    ref_img_pt: ImagePoint,
    ref_gnd_pt: GeographicPoint,
    gsd: PlanarPoint,
    mean_gsd: f64,
    bound_gnd_polygon: GroundPolygon,
    image_clip_rect: ImageRect,
    ce90_absolute: f64,
    ce90_relative: f64,
    params: AdjustableParameters,
}

impl SensorModel {
    /// Model covering a whole `samples` x `lines` image. The reference point,
    /// footprint and GSD are measured from the geometry.
    pub fn new(
        geometry: Box<dyn SensorGeometry>,
        elevation: Arc<dyn ElevationSource>,
        samples: u32,
        lines: u32,
    ) -> Result<Self, GeoError> {
        let mut model = Self::blank(geometry, elevation, samples, lines);
        model.params = model.geometry.default_parameters();
        model.geometry.update_model(&model.params);
        model.set_image_rect(ImageRect::from_size(samples as f64, lines as f64));
        model.initialize_bounds()?;
        Ok(model)
    }

    fn blank(
        geometry: Box<dyn SensorGeometry>,
        elevation: Arc<dyn ElevationSource>,
        samples: u32,
        lines: u32,
    ) -> Self {
        Self {
            geometry,
            elevation,
            image_id: "NULL".to_string(),
            sensor_id: "NULL".to_string(),
            samples,
            lines,
            sub_image_offset: PlanarPoint::new(0.0, 0.0),
            ref_img_pt: PlanarPoint::undefined(),
            ref_gnd_pt: GeographicPoint::new(f64::NAN, f64::NAN, None),
            gsd: PlanarPoint::undefined(),
            mean_gsd: f64::NAN,
            bound_gnd_polygon: GroundPolygon::default(),
            image_clip_rect: ImageRect::undefined(),
            ce90_absolute: 0.0,
            ce90_relative: 0.0,
            params: AdjustableParameters::default(),
        }
    }

    /// Rebuild the base state of a model around `geometry`. Reference points,
    /// footprint and GSD missing from `kwl` are measured from the geometry.
    pub fn from_keywords(
        kwl: &KeywordList,
        prefix: &str,
        geometry: Box<dyn SensorGeometry>,
        elevation: Arc<dyn ElevationSource>,
    ) -> Result<Self, GeoError> {
        let missing = |key: &str| GeoError::MissingKeyword(format!("{prefix}{key}"));
        let samples = kwl
            .get::<u32>(prefix, keys::NUMBER_SAMPLES)?
            .ok_or_else(|| missing(keys::NUMBER_SAMPLES))?;
        let lines = kwl
            .get::<u32>(prefix, keys::NUMBER_LINES)?
            .ok_or_else(|| missing(keys::NUMBER_LINES))?;

        let mut model = Self::blank(geometry, elevation, samples, lines);
        if let Some(id) = kwl.find(prefix, keys::IMAGE_ID) {
            model.image_id = id.to_string();
        }
        if let Some(id) = kwl.find(prefix, keys::SENSOR_ID) {
            model.sensor_id = id.to_string();
        }

        let params = AdjustableParameters::from_keywords(kwl, prefix)?;
        model.params = if params.is_empty() {
            model.geometry.default_parameters()
        } else {
            params
        };
        model.geometry.update_model(&model.params);

        model.image_clip_rect = match load_rect(kwl, prefix)? {
            Some(rect) => rect,
            None => ImageRect::from_size(samples as f64, lines as f64),
        };
        if let Some(offset) = kwl.get_point(prefix, keys::SUB_IMAGE_OFFSET)? {
            model.sub_image_offset = offset;
        }

        model.ref_img_pt = match (
            kwl.get_f64(prefix, keys::REF_POINT_SAMP)?,
            kwl.get_f64(prefix, keys::REF_POINT_LINE)?,
        ) {
            (Some(samp), Some(line)) => ImagePoint::from_line_sample(line, samp),
            _ => model.image_clip_rect.midpoint(),
        };
        if let (Some(lat), Some(lon)) = (
            kwl.get_f64(prefix, keys::REF_POINT_LAT)?,
            kwl.get_f64(prefix, keys::REF_POINT_LON)?,
        ) {
            let hgt = kwl.get_f64(prefix, keys::REF_POINT_HGT)?;
            model.ref_gnd_pt = GeographicPoint::new(lat, lon, hgt);
        }

        let corner_keys = [
            (keys::UL_LAT, keys::UL_LON),
            (keys::UR_LAT, keys::UR_LON),
            (keys::LR_LAT, keys::LR_LON),
            (keys::LL_LAT, keys::LL_LON),
        ];
        let mut corners = Vec::with_capacity(4);
        for (lat_key, lon_key) in corner_keys {
            if let (Some(lat), Some(lon)) =
                (kwl.get_f64(prefix, lat_key)?, kwl.get_f64(prefix, lon_key)?)
            {
                corners.push(PlanarPoint::new(lon, lat));
            }
        }
        if corners.len() == 4 {
            model.bound_gnd_polygon = GroundPolygon::new(corners);
        }

        if let (Some(x), Some(y)) = (
            kwl.get_f64(prefix, keys::METERS_PER_PIXEL_X)?,
            kwl.get_f64(prefix, keys::METERS_PER_PIXEL_Y)?,
        ) {
            model.gsd = PlanarPoint::new(x, y);
            model.mean_gsd = (x.abs() + y.abs()) / 2.0;
        }

        model.ce90_absolute = kwl.get_f64(prefix, keys::CE90_ABSOLUTE)?.unwrap_or(0.0);
        model.ce90_relative = kwl
            .get_f64(prefix, keys::CE90_RELATIVE)?
            .unwrap_or(model.ce90_absolute);

        model.initialize_bounds()?;
        Ok(model)
    }

    pub fn save_state(&self, kwl: &mut KeywordList, prefix: &str) {
        kwl.add(prefix, keys::TYPE, self.geometry.type_name());
        kwl.add(prefix, keys::IMAGE_ID, &self.image_id);
        kwl.add(prefix, keys::SENSOR_ID, &self.sensor_id);
        kwl.add(prefix, keys::NUMBER_SAMPLES, self.samples);
        kwl.add(prefix, keys::NUMBER_LINES, self.lines);

        kwl.add(prefix, keys::REF_POINT_LAT, self.ref_gnd_pt.lat());
        kwl.add(prefix, keys::REF_POINT_LON, self.ref_gnd_pt.lon());
        kwl.add(prefix, keys::REF_POINT_HGT, self.ref_gnd_pt.height_or_zero());
        kwl.add(prefix, keys::REF_POINT_SAMP, self.ref_img_pt.samp());
        kwl.add(prefix, keys::REF_POINT_LINE, self.ref_img_pt.line());

        kwl.add(prefix, keys::METERS_PER_PIXEL_X, self.gsd.x);
        kwl.add(prefix, keys::METERS_PER_PIXEL_Y, self.gsd.y);

        if let [ul, ur, lr, ll] = self.bound_gnd_polygon.vertices() {
            let corners = [
                (keys::UL_LAT, keys::UL_LON, ul),
                (keys::UR_LAT, keys::UR_LON, ur),
                (keys::LR_LAT, keys::LR_LON, lr),
                (keys::LL_LAT, keys::LL_LON, ll),
            ];
            for (lat_key, lon_key, p) in corners {
                kwl.add(prefix, lat_key, p.y);
                kwl.add(prefix, lon_key, p.x);
            }
        }

        kwl.add(prefix, keys::CE90_ABSOLUTE, self.ce90_absolute);
        kwl.add(prefix, keys::CE90_RELATIVE, self.ce90_relative);
        let r = self.image_clip_rect;
        kwl.add(
            prefix,
            keys::RECT,
            format!("{} {} {} {}", r.ul.x, r.ul.y, r.lr.x, r.lr.y),
        );
        kwl.add_point(prefix, keys::SUB_IMAGE_OFFSET, self.sub_image_offset);

        self.params.save_state(kwl, prefix);
        self.geometry.save_state(kwl, prefix);
    }

    /// Measure whatever of the reference ground point, footprint and GSD is
    /// still undefined.
    pub fn initialize_bounds(&mut self) -> Result<(), GeoError> {
        let kind = self.geometry.type_name();
        let undefined = |what: &str| GeoError::Undefined(format!("{kind} {what}"));

        if self.ref_img_pt.has_nans() {
            self.ref_img_pt = self.image_clip_rect.midpoint();
        }
        if self.ref_gnd_pt.has_nans() {
            self.ref_gnd_pt = self
                .world_at(self.ref_img_pt)
                .ok_or_else(|| undefined("reference ground point"))?;
        }
        if self.bound_gnd_polygon.is_empty() || self.bound_gnd_polygon.has_nans() {
            let r = self.image_clip_rect;
            let corners = [
                r.ul,
                PlanarPoint::new(r.lr.x, r.ul.y),
                r.lr,
                PlanarPoint::new(r.ul.x, r.lr.y),
            ];
            let mut gpts = [GeographicPoint::default(); 4];
            for (gpt, corner) in gpts.iter_mut().zip(corners) {
                *gpt = self
                    .world_at(corner)
                    .ok_or_else(|| undefined("image corner"))?;
            }
            self.set_ground_rect(&gpts);
        }
        if self.gsd.has_nans() {
            self.compute_gsd()
                .ok_or_else(|| undefined("ground sample distance"))?;
        }
        Ok(())
    }

    /// Measure the GSD across the middle of the image: left to right edge
    /// for samples, top to bottom for lines, all at the terrain height of
    /// the left edge.
    pub fn compute_gsd(&mut self) -> Option<PlanarPoint> {
        let end_samp = if self.samples > 2 {
            self.samples as f64 - 1.0
        } else {
            1.0
        };
        let end_line = if self.lines > 2 {
            self.lines as f64 - 1.0
        } else {
            1.0
        };
        let (mid_samp, mid_line) = (end_samp / 2.0, end_line / 2.0);

        let left = self.world_at(PlanarPoint::new(0.0, mid_line))?;
        let h = left.height_or_zero();
        let right = self.world_at_height(PlanarPoint::new(end_samp, mid_line), h)?;
        let top = self.world_at_height(PlanarPoint::new(mid_samp, 0.0), h)?;
        let bottom = self.world_at_height(PlanarPoint::new(mid_samp, end_line), h)?;

        let gsd = PlanarPoint::new(
            left.distance_to(&right) / end_samp,
            top.distance_to(&bottom) / end_line,
        );
        if gsd.has_nans() {
            return None;
        }
        self.gsd = gsd;
        self.mean_gsd = (gsd.x + gsd.y) / 2.0;
        Some(gsd)
    }

    /// Set the clip rectangle (full-image coordinates) and move the reference
    /// image point to its middle.
    pub fn set_image_rect(&mut self, rect: ImageRect) {
        self.image_clip_rect = rect;
        self.ref_img_pt = rect.midpoint();
    }

    /// Set the ground footprint from the image corners in UL, UR, LR, LL order.
    pub fn set_ground_rect(&mut self, corners: &[GeographicPoint; 4]) {
        let wgs84 = corners.map(|g| g.on_datum(&WGS84_DATUM));
        self.bound_gnd_polygon = GroundPolygon::from_corners(&wgs84);
    }

    /// Replace the seed pair used by the ground-to-image solve.
    pub fn set_reference_point(&mut self, image: ImagePoint, ground: GeographicPoint) {
        self.ref_img_pt = image;
        self.ref_gnd_pt = ground.on_datum(&WGS84_DATUM);
    }

    /// Whether `image` (sub-image coordinates) is inside the clip rectangle.
    pub fn inside_image(&self, image: ImagePoint) -> bool {
        self.image_clip_rect.contains(image + self.sub_image_offset)
    }

    pub fn geometry(&self) -> &dyn SensorGeometry {
        self.geometry.as_ref()
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn set_image_id(&mut self, id: impl Into<String>) {
        self.image_id = id.into();
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn set_sensor_id(&mut self, id: impl Into<String>) {
        self.sensor_id = id.into();
    }

    /// (samples, lines)
    pub fn image_size(&self) -> (u32, u32) {
        (self.samples, self.lines)
    }

    pub fn sub_image_offset(&self) -> PlanarPoint {
        self.sub_image_offset
    }

    pub fn set_sub_image_offset(&mut self, offset: PlanarPoint) {
        self.sub_image_offset = offset;
    }

    pub fn ref_img_pt(&self) -> ImagePoint {
        self.ref_img_pt
    }

    pub fn ref_gnd_pt(&self) -> &GeographicPoint {
        &self.ref_gnd_pt
    }

    pub fn mean_gsd(&self) -> f64 {
        self.mean_gsd
    }

    pub fn bound_gnd_polygon(&self) -> &GroundPolygon {
        &self.bound_gnd_polygon
    }

    pub fn image_clip_rect(&self) -> &ImageRect {
        &self.image_clip_rect
    }

    /// Nominal absolute and relative position error (CE90, metres).
    pub fn position_error(&self) -> (f64, f64) {
        (self.ce90_absolute, self.ce90_relative)
    }

    pub fn set_position_error(&mut self, absolute: f64, relative: f64) {
        self.ce90_absolute = absolute;
        self.ce90_relative = relative;
    }

    pub fn adjustable_parameters(&self) -> &AdjustableParameters {
        &self.params
    }

    /// Set the normalized value of parameter `index` and re-apply the
    /// parameters to the geometry. False if the parameter is locked or absent.
    pub fn set_adjustable_parameter(&mut self, index: usize, value: f64) -> bool {
        if !self.params.set_value(index, value) {
            return false;
        }
        self.geometry.update_model(&self.params);
        true
    }

    pub fn reset_adjustable_parameters(&mut self) {
        self.params.reset();
        self.geometry.update_model(&self.params);
    }

    /// Ground-to-image with its convergence record. `None` for NaN input or
    /// when the geometry is undefined along the way.
    pub fn inverse_solution(&self, world: &GeographicPoint) -> Option<InverseSolution> {
        if world.has_nans() {
            return None;
        }
        let w = world.on_datum(&WGS84_DATUM);
        let polygon = &self.bound_gnd_polygon;
        let solution = if !polygon.is_empty()
            && !polygon.has_nans()
            && !polygon.contains(PlanarPoint::new(w.lon(), w.lat()))
        {
            InverseSolution {
                image: self.extrapolate_ground_full(&w)?,
                iterations: 0,
                residual: 0.0,
                converged: true,
                extrapolated: true,
            }
        } else {
            self.solve(&w)?
        };
        let image = solution.image - self.sub_image_offset;
        (!image.has_nans()).then_some(InverseSolution { image, ..solution })
    }

    /// Linear image-to-ground estimate for `image` (sub-image coordinates),
    /// from the model's rate of change just inside the clip rectangle along
    /// the radial from the reference image point. The height is `height`
    /// when given, otherwise looked up at the result.
    pub fn extrapolate_image(
        &self,
        image: ImagePoint,
        height: Option<f64>,
    ) -> Option<GeographicPoint> {
        self.extrapolate_image_full(image + self.sub_image_offset, height)
    }

    /// Linear ground-to-image estimate for a point outside the footprint,
    /// the counterpart of [`extrapolate_image`](Self::extrapolate_image) on
    /// the ground polygon.
    pub fn extrapolate_ground(&self, world: &GeographicPoint) -> Option<ImagePoint> {
        let w = world.on_datum(&WGS84_DATUM);
        Some(self.extrapolate_ground_full(&w)? - self.sub_image_offset)
    }

    fn outside_rect(&self, full: ImagePoint) -> bool {
        !self.image_clip_rect.has_nans() && !self.image_clip_rect.contains(full)
    }

    fn intersect(&self, full: ImagePoint) -> Option<GeographicPoint> {
        let ray = self.geometry.imaging_ray(full)?;
        self.elevation.intersect_ray(&ray)
    }

    fn world_at(&self, full: ImagePoint) -> Option<GeographicPoint> {
        if full.has_nans() {
            return None;
        }
        if self.outside_rect(full) {
            return self.extrapolate_image_full(full, None);
        }
        self.intersect(full)
    }

    fn world_at_height(&self, full: ImagePoint, height: f64) -> Option<GeographicPoint> {
        if full.has_nans() {
            return None;
        }
        if self.outside_rect(full) {
            return self.extrapolate_image_full(full, Some(height));
        }
        self.geometry.line_sample_height_to_world(full, height)
    }

    fn seed(&self) -> ImagePoint {
        if self.ref_img_pt.has_nans() {
            self.image_clip_rect.midpoint()
        } else {
            self.ref_img_pt
        }
    }

    fn extrapolate_image_full(
        &self,
        full: ImagePoint,
        height: Option<f64>,
    ) -> Option<GeographicPoint> {
        if full.has_nans() || self.image_clip_rect.has_nans() {
            return None;
        }
        let evaluate = |p: ImagePoint| match height {
            Some(h) => self.geometry.line_sample_height_to_world(p, h),
            None => self.intersect(p),
        };
        let reference = self.seed();
        let radial = full - reference;
        let len = radial.length();
        if !(len > 0.0) {
            return evaluate(full);
        }
        let (_, edge) = self.image_clip_rect.clip_segment(reference, full)?;

        // One-pixel steps back inside along the radial
        let eps = radial / len;
        let edge1 = edge - eps;
        let edge2 = edge1 - eps;
        let g1 = evaluate(edge1)?.on_datum(&WGS84_DATUM);
        let g2 = evaluate(edge2)?.on_datum(&WGS84_DATUM);

        let dist = (full - edge1).length();
        let mut gpt = GeographicPoint::new(
            g1.lat() + (g1.lat() - g2.lat()) * dist,
            g1.lon() + (g1.lon() - g2.lon()) * dist,
            None,
        );
        gpt.height = match height {
            Some(h) => Some(h),
            None => self.elevation.height_above_ellipsoid(&gpt),
        };
        log::trace!("extrapolated {full} from edge {edge} to {gpt}");
        (!gpt.has_nans()).then_some(gpt)
    }

    fn extrapolate_ground_full(&self, world: &GeographicPoint) -> Option<ImagePoint> {
        let polygon = &self.bound_gnd_polygon;
        if world.has_nans() || polygon.is_empty() || polygon.has_nans() {
            return None;
        }
        let target = PlanarPoint::new(world.lon(), world.lat());
        let reference = PlanarPoint::new(self.ref_gnd_pt.lon(), self.ref_gnd_pt.lat());
        let radial = target - reference;
        let len = radial.length();
        let step = self.mean_gsd * DEG_PER_MTR;
        if !(len > 0.0) || !(step > 0.0) {
            return None;
        }
        let (_, edge) = polygon.clip_segment(reference, target)?;

        let eps = radial / len * step;
        let edge1 = edge - eps;
        let edge2 = edge1 - eps;
        let h = world.height_or_zero();
        let at = |p: PlanarPoint| GeographicPoint::new(p.y, p.x, Some(h));
        let ip1 = self.solve(&at(edge1))?.image;
        let ip2 = self.solve(&at(edge2))?.image;

        let rate = (ip1 - ip2) / step;
        let ip = ip1 + rate * (target - edge1).length();
        (!ip.has_nans()).then_some(ip)
    }

    /// Newton iteration from the reference image point, in full-image
    /// coordinates. `target` must be on WGS 84.
    fn solve(&self, target: &GeographicPoint) -> Option<InverseSolution> {
        let h = target.height_or_zero();
        let ground = |p: ImagePoint| {
            self.world_at_height(p, h)
                .or_else(|| self.extrapolate_image_full(p, Some(h)))
                .map(|g| g.on_datum(&WGS84_DATUM))
        };

        let mut ip = self.seed();
        if ip.has_nans() {
            return None;
        }
        let mut step = PlanarPoint::new(f64::INFINITY, f64::INFINITY);
        let mut iterations = 0;
        let mut converged = false;
        while iterations < MAX_ITERATIONS {
            iterations += 1;
            let gp = ground(ip)?;
            let gp_du = ground(ip + PlanarPoint::new(1.0, 0.0))?;
            let gp_dv = ground(ip + PlanarPoint::new(0.0, 1.0))?;

            // Partials of (lat, lon) with respect to sample (u) and line (v)
            let e = gp_du.lat() - gp.lat();
            let g = gp_du.lon() - gp.lon();
            let f = gp_dv.lat() - gp.lat();
            let hh = gp_dv.lon() - gp.lon();
            let dlat = target.lat() - gp.lat();
            let dlon = target.lon() - gp.lon();

            let det = f * g - e * hh;
            let scale = (e * hh).abs().max((f * g).abs());
            if !(det.abs() > f64::EPSILON * scale) {
                log::debug!("singular partials at {ip}, stopping");
                step = PlanarPoint::new(0.0, 0.0);
                break;
            }
            step = PlanarPoint::new((-hh * dlat + f * dlon) / det, (g * dlat - e * dlon) / det);
            ip += step;
            log::trace!("iteration {iterations}: step {step} -> {ip}");
            if step.x.abs() < CONVERGENCE_PIXELS && step.y.abs() < CONVERGENCE_PIXELS {
                converged = true;
                break;
            }
        }
        if !converged {
            log::debug!(
                "ground-to-image for {target} not converged after {iterations} iterations, last step {step}"
            );
        }
        Some(InverseSolution {
            image: ip,
            iterations,
            residual: step.length(),
            converged,
            extrapolated: false,
        })
    }
}

impl GeodeticTransform for SensorModel {
    fn world_to_line_sample(&self, world: &GeographicPoint) -> Option<ImagePoint> {
        self.inverse_solution(world).map(|s| s.image)
    }

    fn line_sample_to_world(&self, image: ImagePoint) -> Option<GeographicPoint> {
        self.world_at(image + self.sub_image_offset)
            .filter(|g| !g.has_nans())
    }

    fn line_sample_height_to_world(
        &self,
        image: ImagePoint,
        height: f64,
    ) -> Option<GeographicPoint> {
        self.world_at_height(image + self.sub_image_offset, height)
            .filter(|g| !g.has_nans())
    }

    fn meters_per_pixel(&self) -> PlanarPoint {
        self.gsd
    }

    fn is_affected_by_elevation(&self) -> bool {
        true
    }
}

/// Rebuild a sensor model of the kind named by the `type` keyword.
pub fn from_keywords(
    kwl: &KeywordList,
    prefix: &str,
    elevation: Arc<dyn ElevationSource>,
) -> Result<SensorModel, GeoError> {
    let kind = kwl
        .find(prefix, keys::TYPE)
        .ok_or_else(|| GeoError::MissingKeyword(format!("{prefix}{}", keys::TYPE)))?;
    let geometry: Box<dyn SensorGeometry> = match kind.to_ascii_lowercase().as_str() {
        frame::FRAME_CAMERA => Box::new(FrameCamera::from_keywords(kwl, prefix)?),
        _ => {
            return Err(GeoError::InvalidValue {
                key: format!("{prefix}{}", keys::TYPE),
                value: kind.to_string(),
            })
        }
    };
    SensorModel::from_keywords(kwl, prefix, geometry, elevation)
}

/// `rect` as "ulx uly lrx lry".
fn load_rect(kwl: &KeywordList, prefix: &str) -> Result<Option<ImageRect>, GeoError> {
    let Some(raw) = kwl.find(prefix, keys::RECT) else {
        return Ok(None);
    };
    let invalid = || GeoError::InvalidValue {
        key: format!("{prefix}{}", keys::RECT),
        value: raw.to_string(),
    };
    let nums = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    match nums.as_slice() {
        [ulx, uly, lrx, lry] => Ok(Some(ImageRect::new(
            PlanarPoint::new(*ulx, *uly),
            PlanarPoint::new(*lrx, *lry),
        ))),
        _ => Err(invalid()),
    }
}
