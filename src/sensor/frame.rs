//! Frame camera: a pinhole at a fixed platform position, looking straight
//! down, with roll/pitch/yaw corrections as its adjustable parameters.
//!
//! Camera axes are sample (east), line (south) and boresight (down) in the
//! local level frame at the platform. Attitude corrections rotate the
//! camera about those axes.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::error::GeoError;
use crate::keywords::KeywordList;
use crate::point::{GeographicPoint, ImagePoint};
use crate::proj::datum::WGS84_DATUM;
use crate::proj::ellipsoid::WGS84;
use crate::ray::EcefRay;
use crate::sensor::{AdjustableParameter, AdjustableParameters, SensorGeometry};

pub const FRAME_CAMERA: &str = "frame_camera";

const PLATFORM_LAT: &str = "platform_lat";
const PLATFORM_LON: &str = "platform_lon";
const PLATFORM_HGT: &str = "platform_hgt";
const FOCAL_LENGTH: &str = "focal_length";
const PRINCIPAL_POINT: &str = "principal_point";

const ATTITUDE_SIGMA_DEG: f64 = 0.01;
const HEIGHT_TOLERANCE_M: f64 = 1e-6;
const HEIGHT_ITERATIONS: usize = 4;

#[derive(Clone, Debug)]
pub struct FrameCamera {
    platform: GeographicPoint,
    /// Pixels.
    focal_length: f64,
    principal_point: ImagePoint,
    camera_to_ecef: Matrix3<f64>,
}

impl FrameCamera {
    /// `platform` carries the camera height above the ellipsoid.
    pub fn nadir(platform: GeographicPoint, focal_length: f64, principal_point: ImagePoint) -> Self {
        let mut camera = Self {
            platform: platform.on_datum(&WGS84_DATUM),
            focal_length,
            principal_point,
            camera_to_ecef: Matrix3::identity(),
        };
        camera.orient(0.0, 0.0, 0.0);
        camera
    }

    pub fn from_keywords(kwl: &KeywordList, prefix: &str) -> Result<Self, GeoError> {
        let platform = GeographicPoint::new(
            kwl.require_f64(prefix, PLATFORM_LAT)?,
            kwl.require_f64(prefix, PLATFORM_LON)?,
            Some(kwl.require_f64(prefix, PLATFORM_HGT)?),
        );
        let principal_point = kwl
            .get_point(prefix, PRINCIPAL_POINT)?
            .ok_or_else(|| GeoError::MissingKeyword(format!("{prefix}{PRINCIPAL_POINT}")))?;
        Ok(Self::nadir(
            platform,
            kwl.require_f64(prefix, FOCAL_LENGTH)?,
            principal_point,
        ))
    }

    pub fn platform(&self) -> &GeographicPoint {
        &self.platform
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Attitude angles in radians.
    fn orient(&mut self, roll: f64, pitch: f64, yaw: f64) {
        let (sin_phi, cos_phi) = self.platform.lat().to_radians().sin_cos();
        let (sin_lam, cos_lam) = self.platform.lon().to_radians().sin_cos();
        let east = Vector3::new(-sin_lam, cos_lam, 0.0);
        let north = Vector3::new(-sin_phi * cos_lam, -sin_phi * sin_lam, cos_phi);
        let up = Vector3::new(cos_phi * cos_lam, cos_phi * sin_lam, sin_phi);

        let level = Matrix3::from_columns(&[east, -north, -up]);
        let attitude = Rotation3::from_euler_angles(roll, pitch, yaw);
        self.camera_to_ecef = level * attitude.matrix();
    }

    /// Ray from the perspective centre through `image`.
    fn line_of_sight(&self, image: ImagePoint) -> Option<EcefRay> {
        if image.has_nans() {
            return None;
        }
        let pixel = Vector3::new(
            (image.samp() - self.principal_point.x) / self.focal_length,
            (image.line() - self.principal_point.y) / self.focal_length,
            1.0,
        );
        EcefRay::new(self.platform.to_ecef(), self.camera_to_ecef * pixel)
    }
}

impl SensorGeometry for FrameCamera {
    fn line_sample_height_to_world(
        &self,
        image: ImagePoint,
        height: f64,
    ) -> Option<GeographicPoint> {
        if image.has_nans() || !height.is_finite() {
            return None;
        }
        if height >= self.platform.height_or_zero() {
            return None;
        }
        let ray = self.line_of_sight(image)?;

        // The raised ellipsoid is not a constant-height surface; correct the
        // offset until the geodetic height matches.
        let mut offset = height;
        let mut gpt = ray
            .intersect_ellipsoid(&WGS84, offset)?
            .to_geographic(&WGS84_DATUM);
        for _ in 0..HEIGHT_ITERATIONS {
            let error = height - gpt.height_or_zero();
            if error.abs() < HEIGHT_TOLERANCE_M {
                break;
            }
            offset += error;
            gpt = ray
                .intersect_ellipsoid(&WGS84, offset)?
                .to_geographic(&WGS84_DATUM);
        }
        gpt.height = Some(height);
        Some(gpt)
    }

    /// Starts at the platform, so cameras flying below the default ray
    /// origin height still have a line of sight.
    fn imaging_ray(&self, image: ImagePoint) -> Option<EcefRay> {
        self.line_of_sight(image)
    }

    fn default_parameters(&self) -> AdjustableParameters {
        AdjustableParameters::new(
            ["roll", "pitch", "yaw"]
                .into_iter()
                .map(|name| AdjustableParameter::new(name, "degrees", ATTITUDE_SIGMA_DEG))
                .collect(),
        )
    }

    fn update_model(&mut self, params: &AdjustableParameters) {
        self.orient(
            params.compute(0).to_radians(),
            params.compute(1).to_radians(),
            params.compute(2).to_radians(),
        );
    }

    fn type_name(&self) -> &'static str {
        FRAME_CAMERA
    }

    fn save_state(&self, kwl: &mut KeywordList, prefix: &str) {
        kwl.add(prefix, PLATFORM_LAT, self.platform.lat());
        kwl.add(prefix, PLATFORM_LON, self.platform.lon());
        kwl.add(prefix, PLATFORM_HGT, self.platform.height_or_zero());
        kwl.add(prefix, FOCAL_LENGTH, self.focal_length);
        kwl.add_point(prefix, PRINCIPAL_POINT, self.principal_point);
    }
}
