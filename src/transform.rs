//! The image/world contract shared by map projections and sensor models.

use crate::point::{GeographicPoint, ImagePoint, PlanarPoint};

/// Bidirectional transform between image pixels and ground coordinates.
///
/// Every method returns `None` for an undefined result: NaN input, an
/// uncalibrated instance, or a point the model cannot represent. Callers can
/// map a whole batch and filter afterwards.
pub trait GeodeticTransform: Send + Sync {
    fn world_to_line_sample(&self, world: &GeographicPoint) -> Option<ImagePoint>;

    /// Ground point for `image`, with the height taken from the terrain where
    /// the model has access to it.
    fn line_sample_to_world(&self, image: ImagePoint) -> Option<GeographicPoint>;

    /// Ground point for `image` at the given ellipsoid height.
    fn line_sample_height_to_world(
        &self,
        image: ImagePoint,
        height: f64,
    ) -> Option<GeographicPoint>;

    /// Nominal ground sample distance (metres) along sample and line.
    fn meters_per_pixel(&self) -> PlanarPoint;

    /// Whether the image/world mapping changes with terrain height.
    fn is_affected_by_elevation(&self) -> bool;
}

/// Ground positions of the four image corners in UL, UR, LR, LL order, as
/// needed for image-corner geolocation tags.
pub fn image_corners(
    transform: &dyn GeodeticTransform,
    samples: u32,
    lines: u32,
) -> Option<[GeographicPoint; 4]> {
    if samples == 0 || lines == 0 {
        return None;
    }
    let (right, bottom) = (samples as f64 - 1.0, lines as f64 - 1.0);
    Some([
        transform.line_sample_to_world(ImagePoint::new(0.0, 0.0))?,
        transform.line_sample_to_world(ImagePoint::new(right, 0.0))?,
        transform.line_sample_to_world(ImagePoint::new(right, bottom))?,
        transform.line_sample_to_world(ImagePoint::new(0.0, bottom))?,
    ])
}
