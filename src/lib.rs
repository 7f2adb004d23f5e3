pub mod error;
pub mod affine;
pub mod elevation;
pub mod geometry;
pub mod keywords;
pub mod map_projection;
pub mod point;
pub mod proj;
pub mod ray;
pub mod sensor;
pub mod transform;

pub use error::{GeoError, ProjError};
pub use keywords::{KeywordList, Unit};
pub use map_projection::MapProjection;
pub use point::{EcefPoint, GeographicPoint, ImagePoint, PlanarPoint};
pub use sensor::{InverseSolution, SensorGeometry, SensorModel};
pub use transform::{image_corners, GeodeticTransform};
