//! Flat key/value parameter lists used to persist projections and sensor models.
//!
//! Every field is stored as a string under `prefix + key`. Lists parse from and
//! print to a simple line format:
//!
//! ```text
//! type: utm
//! zone: 31
//! meters_per_pixel_x: 10
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::GeoError;
use crate::point::PlanarPoint;

/// Well-known keyword names.
pub mod keys {
    pub const TYPE: &str = "type";
    pub const ORIGIN_LATITUDE: &str = "origin_latitude";
    pub const CENTRAL_MERIDIAN: &str = "central_meridian";
    pub const MAJOR_AXIS: &str = "major_axis";
    pub const MINOR_AXIS: &str = "minor_axis";
    pub const ELLIPSE_CODE: &str = "ellipse_code";
    pub const DATUM: &str = "datum";
    pub const PCS_CODE: &str = "pcs_code";
    pub const ZONE: &str = "zone";
    pub const HEMISPHERE: &str = "hemisphere";
    pub const SCALE_FACTOR: &str = "scale_factor";
    pub const STD_PARALLEL_1: &str = "std_parallel_1";
    pub const FALSE_EASTING_NORTHING: &str = "false_easting_northing";
    pub const FALSE_EASTING_NORTHING_UNITS: &str = "false_easting_northing_units";

    pub const TIE_POINT_XY: &str = "tie_point_xy";
    pub const TIE_POINT_UNITS: &str = "tie_point_units";
    pub const PIXEL_SCALE_XY: &str = "pixel_scale_xy";
    pub const PIXEL_SCALE_UNITS: &str = "pixel_scale_units";
    pub const PIXEL_TYPE: &str = "pixel_type";
    pub const ELEVATION_LOOKUP_FLAG: &str = "elevation_lookup_flag";

    // Legacy calibration keys.
    pub const METERS_PER_PIXEL_X: &str = "meters_per_pixel_x";
    pub const METERS_PER_PIXEL_Y: &str = "meters_per_pixel_y";
    pub const DECIMAL_DEGREES_PER_PIXEL_LAT: &str = "decimal_degrees_per_pixel_lat";
    pub const DECIMAL_DEGREES_PER_PIXEL_LON: &str = "decimal_degrees_per_pixel_lon";
    pub const TIE_POINT_EASTING: &str = "tie_point_easting";
    pub const TIE_POINT_NORTHING: &str = "tie_point_northing";
    pub const TIE_POINT_LAT: &str = "tie_point_lat";
    pub const TIE_POINT_LON: &str = "tie_point_lon";

    // Sensor models.
    pub const IMAGE_ID: &str = "image_id";
    pub const SENSOR_ID: &str = "sensor";
    pub const NUMBER_LINES: &str = "number_lines";
    pub const NUMBER_SAMPLES: &str = "number_samples";
    pub const REF_POINT_LAT: &str = "ref_point_lat";
    pub const REF_POINT_LON: &str = "ref_point_lon";
    pub const REF_POINT_HGT: &str = "ref_point_hgt";
    pub const REF_POINT_LINE: &str = "ref_point_line";
    pub const REF_POINT_SAMP: &str = "ref_point_samp";
    pub const UL_LAT: &str = "ul_lat";
    pub const UL_LON: &str = "ul_lon";
    pub const UR_LAT: &str = "ur_lat";
    pub const UR_LON: &str = "ur_lon";
    pub const LR_LAT: &str = "lr_lat";
    pub const LR_LON: &str = "lr_lon";
    pub const LL_LAT: &str = "ll_lat";
    pub const LL_LON: &str = "ll_lon";
    pub const CE90_ABSOLUTE: &str = "ce90_absolute";
    pub const CE90_RELATIVE: &str = "ce90_relative";
    pub const RECT: &str = "rect";
    pub const SUB_IMAGE_OFFSET: &str = "sub_image_offset";
    pub const ADJ_PARAM_PREFIX: &str = "adj_param_";
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeywordList {
    map: BTreeMap<String, String>,
}

impl KeywordList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn add(&mut self, prefix: &str, key: &str, value: impl ToString) {
        self.map.insert(format!("{prefix}{key}"), value.to_string());
    }

    pub fn add_point(&mut self, prefix: &str, key: &str, p: PlanarPoint) {
        self.add(prefix, key, format!("{} {}", p.x, p.y));
    }

    pub fn remove(&mut self, prefix: &str, key: &str) -> Option<String> {
        self.map.remove(&format!("{prefix}{key}"))
    }

    pub fn find(&self, prefix: &str, key: &str) -> Option<&str> {
        self.map
            .get(&format!("{prefix}{key}"))
            .map(|v| v.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a value; `Ok(None)` if the key is absent.
    pub fn get<T: FromStr>(&self, prefix: &str, key: &str) -> Result<Option<T>, GeoError> {
        match self.find(prefix, key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| GeoError::InvalidValue {
                key: format!("{prefix}{key}"),
                value: raw.to_string(),
            }),
        }
    }

    pub fn get_f64(&self, prefix: &str, key: &str) -> Result<Option<f64>, GeoError> {
        self.get(prefix, key)
    }

    pub fn require_f64(&self, prefix: &str, key: &str) -> Result<f64, GeoError> {
        self.get_f64(prefix, key)?
            .ok_or_else(|| GeoError::MissingKeyword(format!("{prefix}{key}")))
    }

    /// Two numbers separated by whitespace or a comma, optionally in parentheses.
    pub fn get_point(&self, prefix: &str, key: &str) -> Result<Option<PlanarPoint>, GeoError> {
        let Some(raw) = self.find(prefix, key) else {
            return Ok(None);
        };
        let invalid = || GeoError::InvalidValue {
            key: format!("{prefix}{key}"),
            value: raw.to_string(),
        };
        let nums = raw
            .trim_matches(|c| c == '(' || c == ')')
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        match nums.as_slice() {
            [x, y] => Ok(Some(PlanarPoint::new(*x, *y))),
            _ => Err(invalid()),
        }
    }

    pub fn get_bool(&self, prefix: &str, key: &str) -> Result<Option<bool>, GeoError> {
        let Some(raw) = self.find(prefix, key) else {
            return Ok(None);
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(GeoError::InvalidValue {
                key: format!("{prefix}{key}"),
                value: raw.to_string(),
            }),
        }
    }

    pub fn get_unit(&self, prefix: &str, key: &str) -> Result<Option<Unit>, GeoError> {
        self.find(prefix, key).map(str::parse::<Unit>).transpose()
    }
}

impl FromStr for KeywordList {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut kwl = KeywordList::new();
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| GeoError::InvalidValue {
                key: "<line>".to_string(),
                value: line.to_string(),
            })?;
            kwl.add("", key.trim(), value.trim());
        }
        Ok(kwl)
    }
}

impl fmt::Display for KeywordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.map {
            writeln!(f, "{k}: {v}")?;
        }
        Ok(())
    }
}

/// Units accepted for tie points, pixel scales and snapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Meters,
    Feet,
    UsSurveyFeet,
    Degrees,
    Radians,
    Minutes,
    Seconds,
}

const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;
const FOOT: f64 = 0.3048;

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Meters => "meters",
            Unit::Feet => "feet",
            Unit::UsSurveyFeet => "us_survey_feet",
            Unit::Degrees => "degrees",
            Unit::Radians => "radians",
            Unit::Minutes => "minutes",
            Unit::Seconds => "seconds",
        }
    }

    pub fn is_angular(&self) -> bool {
        matches!(
            self,
            Unit::Degrees | Unit::Radians | Unit::Minutes | Unit::Seconds
        )
    }

    /// Linear value in metres, `None` for angular units.
    pub fn to_meters(&self, value: f64) -> Option<f64> {
        match self {
            Unit::Meters => Some(value),
            Unit::Feet => Some(value * FOOT),
            Unit::UsSurveyFeet => Some(value * US_SURVEY_FOOT),
            _ => None,
        }
    }

    /// Angular value in degrees, `None` for linear units.
    pub fn to_degrees(&self, value: f64) -> Option<f64> {
        match self {
            Unit::Degrees => Some(value),
            Unit::Radians => Some(value.to_degrees()),
            Unit::Minutes => Some(value / 60.0),
            Unit::Seconds => Some(value / 3600.0),
            _ => None,
        }
    }
}

impl FromStr for Unit {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "meters" | "meter" | "metres" | "m" => Ok(Unit::Meters),
            "feet" | "foot" | "ft" | "international_feet" => Ok(Unit::Feet),
            "us_survey_feet" | "us_survey_foot" | "us_ft" => Ok(Unit::UsSurveyFeet),
            "degrees" | "degree" | "deg" => Ok(Unit::Degrees),
            "radians" | "radian" | "rad" => Ok(Unit::Radians),
            "minutes" | "arc_minutes" => Ok(Unit::Minutes),
            "seconds" | "arc_seconds" => Ok(Unit::Seconds),
            other => Err(GeoError::UnknownUnit(other.to_string())),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
