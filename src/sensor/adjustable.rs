//! Adjustable parameters: the small correction vector refined by bundle
//! adjustment or registration.
//!
//! Each parameter's effective value is `center + value * sigma`, so `value`
//! is dimensionless and zero means "no correction".

use crate::error::GeoError;
use crate::keywords::{keys, KeywordList};

const DESCRIPTION: &str = "description";
const UNITS: &str = "units";
const CENTER: &str = "center";
const SIGMA: &str = "sigma";
const VALUE: &str = "value";
const LOCKED: &str = "locked";

#[derive(Clone, Debug, PartialEq)]
pub struct AdjustableParameter {
    pub description: String,
    pub units: String,
    pub center: f64,
    pub sigma: f64,
    pub value: f64,
    pub locked: bool,
}

impl AdjustableParameter {
    pub fn new(description: impl Into<String>, units: impl Into<String>, sigma: f64) -> Self {
        Self {
            description: description.into(),
            units: units.into(),
            center: 0.0,
            sigma,
            value: 0.0,
            locked: false,
        }
    }

    /// Effective value in `units`.
    pub fn compute(&self) -> f64 {
        self.center + self.value * self.sigma
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdjustableParameters {
    params: Vec<AdjustableParameter>,
}

impl AdjustableParameters {
    pub fn new(params: Vec<AdjustableParameter>) -> Self {
        Self { params }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AdjustableParameter> {
        self.params.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdjustableParameter> {
        self.params.iter()
    }

    /// Effective value of parameter `index`, 0 if there is no such parameter.
    pub fn compute(&self, index: usize) -> f64 {
        self.params.get(index).map_or(0.0, AdjustableParameter::compute)
    }

    /// Set the normalized value of parameter `index`. Returns false if the
    /// index is out of range or the parameter is locked.
    pub fn set_value(&mut self, index: usize, value: f64) -> bool {
        match self.params.get_mut(index) {
            Some(p) if !p.locked => {
                p.value = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_locked(&mut self, index: usize, locked: bool) {
        if let Some(p) = self.params.get_mut(index) {
            p.locked = locked;
        }
    }

    /// Zero every unlocked value.
    pub fn reset(&mut self) {
        for p in self.params.iter_mut().filter(|p| !p.locked) {
            p.value = 0.0;
        }
    }

    /// Records go under `adj_param_N.`, numbered from zero.
    pub fn save_state(&self, kwl: &mut KeywordList, prefix: &str) {
        for (i, p) in self.params.iter().enumerate() {
            let record = format!("{prefix}{}{i}.", keys::ADJ_PARAM_PREFIX);
            kwl.add(&record, DESCRIPTION, &p.description);
            kwl.add(&record, UNITS, &p.units);
            kwl.add(&record, CENTER, p.center);
            kwl.add(&record, SIGMA, p.sigma);
            kwl.add(&record, VALUE, p.value);
            kwl.add(&record, LOCKED, p.locked);
        }
    }

    /// Read consecutive records until the first missing description.
    pub fn from_keywords(kwl: &KeywordList, prefix: &str) -> Result<Self, GeoError> {
        let mut params = Vec::new();
        for i in 0.. {
            let record = format!("{prefix}{}{i}.", keys::ADJ_PARAM_PREFIX);
            let Some(description) = kwl.find(&record, DESCRIPTION) else {
                break;
            };
            params.push(AdjustableParameter {
                description: description.to_string(),
                units: kwl.find(&record, UNITS).unwrap_or_default().to_string(),
                center: kwl.get_f64(&record, CENTER)?.unwrap_or(0.0),
                sigma: kwl.get_f64(&record, SIGMA)?.unwrap_or(0.0),
                value: kwl.get_f64(&record, VALUE)?.unwrap_or(0.0),
                locked: kwl.get_bool(&record, LOCKED)?.unwrap_or(false),
            });
        }
        Ok(Self { params })
    }
}
