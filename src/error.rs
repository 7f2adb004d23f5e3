use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Projection error: {0}")]
    Projection(#[from] ProjError),

    #[error("Missing keyword: {0}")]
    MissingKeyword(String),

    #[error("Invalid value for keyword {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown datum code: {0}")]
    UnknownDatum(String),

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Model is undefined: {0}")]
    Undefined(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjError {
    #[error("Unknown projection: {0}")]
    UnknownProjection(String),

    #[error("Point outside projection domain: {0}")]
    OutOfDomain(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
