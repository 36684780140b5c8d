use thiserror::Error;

/// Failure to turn a persisted envelope back into a value.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed percent escape at byte {offset}")]
    MalformedEscape { offset: usize },
    #[error("decoded envelope is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("envelope json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("cookie line has no name=value pair: {0:?}")]
    MissingPair(String),
    #[error("invalid cookie name {0:?}")]
    InvalidName(String),
    #[error("invalid value for cookie attribute {attribute}: {value:?}")]
    InvalidAttribute { attribute: &'static str, value: String },
}
