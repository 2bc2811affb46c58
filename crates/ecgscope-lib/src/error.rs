use thiserror::Error;

/// Failures surfaced by the windowing core and its storage collaborator.
#[derive(Debug, Error)]
pub enum EcgError {
    /// Unknown record, or a record without any usable lead.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid time range [{start}, {end}): start must be >= 0 and before end")]
    InvalidRange { start: f64, end: f64 },
    #[error("sample retrieval failed")]
    Retrieval(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EcgError>;
