use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShapeError>;

/// Failures of a single classify → validate → reshape pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("Malformed query result: {reason}")]
    MalformedResult { reason: String },
    #[error("Unsupported NRQL query for {chart} chart: {description}")]
    UnsupportedQueryShape { chart: String, description: String },
    #[error("{message}")]
    QuerySyntaxError { message: String },
    #[error("Query returned no results")]
    EmptyResult,
}

impl ShapeError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResult { reason: reason.into() }
    }
}
