use thiserror::Error;

use vendops_core::DomainError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of an application service call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The named resource does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl ServiceError {
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Persistence(format!("record encoding: {e}"))
    }
}
