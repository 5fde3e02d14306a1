use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(i64),

    #[error("{0}")]
    DeviceConflict(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Repository error: {0:#}")]
    RepositoryError(#[from] anyhow::Error),
}
