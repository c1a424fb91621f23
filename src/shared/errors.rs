use thiserror::Error;

/// Domain-level error type. Protocol-level faults are data (`CALL_ERROR`
/// frames), not Rust errors — this type covers genuine domain rejections
/// and structural faults.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),
}

/// Convenience alias for fallible domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
