use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the secret repository.
///
/// Nothing is retried internally; every variant is handed back to the caller,
/// which decides what (if anything) to expose.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{field} contains invalid characters: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },
    #[error("namespace {requested:?} does not match the credential namespace {bound:?}")]
    NamespaceMismatch { requested: String, bound: String },
    #[error("kubernetes api request failed: {0}")]
    Transport(String),
    #[error("kubernetes api returned {actual}, expected {expected}")]
    UnexpectedStatus { expected: u16, actual: u16 },
    #[error("failed to decode kubernetes api response: {0}")]
    Decode(String),
    #[error("failed to encode kubernetes api request: {0}")]
    Encode(String),
    #[error("secret resource {resource} is malformed: {reason}")]
    Integrity { resource: String, reason: String },
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn integrity(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Integrity {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// True for failures caused by the caller's input rather than the platform.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidIdentifier { .. }
                | Error::NamespaceMismatch { .. }
                | Error::NotFound { .. }
        )
    }
}
