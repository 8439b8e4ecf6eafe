use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure kinds surfaced by the transfer, grant and bucket services.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Backend rejected request: {0}")]
    Rejected(String),

    #[error("Local I/O failure: {context}: {source}")]
    LocalIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Signing failure: {0}")]
    SigningFailure(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn local_io(context: impl Into<String>, source: std::io::Error) -> Self {
        GatewayError::LocalIo {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}
