use thiserror::Error;

/// Configuration/validation errors surfaced at startup (exit code 1).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required parameter '{0}' not provided via CLI or config file")]
    MissingParameter(String),

    #[error("invalid sync preset '{0}'")]
    InvalidPreset(String),

    #[error("base dir {0} does not exist")]
    BaseDirMissing(std::path::PathBuf),

    #[error("mac photos library dir {0} does not exist")]
    MacPhotosLibraryMissing(std::path::PathBuf),
}

/// Errors raised by the remote service HTTP layer (§7 taxonomy).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport error talking to the service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned an error status for {uri}: {status}")]
    Status {
        uri: String,
        status: reqwest::StatusCode,
    },

    #[error("upload of '{name}' failed: {message}")]
    UploadFailed { name: String, message: String },

    #[error("malformed response from the service: {0}")]
    MalformedResponse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
