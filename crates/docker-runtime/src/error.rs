//! Error types for docker-runtime

use janitor_core::RuntimeError;
use thiserror::Error;

/// Errors that can occur talking to the Docker daemon
#[derive(Error, Debug)]
pub enum DockerError {
    /// Endpoint URL has an unsupported scheme
    #[error("unsupported docker endpoint: {0}")]
    InvalidEndpoint(String),

    /// API version is neither `auto` nor `<major>.<minor>`
    #[error("invalid docker API version: {0}")]
    InvalidVersion(String),

    /// Error returned by the Engine API client
    #[error("docker API error: {0}")]
    Api(#[from] bollard::errors::Error),
}

/// Map an Engine API error for object `id` onto the janitor's taxonomy.
pub fn runtime_error(id: &str, err: bollard::errors::Error) -> RuntimeError {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound { id: id.to_string() },
        bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message,
        } => RuntimeError::Conflict {
            id: id.to_string(),
            message,
        },
        other => RuntimeError::Api(other.to_string()),
    }
}
