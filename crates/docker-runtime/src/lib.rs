//! Docker-Runtime: container runtime access for the Deis janitor
//!
//! Implements `janitor_core::RuntimeClient` on the Docker Engine API via
//! bollard. Both unix-socket and TCP daemons are supported.

mod error;
mod runtime;

pub use error::{runtime_error, DockerError};
pub use runtime::{
    container_from_summary, image_from_summary, ApiVersion, DockerConfig, DockerRuntime, Endpoint,
};

/// Result type for docker-runtime operations
pub type Result<T> = std::result::Result<T, DockerError>;
