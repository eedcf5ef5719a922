//! Error types for janitor-core

use thiserror::Error;

/// Errors raised while setting up the janitor engine.
///
/// Nothing that happens during a reconcile pass surfaces as a `JanitorError`:
/// per-item failures are logged and absorbed by the pass itself.
#[derive(Error, Debug)]
pub enum JanitorError {
    /// An exclusion pattern failed to compile
    #[error("invalid exclusion pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Failures reported by a service registry client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The requested path does not exist in the registry
    #[error("registry key not found: {path}")]
    KeyNotFound { path: String },

    /// The registry could not be reached
    #[error("registry transport error: {0}")]
    Transport(String),

    /// The registry answered with something we could not decode
    #[error("registry response could not be decoded: {0}")]
    Decode(String),
}

/// Failures reported by a container runtime client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// No image or container with this id
    #[error("no such object: {id}")]
    NotFound { id: String },

    /// The runtime refused the operation (object in use, etc.)
    #[error("conflict on {id}: {message}")]
    Conflict { id: String, message: String },

    /// Any other API or transport failure
    #[error("runtime API error: {0}")]
    Api(String),
}

/// Result type for janitor-core setup operations
pub type Result<T> = std::result::Result<T, JanitorError>;
