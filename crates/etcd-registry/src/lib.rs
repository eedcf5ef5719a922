//! Etcd-Registry: service registry access for the Deis janitor
//!
//! Implements `janitor_core::RegistryClient` on top of the etcd v2 keys
//! HTTP API, which is where the platform publishes running app instances.

mod client;
mod error;

pub use client::{EtcdClient, EtcdConfig, EtcdNode, EtcdResponse};
pub use error::{EtcdError, KEY_NOT_FOUND};

/// Result type for etcd-registry operations
pub type Result<T> = std::result::Result<T, EtcdError>;
