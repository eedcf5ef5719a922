//! Collaborator trait definitions for the janitor
//!
//! These traits define the two external systems a reconcile pass talks to:
//! - `RegistryClient`: Hierarchical key read from the service registry
//! - `RuntimeClient`: Image/container listing and removal on the local runtime
//!
//! Both are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RuntimeError};

/// Result type for registry reads
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type for runtime calls
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

// ---------------------------------------------------------------------------
// RegistryClient — hierarchical service registry
// ---------------------------------------------------------------------------

/// One node returned by a recursive registry read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Absolute key, e.g. `/deis/services/madrobot/madrobot_v187.web.1`
    pub key: String,
    /// Whether the node is a directory
    pub dir: bool,
    /// Number of direct children (always 0 for leaves)
    pub child_count: usize,
}

impl RegistryEntry {
    pub fn leaf(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            dir: false,
            child_count: 0,
        }
    }

    pub fn empty_dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            dir: true,
            child_count: 0,
        }
    }

    /// A directory node with no descendants.
    pub fn is_empty_dir(&self) -> bool {
        self.dir && self.child_count == 0
    }
}

/// Flattened result of a recursive registry read.
///
/// `children` holds every leaf under the requested path plus every empty
/// directory, in the order the registry returned them. The requested path
/// itself is never listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryListing {
    pub children: Vec<RegistryEntry>,
}

/// Read-only access to the service registry.
///
/// Guarantees:
/// - A missing path fails with `RegistryError::KeyNotFound`.
/// - With `sorted = true`, siblings are returned in key order.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn read(&self, path: &str, recursive: bool, sorted: bool)
        -> RegistryResult<RegistryListing>;
}

// ---------------------------------------------------------------------------
// RuntimeClient — local container runtime
// ---------------------------------------------------------------------------

/// An image as listed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    /// Repository tags in runtime order; any one of them may trigger deletion.
    pub repo_tags: Vec<String>,
}

impl Image {
    pub fn new<I, S>(id: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            repo_tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// A container as listed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    /// Names as reported by the runtime, with their leading slash.
    pub names: Vec<String>,
    pub status: String,
}

impl Container {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            names: vec![name.into()],
            status: status.into(),
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// What the runtime reports after removing an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRemoval {
    pub untagged: Vec<String>,
    pub deleted: Vec<String>,
}

/// Container runtime operations used by a reconcile pass.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// All images known to the runtime.
    async fn list_images(&self) -> RuntimeResult<Vec<Image>>;

    /// Containers, optionally including stopped ones, filtered by status
    /// (e.g. `"exited"`) when a filter is given.
    async fn list_containers(
        &self,
        all: bool,
        status_filter: Option<&str>,
    ) -> RuntimeResult<Vec<Container>>;

    async fn remove_image(&self, id: &str, force: bool) -> RuntimeResult<ImageRemoval>;

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> RuntimeResult<()>;
}
