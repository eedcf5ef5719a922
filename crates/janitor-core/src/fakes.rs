//! In-memory fakes for collaborator traits (testing only)
//!
//! Provides `MemoryRegistry` and `MemoryRuntime` that satisfy the trait
//! contracts without a registry server or a container daemon.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::collaborators::*;
use crate::error::{RegistryError, RuntimeError};

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

/// Registry fake that serves a fixed listing, or a fixed failure.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entries: Vec<RegistryEntry>,
    failure: Option<RegistryError>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve exactly these entries, in this order.
    pub fn with_entries(entries: Vec<RegistryEntry>) -> Self {
        Self {
            entries,
            failure: None,
        }
    }

    /// Fail every read with `KeyNotFound` for the requested path.
    pub fn missing() -> Self {
        Self {
            entries: Vec::new(),
            failure: Some(RegistryError::KeyNotFound {
                path: String::new(),
            }),
        }
    }

    /// Fail every read with the given error.
    pub fn failing(err: RegistryError) -> Self {
        Self {
            entries: Vec::new(),
            failure: Some(err),
        }
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn read(
        &self,
        path: &str,
        _recursive: bool,
        sorted: bool,
    ) -> RegistryResult<RegistryListing> {
        match &self.failure {
            Some(RegistryError::KeyNotFound { .. }) => Err(RegistryError::KeyNotFound {
                path: path.to_string(),
            }),
            Some(err) => Err(err.clone()),
            None => {
                let mut children: Vec<RegistryEntry> = self
                    .entries
                    .iter()
                    .filter(|e| e.key.starts_with(path))
                    .cloned()
                    .collect();
                if sorted {
                    children.sort_by(|a, b| a.key.cmp(&b.key));
                }
                Ok(RegistryListing { children })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryRuntime
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RuntimeState {
    images: Vec<Image>,
    containers: Vec<Container>,
    removed_images: Vec<String>,
    removed_containers: Vec<String>,
    failing_ids: Vec<String>,
}

/// Runtime fake backed by mutable image and container inventories.
///
/// Removing an id that is not present fails with `RuntimeError::NotFound`,
/// which is what a real daemon does for an already-removed object.
/// `list_containers` ignores the status filter: the fake's inventory is
/// assumed to hold only containers that match it.
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    state: Mutex<RuntimeState>,
}

impl MemoryRuntime {
    pub fn new(images: Vec<Image>, containers: Vec<Container>) -> Self {
        Self {
            state: Mutex::new(RuntimeState {
                images,
                containers,
                ..RuntimeState::default()
            }),
        }
    }

    /// Make every removal of `id` fail with an API error.
    pub fn fail_on(self, id: impl Into<String>) -> Self {
        self.state.lock().unwrap().failing_ids.push(id.into());
        self
    }

    /// Current image inventory.
    pub fn images(&self) -> Vec<Image> {
        self.state.lock().unwrap().images.clone()
    }

    /// Current container inventory.
    pub fn containers(&self) -> Vec<Container> {
        self.state.lock().unwrap().containers.clone()
    }

    /// Ids of images removed so far, in removal order.
    pub fn removed_images(&self) -> Vec<String> {
        self.state.lock().unwrap().removed_images.clone()
    }

    /// Ids of containers removed so far, in removal order.
    pub fn removed_containers(&self) -> Vec<String> {
        self.state.lock().unwrap().removed_containers.clone()
    }
}

#[async_trait]
impl RuntimeClient for MemoryRuntime {
    async fn list_images(&self) -> RuntimeResult<Vec<Image>> {
        Ok(self.images())
    }

    async fn list_containers(
        &self,
        _all: bool,
        _status_filter: Option<&str>,
    ) -> RuntimeResult<Vec<Container>> {
        Ok(self.containers())
    }

    async fn remove_image(&self, id: &str, _force: bool) -> RuntimeResult<ImageRemoval> {
        let mut state = self.state.lock().unwrap();
        if state.failing_ids.iter().any(|f| f == id) {
            return Err(RuntimeError::Api(format!("injected failure for {id}")));
        }
        let pos = state
            .images
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| RuntimeError::NotFound { id: id.to_string() })?;
        let image = state.images.remove(pos);
        state.removed_images.push(image.id.clone());
        Ok(ImageRemoval {
            untagged: image.repo_tags,
            deleted: vec![image.id],
        })
    }

    async fn remove_container(&self, id: &str, _remove_volumes: bool) -> RuntimeResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_ids.iter().any(|f| f == id) {
            return Err(RuntimeError::Api(format!("injected failure for {id}")));
        }
        let pos = state
            .containers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| RuntimeError::NotFound { id: id.to_string() })?;
        let container = state.containers.remove(pos);
        state.removed_containers.push(container.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_registry_missing_reports_path() {
        let registry = MemoryRegistry::missing();
        let err = registry.read("/deis/services/", true, true).await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::KeyNotFound {
                path: "/deis/services/".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_memory_registry_sorts_by_key() {
        let registry = MemoryRegistry::with_entries(vec![
            RegistryEntry::leaf("/deis/services/b/b_v2.web.1"),
            RegistryEntry::leaf("/deis/services/a/a_v1.web.1"),
        ]);
        let listing = registry.read("/deis/services/", true, true).await.unwrap();
        assert_eq!(listing.children[0].key, "/deis/services/a/a_v1.web.1");
    }

    #[tokio::test]
    async fn test_memory_runtime_remove_twice_is_not_found() {
        let runtime = MemoryRuntime::new(vec![Image::new("img1", ["a/b:v1"])], vec![]);
        runtime.remove_image("img1", true).await.unwrap();
        let err = runtime.remove_image("img1", true).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound { .. }));
        assert_eq!(runtime.removed_images(), vec!["img1".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_runtime_injected_failure() {
        let runtime = MemoryRuntime::new(vec![], vec![Container::new("c1", "/web", "Exited (0)")])
            .fail_on("c1");
        let err = runtime.remove_container("c1", true).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Api(_)));
        assert_eq!(runtime.containers().len(), 1);
    }
}
