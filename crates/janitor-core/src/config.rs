//! Janitor configuration.
//!
//! The engine never reads the environment itself; the binary builds a
//! `JanitorConfig` and hands it over at construction.

use serde::{Deserialize, Serialize};

use crate::containers::{BUILDER_CONTAINER, BUILDER_DATA_CONTAINER};
use crate::decision::UNTAGGED;
use crate::exclusion::DEFAULT_EXCLUSION_PATTERNS;
use crate::executor::DeletionMode;
use crate::registry::SERVICES_PATH;
use crate::retention::DEFAULT_RETENTION_WINDOW;

/// Settings for one janitor instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorConfig {
    /// Versions kept per application, the running one included
    pub retention_window: u64,
    /// Actually remove images (otherwise log only)
    pub delete_images: bool,
    /// Actually remove containers (otherwise log only)
    pub delete_containers: bool,
    /// Registry path holding the service tree
    pub services_root: String,
    /// Protect-list used on registry-less nodes
    pub exclusion_patterns: Vec<String>,
    pub builder_container: String,
    pub builder_data_container: String,
    /// Tag the runtime reports for untagged images
    pub untagged_sentinel: String,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            retention_window: DEFAULT_RETENTION_WINDOW,
            delete_images: false,
            delete_containers: false,
            services_root: SERVICES_PATH.to_string(),
            exclusion_patterns: DEFAULT_EXCLUSION_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            builder_container: BUILDER_CONTAINER.to_string(),
            builder_data_container: BUILDER_DATA_CONTAINER.to_string(),
            untagged_sentinel: UNTAGGED.to_string(),
        }
    }
}

impl JanitorConfig {
    pub fn with_retention_window(mut self, window: u64) -> Self {
        self.retention_window = window;
        self
    }

    pub fn with_image_deletion(mut self, enabled: bool) -> Self {
        self.delete_images = enabled;
        self
    }

    pub fn with_container_deletion(mut self, enabled: bool) -> Self {
        self.delete_containers = enabled;
        self
    }

    pub fn deletion_mode(&self) -> DeletionMode {
        DeletionMode {
            images: self.delete_images,
            containers: self.delete_containers,
        }
    }
}
