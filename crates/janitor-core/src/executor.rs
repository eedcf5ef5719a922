//! Best-effort removal of images and containers.
//!
//! Every call returns a [`DeletionOutcome`]; runtime errors are logged with
//! the object id and never propagate, so one bad object cannot stop a batch.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::collaborators::{Container, Image, RuntimeClient};

/// Result of one removal attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum DeletionOutcome {
    Deleted,
    SkippedDryRun,
    Failed(String),
}

impl DeletionOutcome {
    /// Dry runs count as success.
    pub fn is_success(&self) -> bool {
        !matches!(self, DeletionOutcome::Failed(_))
    }
}

/// Which object kinds may actually be removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionMode {
    pub images: bool,
    pub containers: bool,
}

/// Applies removal decisions against a runtime.
pub struct DeletionExecutor<'a> {
    runtime: &'a dyn RuntimeClient,
    mode: DeletionMode,
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(runtime: &'a dyn RuntimeClient, mode: DeletionMode) -> Self {
        Self { runtime, mode }
    }

    /// Force-remove an image, or just report it in dry-run mode.
    pub async fn delete_image(&self, image: &Image) -> DeletionOutcome {
        if !self.mode.images {
            info!(id = %image.id, tags = ?image.repo_tags, "dry run, would delete image");
            return DeletionOutcome::SkippedDryRun;
        }

        info!(id = %image.id, tags = ?image.repo_tags, "deleting image");
        match self.runtime.remove_image(&image.id, true).await {
            Ok(removal) => {
                info!(
                    id = %image.id,
                    untagged = ?removal.untagged,
                    deleted = ?removal.deleted,
                    "image removed"
                );
                DeletionOutcome::Deleted
            }
            Err(e) => {
                error!(id = %image.id, error = %e, "error deleting image");
                DeletionOutcome::Failed(e.to_string())
            }
        }
    }

    /// Remove a container and its anonymous volumes, or just report it in
    /// dry-run mode.
    pub async fn delete_container(&self, container: &Container) -> DeletionOutcome {
        if !self.mode.containers {
            info!(
                id = %container.id,
                names = ?container.names,
                status = %container.status,
                "dry run, would delete container"
            );
            return DeletionOutcome::SkippedDryRun;
        }

        info!(
            id = %container.id,
            names = ?container.names,
            status = %container.status,
            "deleting container"
        );
        match self.runtime.remove_container(&container.id, true).await {
            Ok(()) => DeletionOutcome::Deleted,
            Err(e) => {
                error!(id = %container.id, error = %e, "error deleting container");
                DeletionOutcome::Failed(e.to_string())
            }
        }
    }
}
