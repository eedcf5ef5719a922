//! Reconcile passes: the janitor's two entry points.
//!
//! A pass snapshots everything it needs up front (version map, images,
//! exited containers), then walks images and containers sequentially.
//! Passes must not overlap on the same runtime; the caller schedules them.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::collaborators::{Container, Image, RegistryClient, RuntimeClient};
use crate::config::JanitorConfig;
use crate::containers::ContainerClassifier;
use crate::decision::{Decision, ImagePolicy};
use crate::error::Result;
use crate::exclusion::ExclusionFilter;
use crate::executor::{DeletionExecutor, DeletionOutcome};
use crate::registry::build_version_map;
use crate::retention::RetentionPolicy;

/// Status filter used when listing containers for cleanup.
pub const EXITED: &str = "exited";

/// Which entry point a janitor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Worker node: version map from the registry, plus container cleanup.
    Registry,
    /// Control-plane node: protect-list only, images only.
    RegistryLess,
}

impl std::fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileMode::Registry => write!(f, "registry"),
            ReconcileMode::RegistryLess => write!(f, "registry-less"),
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    deleted: usize,
    dry_run: usize,
    failed: usize,
    kept: usize,
}

impl Tally {
    fn record(&mut self, outcome: &DeletionOutcome) {
        match outcome {
            DeletionOutcome::Deleted => self.deleted += 1,
            DeletionOutcome::SkippedDryRun => self.dry_run += 1,
            DeletionOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Reconciles a container runtime against the service registry.
pub struct Janitor {
    runtime: Arc<dyn RuntimeClient>,
    registry: Option<Arc<dyn RegistryClient>>,
    config: JanitorConfig,
    policy: ImagePolicy,
    classifier: ContainerClassifier,
}

impl Janitor {
    /// Registry-less janitor. Fails only on an invalid exclusion pattern.
    pub fn new(runtime: Arc<dyn RuntimeClient>, config: JanitorConfig) -> Result<Self> {
        let exclusions = ExclusionFilter::new(&config.exclusion_patterns)?;
        let policy = ImagePolicy::new(
            RetentionPolicy::new(config.retention_window),
            exclusions,
            config.untagged_sentinel.clone(),
        );
        let classifier = ContainerClassifier::new(
            config.builder_container.clone(),
            config.builder_data_container.clone(),
        );
        Ok(Self {
            runtime,
            registry: None,
            config,
            policy,
            classifier,
        })
    }

    /// Attach a registry, switching the janitor to registry-driven mode.
    pub fn with_registry(mut self, registry: Arc<dyn RegistryClient>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn mode(&self) -> ReconcileMode {
        if self.registry.is_some() {
            ReconcileMode::Registry
        } else {
            ReconcileMode::RegistryLess
        }
    }

    /// Run whichever pass matches this janitor's mode.
    pub async fn run(&self) {
        match self.mode() {
            ReconcileMode::Registry => self.reconcile_with_registry().await,
            ReconcileMode::RegistryLess => self.reconcile_without_registry().await,
        }
    }

    /// Remove stale, untagged and git-tagged images, then exited containers.
    pub async fn reconcile_with_registry(&self) {
        let Some(registry) = self.registry.as_deref() else {
            error!("registry-driven pass requested without a registry client");
            return;
        };
        let span = info_span!("reconcile", run_id = %Uuid::new_v4(), mode = %ReconcileMode::Registry);
        async {
            let apps = build_version_map(registry, &self.config.services_root).await;
            info!(apps = apps.len(), "loaded application versions");

            let images = self.snapshot_images().await;
            let containers = self.snapshot_containers().await;

            let executor = DeletionExecutor::new(self.runtime.as_ref(), self.config.deletion_mode());
            let mut tally = Tally::default();
            self.sweep_images(&executor, &images, &mut tally, |image| {
                self.policy.decide(image, &apps)
            })
            .await;
            self.sweep_containers(&executor, containers, &mut tally).await;
            log_summary(&tally);
        }
        .instrument(span)
        .await
    }

    /// Remove every image not covered by the protect-list.
    pub async fn reconcile_without_registry(&self) {
        let span =
            info_span!("reconcile", run_id = %Uuid::new_v4(), mode = %ReconcileMode::RegistryLess);
        async {
            let images = self.snapshot_images().await;
            let executor = DeletionExecutor::new(self.runtime.as_ref(), self.config.deletion_mode());
            let mut tally = Tally::default();
            self.sweep_images(&executor, &images, &mut tally, |image| {
                self.policy.decide_without_registry(image)
            })
            .await;
            log_summary(&tally);
        }
        .instrument(span)
        .await
    }

    async fn snapshot_images(&self) -> Vec<Image> {
        match self.runtime.list_images().await {
            Ok(images) => images,
            Err(e) => {
                error!(error = %e, "unable to list images, skipping image cleanup");
                Vec::new()
            }
        }
    }

    async fn snapshot_containers(&self) -> Vec<Container> {
        match self.runtime.list_containers(true, Some(EXITED)).await {
            Ok(containers) => containers,
            Err(e) => {
                error!(error = %e, "unable to list containers, skipping container cleanup");
                Vec::new()
            }
        }
    }

    async fn sweep_images<F>(
        &self,
        executor: &DeletionExecutor<'_>,
        images: &[Image],
        tally: &mut Tally,
        decide: F,
    ) where
        F: Fn(&Image) -> Decision,
    {
        info!(images = images.len(), "processing images");
        for image in images {
            let decision = decide(image);
            if decision.is_delete() {
                info!(id = %image.id, tags = ?image.repo_tags, "{decision}");
                tally.record(&executor.delete_image(image).await);
            } else {
                debug!(id = %image.id, tags = ?image.repo_tags, "{decision}");
                tally.kept += 1;
            }
        }
    }

    async fn sweep_containers(
        &self,
        executor: &DeletionExecutor<'_>,
        containers: Vec<Container>,
        tally: &mut Tally,
    ) {
        let classified = self.classifier.classify(containers);

        info!(containers = classified.ordinary.len(), "processing regular containers");
        for container in &classified.ordinary {
            tally.record(&executor.delete_container(container).await);
        }

        info!("processing builder containers");
        let sentinels = classified.sentinels.removable();
        if sentinels.is_empty() {
            info!("builder is alive or not present, skip deleting");
            if classified.sentinels.builder_data.is_some() {
                tally.kept += 1;
            }
            return;
        }
        for container in sentinels {
            tally.record(&executor.delete_container(container).await);
        }
    }
}

fn log_summary(tally: &Tally) {
    info!(
        deleted = tally.deleted,
        dry_run = tally.dry_run,
        failed = tally.failed,
        kept = tally.kept,
        "reconcile pass finished"
    );
}
