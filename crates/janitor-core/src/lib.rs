//! Janitor Core: retention decisions for Deis cluster nodes
//!
//! This crate decides which container images and exited containers on a
//! node are no longer needed, and removes them through a runtime client.
//!
//! ## Key Components
//!
//! - `registry`: Application version map from the service registry
//! - `tag` / `retention`: Tag parsing and version-window staleness
//! - `exclusion`: Protect-list for registry-less nodes
//! - `decision`: Ordered per-tag rules producing a tagged keep/delete verdict
//! - `containers`: Exited-container classification and builder protection
//! - `executor`: Best-effort removal that never aborts a batch
//! - `janitor`: The two reconcile passes tying it all together
//!
//! Runtime and registry access go through the traits in `collaborators`;
//! `fakes` has in-memory implementations for tests.

pub mod collaborators;
pub mod config;
pub mod containers;
pub mod decision;
mod error;
pub mod exclusion;
pub mod executor;
pub mod fakes;
pub mod janitor;
pub mod registry;
pub mod retention;
pub mod tag;
pub mod telemetry;

pub use collaborators::{
    Container, Image, ImageRemoval, RegistryClient, RegistryEntry, RegistryListing,
    RegistryResult, RuntimeClient, RuntimeResult,
};
pub use config::JanitorConfig;
pub use containers::{Classified, ContainerClassifier, Sentinels};
pub use decision::{Decision, DeleteReason, ImagePolicy, KeepReason, TagRule, UNTAGGED};
pub use error::{JanitorError, RegistryError, Result, RuntimeError};
pub use exclusion::ExclusionFilter;
pub use executor::{DeletionExecutor, DeletionMode, DeletionOutcome};
pub use janitor::{Janitor, ReconcileMode};
pub use registry::{build_version_map, AppVersionMap, SERVICES_PATH};
pub use retention::{RetentionPolicy, Staleness};
pub use tag::{is_ephemeral_build_tag, parse_tag, ImageTag};
pub use telemetry::{init_tracing, LogFormat};
