//! Application version map built from the service registry.
//!
//! The registry lays services out as
//!
//! ```text
//! /deis/services/<app>/                          (empty dir: app has no instances)
//! /deis/services/<app>/<app>_v<version>.<type>.<n>
//! ```
//!
//! and the map records, per application, the version of its running
//! instances, or `0` when the application exists but runs nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::collaborators::{RegistryClient, RegistryEntry};

/// Root under which the platform publishes service instances.
pub const SERVICES_PATH: &str = "/deis/services/";

/// Application name to running version; `0` means registered but idle.
///
/// Built once per pass and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppVersionMap(BTreeMap<String, u64>);

impl AppVersionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running version for `app`, or `None` if the registry never mentioned it.
    pub fn version_of(&self, app: &str) -> Option<u64> {
        self.0.get(app).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last write wins.
    fn record(&mut self, app: &str, version: u64) {
        self.0.insert(app.to_string(), version);
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for AppVersionMap {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A leaf key decoded into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub app: String,
    pub version: u64,
    pub service_type: String,
    pub instance: String,
}

/// Why a registry key could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("expected <app>/<instance>, got {segments} path segment(s)")]
    Segments { segments: usize },

    #[error("instance name has no single _v version marker")]
    VersionMarker,

    #[error("expected <version>.<type>.<instance>, got {parts} part(s)")]
    ReleaseParts { parts: usize },

    #[error("version {0:?} is not an integer")]
    Version(String),
}

/// Decode `<app>/<app>_v<version>.<type>.<instance>` (relative to the root).
///
/// The application name is taken from the instance segment, not from the
/// directory.
pub fn parse_service_key(relative: &str) -> Result<ServiceInstance, KeyParseError> {
    let segments: Vec<&str> = relative.split('/').collect();
    let &[_dir, instance] = segments.as_slice() else {
        return Err(KeyParseError::Segments {
            segments: segments.len(),
        });
    };

    let halves: Vec<&str> = instance.split("_v").collect();
    let &[app, release] = halves.as_slice() else {
        return Err(KeyParseError::VersionMarker);
    };

    let parts: Vec<&str> = release.split('.').collect();
    let &[version, service_type, instance] = parts.as_slice() else {
        return Err(KeyParseError::ReleaseParts { parts: parts.len() });
    };

    let version = version
        .parse()
        .map_err(|_| KeyParseError::Version(version.to_string()))?;

    Ok(ServiceInstance {
        app: app.to_string(),
        version,
        service_type: service_type.to_string(),
        instance: instance.to_string(),
    })
}

/// Builds an [`AppVersionMap`] from a registry client.
pub struct VersionMapBuilder<'a> {
    registry: &'a dyn RegistryClient,
    root: String,
}

impl<'a> VersionMapBuilder<'a> {
    pub fn new(registry: &'a dyn RegistryClient, root: impl Into<String>) -> Self {
        Self {
            registry,
            root: root.into(),
        }
    }

    /// Read the whole services tree and fold it into a version map.
    ///
    /// A failed read yields an empty map. Keys that do not decode are skipped.
    pub async fn build(&self) -> AppVersionMap {
        let listing = match self.registry.read(&self.root, true, true).await {
            Ok(listing) => listing,
            Err(e) => {
                error!(root = %self.root, error = %e, "registry read failed, treating as empty");
                return AppVersionMap::new();
            }
        };

        let mut apps = AppVersionMap::new();
        for entry in &listing.children {
            self.fold_entry(&mut apps, entry);
        }
        debug!(apps = apps.len(), "version map built");
        apps
    }

    fn fold_entry(&self, apps: &mut AppVersionMap, entry: &RegistryEntry) {
        let relative = entry
            .key
            .strip_prefix(&self.root)
            .unwrap_or(&entry.key)
            .trim_matches('/');
        if relative.is_empty() {
            return;
        }

        if entry.is_empty_dir() {
            apps.record(relative, 0);
            return;
        }

        match parse_service_key(relative) {
            Ok(svc) => apps.record(&svc.app, svc.version),
            Err(e) => warn!(key = %relative, error = %e, "unable to parse service key"),
        }
    }
}

/// Convenience wrapper over [`VersionMapBuilder`].
pub async fn build_version_map(registry: &dyn RegistryClient, root: &str) -> AppVersionMap {
    VersionMapBuilder::new(registry, root).build().await
}
