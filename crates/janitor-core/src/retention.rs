//! Version-window retention for application images.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::registry::AppVersionMap;
use crate::tag::ImageTag;

/// Default number of versions kept per application (current one included).
pub const DEFAULT_RETENTION_WINDOW: u64 = 3;

/// Outcome of checking one image tag against the version map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Staleness {
    /// The application is registered but runs no instances.
    AppNotRunning { app: String },
    /// The image version is at or below `running - window`.
    OutsideWindow { app: String, running: u64, image: u64 },
    /// The image version is recent enough to keep.
    WithinWindow { app: String, running: u64, image: u64 },
    /// The registry never mentioned this application.
    UnknownApp { app: String },
    /// The tag's version is not an integer.
    InvalidVersion { app: String, version: String },
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            Staleness::AppNotRunning { .. } | Staleness::OutsideWindow { .. }
        )
    }
}

/// Keeps the running version and the `window - 1` versions below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub window: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_RETENTION_WINDOW,
        }
    }
}

impl RetentionPolicy {
    pub fn new(window: u64) -> Self {
        Self { window }
    }

    pub fn evaluate(&self, tag: &ImageTag, apps: &AppVersionMap) -> Staleness {
        let app = tag.name.clone();
        let Some(running) = apps.version_of(&tag.name) else {
            return Staleness::UnknownApp { app };
        };

        if running == 0 {
            debug!(app = %app, "app has no running instances, all its images go");
            return Staleness::AppNotRunning { app };
        }

        let Some(image) = tag.numeric_version() else {
            warn!(app = %app, version = %tag.version, "image version is not numeric, keeping");
            return Staleness::InvalidVersion {
                app,
                version: tag.version.clone(),
            };
        };

        // running - window >= image, without underflow when window > running
        let stale = running
            .checked_sub(self.window)
            .is_some_and(|floor| floor >= image);
        if stale {
            Staleness::OutsideWindow {
                app,
                running,
                image,
            }
        } else {
            Staleness::WithinWindow {
                app,
                running,
                image,
            }
        }
    }

    pub fn is_image_stale(&self, tag: &ImageTag, apps: &AppVersionMap) -> bool {
        self.evaluate(tag, apps).is_stale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apps() -> AppVersionMap {
        [
            ("madrobot", 187),
            ("my-shiny-service", 0),
            ("shiny-service", 20),
        ]
        .into_iter()
        .collect()
    }

    fn tag(name: &str, version: &str) -> ImageTag {
        ImageTag::new("host", name, version)
    }

    #[test]
    fn test_window_boundary() {
        let policy = RetentionPolicy::default();
        let apps = apps();
        assert!(!policy.is_image_stale(&tag("shiny-service", "20"), &apps));
        assert!(!policy.is_image_stale(&tag("shiny-service", "19"), &apps));
        assert!(!policy.is_image_stale(&tag("shiny-service", "18"), &apps));
        assert!(policy.is_image_stale(&tag("shiny-service", "17"), &apps));
        assert!(policy.is_image_stale(&tag("shiny-service", "0"), &apps));
    }

    #[test]
    fn test_madrobot_scenario() {
        let policy = RetentionPolicy::new(3);
        let apps = apps();
        assert_eq!(
            policy.evaluate(&tag("madrobot", "183"), &apps),
            Staleness::OutsideWindow {
                app: "madrobot".into(),
                running: 187,
                image: 183
            }
        );
        assert!(!policy.is_image_stale(&tag("madrobot", "185"), &apps));
        assert!(policy.is_image_stale(&tag("shiny-service", "16"), &apps));
    }

    #[test]
    fn test_idle_app_loses_every_image() {
        let policy = RetentionPolicy::default();
        let apps = apps();
        for v in ["1", "999", "abc"] {
            assert!(policy.is_image_stale(&tag("my-shiny-service", v), &apps));
        }
    }

    #[test]
    fn test_unknown_app_is_not_stale() {
        let policy = RetentionPolicy::default();
        assert_eq!(
            policy.evaluate(&tag("ghost", "1"), &apps()),
            Staleness::UnknownApp { app: "ghost".into() }
        );
    }

    #[test]
    fn test_non_numeric_version_is_kept() {
        let policy = RetentionPolicy::default();
        let verdict = policy.evaluate(&tag("madrobot", "1a"), &apps());
        assert!(matches!(verdict, Staleness::InvalidVersion { .. }));
        assert!(!verdict.is_stale());
    }

    #[test]
    fn test_window_larger_than_running_version() {
        let apps: AppVersionMap = [("young", 2u64)].into_iter().collect();
        let policy = RetentionPolicy::new(3);
        assert!(!policy.is_image_stale(&tag("young", "0"), &apps));
        assert!(!policy.is_image_stale(&tag("young", "1"), &apps));
    }

    #[test]
    fn test_zero_window_keeps_only_newer_than_running() {
        let apps: AppVersionMap = [("app", 5u64)].into_iter().collect();
        let policy = RetentionPolicy::new(0);
        assert!(policy.is_image_stale(&tag("app", "5"), &apps));
        assert!(!policy.is_image_stale(&tag("app", "6"), &apps));
    }

    #[test]
    fn test_property_stale_iff_floor_reaches_image() {
        let policy = RetentionPolicy::new(4);
        for running in 1..30u64 {
            let apps: AppVersionMap = [("app", running)].into_iter().collect();
            for image in 0..35u64 {
                let expected = running as i64 - 4 >= image as i64;
                assert_eq!(
                    policy.is_image_stale(&tag("app", &image.to_string()), &apps),
                    expected,
                    "running={running} image={image}"
                );
            }
        }
    }
}
