//! Per-image keep/delete decisions.
//!
//! Each tag of an image is run through an ordered list of rules; the first
//! rule that condemns a tag condemns the whole image and no further tags are
//! looked at.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collaborators::Image;
use crate::exclusion::ExclusionFilter;
use crate::registry::AppVersionMap;
use crate::retention::{RetentionPolicy, Staleness};
use crate::tag::{base_name, is_ephemeral_build_tag, parse_tag};

/// Tag shape the runtime reports for images with no repository tag.
pub const UNTAGGED: &str = "<none>:<none>";

/// Rules applied to each tag in registry-driven mode, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRule {
    Untagged,
    EphemeralBuild,
    Versioned,
}

impl TagRule {
    pub const ORDER: [TagRule; 3] = [TagRule::Untagged, TagRule::EphemeralBuild, TagRule::Versioned];
}

/// Why an image is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeleteReason {
    Untagged,
    EphemeralBuild { tag: String },
    Stale { tag: String, staleness: Staleness },
    NotExcluded { tag: String, base_name: String },
}

/// Why an image is left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum KeepReason {
    /// A versioned tag was evaluated and found fresh, unknown or unparsable.
    Retained { tag: String, staleness: Staleness },
    /// Every tag is covered by the protect-list.
    Excluded { base_name: String, pattern: String },
    /// No tag matched any rule.
    Unrecognized,
    /// The image has no tags at all.
    NoTags,
}

/// Keep/delete verdict for one image, with the reason attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "detail", rename_all = "snake_case")]
pub enum Decision {
    Delete(DeleteReason),
    Keep(KeepReason),
}

impl Decision {
    pub fn is_delete(&self) -> bool {
        matches!(self, Decision::Delete(_))
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Delete(DeleteReason::Untagged) => write!(f, "delete: no tag"),
            Decision::Delete(DeleteReason::EphemeralBuild { tag }) => {
                write!(f, "delete: git build tag {tag}")
            }
            Decision::Delete(DeleteReason::Stale { tag, staleness }) => match staleness {
                Staleness::AppNotRunning { app } => {
                    write!(f, "delete: {tag} belongs to {app} which runs no instances")
                }
                Staleness::OutsideWindow { running, .. } => {
                    write!(f, "delete: {tag} is outside the window of running v{running}")
                }
                _ => write!(f, "delete: {tag} is stale"),
            },
            Decision::Delete(DeleteReason::NotExcluded { base_name, .. }) => {
                write!(f, "delete: {base_name} is not protected")
            }
            Decision::Keep(KeepReason::Retained { tag, .. }) => write!(f, "keep: {tag} retained"),
            Decision::Keep(KeepReason::Excluded { base_name, pattern }) => {
                write!(f, "keep: {base_name} protected by {pattern}")
            }
            Decision::Keep(KeepReason::Unrecognized) => write!(f, "keep: no rule matched"),
            Decision::Keep(KeepReason::NoTags) => write!(f, "keep: no tags"),
        }
    }
}

/// Decides the fate of images in either mode.
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    retention: RetentionPolicy,
    exclusions: ExclusionFilter,
    untagged: String,
}

impl ImagePolicy {
    pub fn new(
        retention: RetentionPolicy,
        exclusions: ExclusionFilter,
        untagged: impl Into<String>,
    ) -> Self {
        Self {
            retention,
            exclusions,
            untagged: untagged.into(),
        }
    }

    /// Registry-driven decision: untagged, git build tag, then version window.
    pub fn decide(&self, image: &Image, apps: &AppVersionMap) -> Decision {
        if image.repo_tags.is_empty() {
            return Decision::Keep(KeepReason::NoTags);
        }

        let mut keep = KeepReason::Unrecognized;
        for tag in &image.repo_tags {
            for rule in TagRule::ORDER {
                match self.apply(rule, tag, apps) {
                    RuleOutcome::Condemned(reason) => return Decision::Delete(reason),
                    RuleOutcome::Spared(reason) => {
                        if keep == KeepReason::Unrecognized {
                            keep = reason;
                        }
                        break;
                    }
                    RuleOutcome::NoMatch => {}
                }
            }
        }
        Decision::Keep(keep)
    }

    /// Registry-less decision: delete unless every tag is protected.
    pub fn decide_without_registry(&self, image: &Image) -> Decision {
        let mut protected = None;
        for tag in &image.repo_tags {
            let name = base_name(tag);
            match self.exclusions.matching_pattern(name) {
                Some(pattern) => {
                    protected.get_or_insert_with(|| KeepReason::Excluded {
                        base_name: name.to_string(),
                        pattern: pattern.to_string(),
                    });
                }
                None => {
                    return Decision::Delete(DeleteReason::NotExcluded {
                        tag: tag.clone(),
                        base_name: name.to_string(),
                    })
                }
            }
        }
        Decision::Keep(protected.unwrap_or(KeepReason::NoTags))
    }

    fn apply(&self, rule: TagRule, tag: &str, apps: &AppVersionMap) -> RuleOutcome {
        match rule {
            TagRule::Untagged if tag == self.untagged => {
                RuleOutcome::Condemned(DeleteReason::Untagged)
            }
            TagRule::EphemeralBuild if is_ephemeral_build_tag(tag) => {
                RuleOutcome::Condemned(DeleteReason::EphemeralBuild {
                    tag: tag.to_string(),
                })
            }
            TagRule::Versioned => {
                let Some(parsed) = parse_tag(tag) else {
                    return RuleOutcome::NoMatch;
                };
                debug!(host = %parsed.host, name = %parsed.name, version = %parsed.version, "parsed tag");
                let staleness = self.retention.evaluate(&parsed, apps);
                if staleness.is_stale() {
                    RuleOutcome::Condemned(DeleteReason::Stale {
                        tag: tag.to_string(),
                        staleness,
                    })
                } else {
                    RuleOutcome::Spared(KeepReason::Retained {
                        tag: tag.to_string(),
                        staleness,
                    })
                }
            }
            _ => RuleOutcome::NoMatch,
        }
    }
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self::new(
            RetentionPolicy::default(),
            ExclusionFilter::default(),
            UNTAGGED,
        )
    }
}

enum RuleOutcome {
    Condemned(DeleteReason),
    Spared(KeepReason),
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apps() -> AppVersionMap {
        [("madrobot", 187u64), ("shiny-service", 20), ("idle", 0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_untagged_image_deleted() {
        let policy = ImagePolicy::default();
        let decision = policy.decide(&Image::new("a", [UNTAGGED]), &apps());
        assert_eq!(decision, Decision::Delete(DeleteReason::Untagged));
    }

    #[test]
    fn test_git_tag_checked_before_version() {
        let policy = ImagePolicy::default();
        let decision = policy.decide(&Image::new("a", ["host/madrobot:git-abc123"]), &apps());
        assert_eq!(
            decision,
            Decision::Delete(DeleteReason::EphemeralBuild {
                tag: "host/madrobot:git-abc123".into()
            })
        );
    }

    #[test]
    fn test_any_stale_tag_condemns_image() {
        let policy = ImagePolicy::default();
        let image = Image::new("a", ["host/madrobot:v186", "host/shiny-service:v10"]);
        let decision = policy.decide(&image, &apps());
        assert!(matches!(
            decision,
            Decision::Delete(DeleteReason::Stale { ref tag, .. }) if tag == "host/shiny-service:v10"
        ));
    }

    #[test]
    fn test_fresh_image_kept_with_reason() {
        let policy = ImagePolicy::default();
        let decision = policy.decide(&Image::new("a", ["host/madrobot:v185"]), &apps());
        assert!(matches!(
            decision,
            Decision::Keep(KeepReason::Retained {
                staleness: Staleness::WithinWindow { running: 187, image: 185, .. },
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_shapes_kept() {
        let policy = ImagePolicy::default();
        let decision = policy.decide(&Image::new("a", ["ubuntu:14.04", "busybox"]), &apps());
        assert_eq!(decision, Decision::Keep(KeepReason::Unrecognized));
        assert_eq!(
            policy.decide(&Image::new("b", Vec::<String>::new()), &apps()),
            Decision::Keep(KeepReason::NoTags)
        );
    }

    #[test]
    fn test_idle_app_image_deleted() {
        let policy = ImagePolicy::default();
        assert!(policy
            .decide(&Image::new("a", ["host/idle:v3"]), &apps())
            .is_delete());
    }

    #[test]
    fn test_custom_retention_window() {
        let policy = ImagePolicy::new(RetentionPolicy::new(1), ExclusionFilter::default(), UNTAGGED);
        assert!(policy
            .decide(&Image::new("a", ["host/madrobot:v186"]), &apps())
            .is_delete());
    }

    #[test]
    fn test_without_registry() {
        let policy = ImagePolicy::default();
        assert!(policy
            .decide_without_registry(&Image::new("a", ["myapp:latest"]))
            .is_delete());
        assert_eq!(
            policy.decide_without_registry(&Image::new("b", ["deis/controller:v1.12.2"])),
            Decision::Keep(KeepReason::Excluded {
                base_name: "deis/controller".into(),
                pattern: "deis/(registry|publisher|builder|controller)".into(),
            })
        );
        assert!(policy
            .decide_without_registry(&Image::new("c", ["alpine:3.4", "myapp:1"]))
            .is_delete());
        assert!(policy
            .decide_without_registry(&Image::new("d", [UNTAGGED]))
            .is_delete());
    }

    #[test]
    fn test_decision_display_carries_reason() {
        let policy = ImagePolicy::default();
        let decision = policy.decide(&Image::new("a", ["host/madrobot:v100"]), &apps());
        assert_eq!(
            decision.to_string(),
            "delete: host/madrobot:v100 is outside the window of running v187"
        );
    }
}
