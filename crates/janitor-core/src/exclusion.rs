//! Protect-list for registry-less nodes.
//!
//! On control-plane nodes there is no service registry to consult, so every
//! image is removed unless its repository name matches one of these patterns.

use regex::Regex;

use crate::error::{JanitorError, Result};

/// Default protect-list: platform components, the janitor itself, base OS.
pub const DEFAULT_EXCLUSION_PATTERNS: &[&str] = &[
    "deis/(registry|publisher|builder|controller)",
    "janitor",
    "alpine",
];

/// Compiled, ordered exclusion patterns.
///
/// Patterns are anchored at the start of the name only, so `alpine` also
/// protects `alpine-tools`.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    patterns: Vec<(String, Regex)>,
}

impl ExclusionFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(&format!("^(?:{p})"))
                    .map(|re| (p.to_string(), re))
                    .map_err(|source| JanitorError::InvalidPattern {
                        pattern: p.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// The pattern protecting `base_name`, if any.
    pub fn matching_pattern(&self, base_name: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(base_name))
            .map(|(source, _)| source.as_str())
    }

    pub fn is_excluded(&self, base_name: &str) -> bool {
        self.matching_pattern(base_name).is_some()
    }
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUSION_PATTERNS).expect("default exclusion patterns are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_components_excluded() {
        let filter = ExclusionFilter::default();
        assert!(filter.is_excluded("deis/controller"));
        assert!(filter.is_excluded("deis/registry"));
        assert!(filter.is_excluded("janitor"));
        assert!(filter.is_excluded("alpine"));
    }

    #[test]
    fn test_application_images_not_excluded() {
        let filter = ExclusionFilter::default();
        assert!(!filter.is_excluded("myapp"));
        assert!(!filter.is_excluded("deis/router"));
        assert!(!filter.is_excluded("<none>"));
        assert!(!filter.is_excluded("library/alpine"));
    }

    #[test]
    fn test_prefix_anchoring() {
        let filter = ExclusionFilter::default();
        assert!(filter.is_excluded("alpine-tools"));
        assert!(filter.is_excluded("deis/builder-data"));
    }

    #[test]
    fn test_matching_pattern_reports_source() {
        let filter = ExclusionFilter::default();
        assert_eq!(
            filter.matching_pattern("deis/publisher"),
            Some("deis/(registry|publisher|builder|controller)")
        );
        assert_eq!(filter.matching_pattern("myapp"), None);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = ExclusionFilter::new(["ok", "broken("]).unwrap_err();
        assert!(matches!(err, JanitorError::InvalidPattern { ref pattern, .. } if pattern == "broken("));
    }
}
