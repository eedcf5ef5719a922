//! Image tag parsing.
//!
//! Application images are tagged `<host>/<name>:v<version>` by the platform's
//! builder; throwaway build images carry `:git-<sha>` instead.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static VERSIONED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<host>[^/]*)/(?P<name>.*):v(?P<version>[A-Za-z0-9]+)$")
        .expect("versioned tag pattern is valid")
});

static EPHEMERAL_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*:git-[A-Za-z0-9]*$").expect("git tag pattern is valid"));

/// Structured form of a `<host>/<name>:v<version>` tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageTag {
    pub host: String,
    pub name: String,
    /// Alphanumeric, not necessarily numeric.
    pub version: String,
}

impl ImageTag {
    pub fn new(host: &str, name: &str, version: &str) -> Self {
        Self {
            host: host.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    /// Numeric value of the version field, if it has one.
    pub fn numeric_version(&self) -> Option<u64> {
        self.version.parse().ok()
    }
}

impl std::fmt::Display for ImageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:v{}", self.host, self.name, self.version)
    }
}

/// Parse a versioned application tag. Returns `None` for anything else.
pub fn parse_tag(tag: &str) -> Option<ImageTag> {
    let caps = VERSIONED_TAG.captures(tag)?;
    Some(ImageTag {
        host: caps["host"].to_string(),
        name: caps["name"].to_string(),
        version: caps["version"].to_string(),
    })
}

/// True for `...:git-<hash>` build tags, whether or not the tag also
/// parses as a versioned tag.
pub fn is_ephemeral_build_tag(tag: &str) -> bool {
    EPHEMERAL_TAG.is_match(tag)
}

/// Repository part of a tag: everything before the first colon.
pub fn base_name(tag: &str) -> &str {
    tag.split_once(':').map_or(tag, |(name, _)| name)
}
