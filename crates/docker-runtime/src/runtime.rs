//! Docker Engine API runtime client

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{ListContainersOptions, RemoveContainerOptions};
use bollard::image::{ListImagesOptions, RemoveImageOptions};
use bollard::models::{ContainerSummary, ImageSummary};
use bollard::{ClientVersion, Docker, API_DEFAULT_VERSION};
use janitor_core::{
    Container, Image, ImageRemoval, RuntimeClient, RuntimeError, RuntimeResult, UNTAGGED,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{runtime_error, DockerError};
use crate::Result;

/// Docker connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerConfig {
    /// `unix:///path/to/docker.sock`, `tcp://host:port` or `http://host:port`
    pub url: String,
    /// `auto` to negotiate with the daemon, or `<major>.<minor>`
    pub api_version: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        DockerConfig {
            url: "unix:///var/run/docker.sock".to_string(),
            api_version: "auto".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(String),
    Http(String),
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(path) = url.strip_prefix("unix://") {
            Ok(Endpoint::Unix(path.to_string()))
        } else if let Some(addr) = url.strip_prefix("tcp://") {
            Ok(Endpoint::Http(format!("http://{addr}")))
        } else if url.starts_with("http://") {
            Ok(Endpoint::Http(url.to_string()))
        } else {
            Err(DockerError::InvalidEndpoint(url.to_string()))
        }
    }
}

/// Requested API version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiVersion {
    Auto,
    Fixed { major: usize, minor: usize },
}

impl ApiVersion {
    pub fn parse(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ApiVersion::Auto);
        }
        let invalid = || DockerError::InvalidVersion(s.to_string());
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        Ok(ApiVersion::Fixed {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }

    fn client_version(&self) -> ClientVersion {
        match self {
            ApiVersion::Auto => API_DEFAULT_VERSION.clone(),
            ApiVersion::Fixed { major, minor } => ClientVersion {
                major_version: *major,
                minor_version: *minor,
            },
        }
    }
}

/// Runtime client over the Docker Engine API
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the daemon described by `config`.
    ///
    /// With `api_version = "auto"` this performs a version handshake, so it
    /// fails if the daemon is unreachable.
    pub async fn connect(config: &DockerConfig) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.url)?;
        let version = ApiVersion::parse(&config.api_version)?;
        let client_version = version.client_version();

        let docker = match &endpoint {
            Endpoint::Unix(path) => {
                Docker::connect_with_unix(path, config.timeout_secs, &client_version)?
            }
            Endpoint::Http(addr) => {
                Docker::connect_with_http(addr, config.timeout_secs, &client_version)?
            }
        };
        let docker = match version {
            ApiVersion::Auto => docker.negotiate_version().await?,
            ApiVersion::Fixed { .. } => docker,
        };

        info!(url = %config.url, api_version = %config.api_version, "connected to docker");
        Ok(Self { docker })
    }
}

/// Convert an engine image summary, giving untagged images the sentinel tag.
pub fn image_from_summary(summary: ImageSummary) -> Image {
    let repo_tags = if summary.repo_tags.is_empty() {
        vec![UNTAGGED.to_string()]
    } else {
        summary.repo_tags
    };
    Image {
        id: summary.id,
        repo_tags,
    }
}

pub fn container_from_summary(summary: ContainerSummary) -> Container {
    Container {
        id: summary.id.unwrap_or_default(),
        names: summary.names.unwrap_or_default(),
        status: summary.status.unwrap_or_default(),
    }
}

#[async_trait]
impl RuntimeClient for DockerRuntime {
    async fn list_images(&self) -> RuntimeResult<Vec<Image>> {
        let summaries = self
            .docker
            .list_images(Some(ListImagesOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;
        debug!(count = summaries.len(), "listed images");
        Ok(summaries.into_iter().map(image_from_summary).collect())
    }

    async fn list_containers(
        &self,
        all: bool,
        status_filter: Option<&str>,
    ) -> RuntimeResult<Vec<Container>> {
        let mut filters = HashMap::new();
        if let Some(status) = status_filter {
            filters.insert("status".to_string(), vec![status.to_string()]);
        }
        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all,
                filters,
                ..Default::default()
            }))
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;
        debug!(count = summaries.len(), "listed containers");
        Ok(summaries.into_iter().map(container_from_summary).collect())
    }

    async fn remove_image(&self, id: &str, force: bool) -> RuntimeResult<ImageRemoval> {
        let items = self
            .docker
            .remove_image(
                id,
                Some(RemoveImageOptions {
                    force,
                    ..Default::default()
                }),
                None,
            )
            .await
            .map_err(|e| runtime_error(id, e))?;

        let mut removal = ImageRemoval::default();
        for item in items {
            removal.untagged.extend(item.untagged);
            removal.deleted.extend(item.deleted);
        }
        Ok(removal)
    }

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> RuntimeResult<()> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    v: remove_volumes,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| runtime_error(id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_config_default() {
        let config = DockerConfig::default();
        assert_eq!(config.url, "unix:///var/run/docker.sock");
        assert_eq!(config.api_version, "auto");
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn test_endpoint_parse() {
        assert_eq!(
            Endpoint::parse("unix:///var/run/docker.sock").unwrap(),
            Endpoint::Unix("/var/run/docker.sock".into())
        );
        assert_eq!(
            Endpoint::parse("tcp://10.0.0.1:2375").unwrap(),
            Endpoint::Http("http://10.0.0.1:2375".into())
        );
        assert_eq!(
            Endpoint::parse("http://localhost:2375").unwrap(),
            Endpoint::Http("http://localhost:2375".into())
        );
        assert!(matches!(
            Endpoint::parse("npipe:////./pipe/docker_engine"),
            Err(DockerError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_api_version_parse() {
        assert_eq!(ApiVersion::parse("auto").unwrap(), ApiVersion::Auto);
        assert_eq!(
            ApiVersion::parse("1.24").unwrap(),
            ApiVersion::Fixed {
                major: 1,
                minor: 24
            }
        );
        assert!(ApiVersion::parse("1").is_err());
        assert!(ApiVersion::parse("one.two").is_err());
    }

    #[test]
    fn test_untagged_image_gets_sentinel() {
        let summary = ImageSummary {
            id: "sha256:dead".into(),
            repo_tags: vec![],
            ..Default::default()
        };
        let image = image_from_summary(summary);
        assert_eq!(image.repo_tags, vec![UNTAGGED.to_string()]);
    }

    #[test]
    fn test_tagged_image_kept_as_is() {
        let summary = ImageSummary {
            id: "sha256:beef".into(),
            repo_tags: vec!["10.0.0.5:5000/madrobot:v187".into()],
            ..Default::default()
        };
        assert_eq!(
            image_from_summary(summary).repo_tags,
            vec!["10.0.0.5:5000/madrobot:v187".to_string()]
        );
    }

    #[test]
    fn test_container_from_summary() {
        let summary = ContainerSummary {
            id: Some("c0ffee".into()),
            names: Some(vec!["/deis-builder-data".into()]),
            status: Some("Exited (0) 2 days ago".into()),
            ..Default::default()
        };
        let container = container_from_summary(summary);
        assert!(container.has_name("/deis-builder-data"));
        assert_eq!(container.id, "c0ffee");
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_endpoint() {
        let config = DockerConfig {
            url: "ftp://nowhere".into(),
            ..DockerConfig::default()
        };
        assert!(matches!(
            DockerRuntime::connect(&config).await,
            Err(DockerError::InvalidEndpoint(_))
        ));
    }
}
