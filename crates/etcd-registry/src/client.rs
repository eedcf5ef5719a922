//! etcd v2 keys API client
//!
//! Reads the service tree the platform publishes under `/deis/services`
//! and flattens it into the janitor's `RegistryListing`.

use std::time::Duration;

use async_trait::async_trait;
use janitor_core::{RegistryClient, RegistryEntry, RegistryListing, RegistryResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EtcdError;
use crate::Result;

/// etcd connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtcdConfig {
    /// Host name or address
    pub host: String,
    /// Client port
    pub port: u16,
    /// `http` or `https`
    pub protocol: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        EtcdConfig {
            host: "127.0.0.1".to_string(),
            port: 4001,
            protocol: "http".to_string(),
            timeout_secs: 60,
        }
    }
}

impl EtcdConfig {
    /// Config for a specific host on the default port
    pub fn new(host: &str) -> Self {
        EtcdConfig {
            host: host.to_string(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Base URL, e.g. `http://127.0.0.1:4001`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// One node of an etcd v2 response tree.
#[derive(Debug, Clone, Deserialize)]
pub struct EtcdNode {
    pub key: String,
    #[serde(default)]
    pub dir: bool,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub nodes: Vec<EtcdNode>,
}

impl EtcdNode {
    /// Leaves and empty directories below this node, depth first.
    /// The node itself is not included.
    pub fn flatten(&self) -> Vec<RegistryEntry> {
        let mut out = Vec::new();
        for child in &self.nodes {
            child.collect_leaves(&mut out);
        }
        out
    }

    fn collect_leaves(&self, out: &mut Vec<RegistryEntry>) {
        if self.nodes.is_empty() {
            out.push(RegistryEntry {
                key: self.key.clone(),
                dir: self.dir,
                child_count: 0,
            });
            return;
        }
        for child in &self.nodes {
            child.collect_leaves(out);
        }
    }
}

/// Successful `GET /v2/keys/...` body.
#[derive(Debug, Clone, Deserialize)]
pub struct EtcdResponse {
    pub action: String,
    pub node: EtcdNode,
}

/// etcd error document.
#[derive(Debug, Clone, Deserialize)]
struct EtcdErrorBody {
    #[serde(rename = "errorCode")]
    error_code: u64,
    message: String,
    #[serde(default)]
    cause: String,
}

/// Registry client over the etcd v2 HTTP API
pub struct EtcdClient {
    config: EtcdConfig,
    http_client: reqwest::Client,
}

impl EtcdClient {
    /// Create a new etcd client
    pub fn new(config: EtcdConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("deis-janitor/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(EtcdClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &EtcdConfig {
        &self.config
    }

    fn keys_url(&self, path: &str) -> String {
        format!(
            "{}/v2/keys/{}",
            self.config.base_url(),
            path.trim_start_matches('/')
        )
    }

    /// Fetch a key (and, if `recursive`, its subtree).
    pub async fn get(&self, path: &str, recursive: bool, sorted: bool) -> Result<EtcdResponse> {
        let url = self.keys_url(path);
        debug!(url = %url, recursive, sorted, "reading etcd key");

        let response = self
            .http_client
            .get(&url)
            .query(&[("recursive", recursive), ("sorted", sorted)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        match serde_json::from_str::<EtcdErrorBody>(&body) {
            Ok(err) => Err(EtcdError::Api {
                code: err.error_code,
                message: err.message,
                cause: err.cause,
            }),
            Err(_) => Err(EtcdError::Status {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

#[async_trait]
impl RegistryClient for EtcdClient {
    async fn read(
        &self,
        path: &str,
        recursive: bool,
        sorted: bool,
    ) -> RegistryResult<RegistryListing> {
        let response = self
            .get(path, recursive, sorted)
            .await
            .map_err(|e| e.into_registry_error(path))?;
        Ok(RegistryListing {
            children: response.node.flatten(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etcd_config_default() {
        let config = EtcdConfig::default();
        assert_eq!(config.base_url(), "http://127.0.0.1:4001");
    }

    #[test]
    fn test_etcd_config_new() {
        let config = EtcdConfig::new("10.21.1.4").with_port(2379);
        assert_eq!(config.base_url(), "http://10.21.1.4:2379");
    }

    #[test]
    fn test_keys_url_joins_path() {
        let client = EtcdClient::new(EtcdConfig::default()).unwrap();
        assert_eq!(
            client.keys_url("/deis/services/"),
            "http://127.0.0.1:4001/v2/keys/deis/services/"
        );
    }

    #[test]
    fn test_flatten_skips_root_and_inner_dirs() {
        let node: EtcdNode = serde_json::from_value(serde_json::json!({
            "key": "/deis/services",
            "dir": true,
            "nodes": [
                {"key": "/deis/services/idle", "dir": true},
                {"key": "/deis/services/app", "dir": true, "nodes": [
                    {"key": "/deis/services/app/app_v2.web.1", "value": "10.0.0.1:49153"}
                ]}
            ]
        }))
        .unwrap();

        let entries = node.flatten();
        assert_eq!(
            entries,
            vec![
                RegistryEntry::empty_dir("/deis/services/idle"),
                RegistryEntry::leaf("/deis/services/app/app_v2.web.1"),
            ]
        );
    }

    #[test]
    fn test_flatten_empty_root() {
        let node: EtcdNode =
            serde_json::from_str(r#"{"key": "/deis/services", "dir": true}"#).unwrap();
        assert!(node.flatten().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_etcd_is_transport_error() {
        let client = EtcdClient::new(EtcdConfig::new("127.0.0.1").with_port(1)).unwrap();
        let err = client.read("/deis/services/", true, true).await.unwrap_err();
        assert!(matches!(err, janitor_core::RegistryError::Transport(_)));
    }
}
