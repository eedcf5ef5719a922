//! Error types for etcd-registry

use janitor_core::RegistryError;
use thiserror::Error;

/// etcd's errorCode for a missing key
pub const KEY_NOT_FOUND: u64 = 100;

/// Errors that can occur talking to etcd
#[derive(Error, Debug)]
pub enum EtcdError {
    /// Request never got an HTTP response
    #[error("HTTP error: {0}")]
    Http(String),

    /// etcd answered with an error document
    #[error("etcd error {code}: {message} ({cause})")]
    Api {
        code: u64,
        message: String,
        cause: String,
    },

    /// Non-success status without an error document
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for EtcdError {
    fn from(err: reqwest::Error) -> Self {
        EtcdError::Http(err.to_string())
    }
}

impl EtcdError {
    /// Map onto the janitor's registry error taxonomy.
    pub fn into_registry_error(self, path: &str) -> RegistryError {
        match self {
            EtcdError::Api {
                code: KEY_NOT_FOUND,
                ..
            }
            | EtcdError::Status { status: 404, .. } => RegistryError::KeyNotFound {
                path: path.to_string(),
            },
            EtcdError::Http(msg) => RegistryError::Transport(msg),
            other @ (EtcdError::Api { .. } | EtcdError::Status { .. }) => {
                RegistryError::Transport(other.to_string())
            }
            EtcdError::Json(e) => RegistryError::Decode(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_found_maps_to_registry_not_found() {
        let err = EtcdError::Api {
            code: KEY_NOT_FOUND,
            message: "Key not found".into(),
            cause: "/deis/services".into(),
        };
        assert_eq!(
            err.into_registry_error("/deis/services/"),
            RegistryError::KeyNotFound {
                path: "/deis/services/".into()
            }
        );
    }

    #[test]
    fn test_other_api_errors_are_transport() {
        let err = EtcdError::Api {
            code: 300,
            message: "Raft Internal Error".into(),
            cause: String::new(),
        };
        assert!(matches!(
            err.into_registry_error("/x"),
            RegistryError::Transport(_)
        ));
    }

    #[test]
    fn test_bare_404_is_not_found() {
        let err = EtcdError::Status {
            status: 404,
            body: String::new(),
        };
        assert!(matches!(
            err.into_registry_error("/x"),
            RegistryError::KeyNotFound { .. }
        ));
    }
}
