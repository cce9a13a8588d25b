//! Kubernetes `Secret` backed storage for namespaced, immutable secrets.
//!
//! Each secret is written as one labelled `v1/Secret` resource in the
//! namespace it belongs to. Callers authenticate with a service account
//! token; the namespace carried in that token bounds what a repository
//! instance may touch.

pub mod backend;
pub mod config;
pub mod errors;
pub mod http;
pub mod resource;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod token;
pub mod types;

pub use backend::k8s::{K8sDatabaseFactory, K8sSecretDatabase};
pub use backend::{DatabaseFactory, SecretDatabase};
pub use config::KubeConfig;
pub use errors::{Error, Result};
pub use http::{HttpBuilder, HttpTransport, KubeRequest, KubeResponse, Transport};
pub use token::{bound_namespace, namespace_claim};
pub use types::{Secret, SecretType, is_valid_identifier};
