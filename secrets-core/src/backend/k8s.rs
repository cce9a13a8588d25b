use crate::backend::{DatabaseFactory, SecretDatabase};
use crate::config::KubeConfig;
use crate::errors::{Error, Result};
use crate::http::{HttpTransport, KubeRequest, KubeResponse, Transport};
use crate::resource::{
    KubeSecret, KubeSecretList, cluster_secrets_path, decode_list, label_selector,
    namespaced_secrets_path,
};
use crate::token::bound_namespace;
use crate::types::{Secret, validate_identifier};
use async_trait::async_trait;
use std::fmt;
use tracing::info;

const STATUS_OK: u16 = 200;
const STATUS_CREATED: u16 = 201;

/// Secret repository backed by Kubernetes `Secret` resources.
///
/// `Secret.namespace` maps directly onto a Kubernetes namespace. The bound
/// namespace is read from the token once, at construction, and every call is
/// refused locally when it asks for a different one. The API server still
/// authenticates the token on every request.
pub struct K8sSecretDatabase<T = HttpTransport> {
    transport: T,
    token: String,
    namespace: String,
}

impl K8sSecretDatabase<HttpTransport> {
    /// Builds a repository using `KUBE_APISERVER` / `KUBE_IGNORE_TLS_ERROR`
    /// from the environment.
    pub fn from_env(token: impl Into<String>) -> Result<Self> {
        let config = KubeConfig::from_env()?;
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self::new(transport, token))
    }
}

impl<T: Transport> K8sSecretDatabase<T> {
    pub fn new(transport: T, token: impl Into<String>) -> Self {
        let token = token.into();
        let namespace = bound_namespace(&token);
        Self {
            transport,
            token,
            namespace,
        }
    }

    /// Namespace bound to the credential; empty when the token carried none.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn ensure_namespace(&self, requested: &str) -> Result<()> {
        if requested == self.namespace {
            Ok(())
        } else {
            Err(Error::NamespaceMismatch {
                requested: requested.to_string(),
                bound: self.namespace.clone(),
            })
        }
    }

    async fn fetch_list(&self, collection: &str) -> Result<Vec<Secret>> {
        let path = format!("{collection}?labelSelector={}", label_selector());
        let response = self
            .transport
            .send(KubeRequest::get(path, self.token.clone()))
            .await?;
        expect_status(&response, STATUS_OK)?;
        let list: KubeSecretList = serde_json::from_slice(&response.body)
            .map_err(|err| Error::Decode(err.to_string()))?;
        decode_list(list)
    }
}

fn expect_status(response: &KubeResponse, expected: u16) -> Result<()> {
    if response.status == expected {
        Ok(())
    } else {
        Err(Error::UnexpectedStatus {
            expected,
            actual: response.status,
        })
    }
}

#[async_trait]
impl<T: Transport> SecretDatabase for K8sSecretDatabase<T> {
    async fn save(&self, secret: Secret) -> Result<()> {
        secret.validate()?;
        self.ensure_namespace(&secret.namespace)?;

        let resource = KubeSecret::from(&secret);
        let body = serde_json::to_vec(&resource).map_err(|err| Error::Encode(err.to_string()))?;
        let response = self
            .transport
            .send(KubeRequest::post(
                namespaced_secrets_path(&self.namespace),
                self.token.clone(),
                body,
            ))
            .await?;
        expect_status(&response, STATUS_CREATED)?;
        info!(namespace = %secret.namespace, name = %secret.name, "saved secret");
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.ensure_namespace(namespace)?;

        let found = self
            .list(namespace)
            .await?
            .into_iter()
            .find(|secret| secret.name == name);
        match found {
            Some(secret) => {
                info!(namespace, name, "get secret");
                Ok(secret)
            }
            None => Err(Error::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
        }
    }

    async fn list(&self, namespace: &str) -> Result<Vec<Secret>> {
        self.ensure_namespace(namespace)?;
        validate_identifier(namespace, "namespace")?;

        self.fetch_list(&namespaced_secrets_path(namespace)).await
    }

    async fn list_all_namespace_for_admin(&self) -> Result<Vec<Secret>> {
        let secrets = self.fetch_list(cluster_secrets_path()).await?;
        info!(count = secrets.len(), "list all secrets");
        Ok(secrets.into_iter().map(Secret::redacted).collect())
    }
}

impl<T> fmt::Debug for K8sSecretDatabase<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("K8sSecretDatabase")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Hands out one [`K8sSecretDatabase`] per credential over a shared transport.
#[derive(Clone, Debug)]
pub struct K8sDatabaseFactory<T = HttpTransport> {
    transport: T,
}

impl K8sDatabaseFactory<HttpTransport> {
    pub fn from_config(config: &KubeConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::from_config(config)?))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(&KubeConfig::from_env()?)
    }
}

impl<T> K8sDatabaseFactory<T>
where
    T: Transport + Clone + 'static,
{
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T> DatabaseFactory for K8sDatabaseFactory<T>
where
    T: Transport + Clone + 'static,
{
    fn connect(&self, token: &str) -> Box<dyn SecretDatabase> {
        Box::new(K8sSecretDatabase::new(self.transport.clone(), token))
    }
}
