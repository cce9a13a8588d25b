use crate::errors::Result;
use crate::types::Secret;
use async_trait::async_trait;

pub mod k8s;

/// Storage interface the HTTP front end and the admin tooling depend on.
///
/// An implementation is bound to a single credential; namespace arguments
/// are checked against that credential before anything leaves the process.
#[async_trait]
pub trait SecretDatabase: Send + Sync {
    /// Create a secret. Secrets are immutable, so saving an existing name fails.
    async fn save(&self, secret: Secret) -> Result<()>;

    /// Fetch one secret by name.
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret>;

    /// Every secret in `namespace`, all or nothing.
    async fn list(&self, namespace: &str) -> Result<Vec<Secret>>;

    /// Every secret in every namespace, values cleared. Requires a credential
    /// allowed to read secrets cluster-wide.
    async fn list_all_namespace_for_admin(&self) -> Result<Vec<Secret>>;
}

#[async_trait]
impl<T> SecretDatabase for Box<T>
where
    T: SecretDatabase + ?Sized,
{
    async fn save(&self, secret: Secret) -> Result<()> {
        (**self).save(secret).await
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Secret> {
        (**self).get(namespace, name).await
    }

    async fn list(&self, namespace: &str) -> Result<Vec<Secret>> {
        (**self).list(namespace).await
    }

    async fn list_all_namespace_for_admin(&self) -> Result<Vec<Secret>> {
        (**self).list_all_namespace_for_admin().await
    }
}

/// Builds a [`SecretDatabase`] bound to a caller's bearer credential.
pub trait DatabaseFactory: Send + Sync {
    fn connect(&self, token: &str) -> Box<dyn SecretDatabase>;
}
