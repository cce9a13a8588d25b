use std::net::SocketAddr;

use anyhow::Context;
use secrets_core::KubeConfig;

pub const BIND_ADDRESS_ENV: &str = "SECRET_MANAGER_BIND_ADDRESS";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Runtime settings for the HTTP front end.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    pub http_addr: SocketAddr,
    pub kube: KubeConfig,
}

impl BrokerConfig {
    /// Resolves the listen address from the flag, then
    /// `SECRET_MANAGER_BIND_ADDRESS`, then the default, and reads the
    /// Kubernetes settings from the environment.
    pub fn resolve(bind: Option<String>) -> anyhow::Result<Self> {
        Self::resolve_with(bind, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(bind: Option<String>, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = bind
            .or_else(|| lookup(BIND_ADDRESS_ENV).filter(|value| !value.is_empty()))
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let http_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address `{bind}`"))?;
        let kube = KubeConfig::from_lookup(&lookup).context("invalid kubernetes settings")?;
        Ok(Self { http_addr, kube })
    }
}
