use crate::errors::{Error, Result};
use std::time::Duration;
use url::Url;

pub const KUBE_APISERVER_ENV: &str = "KUBE_APISERVER";
pub const KUBE_IGNORE_TLS_ERROR_ENV: &str = "KUBE_IGNORE_TLS_ERROR";
pub const KUBE_HTTP_TIMEOUT_ENV: &str = "KUBE_HTTP_TIMEOUT_SECS";

/// In-cluster API server address used when `KUBE_APISERVER` is unset.
pub const DEFAULT_API_SERVER: &str = "https://kubernetes.default.svc.cluster.local";

/// Transport settings for talking to the Kubernetes API server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KubeConfig {
    pub api_server: String,
    pub ignore_tls_error: bool,
    pub timeout: Option<Duration>,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            api_server: DEFAULT_API_SERVER.to_string(),
            ignore_tls_error: false,
            timeout: None,
        }
    }
}

impl KubeConfig {
    /// Reads `KUBE_APISERVER`, `KUBE_IGNORE_TLS_ERROR` and
    /// `KUBE_HTTP_TIMEOUT_SECS` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`KubeConfig::from_env`] with a caller supplied variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_server = lookup(KUBE_APISERVER_ENV)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_SERVER.to_string());
        let api_server = normalize_api_server(&api_server)?;

        // TODO: trust the in-cluster CA bundle instead of offering only the bypass.
        let ignore_tls_error = lookup(KUBE_IGNORE_TLS_ERROR_ENV)
            .map(|value| !value.is_empty())
            .unwrap_or(false);

        let timeout = match lookup(KUBE_HTTP_TIMEOUT_ENV).filter(|value| !value.is_empty()) {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| {
                        Error::Config(format!(
                            "{KUBE_HTTP_TIMEOUT_ENV} must be a positive integer, got {raw:?}"
                        ))
                    })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            api_server,
            ignore_tls_error,
            timeout,
        })
    }
}

fn normalize_api_server(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw)
        .map_err(|err| Error::Config(format!("{KUBE_APISERVER_ENV} is not a valid url: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "{KUBE_APISERVER_ENV} must use http or https, got {}",
            parsed.scheme()
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
