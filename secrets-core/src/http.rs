use crate::config::KubeConfig;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// A single request against the Kubernetes API.
#[derive(Clone)]
pub struct KubeRequest {
    pub method: Method,
    /// Path and query, relative to the API server root.
    pub path: String,
    pub bearer_token: String,
    pub body: Option<Vec<u8>>,
}

impl KubeRequest {
    pub fn get(path: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            bearer_token: bearer_token.into(),
            body: None,
        }
    }

    pub fn post(
        path: impl Into<String>,
        bearer_token: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            bearer_token: bearer_token.into(),
            body: Some(body),
        }
    }
}

impl fmt::Debug for KubeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

/// Raw status and body returned by the API server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KubeResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Network seam between the repository and the Kubernetes API.
///
/// Implementations must be safe to share between unrelated callers; the
/// repository never retries, so a returned error is final for that call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: KubeRequest) -> Result<KubeResponse>;
}

#[async_trait]
impl<T> Transport for std::sync::Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: KubeRequest) -> Result<KubeResponse> {
        (**self).send(request).await
    }
}

/// Builder for [`HttpTransport`] exposing the client options the API
/// server connection needs.
#[derive(Clone, Debug, Default)]
pub struct HttpBuilder {
    timeout: Option<Duration>,
    insecure_tls: bool,
}

impl HttpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout = duration;
        self
    }

    /// Disables certificate and hostname verification. Only ever set from
    /// explicit configuration.
    pub fn insecure_tls(mut self, on: bool) -> Self {
        self.insecure_tls = on;
        self
    }

    pub fn build(self, api_server: impl Into<String>) -> Result<HttpTransport> {
        let mut builder = Client::builder().use_rustls_tls();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if self.insecure_tls {
            warn!("tls verification disabled for kubernetes api requests");
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let client = builder
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(HttpTransport {
            client,
            api_server: api_server.into().trim_end_matches('/').to_string(),
        })
    }
}

/// reqwest backed transport. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    api_server: String,
}

impl HttpTransport {
    pub fn builder() -> HttpBuilder {
        HttpBuilder::new()
    }

    pub fn from_config(config: &KubeConfig) -> Result<Self> {
        Self::builder()
            .timeout(config.timeout)
            .insecure_tls(config.ignore_tls_error)
            .build(config.api_server.clone())
    }

    pub fn api_server(&self) -> &str {
        &self.api_server
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("api_server", &self.api_server)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: KubeRequest) -> Result<KubeResponse> {
        let url = format!(
            "{}/{}",
            self.api_server,
            request.path.trim_start_matches('/')
        );
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .bearer_auth(&request.bearer_token)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| Error::Transport(err.without_url().to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::Transport(format!("failed to read response body: {err}")))?;
        debug!(
            method = %request.method,
            path = %request.path,
            status,
            "kubernetes api call"
        );
        Ok(KubeResponse {
            status,
            body: body.to_vec(),
        })
    }
}
