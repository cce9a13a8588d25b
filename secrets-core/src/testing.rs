//! In-process stand-in for the Kubernetes secrets API.
//!
//! Keeps resources in memory per namespace and answers the handful of
//! requests the repository issues, so repository and front end tests can
//! run without a cluster. Every request is counted, which lets tests assert
//! that rejected calls never reached the network.

use crate::errors::Result;
use crate::http::{KubeRequest, KubeResponse, Transport};
use crate::resource::{KubeSecret, KubeSecretList};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Method;
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Unsigned JWT-shaped token whose claims bind it to `namespace`, in the
/// shape of a projected service account token.
pub fn service_account_token(namespace: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"test"}"#);
    let claims = json!({
        "iss": "kubernetes/serviceaccount",
        "kubernetes.io/serviceaccount/namespace": namespace,
        "kubernetes.io/serviceaccount/service-account.name": "secret-manager",
        "sub": format!("system:serviceaccount:{namespace}:secret-manager")
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.dGVzdC1zaWduYXR1cmU")
}

#[derive(Default)]
pub struct FakeKubeApi {
    namespaces: Mutex<BTreeMap<String, Vec<KubeSecret>>>,
    scripted: Mutex<VecDeque<KubeResponse>>,
    requests: Mutex<Vec<(Method, String)>>,
    count: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeKubeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Method and path of every request received so far.
    pub fn requests(&self) -> Vec<(Method, String)> {
        lock(&self.requests).clone()
    }

    /// Stored resources of one namespace, in insertion order.
    pub fn resources(&self, namespace: &str) -> Vec<KubeSecret> {
        lock(&self.namespaces)
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    /// Stores a resource directly, bypassing validation.
    pub fn insert(&self, namespace: &str, resource: KubeSecret) {
        lock(&self.namespaces)
            .entry(namespace.to_string())
            .or_default()
            .push(resource);
    }

    /// Answers the next request with `response` instead of simulating it.
    pub fn fail_next(&self, response: KubeResponse) {
        lock(&self.scripted).push_back(response);
    }

    fn handle(&self, request: KubeRequest) -> KubeResponse {
        if request.bearer_token.is_empty() {
            return status(401, "Unauthorized");
        }
        let (path, query) = match request.path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (request.path.as_str(), None),
        };
        let selector = query
            .and_then(|query| query.strip_prefix("labelSelector="))
            .and_then(|selector| selector.split_once('='));
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["api", "v1", "secrets"]) => {
                let namespaces = lock(&self.namespaces);
                let items = namespaces
                    .values()
                    .flatten()
                    .filter(|item| matches_selector(item, selector))
                    .cloned()
                    .collect();
                list_response(items)
            }
            ("GET", ["api", "v1", "namespaces", namespace, "secrets"]) => {
                let items = self
                    .resources(namespace)
                    .into_iter()
                    .filter(|item| matches_selector(item, selector))
                    .collect();
                list_response(items)
            }
            ("POST", ["api", "v1", "namespaces", namespace, "secrets"]) => {
                let Some(body) = request.body.as_deref() else {
                    return status(400, "BadRequest");
                };
                let Ok(resource) = serde_json::from_slice::<KubeSecret>(body) else {
                    return status(400, "BadRequest");
                };
                if resource.metadata.namespace != *namespace {
                    return status(400, "BadRequest");
                }
                let mut namespaces = lock(&self.namespaces);
                let items = namespaces.entry(namespace.to_string()).or_default();
                if items
                    .iter()
                    .any(|item| item.metadata.name == resource.metadata.name)
                {
                    return status(409, "AlreadyExists");
                }
                items.push(resource.clone());
                KubeResponse {
                    status: 201,
                    body: serde_json::to_vec(&resource).unwrap_or_default(),
                }
            }
            _ => status(404, "NotFound"),
        }
    }
}

fn matches_selector(item: &KubeSecret, selector: Option<(&str, &str)>) -> bool {
    match selector {
        Some((key, value)) => item.metadata.labels.get(key).map(String::as_str) == Some(value),
        None => true,
    }
}

fn list_response(items: Vec<KubeSecret>) -> KubeResponse {
    KubeResponse {
        status: 200,
        body: serde_json::to_vec(&KubeSecretList { items }).unwrap_or_default(),
    }
}

fn status(code: u16, reason: &str) -> KubeResponse {
    let body = json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "reason": reason,
        "code": code
    });
    KubeResponse {
        status: code,
        body: body.to_string().into_bytes(),
    }
}

#[async_trait]
impl Transport for FakeKubeApi {
    async fn send(&self, request: KubeRequest) -> Result<KubeResponse> {
        self.count.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push((request.method.clone(), request.path.clone()));
        if let Some(scripted) = lock(&self.scripted).pop_front() {
            return Ok(scripted);
        }
        Ok(self.handle(request))
    }
}
