//! Namespace hint extraction from service account tokens.
//!
//! The token signature is never checked here. The Kubernetes API verifies the
//! credential on every request; the namespace read from the claims is only
//! used to refuse obviously out-of-scope requests before they leave the
//! process.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

pub const NAMESPACE_CLAIM: &str = "kubernetes.io/serviceaccount/namespace";

#[derive(Debug, Deserialize)]
struct ServiceAccountClaims {
    #[serde(rename = "kubernetes.io/serviceaccount/namespace", default)]
    namespace: Option<String>,
}

/// Returns the namespace claim of a JWT-shaped token, or `None` when the
/// token is not three dot separated segments, the payload is not URL-safe
/// base64, or the payload is not a JSON object.
pub fn namespace_claim(token: &str) -> Option<String> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return None;
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload.as_bytes()).ok()?;
    let claims: ServiceAccountClaims = serde_json::from_slice(&bytes).ok()?;
    claims.namespace
}

/// Namespace bound to a credential; empty when nothing could be extracted.
pub fn bound_namespace(token: &str) -> String {
    namespace_claim(token).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_with(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"k"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn reads_service_account_namespace() {
        let token = token_with(json!({
            "iss": "kubernetes/serviceaccount",
            "kubernetes.io/serviceaccount/namespace": "team-a",
            "kubernetes.io/serviceaccount/service-account.name": "reader"
        }));
        assert_eq!(namespace_claim(&token).as_deref(), Some("team-a"));
        assert_eq!(bound_namespace(&token), "team-a");
    }

    #[test]
    fn wrong_segment_count_is_empty() {
        assert_eq!(bound_namespace(""), "");
        assert_eq!(bound_namespace("abc"), "");
        assert_eq!(bound_namespace("a.b"), "");
        let token = token_with(json!({ "kubernetes.io/serviceaccount/namespace": "team-a" }));
        assert_eq!(bound_namespace(&format!("{token}.extra")), "");
    }

    #[test]
    fn undecodable_payload_is_empty() {
        assert_eq!(bound_namespace("header.!!not-base64!!.sig"), "");
        let not_json = URL_SAFE_NO_PAD.encode("plain text");
        assert_eq!(bound_namespace(&format!("h.{not_json}.s")), "");
        let array = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert_eq!(bound_namespace(&format!("h.{array}.s")), "");
    }

    #[test]
    fn missing_claim_is_empty() {
        let token = token_with(json!({ "sub": "system:serviceaccount:team-a:reader" }));
        assert_eq!(namespace_claim(&token), None);
        assert_eq!(bound_namespace(&token), "");
    }
}
