use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::{AppError, attach_correlation};
use crate::telemetry::CorrelationId;

/// Length of the `"Bearer "` scheme prefix stripped from the header.
const SCHEME_PREFIX_LEN: usize = 7;

/// Bearer credential taken from the request, handed to the repository as is.
#[derive(Clone)]
pub struct Credential(pub String);

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Returns everything after the first seven bytes of `Authorization`.
///
/// The scheme itself is not inspected. Headers shorter than eight bytes,
/// including a missing header, carry no credential.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get(AUTHORIZATION)
        .map(|value| value.as_bytes())
        .unwrap_or_default();
    if raw.len() <= SCHEME_PREFIX_LEN {
        return None;
    }
    Some(String::from_utf8_lossy(&raw[SCHEME_PREFIX_LEN..]).into_owned())
}

pub async fn http_layer(mut req: Request<Body>, next: Next) -> Response {
    let Some(credential) = extract_credential(req.headers()) else {
        warn!("authorization header missing or too short");
        let mut err = AppError::bad_request("authorization header missing or too short");
        if let Some(correlation) = req.extensions().get::<CorrelationId>() {
            err = attach_correlation(err, correlation);
        }
        return err.into_response();
    };

    req.extensions_mut().insert(Credential(credential));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn strips_scheme_prefix() {
        assert_eq!(
            extract_credential(&headers("Bearer abc.def.ghi")).as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn short_or_missing_header_has_no_credential() {
        assert_eq!(extract_credential(&HeaderMap::new()), None);
        assert_eq!(extract_credential(&headers("Bearer")), None);
        assert_eq!(extract_credential(&headers("Bearer ")), None);
        assert_eq!(extract_credential(&headers("Bearer x")).as_deref(), Some("x"));
    }

    #[test]
    fn scheme_is_not_checked() {
        assert_eq!(
            extract_credential(&headers("Token  abcdef")).as_deref(),
            Some("abcdef")
        );
    }
}
