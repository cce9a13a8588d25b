use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, Span, info_span};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Request id echoed on every response, taken from the caller when present.
#[derive(Clone, Debug)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    fn from_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
        Self(id)
    }

    /// Stamps the id onto `headers`; ids that are not valid header values are skipped.
    pub fn stamp(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.0) {
            headers.insert(CORRELATION_ID_HEADER, value);
        }
    }
}

/// JSON logs on stdout, filtered by `RUST_LOG` (default `info`).
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let json = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(false);
    // A subscriber may already be installed by an embedding process.
    let _ = tracing_subscriber::registry().with(filter).with(json).try_init();
    Ok(())
}

pub async fn correlation_layer(mut req: Request<Body>, next: Next) -> Response {
    let correlation = CorrelationId::from_headers(req.headers());
    let span = info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        correlation_id = %correlation.0
    );
    req.extensions_mut().insert(correlation.clone());

    let mut response = next.run(req).instrument(span).await;
    correlation.stamp(response.headers_mut());
    response
}

pub fn request_span(operation: &str, correlation_id: &str) -> Span {
    info_span!("secrets.op", operation, correlation_id)
}
