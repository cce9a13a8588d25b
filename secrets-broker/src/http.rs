use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::middleware;
use axum::response::IntoResponse;
use axum::{Extension, Json, Router, routing::get};
use secrets_core::SecretDatabase;
use tracing::{Instrument, info, warn};

use crate::auth::{self, Credential};
use crate::error::{AppError, attach_correlation};
use crate::state::AppState;
use crate::telemetry::{CorrelationId, correlation_layer, request_span};

pub fn router(state: AppState) -> Router {
    let api = api_routes().layer(middleware::from_fn(auth::http_layer));

    Router::new()
        .route("/healthz", get(health_check))
        .merge(api)
        .layer(middleware::from_fn(correlation_layer))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new().route("/v1/secrets/{namespace}/{name}", get(get_secret))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn get_secret(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(Credential(token)): Extension<Credential>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.get", &correlation.0);
    async move {
        let Path((namespace, name)) = path.map_err(|rejection| {
            warn!(error = %rejection, "rejected secret path");
            AppError::bad_request(rejection.body_text())
        })?;
        let database = state.databases.connect(&token);
        let secret = database.get(&namespace, &name).await.map_err(|err| {
            warn!(%namespace, %name, error = %err, "get secret failed");
            AppError::from(err)
        })?;

        let mut body = serde_json::to_vec(&secret).map_err(|err| {
            warn!(error = %err, "failed to encode secret");
            AppError::internal(err.to_string())
        })?;
        body.push(b'\n');
        info!(%namespace, %name, "served secret");
        Ok::<_, AppError>((StatusCode::OK, [(CONTENT_TYPE, "application/json")], body))
    }
    .instrument(span)
    .await
    .map_err(|err| attach_correlation(err, &correlation))
}
