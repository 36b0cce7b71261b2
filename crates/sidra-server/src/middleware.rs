use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::server::AppState;

/// Static bearer check guarding the synchronization endpoints. Missing or
/// malformed header is 401; a present token that does not match the
/// configured key is 403.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        None => {
            tracing::debug!(path = %req.uri().path(), "missing authorization header");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "success": false,
                    "error": "Token de autorização não fornecido",
                })),
            )
                .into_response()
        }
        Some(token) if token != state.config.auth.api_key => {
            tracing::warn!(path = %req.uri().path(), "rejected invalid api key");
            (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "success": false,
                    "error": "Token de autorização inválido",
                })),
            )
                .into_response()
        }
        Some(_) => next.run(req).await,
    }
}

/// Propagate or generate an `x-request-id` header for log correlation.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static("x-request-id");

    let req_id = req.headers().get(&header_name).cloned().unwrap_or_else(|| {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
    });

    req.extensions_mut().insert(req_id.clone());
    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id);
    res
}
