//! Shared HTTP surface types for the SIDRA portal API: the JSON success
//! envelope, the error body shape, and the mapping from domain errors to
//! HTTP responses.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use sidra_client::UpstreamError;
use sidra_core::CoreError;

// -------------------------
// Success envelopes
// -------------------------

/// `{"success": true, "data": ...}`
pub fn envelope(data: Value) -> Value {
    json!({"success": true, "data": data})
}

/// Adds a `total` field, used by listing endpoints.
pub fn envelope_with_count(data: Value, total: usize) -> Value {
    json!({"success": true, "total": total, "data": data})
}

/// Adds `message` and `timestamp`, used by mutation endpoints.
pub fn envelope_with_message(data: Value, message: impl Into<String>) -> Value {
    json!({
        "success": true,
        "message": message.into(),
        "timestamp": now_rfc3339(),
        "data": data,
    })
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

// -------------------------
// Error detail exposure
// -------------------------

// Production deployments hide internal error details from response bodies.
static EXPOSE_ERROR_DETAILS: AtomicBool = AtomicBool::new(true);

pub fn set_error_detail_mode(expose: bool) {
    EXPOSE_ERROR_DETAILS.store(expose, Ordering::Relaxed);
}

fn expose_details() -> bool {
    EXPOSE_ERROR_DETAILS.load(Ordering::Relaxed)
}

// -------------------------
// ApiError
// -------------------------

/// High-level API errors, mapped to HTTP status codes and the
/// `{"success": false, "error": ...}` body shape.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Parâmetro inválido: {0}")]
    Validation(String),
    #[error("Formato não suportado: {0}")]
    UnsupportedFormat(String),
    #[error("Não encontrado: {0}")]
    NotFound(String),
    /// Upstream failure. `status` is the HTTP status the external API
    /// returned; `None` means the request never produced a response.
    #[error("Falha na consulta externa: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },
    #[error("Erro interno: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn upstream(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: msg.into(),
        }
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { status: Some(s), .. } => {
                StatusCode::from_u16(*s).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            // No upstream response at all reads as a gateway timeout.
            Self::Upstream { status: None, .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Public-facing message. Upstream and internal details are replaced
    /// by fixed Portuguese messages; the original text goes to `details`
    /// when detail exposure is on.
    fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::UnsupportedFormat(msg) | Self::NotFound(msg) => {
                msg.clone()
            }
            Self::Upstream { status: Some(_), .. } => "Erro na consulta ao IBGE".to_string(),
            Self::Upstream { status: None, .. } => {
                "Serviço do IBGE indisponível no momento".to_string()
            }
            Self::Internal(_) => "Erro interno do servidor".to_string(),
        }
    }

    fn source(&self) -> Option<&'static str> {
        match self {
            Self::Upstream { status: Some(_), .. } => Some("external-api"),
            Self::Upstream { status: None, .. } => Some("network"),
            Self::Internal(_) => Some("internal"),
            _ => None,
        }
    }

    pub fn body(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.public_message(),
        });
        if let Some(source) = self.source() {
            body["source"] = json!(source);
        }
        if expose_details() {
            match self {
                Self::Upstream { message, .. } | Self::Internal(message) => {
                    body["details"] = json!(message);
                }
                _ => {}
            }
        }
        body
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnsupportedFormat(fmt) => Self::unsupported_format(format!(
                "Formato não suportado: {fmt}. Use: json, csv, xlsx ou pdf"
            )),
            CoreError::InvalidParameter(msg) => Self::Validation(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match &err {
            UpstreamError::Status { status, .. } => Self::Upstream {
                status: Some(*status),
                message: err.to_string(),
            },
            UpstreamError::Network(_) => Self::Upstream {
                status: None,
                message: err.to_string(),
            },
            UpstreamError::Decode(_) | UpstreamError::InvalidBaseUrl(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        }
        let body = serde_json::to_vec(&self.body())
            .unwrap_or_else(|_| br#"{"success":false,"error":"Erro interno do servidor"}"#.to_vec());

        axum::http::Response::builder()
            .status(status)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .body(axum::body::Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that touch the detail-mode flag must not interleave.
    static DETAIL_MODE: Mutex<()> = Mutex::new(());

    #[test]
    fn envelope_shapes() {
        let e = envelope(json!([1, 2]));
        assert_eq!(e["success"], json!(true));
        assert_eq!(e["data"], json!([1, 2]));

        let e = envelope_with_count(json!([1, 2]), 2);
        assert_eq!(e["total"], json!(2));

        let e = envelope_with_message(json!(null), "Sincronização concluída");
        assert_eq!(e["message"], json!("Sincronização concluída"));
        assert!(e["timestamp"].as_str().is_some_and(|t| t.contains('T')));
    }

    #[test]
    fn validation_maps_to_400_with_plain_message() {
        let _guard = DETAIL_MODE.lock().unwrap();
        set_error_detail_mode(true);
        let err = ApiError::validation("Código do agregado é obrigatório");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = err.body();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Código do agregado é obrigatório"));
        assert!(body.get("source").is_none());
        assert!(body.get("details").is_none());
    }

    #[test]
    fn upstream_status_is_echoed_with_external_source() {
        let _guard = DETAIL_MODE.lock().unwrap();
        set_error_detail_mode(true);
        let err = ApiError::upstream(Some(404), "IBGE retornou 404");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let body = err.body();
        assert_eq!(body["error"], json!("Erro na consulta ao IBGE"));
        assert_eq!(body["source"], json!("external-api"));
        assert_eq!(body["details"], json!("IBGE retornou 404"));
    }

    #[test]
    fn network_failure_maps_to_504() {
        let err = ApiError::upstream(None, "connect timed out");
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        let body = err.body();
        assert_eq!(
            body["error"],
            json!("Serviço do IBGE indisponível no momento")
        );
        assert_eq!(body["source"], json!("network"));
    }

    #[test]
    fn internal_details_hidden_when_mode_off() {
        let _guard = DETAIL_MODE.lock().unwrap();
        set_error_detail_mode(false);
        let err = ApiError::internal("stack trace here");
        let body = err.body();
        assert_eq!(body["error"], json!("Erro interno do servidor"));
        assert!(body.get("details").is_none());
        set_error_detail_mode(true);
    }

    #[test]
    fn core_error_conversions() {
        let err: ApiError = CoreError::unsupported_format("docx").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = CoreError::invalid_parameter("periodo inválido").into();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn upstream_error_conversions() {
        let err: ApiError = UpstreamError::status(500, "boom").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, ApiError::Upstream { status: Some(500), .. }));

        let err: ApiError = UpstreamError::network("timeout").into();
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn into_response_sets_status_and_content_type() {
        let resp = ApiError::not_found("Nenhum dado disponível").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static("application/json")
        );
    }
}
