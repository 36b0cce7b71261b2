//! Locality routes: upstream passthrough plus cache administration.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use sidra_api::{ApiError, envelope};

use crate::server::AppState;

pub async fn estados(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let body = state.client.estados().await?;
    Ok(Json(body))
}

pub async fn municipios(
    State(state): State<AppState>,
    Path(uf): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let body = state.client.municipios(&uf).await?;
    Ok(Json(body))
}

pub async fn cache_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stats = state.cache.stats();
    let data = serde_json::to_value(&stats).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(envelope(data)))
}

pub async fn cache_clear(State(state): State<AppState>) -> Json<Value> {
    state.cache.clear();
    Json(json!({
        "success": true,
        "message": "Cache limpo com sucesso",
    }))
}
