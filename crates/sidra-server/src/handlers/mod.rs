pub mod agregados;
pub mod localidades;
pub mod relatorios;
pub mod sincronizacao;

use axum::Json;
use serde_json::{Value, json};

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "sidra-server",
        "description": "Portal de dados estatísticos do IBGE",
        "api": "/api",
    }))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
