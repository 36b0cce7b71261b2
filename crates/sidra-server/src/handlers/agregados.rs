//! Aggregate data routes. Listing and search work over the upstream
//! aggregate catalog; data queries are normalized into flat report records.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use sidra_api::{ApiError, envelope_with_count};
use sidra_client::UpstreamError;
use sidra_core::{ReportRecord, normalize_value};

use crate::server::AppState;

const AGGREGATE_NOT_FOUND: &str =
    "O código do agregado especificado não existe ou não está disponível";

fn map_aggregate_error(error: UpstreamError) -> ApiError {
    if error.is_not_found() {
        ApiError::not_found(AGGREGATE_NOT_FOUND)
    } else {
        error.into()
    }
}

/// Catalog listing, reshaped per item for the frontend.
pub async fn listar(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let body = state.client.agregados().await?;
    let items = body.as_array().cloned().unwrap_or_default();

    let formatted: Vec<Value> = items
        .iter()
        .map(|item| {
            json!({
                "id": item.get("id").cloned().unwrap_or(Value::Null),
                "nome": item.get("nome").cloned().unwrap_or(Value::Null),
                "periodos": item
                    .get("periodicidade")
                    .and_then(Value::as_array)
                    .map(|p| p.len())
                    .unwrap_or(0),
                "assunto": item
                    .pointer("/assunto/nome")
                    .cloned()
                    .unwrap_or_else(|| json!("Não categorizado")),
                "ultimaAtualizacao": item.get("dataAtualizacao").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    let count = formatted.len();
    Ok(Json(envelope_with_count(Value::Array(formatted), count)))
}

/// Curated category shortcuts for the UI.
pub async fn categorias() -> Json<Value> {
    Json(json!([
        { "id": "1301", "nome": "População residente, por situação do domicílio", "descricao": "Dados demográficos básicos" },
        { "id": "1378", "nome": "Produto Interno Bruto a preços correntes", "descricao": "Indicadores econômicos" },
        { "id": "2579", "nome": "Matrículas nos ensinos Fundamental e Médio", "descricao": "Dados educacionais" },
        { "id": "3175", "nome": "Esperança de vida ao nascer", "descricao": "Indicadores de saúde" },
        { "id": "5938", "nome": "Domicílios por tipo", "descricao": "Habitação e infraestrutura" },
        { "id": "6579", "nome": "Taxa de analfabetismo", "descricao": "Indicadores sociais" },
    ]))
}

#[derive(Debug, Deserialize)]
pub struct BuscaQuery {
    #[serde(default)]
    pub termo: String,
}

/// The upstream has no search endpoint, so this filters the full catalog
/// locally by name or description.
pub async fn buscar(
    State(state): State<AppState>,
    Query(query): Query<BuscaQuery>,
) -> Result<Json<Value>, ApiError> {
    if query.termo.chars().count() < 3 {
        return Err(ApiError::validation(
            "O termo de busca deve ter pelo menos 3 caracteres",
        ));
    }

    let termo = query.termo.to_lowercase();
    let body = state.client.agregados().await?;
    let resultados: Vec<Value> = body
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter(|agregado| {
            let nome = agregado.get("nome").and_then(Value::as_str).unwrap_or("");
            let descricao = agregado
                .get("descricao")
                .and_then(Value::as_str)
                .unwrap_or("");
            nome.to_lowercase().contains(&termo) || descricao.to_lowercase().contains(&termo)
        })
        .collect();

    Ok(Json(Value::Array(resultados)))
}

#[derive(Debug, Deserialize)]
pub struct DadosQuery {
    #[serde(default = "default_localidades")]
    pub localidades: String,
    #[serde(default = "default_periodos")]
    pub periodos: String,
    pub variaveis: Option<String>,
}

fn default_localidades() -> String {
    "BR".into()
}
fn default_periodos() -> String {
    "ultimo".into()
}

/// Variable data for one aggregate, flattened into report records.
pub async fn dados(
    State(state): State<AppState>,
    Path(codigo): Path<String>,
    Query(query): Query<DadosQuery>,
) -> Result<Json<Vec<ReportRecord>>, ApiError> {
    let body = state
        .client
        .aggregate_data(
            &codigo,
            &query.periodos,
            query.variaveis.as_deref(),
            &query.localidades,
        )
        .await
        .map_err(map_aggregate_error)?;

    Ok(Json(normalize_value(&body)))
}

pub async fn metadados(
    State(state): State<AppState>,
    Path(codigo): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .client
        .agregado_metadados(&codigo)
        .await
        .map_err(map_aggregate_error)?;
    Ok(Json(body))
}

pub async fn periodos(
    State(state): State<AppState>,
    Path(codigo): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .client
        .agregado_periodos(&codigo)
        .await
        .map_err(map_aggregate_error)?;
    Ok(Json(body))
}

pub async fn variaveis(
    State(state): State<AppState>,
    Path(codigo): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .client
        .agregado_variaveis(&codigo)
        .await
        .map_err(map_aggregate_error)?;
    Ok(Json(body))
}
