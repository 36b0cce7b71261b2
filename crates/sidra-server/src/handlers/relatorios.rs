//! Report generation: typed reports over fixed aggregate codes, the custom
//! multi-indicator report, and catalog endpoints for the frontend.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Response, StatusCode, header};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::macros::format_description;

use sidra_api::{ApiError, envelope, now_rfc3339};
use sidra_client::{IndicatorQuery, collect_indicators};
use sidra_core::{Export, ReportFormat, ReportMeta, ReportRecord, export, normalize_value};

use crate::server::AppState;

const VALID_REPORT_TYPES: &[&str] = &[
    "demografico",
    "economico",
    "educacao",
    "saude",
    "habitacao",
    "personalizado",
];

const NO_DATA: &str = "Não foram encontrados dados para os parâmetros informados";

/// Static model catalog with the parameters each report type accepts.
pub async fn modelos() -> Json<Value> {
    Json(json!([
        {
            "id": "demografico",
            "nome": "Dados Demográficos",
            "descricao": "População, densidade demográfica e distribuição etária",
            "parametrosDisponiveis": [
                { "nome": "localidade", "tipo": "string", "obrigatorio": false, "descricao": "Código da localidade (BR, UF33, etc)" },
                { "nome": "ano", "tipo": "number", "obrigatorio": false, "descricao": "Ano de referência" },
            ],
        },
        {
            "id": "economico",
            "nome": "Indicadores Econômicos",
            "descricao": "PIB, renda per capita e indicadores econômicos",
            "parametrosDisponiveis": [
                { "nome": "localidade", "tipo": "string", "obrigatorio": false, "descricao": "Código da localidade (BR, UF33, etc)" },
                { "nome": "indicador", "tipo": "string", "obrigatorio": false, "descricao": "Tipo de indicador (pib, renda, desemprego)" },
                { "nome": "periodo", "tipo": "string", "obrigatorio": false, "descricao": "Período desejado (ultimo, 2020, etc)" },
            ],
        },
        {
            "id": "educacao",
            "nome": "Educação",
            "descricao": "Taxa de alfabetização, matrículas e outros indicadores educacionais",
            "parametrosDisponiveis": [
                { "nome": "localidade", "tipo": "string", "obrigatorio": false, "descricao": "Código da localidade (BR, UF33, etc)" },
                { "nome": "nivel", "tipo": "string", "obrigatorio": false, "descricao": "Nível de ensino (fundamental, medio, superior)" },
            ],
        },
        {
            "id": "saude",
            "nome": "Saúde",
            "descricao": "Expectativa de vida, mortalidade e indicadores de saúde",
            "parametrosDisponiveis": [
                { "nome": "localidade", "tipo": "string", "obrigatorio": false, "descricao": "Código da localidade (BR, UF33, etc)" },
                { "nome": "indicador", "tipo": "string", "obrigatorio": false, "descricao": "Tipo de indicador (expectativa_vida, mortalidade)" },
            ],
        },
        {
            "id": "habitacao",
            "nome": "Habitação",
            "descricao": "Domicílios por tipo e infraestrutura habitacional",
            "parametrosDisponiveis": [
                { "nome": "localidade", "tipo": "string", "obrigatorio": false, "descricao": "Código da localidade (BR, UF33, etc)" },
            ],
        },
        {
            "id": "personalizado",
            "nome": "Relatório Personalizado",
            "descricao": "Crie um relatório com base em agregados selecionados",
            "parametrosDisponiveis": [
                { "nome": "agregados", "tipo": "string", "obrigatorio": true, "descricao": "Lista de códigos de agregados separados por vírgula" },
                { "nome": "localidade", "tipo": "string", "obrigatorio": false, "descricao": "Código da localidade (BR, UF33, etc)" },
            ],
        },
    ]))
}

/// Export formats, report types and indicator metadata in one call.
pub async fn info() -> Json<Value> {
    Json(envelope(json!({
        "formatosExportacao": ["json", "pdf", "excel", "xlsx", "csv"],
        "tiposRelatorios": [
            {
                "id": "demografico",
                "nome": "Demográfico",
                "descricao": "Dados sobre população, faixa etária e distribuição geográfica",
                "indicadoresDisponiveis": ["populacao", "densidade"],
            },
            {
                "id": "economico",
                "nome": "Econômico",
                "descricao": "Dados econômicos como PIB, renda e produção",
                "indicadoresDisponiveis": ["pib", "renda", "desemprego"],
            },
            {
                "id": "social",
                "nome": "Social",
                "descricao": "Indicadores sociais como educação, saúde e trabalho",
                "indicadoresDisponiveis": ["alfabetizacao", "expectativa_vida", "mortalidade"],
            },
        ],
        "indicadores": {
            "populacao": {
                "nome": "População",
                "descricao": "Estimativa populacional",
                "unidade": "pessoas",
                "periodos": ["2018", "2019", "2020", "2021", "2022"],
            },
            "pib": {
                "nome": "Produto Interno Bruto",
                "descricao": "Soma de todos os bens e serviços finais produzidos",
                "unidade": "R$",
                "periodos": ["2017", "2018", "2019", "2020"],
            },
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct RelatorioQuery {
    #[serde(default = "default_formato_csv")]
    pub formato: String,
    #[serde(default = "default_localidade")]
    pub localidade: String,
    pub ano: Option<String>,
    pub indicador: Option<String>,
    pub periodo: Option<String>,
    pub nivel: Option<String>,
    pub agregados: Option<String>,
}

fn default_formato_csv() -> String {
    "csv".into()
}
fn default_localidade() -> String {
    "BR".into()
}

/// Typed report download: resolve the type to aggregate codes, normalize
/// and export in the requested format.
pub async fn gerar(
    State(state): State<AppState>,
    Path(tipo): Path<String>,
    Query(query): Query<RelatorioQuery>,
) -> Result<Response<Body>, ApiError> {
    if !VALID_REPORT_TYPES.contains(&tipo.as_str()) {
        return Err(ApiError::validation(format!(
            "Tipo de relatório inválido. Os tipos válidos são: {}",
            VALID_REPORT_TYPES.join(", ")
        )));
    }

    let format: ReportFormat = query.formato.parse()?;
    let records = collect_report_records(&state, &tipo, &query).await?;

    if records.is_empty() {
        return Err(ApiError::not_found(NO_DATA));
    }

    tracing::info!(
        tipo = %tipo,
        formato = format.extension(),
        records = records.len(),
        "generating report"
    );

    let meta = ReportMeta::new("Relatório de Dados IBGE");
    let exported = export(&records, format, &meta, state.writer.as_ref())?;
    download(exported, &format!("relatorio_{tipo}_{}", today()))
}

async fn collect_report_records(
    state: &AppState,
    tipo: &str,
    query: &RelatorioQuery,
) -> Result<Vec<ReportRecord>, ApiError> {
    let localidade = query.localidade.as_str();

    let records = match tipo {
        "demografico" => {
            // 1301: população residente.
            let periodo = query.ano.as_deref().unwrap_or("ultimo");
            fetch_records(state, "1301", periodo, localidade)
                .await?
                .into_iter()
                .map(|r| r.with_report_kind("Demográfico"))
                .collect()
        }
        "economico" => {
            let indicador = query.indicador.as_deref().unwrap_or("pib");
            let codigo = match indicador {
                "renda" => "4115",
                "desemprego" => "6381",
                _ => "1378",
            };
            let periodo = query.periodo.as_deref().unwrap_or("ultimo");
            fetch_records(state, codigo, periodo, localidade)
                .await?
                .into_iter()
                .map(|r| r.with_report_kind("Econômico").with_indicator(indicador))
                .collect()
        }
        "educacao" => {
            let nivel = query.nivel.as_deref().unwrap_or("todos");
            match nivel {
                "fundamental" => education_records(state, "2579", "fundamental", localidade).await?,
                "medio" => education_records(state, "2580", "medio", localidade).await?,
                "superior" => education_records(state, "2581", "superior", localidade).await?,
                _ => {
                    // "todos" merges the fundamental and medio series.
                    let mut records =
                        education_records(state, "2579", "fundamental", localidade).await?;
                    records
                        .extend(education_records(state, "2580", "medio", localidade).await?);
                    records
                }
            }
        }
        "saude" => {
            let indicador = query.indicador.as_deref().unwrap_or("expectativa_vida");
            let codigo = match indicador {
                "mortalidade" => "3320",
                _ => "3175",
            };
            fetch_records(state, codigo, "ultimo", localidade)
                .await?
                .into_iter()
                .map(|r| r.with_report_kind("Saúde").with_indicator(indicador))
                .collect()
        }
        "habitacao" => {
            // 5938: domicílios por tipo.
            fetch_records(state, "5938", "ultimo", localidade)
                .await?
                .into_iter()
                .map(|r| r.with_report_kind("Habitação"))
                .collect()
        }
        "personalizado" => {
            let agregados = query.agregados.as_deref().ok_or_else(|| {
                ApiError::validation(
                    "Lista de agregados é obrigatória para relatório personalizado",
                )
            })?;
            let mut records = Vec::new();
            for codigo in agregados.split(',') {
                records.extend(fetch_records(state, codigo.trim(), "ultimo", localidade).await?);
            }
            records
        }
        _ => Vec::new(),
    };

    Ok(records)
}

async fn fetch_records(
    state: &AppState,
    codigo: &str,
    periodo: &str,
    localidade: &str,
) -> Result<Vec<ReportRecord>, ApiError> {
    let body = state
        .client
        .aggregate_data(codigo, periodo, None, localidade)
        .await?;
    Ok(normalize_value(&body))
}

async fn education_records(
    state: &AppState,
    codigo: &str,
    nivel: &str,
    localidade: &str,
) -> Result<Vec<ReportRecord>, ApiError> {
    Ok(fetch_records(state, codigo, "ultimo", localidade)
        .await?
        .into_iter()
        .map(|r| r.with_report_kind("Educação").with_education_level(nivel))
        .collect())
}

#[derive(Debug, Deserialize)]
pub struct PersonalizadoBody {
    #[serde(default)]
    pub indicadores: Vec<String>,
    #[serde(default)]
    pub localidades: Vec<String>,
    pub periodos: Option<Vec<String>>,
    #[serde(default = "default_formato_json")]
    pub formato: String,
}

fn default_formato_json() -> String {
    "json".into()
}

/// Custom multi-indicator report. Every indicator is fetched concurrently;
/// per-indicator failures are reported inline and never abort the batch.
pub async fn personalizado(
    State(state): State<AppState>,
    Json(body): Json<PersonalizadoBody>,
) -> Result<Response<Body>, ApiError> {
    if body.indicadores.is_empty() {
        return Err(ApiError::validation(
            "Pelo menos um indicador deve ser fornecido",
        ));
    }
    if body.localidades.is_empty() {
        return Err(ApiError::validation(
            "Pelo menos uma localidade deve ser fornecida",
        ));
    }
    let format: ReportFormat = body.formato.parse()?;

    tracing::info!(
        indicadores = body.indicadores.len(),
        localidades = body.localidades.len(),
        "generating custom report"
    );

    let query = IndicatorQuery::new(
        body.indicadores.clone(),
        body.localidades.clone(),
        body.periodos.clone(),
    );
    let results = collect_indicators(&state.client, &query).await;

    if !results.iter().any(|r| r.has_data()) {
        return Err(ApiError::not_found(NO_DATA));
    }

    if format == ReportFormat::Json {
        let payload = json!({
            "success": true,
            "timestamp": now_rfc3339(),
            "parametros": {
                "indicadores": body.indicadores,
                "localidades": body.localidades,
                "periodos": body.periodos,
            },
            "data": results,
        });
        return Ok(Json(payload).into_response());
    }

    // Flatten successful indicator payloads into one record table.
    let records: Vec<ReportRecord> = results
        .iter()
        .filter(|r| r.has_data())
        .flat_map(|r| {
            normalize_value(r.data())
                .into_iter()
                .map(|record| record.with_indicator(r.indicator()))
        })
        .collect();

    let meta = ReportMeta::new("Relatório Personalizado IBGE");
    let exported = export(&records, format, &meta, state.writer.as_ref())?;
    download(exported, &format!("relatorio_personalizado_{}", today()))
}

fn today() -> String {
    let fmt = format_description!("[year]-[month]-[day]");
    OffsetDateTime::now_utc()
        .date()
        .format(&fmt)
        .unwrap_or_default()
}

fn download(exported: Export, filename_base: &str) -> Result<Response<Body>, ApiError> {
    let filename = format!("{filename_base}.{}", exported.extension);
    let disposition = HeaderValue::from_str(&format!("attachment; filename={filename}"))
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static(exported.content_type),
        )
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(exported.body))
        .map_err(|e| ApiError::internal(e.to_string()))
}
