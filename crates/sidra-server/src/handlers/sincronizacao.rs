//! Locality and indicator synchronization. Both operations pull from the
//! IBGE API into the local store and invalidate the response cache when done.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use sidra_api::{ApiError, now_rfc3339};
use sidra_client::Pacer;

use crate::server::AppState;
use crate::storage::{MunicipalityRecord, RegionRecord, StateRecord, SyncRecord};

/// Full locality sync: regions, states, then municipalities state by state.
///
/// Municipality fetches are paced and tolerate per-state failures so one
/// flaky UF does not abort the whole run.
pub async fn sync_localidades(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    tracing::info!("starting locality sync");

    let estados_body = state.client.estados().await?;
    let estados = estados_body.as_array().cloned().unwrap_or_default();
    for estado in &estados {
        let Some(id) = estado["id"].as_u64() else {
            continue;
        };
        state
            .localities
            .upsert_state(StateRecord {
                id,
                sigla: json_str(estado, "sigla"),
                nome: json_str(estado, "nome"),
                regiao_id: estado.pointer("/regiao/id").and_then(Value::as_u64),
            })
            .await;
    }

    let regioes_body = state.client.regioes().await?;
    let regioes = regioes_body.as_array().cloned().unwrap_or_default();
    for regiao in &regioes {
        let Some(id) = regiao["id"].as_u64() else {
            continue;
        };
        state
            .localities
            .upsert_region(RegionRecord {
                id,
                sigla: json_str(regiao, "sigla"),
                nome: json_str(regiao, "nome"),
            })
            .await;
    }

    let mut pacer = Pacer::new(state.config.state_delay());
    let mut municipios_total = 0usize;
    for estado in &estados {
        let Some(estado_id) = estado["id"].as_u64() else {
            continue;
        };
        pacer.tick().await;

        let municipios_body = match state.client.municipios(&estado_id.to_string()).await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(estado = estado_id, error = %err, "municipality fetch failed, skipping state");
                continue;
            }
        };
        let municipios = municipios_body.as_array().cloned().unwrap_or_default();
        for municipio in &municipios {
            let Some(id) = municipio["id"].as_u64() else {
                continue;
            };
            state
                .localities
                .upsert_municipality(MunicipalityRecord {
                    id,
                    nome: json_str(municipio, "nome"),
                    estado_id: municipio
                        .pointer("/microrregiao/mesorregiao/UF/id")
                        .and_then(Value::as_u64),
                })
                .await;
        }
        municipios_total += municipios.len();
    }

    state.localities.record_sync("localidades").await;
    state.cache.clear();

    let counts = state.localities.counts().await;
    tracing::info!(
        regioes = counts.regioes,
        estados = counts.estados,
        municipios = municipios_total,
        "locality sync finished"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Sincronização de localidades concluída com sucesso",
        "stats": {
            "regioes": regioes.len(),
            "estados": estados.len(),
            "municipios": municipios_total,
        },
        "timestamp": now_rfc3339(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct SyncIndicadoresBody {
    #[serde(default)]
    pub indicadores: Vec<String>,
}

/// Per-indicator sync. Unknown indicators and upstream failures are
/// reported inline per entry; the batch itself always completes.
pub async fn sync_indicadores(
    State(state): State<AppState>,
    Json(body): Json<SyncIndicadoresBody>,
) -> Result<Json<Value>, ApiError> {
    if body.indicadores.is_empty() {
        return Err(ApiError::validation(
            "É necessário fornecer uma lista de indicadores para sincronizar",
        ));
    }

    let mut resultados = Map::new();
    for indicador in &body.indicadores {
        let resultado = match indicador.to_lowercase().as_str() {
            "pib" => sync_counted(
                &state,
                "pib",
                "/pesquisas/10080/periodos/2010|2015|2020/indicadores/37|38|47|48",
                "registros de PIB sincronizados",
            )
            .await,
            "populacao" => sync_counted(
                &state,
                "populacao",
                "/projecoes/populacao",
                "registros de população sincronizados",
            )
            .await,
            "educacao" => {
                // No dedicated upstream series yet; acknowledged as a no-op.
                state.localities.record_sync("educacao").await;
                json!({
                    "success": true,
                    "count": 0,
                    "message": "Dados de educação sincronizados com sucesso",
                })
            }
            other => json!({
                "success": false,
                "error": format!("Indicador não suportado: {other}"),
            }),
        };
        resultados.insert(indicador.clone(), resultado);
    }

    state.cache.clear();

    Ok(Json(json!({
        "success": true,
        "message": "Sincronização de indicadores concluída",
        "resultados": resultados,
        "timestamp": now_rfc3339(),
    })))
}

async fn sync_counted(state: &AppState, tipo: &str, path: &str, message: &str) -> Value {
    match state.client.get_json(path).await {
        Ok(body) => {
            let count = body.as_array().map(Vec::len).unwrap_or(0);
            state.localities.record_sync(tipo).await;
            tracing::info!(indicador = tipo, count, "indicator sync finished");
            json!({
                "success": true,
                "count": count,
                "message": format!("{count} {message}"),
            })
        }
        Err(err) => {
            tracing::warn!(indicador = tipo, error = %err, "indicator sync failed");
            json!({ "success": false, "error": err.to_string() })
        }
    }
}

/// Last completed sync per known type, plus the current store counts.
pub async fn sync_status(State(state): State<AppState>) -> Json<Value> {
    let mut dados = Map::new();
    for tipo in ["localidades", "pib", "populacao", "educacao"] {
        let last = state.localities.last_sync(tipo).await;
        dados.insert(
            tipo.to_string(),
            json!({
                "status": if last.is_some() { "completo" } else { "pendente" },
                "data": last.as_ref().map(sync_record_json),
            }),
        );
    }

    let counts = state.localities.counts().await;
    Json(json!({
        "success": true,
        "dados": dados,
        "contagens": {
            "regioes": counts.regioes,
            "estados": counts.estados,
            "municipios": counts.municipios,
        },
    }))
}

fn sync_record_json(record: &SyncRecord) -> Value {
    json!({
        "tipo": record.tipo,
        "concluidaEm": record.concluida_em,
        "status": record.status,
    })
}

fn json_str(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}
