//! Multi-source collector: one upstream request per indicator, issued
//! concurrently with all-settle semantics. A failed indicator produces an
//! inline `Failure` entry; it never cancels or blocks the others, and the
//! output order always matches the input order.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;

use crate::client::IbgeClient;
use crate::endpoints::indicator_path;

/// Parameters for one collection run. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorQuery {
    pub indicators: Vec<String>,
    pub localities: Vec<String>,
    pub periods: Option<Vec<String>>,
}

impl IndicatorQuery {
    pub fn new(
        indicators: Vec<String>,
        localities: Vec<String>,
        periods: Option<Vec<String>>,
    ) -> Self {
        Self {
            indicators,
            localities,
            periods,
        }
    }
}

/// Per-indicator outcome. Serialized with the wire names the frontend
/// consumes: `{indicador, dados}` on success, `{indicador, erro, dados}`
/// (empty array) on failure.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum IndicatorResult {
    Success {
        #[serde(rename = "indicador")]
        indicator: String,
        #[serde(rename = "dados")]
        data: Value,
    },
    Failure {
        #[serde(rename = "indicador")]
        indicator: String,
        #[serde(rename = "erro")]
        error: String,
        #[serde(rename = "dados")]
        data: Value,
    },
}

impl IndicatorResult {
    pub fn success(indicator: impl Into<String>, data: Value) -> Self {
        Self::Success {
            indicator: indicator.into(),
            data,
        }
    }

    pub fn failure(indicator: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failure {
            indicator: indicator.into(),
            error: error.into(),
            data: Value::Array(Vec::new()),
        }
    }

    pub fn indicator(&self) -> &str {
        match self {
            Self::Success { indicator, .. } | Self::Failure { indicator, .. } => indicator,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> &Value {
        match self {
            Self::Success { data, .. } | Self::Failure { data, .. } => data,
        }
    }

    /// Whether this result carries a structurally non-empty dataset.
    /// Only non-empty arrays count, mirroring the `dados.length` check
    /// the callers apply.
    pub fn has_data(&self) -> bool {
        matches!(self, Self::Success { data: Value::Array(items), .. } if !items.is_empty())
    }
}

/// Await every task, keeping input order and turning each outcome into a
/// `Result` entry. All tasks run to completion; no failure short-circuits.
/// Independent of any specific concurrency primitive beyond `join_all`.
pub async fn collect_all<F, T, E>(tasks: Vec<F>) -> Vec<Result<T, E>>
where
    F: Future<Output = Result<T, E>>,
{
    futures_util::future::join_all(tasks).await
}

/// Fetch every indicator of the query concurrently. Single attempt per
/// indicator, no retries; a failure is terminal for that indicator only.
pub async fn collect_indicators(
    client: &IbgeClient,
    query: &IndicatorQuery,
) -> Vec<IndicatorResult> {
    let tasks: Vec<_> = query
        .indicators
        .iter()
        .map(|indicator| {
            let path = indicator_path(indicator, &query.localities, query.periods.as_deref());
            tracing::info!(indicator = %indicator, path = %path, "collecting indicator");
            async move { client.get_json(&path).await }
        })
        .collect();

    let settled = collect_all(tasks).await;

    query
        .indicators
        .iter()
        .zip(settled)
        .map(|(indicator, outcome)| match outcome {
            Ok(data) => IndicatorResult::success(indicator, data),
            Err(error) => {
                tracing::warn!(indicator = %indicator, error = %error, "indicator fetch failed");
                IndicatorResult::failure(indicator, error.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_collect_all_preserves_order() {
        use std::pin::Pin;

        let tasks: Vec<Pin<Box<dyn Future<Output = Result<i32, String>>>>> = vec![
            Box::pin(async { Ok(1) }),
            Box::pin(async { Err("boom".to_string()) }),
            Box::pin(async { Ok(3) }),
        ];
        let results = collect_all(tasks).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &1);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &3);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/economia/pib/municipal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"valor": 1}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indicadores/quebrado"))
            .respond_with(ResponseTemplate::new(500).set_body_string("erro"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/educacao/indicadores"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"valor": 2}])))
            .mount(&server)
            .await;

        let client = IbgeClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let query = IndicatorQuery::new(
            strings(&["pib", "quebrado", "alfabetizacao"]),
            strings(&["BR"]),
            None,
        );

        let results = collect_indicators(&client, &query).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].indicator(), "pib");
        assert!(results[0].is_success());
        assert_eq!(results[1].indicator(), "quebrado");
        assert!(!results[1].is_success());
        assert_eq!(results[2].indicator(), "alfabetizacao");
        assert!(results[2].is_success());
    }

    #[tokio::test]
    async fn test_requests_overlap_instead_of_serializing() {
        let server = MockServer::start().await;
        let delay = Duration::from_millis(150);
        for p in ["/indicadores/a", "/indicadores/b", "/indicadores/c"] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!([]))
                        .set_delay(delay),
                )
                .mount(&server)
                .await;
        }

        let client = IbgeClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let query = IndicatorQuery::new(strings(&["a", "b", "c"]), strings(&["BR"]), None);

        let started = Instant::now();
        let results = collect_indicators(&client, &query).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 3);
        assert!(elapsed >= delay);
        // Sequential execution would take at least 450ms.
        assert!(
            elapsed < Duration::from_millis(400),
            "collection took {elapsed:?}, expected concurrent execution"
        );
    }

    #[test]
    fn test_success_serialization_shape() {
        let result = IndicatorResult::success("pib", json!([{"valor": 1}]));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"indicador": "pib", "dados": [{"valor": 1}]}));
    }

    #[test]
    fn test_failure_serialization_shape() {
        let result = IndicatorResult::failure("pib", "Erro na consulta");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"indicador": "pib", "erro": "Erro na consulta", "dados": []})
        );
    }

    #[test]
    fn test_has_data_only_for_non_empty_arrays() {
        assert!(IndicatorResult::success("x", json!([1])).has_data());
        assert!(!IndicatorResult::success("x", json!([])).has_data());
        assert!(!IndicatorResult::success("x", json!({"k": "v"})).has_data());
        assert!(!IndicatorResult::failure("x", "erro").has_data());
    }
}
