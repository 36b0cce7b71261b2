use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::endpoints::aggregate_data_path;
use crate::error::UpstreamError;

/// Read-only HTTP client for the IBGE API.
///
/// Holds one pooled reqwest client; all calls are unauthenticated GETs
/// against `base_url` + a path template. Errors distinguish transport
/// failures (no status available) from upstream non-2xx answers.
#[derive(Debug, Clone)]
pub struct IbgeClient {
    http: reqwest::Client,
    base_url: String,
}

impl IbgeClient {
    /// Create a client for the given base URL with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| UpstreamError::invalid_base_url(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UpstreamError::invalid_base_url(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a path (with its query string) and decode the JSON body.
    pub async fn get_json(&self, path: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "fetching upstream");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), "upstream error status");
            return Err(UpstreamError::status(status.as_u16(), truncate(&message)));
        }

        response
            .json()
            .await
            .map_err(|e| UpstreamError::decode(e.to_string()))
    }

    pub async fn estados(&self) -> Result<Value, UpstreamError> {
        self.get_json("/localidades/estados").await
    }

    pub async fn municipios(&self, uf: &str) -> Result<Value, UpstreamError> {
        let path = format!("/localidades/estados/{}/municipios", urlencoding::encode(uf));
        self.get_json(&path).await
    }

    pub async fn regioes(&self) -> Result<Value, UpstreamError> {
        self.get_json("/localidades/regioes").await
    }

    pub async fn agregados(&self) -> Result<Value, UpstreamError> {
        self.get_json("/agregados").await
    }

    pub async fn agregado_metadados(&self, codigo: &str) -> Result<Value, UpstreamError> {
        let path = format!("/agregados/{}/metadados", urlencoding::encode(codigo));
        self.get_json(&path).await
    }

    pub async fn agregado_periodos(&self, codigo: &str) -> Result<Value, UpstreamError> {
        let path = format!("/agregados/{}/periodos", urlencoding::encode(codigo));
        self.get_json(&path).await
    }

    pub async fn agregado_variaveis(&self, codigo: &str) -> Result<Value, UpstreamError> {
        let path = format!("/agregados/{}/variaveis", urlencoding::encode(codigo));
        self.get_json(&path).await
    }

    /// Query aggregate variable data filtered by periods and localities.
    pub async fn aggregate_data(
        &self,
        codigo: &str,
        periodos: &str,
        variaveis: Option<&str>,
        localidades: &str,
    ) -> Result<Value, UpstreamError> {
        let path = aggregate_data_path(codigo, periodos, variaveis, localidades);
        self.get_json(&path).await
    }
}

fn map_transport_error(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::network(format!("request timed out: {error}"))
    } else if error.is_connect() {
        UpstreamError::network(format!("connection failed: {error}"))
    } else {
        UpstreamError::network(error.to_string())
    }
}

// Upstream error bodies can be whole HTML pages; keep log/response noise down.
fn truncate(message: &str) -> String {
    const MAX: usize = 200;
    if message.len() <= MAX {
        message.to_string()
    } else {
        let mut end = MAX;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &message[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = IbgeClient::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidBaseUrl(_)));

        let err = IbgeClient::new("ftp://example.com", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = IbgeClient::new("http://localhost:1234/api/v1/", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/api/v1");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "ç".repeat(300);
        let out = truncate(&long);
        assert!(out.len() <= 204);
        assert!(out.ends_with('…'));
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test]
    async fn test_get_json_decodes_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/localidades/estados"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 33, "sigla": "RJ", "nome": "Rio de Janeiro"}
            ])))
            .mount(&server)
            .await;

        let client = IbgeClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let body = client.estados().await.unwrap();
        assert_eq!(body[0]["sigla"], "RJ");
    }

    #[tokio::test]
    async fn test_non_2xx_maps_to_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agregados/9999/metadados"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nao encontrado"))
            .mount(&server)
            .await;

        let client = IbgeClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.agregado_metadados("9999").await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(404));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_connection_failure_maps_to_network_error() {
        // Nothing listens on this port.
        let client =
            IbgeClient::new("http://127.0.0.1:59999", Duration::from_secs(1)).unwrap();
        let err = client.estados().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Network(_)));
        assert_eq!(err.upstream_status(), None);
    }

    #[tokio::test]
    async fn test_invalid_json_maps_to_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agregados"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = IbgeClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.agregados().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[tokio::test]
    async fn test_aggregate_data_builds_templated_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agregados/1301/periodos/ultimo/variaveis"))
            .and(query_param("localidades", "BR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = IbgeClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let body = client
            .aggregate_data("1301", "ultimo", None, "BR")
            .await
            .unwrap();
        assert!(body.as_array().unwrap().is_empty());
    }
}
