use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use sidra_client::IbgeClient;
use sidra_core::{ReportWriter, TabularWriter};

use crate::cache::ResponseCache;
use crate::cache::middleware::{CacheContext, cache_response};
use crate::config::AppConfig;
use crate::handlers;
use crate::middleware as app_middleware;
use crate::storage::{LocalityStore, MemoryLocalityStore};

/// Shared handler state. Every field is behind an `Arc` so the router can
/// clone it per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<ResponseCache>,
    pub client: Arc<IbgeClient>,
    pub localities: Arc<dyn LocalityStore>,
    pub writer: Arc<dyn ReportWriter>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let client = IbgeClient::new(&config.ibge.base_url, config.upstream_timeout())?;
        Ok(Self {
            config: Arc::new(config),
            cache: Arc::new(ResponseCache::new()),
            client: Arc::new(client),
            localities: Arc::new(MemoryLocalityStore::new()),
            writer: Arc::new(TabularWriter),
        })
    }
}

pub struct SidraServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    // Locality passthrough is cached with the long TTL; the cache admin
    // routes are registered after the layer so they are never cached
    // themselves.
    let localidades = Router::new()
        .route("/estados", get(handlers::localidades::estados))
        .route(
            "/estados/{uf}/municipios",
            get(handlers::localidades::municipios),
        )
        .layer(middleware::from_fn_with_state(
            CacheContext::new(state.cache.clone(), state.config.localidades_cache_ttl()),
            cache_response,
        ))
        .route("/cache/stats", get(handlers::localidades::cache_stats))
        .route("/cache/clear", post(handlers::localidades::cache_clear));

    let agregados = Router::new()
        .route("/", get(handlers::agregados::listar))
        .route("/categorias", get(handlers::agregados::categorias))
        .route("/busca", get(handlers::agregados::buscar))
        .route("/{codigo}", get(handlers::agregados::dados))
        .route("/{codigo}/metadados", get(handlers::agregados::metadados))
        .route("/{codigo}/periodos", get(handlers::agregados::periodos))
        .route("/{codigo}/variaveis", get(handlers::agregados::variaveis))
        .layer(middleware::from_fn_with_state(
            CacheContext::new(state.cache.clone(), state.config.agregados_cache_ttl()),
            cache_response,
        ));

    // Report responses carry generation timestamps and download headers;
    // caching them would serve stale filenames.
    let relatorios = Router::new()
        .route("/modelos", get(handlers::relatorios::modelos))
        .route("/info", get(handlers::relatorios::info))
        .route("/personalizado", post(handlers::relatorios::personalizado))
        .route("/{tipo}", get(handlers::relatorios::gerar));

    // Mutating sync endpoints require the api key; status stays open.
    let sincronizacao = Router::new()
        .route("/localidades", post(handlers::sincronizacao::sync_localidades))
        .route("/indicadores", post(handlers::sincronizacao::sync_indicadores))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::require_api_key,
        ))
        .route("/status", get(handlers::sincronizacao::sync_status));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest("/api/localidades", localidades)
        .nest("/api/agregados", agregados)
        .nest("/api/relatorios", relatorios)
        .nest("/api/sincronizacao", sincronizacao)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ServerBuilder {
    addr: Option<SocketAddr>,
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            addr: None,
            config: AppConfig::default(),
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn build(self) -> anyhow::Result<SidraServer> {
        let addr = self.addr.unwrap_or_else(|| self.config.addr());
        let state = AppState::new(self.config)?;
        Ok(SidraServer {
            addr,
            app: build_app(state),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SidraServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
