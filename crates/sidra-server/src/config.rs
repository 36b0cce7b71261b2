use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ibge: IbgeConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let env = self.server.environment.to_ascii_lowercase();
        if !["development", "staging", "production"].contains(&env.as_str()) {
            return Err("server.environment must be development, staging or production".into());
        }
        if self.ibge.base_url.is_empty() {
            return Err("ibge.base_url must not be empty".into());
        }
        if !self.ibge.base_url.starts_with("http://") && !self.ibge.base_url.starts_with("https://")
        {
            return Err("ibge.base_url must be an http(s) URL".into());
        }
        if self.ibge.timeout_secs == 0 {
            return Err("ibge.timeout_secs must be > 0".into());
        }
        if self.auth.api_key.is_empty() {
            return Err("auth.api_key must not be empty".into());
        }
        if self.cache.default_ttl_secs == 0
            || self.cache.localidades_ttl_secs == 0
            || self.cache.agregados_ttl_secs == 0
        {
            return Err("cache TTLs must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn is_production(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("production")
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.ibge.timeout_secs)
    }

    pub fn default_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.default_ttl_secs)
    }

    pub fn localidades_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.localidades_ttl_secs)
    }

    pub fn agregados_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.agregados_ttl_secs)
    }

    pub fn state_delay(&self) -> Duration {
        Duration::from_millis(self.sync.state_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// "development", "staging" or "production". Production hides error
    /// details from response bodies.
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_environment() -> String {
    "development".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IbgeConfig {
    #[serde(default = "default_ibge_base_url")]
    pub base_url: String,
    #[serde(default = "default_ibge_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ibge_base_url() -> String {
    "https://servicodados.ibge.gov.br/api/v1".into()
}
fn default_ibge_timeout_secs() -> u64 {
    30
}

impl Default for IbgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_ibge_base_url(),
            timeout_secs: default_ibge_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Static bearer token required by the synchronization endpoints.
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

fn default_api_key() -> String {
    "chave-secreta-de-desenvolvimento".into()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Locality lists change rarely; cached for an hour.
    #[serde(default = "default_localidades_ttl_secs")]
    pub localidades_ttl_secs: u64,
    #[serde(default = "default_agregados_ttl_secs")]
    pub agregados_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_localidades_ttl_secs() -> u64 {
    3600
}
fn default_agregados_ttl_secs() -> u64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_cache_ttl_secs(),
            localidades_ttl_secs: default_localidades_ttl_secs(),
            agregados_ttl_secs: default_agregados_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Pause between per-state municipality fetches during locality sync.
    #[serde(default = "default_state_delay_ms")]
    pub state_delay_ms: u64,
}

fn default_state_delay_ms() -> u64 {
    200
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            state_delay_ms: default_state_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("sidra.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment overrides, e.g. SIDRA__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("SIDRA")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
