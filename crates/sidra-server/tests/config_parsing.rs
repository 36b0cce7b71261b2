use std::{env, fs};

use sidra_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("sidra.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
environment = "staging"

[ibge]
base_url = "https://servicodados.ibge.gov.br/api/v1"
timeout_secs = 10

[auth]
api_key = "segredo-de-teste"

[cache]
default_ttl_secs = 60
localidades_ttl_secs = 120
agregados_ttl_secs = 90

[sync]
state_delay_ms = 50

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.server.environment, "staging");
    assert_eq!(cfg.ibge.timeout_secs, 10);
    assert_eq!(cfg.auth.api_key, "segredo-de-teste");
    assert_eq!(cfg.cache.localidades_ttl_secs, 120);
    assert_eq!(cfg.sync.state_delay_ms, 50);
    assert_eq!(cfg.logging.level.to_ascii_lowercase(), "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("SIDRA__CACHE__DEFAULT_TTL_SECS", "7");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.cache.default_ttl_secs, 7);
    unsafe {
        env::remove_var("SIDRA__CACHE__DEFAULT_TTL_SECS");
    }

    // 3) Invalid config should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[server]
environment = "weird"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("environment"));

    // 4) Missing file falls back to defaults
    let cfg_default = load_config(None).expect("defaults should validate");
    assert_eq!(cfg_default.server.port, 5000);
    assert_eq!(cfg_default.auth.api_key, "chave-secreta-de-desenvolvimento");
}
