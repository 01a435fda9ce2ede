//! Integration tests for latch-config

use latch_config::*;
use std::io::Write;
use std::time::Duration;
use temp_env::{with_vars, with_vars_unset};

const KEY_VARS: [&str; 6] = [
    "LATCH_AUTH_PRIVATE_KEY",
    "LATCH_AUTH_PRIVATE_KEY_PATH",
    "LATCH_SUPER_USER_EMAIL",
    "LATCH_SUPER_USER_PASSWORD",
    "LATCH_LOG_LEVEL",
    "LATCH_DATABASE_URL",
];

fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_default_config_requires_a_key() {
    let config = LatchConfig::default();
    assert!(matches!(
        config.validate_all(),
        Err(ConfigError::DomainError { ref domain, .. }) if domain == "auth"
    ));
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("LATCH_SERVER_PORT", Some("9090")),
        ("LATCH_DATABASE_URL", Some("sqlite://env.db?mode=rwc")),
        ("LATCH_AUTH_PRIVATE_KEY", Some("MIIEvQIBADANBgkqhkiG9w0BAQEFAASC")),
        ("LATCH_AUTH_ACCESS_TTL", Some("60")),
        ("LATCH_AUTH_REFRESH_TTL", Some("3600")),
        ("LATCH_AUTH_COOKIE_DOMAINS", Some("example.com, api.example.com,")),
        ("LATCH_LOG_LEVEL", Some("debug")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_env().unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.url, "sqlite://env.db?mode=rwc");
        assert!(config.auth.private_key_base64.is_some());
        assert_eq!(config.auth.access_token_ttl, Duration::from_secs(60));
        assert_eq!(config.auth.refresh_token_ttl, Duration::from_secs(3600));
        assert_eq!(
            config.auth.cookie_domains,
            vec!["example.com".to_string(), "api.example.com".to_string()]
        );
        assert_eq!(config.logging.level, Some(LogLevel::Debug));
        assert!(config.super_user.is_none());
    });
}

#[test]
fn test_invalid_env_value_is_rejected() {
    let vars = vec![
        ("LATCH_AUTH_PRIVATE_KEY", Some("MIIE")),
        ("LATCH_SERVER_PORT", Some("eighty")),
    ];

    with_vars(vars, || {
        assert!(matches!(
            ConfigLoader::new().from_env(),
            Err(ConfigError::EnvError(_))
        ));
    });
}

#[test]
fn test_yaml_config_file() {
    let file = write_config(
        r#"
server:
  bind_address: "127.0.0.1"
  port: 8443
  request_timeout: 10
  login_rate_limit: 5

database:
  url: "sqlite://latch.db?mode=rwc"
  max_connections: 4
  connection_timeout: 5

auth:
  issuer: "latch-prod"
  private_key_path: "/etc/latch/private.pem"
  access_token_ttl: 300
  refresh_token_ttl: 86400
  cookie_domains: ["example.com"]
  bcrypt_cost: 10

super_user:
  first_name: "Ada"
  last_name: "Admin"
  email: "admin@example.com"
  password: "Sup3r!Pass"

logging:
  level: warn
  format: compact
"#,
    );

    with_vars_unset(KEY_VARS, || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();

        assert_eq!(config.server.socket_address(), "127.0.0.1:8443");
        assert_eq!(config.server.request_timeout, Duration::from_secs(10));
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.auth.issuer, "latch-prod");
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(config.super_user.as_ref().unwrap().email, "admin@example.com");
        assert_eq!(config.logging.level, Some(LogLevel::Warn));
        assert_eq!(config.logging.format, LogFormat::Compact);
    });
}

#[test]
fn test_env_overrides_file() {
    let file = write_config(
        r#"
auth:
  private_key_path: "/etc/latch/private.pem"
super_user:
  first_name: "Ada"
  last_name: "Admin"
  email: "admin@example.com"
  password: "from-file"
"#,
    );

    let vars = vec![
        ("LATCH_AUTH_PRIVATE_KEY", Some("MIIE")),
        ("LATCH_SUPER_USER_PASSWORD", Some("from-env")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();

        // Inline key replaces the file path
        assert!(config.auth.private_key_path.is_none());
        assert_eq!(config.auth.private_key_base64.as_deref(), Some("MIIE"));
        assert_eq!(config.super_user.unwrap().password, "from-env");
    });
}

#[test]
fn test_super_user_from_env_needs_both_values() {
    let vars = vec![
        ("LATCH_AUTH_PRIVATE_KEY", Some("MIIE")),
        ("LATCH_SUPER_USER_EMAIL", Some("admin@example.com")),
        ("LATCH_SUPER_USER_PASSWORD", None),
    ];
    with_vars(vars, || {
        assert!(matches!(
            ConfigLoader::new().from_env(),
            Err(ConfigError::EnvError(_))
        ));
    });

    let vars = vec![
        ("LATCH_AUTH_PRIVATE_KEY", Some("MIIE")),
        ("LATCH_SUPER_USER_EMAIL", Some("admin@example.com")),
        ("LATCH_SUPER_USER_PASSWORD", Some("Sup3r!Pass")),
    ];
    with_vars(vars, || {
        let config = ConfigLoader::new().from_env().unwrap();
        assert_eq!(config.super_user.unwrap().email, "admin@example.com");
    });
}

#[test]
fn test_invalid_super_user_email() {
    let file = write_config(
        r#"
auth:
  private_key_path: "/etc/latch/private.pem"
super_user:
  first_name: "Ada"
  last_name: "Admin"
  email: "not-an-email"
  password: "x"
"#,
    );

    with_vars_unset(KEY_VARS, || {
        assert!(matches!(
            ConfigLoader::new().from_file(file.path()),
            Err(ConfigError::DomainError { ref domain, .. }) if domain == "super_user"
        ));
    });
}

#[test]
fn test_missing_file_and_bad_yaml() {
    assert!(matches!(
        ConfigLoader::new().from_file("/nonexistent/latch.yaml"),
        Err(ConfigError::FileReadError(_))
    ));

    let file = write_config("server: [not, a, map]");
    assert!(matches!(
        ConfigLoader::new().from_file(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_redacted_yaml_hides_secrets() {
    let config = LatchConfig {
        auth: AuthConfig {
            private_key_base64: Some("c2VjcmV0LWtleQ==".to_string()),
            ..Default::default()
        },
        super_user: Some(SuperUserConfig {
            first_name: "Ada".to_string(),
            last_name: "Admin".to_string(),
            email: "admin@example.com".to_string(),
            password: "Sup3r!Pass".to_string(),
        }),
        ..Default::default()
    };

    let yaml = config.to_redacted_yaml().unwrap();
    assert!(!yaml.contains("c2VjcmV0LWtleQ=="));
    assert!(!yaml.contains("Sup3r!Pass"));
    assert!(yaml.contains("admin@example.com"));

    let parsed: LatchConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed.server.port, config.server.port);
}
