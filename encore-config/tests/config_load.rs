use encore_common::observability::LogFormat;
use encore_config::{EncoreConfigLoader, LlmProvider, LoadError, StealthLevel};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
server:
  host: 0.0.0.0
  port: 8080
database:
  url: "sqlite://${ENCORE_TEST_DATA}/events.db"
browser:
  webdriver_url: http://chromedriver:9515
  stealth: lightweight
  render_timeout_secs: 15
  extra_args: ["--lang=en-GB"]
  navigation_jitter_ms: [100, 400]
llm:
  provider: mistral
  auth_token: "${ENCORE_TEST_MISTRAL_KEY}"
logging:
  format: json
  emit_stderr: false
"#;

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "encore.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("ENCORE_TEST_DATA", Some("/srv/encore")),
            ("ENCORE_TEST_MISTRAL_KEY", Some("mk-123")),
        ],
        || {
            let config = EncoreConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load system config");

            assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
            assert_eq!(config.database.url, "sqlite:///srv/encore/events.db");
            assert_eq!(config.browser.webdriver_url, "http://chromedriver:9515");
            assert_eq!(config.browser.stealth, StealthLevel::Lightweight);
            assert_eq!(config.browser.render_timeout().as_secs(), 15);
            assert_eq!(config.browser.extra_args, vec!["--lang=en-GB".to_string()]);
            assert_eq!(config.browser.navigation_jitter_ms, (100, 400));
            assert_eq!(config.llm.provider, LlmProvider::Mistral);
            assert_eq!(config.llm.auth_token.as_deref(), Some("mk-123"));
            assert_eq!(config.llm.max_retries, 0);
            assert_eq!(config.logging.format, LogFormat::Json);
            assert!(!config.logging.emit_stderr);
        },
    );
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "encore.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("ENCORE_TEST_DATA", Some("/srv/encore")),
            ("ENCORE_TEST_MISTRAL_KEY", Some("mk-123")),
            ("ENCORE__SERVER__PORT", Some("9090")),
            ("ENCORE__DATABASE__URL", Some("sqlite://override.db")),
            ("ENCORE__BROWSER__HEADLESS", Some("false")),
        ],
        || {
            let config = EncoreConfigLoader::new().with_file(&p).load().unwrap();
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.database.url, "sqlite://override.db");
            assert!(!config.browser.headless);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let config = EncoreConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .with_yaml_str("llm:\n  provider: ollama\n")
        .load()
        .unwrap();

    assert_eq!(config.database.url, "sqlite://encore.db");
    assert!(config.browser.headless);
    assert_eq!(config.browser.stealth, StealthLevel::Balanced);
}

#[test]
#[serial]
fn unresolved_token_is_rejected() {
    temp_env::with_var_unset("ENCORE_TEST_MISTRAL_KEY", || {
        let err = EncoreConfigLoader::new()
            .with_yaml_str("llm:\n  provider: mistral\n  auth_token: \"${ENCORE_TEST_MISTRAL_KEY}\"\n")
            .load()
            .unwrap_err();
        assert!(matches!(err, LoadError::Invalid(_)), "{err}");
    });
}

#[test]
#[serial]
fn llm_section_is_required() {
    let err = EncoreConfigLoader::new()
        .with_yaml_str("server:\n  port: 8080\n")
        .load()
        .unwrap_err();
    assert!(matches!(err, LoadError::Source(_)), "{err}");
}
