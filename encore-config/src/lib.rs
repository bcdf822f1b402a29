//! Loader for Encore configuration with YAML + environment overlays.
//!
//! Sources merge in this order, later ones winning:
//!
//! 1. files and inline YAML snippets, in the order they were attached;
//! 2. `ENCORE__<SECTION>__<KEY>` environment variables
//!    (e.g. `ENCORE__DATABASE__URL`, `ENCORE__LLM__AUTH_TOKEN`).
//!
//! After merging, every string value is expanded for `${VAR}` / `$VAR`
//! references, so secrets can stay in the environment while the file names
//! where they come from.
use config::{Config, ConfigError, Environment, File, FileFormat};
use encore_common::observability::{LogConfig, LogFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "ENCORE";

pub const DEFAULT_MISTRAL_MODEL: &str = "mistral-large-latest";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncoreConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://encore.db`.
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Browser automation stealth level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StealthLevel {
    Lightweight,
    #[default]
    Balanced,
    Maximum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (Chromedriver by default).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub stealth: StealthLevel,
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,
    /// Additional Chrome command-line arguments appended to the stealth set.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Random pause before navigation, `[min, max]` milliseconds.
    #[serde(default)]
    pub navigation_jitter_ms: (u64, u64),
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            stealth: StealthLevel::default(),
            render_timeout_secs: default_render_timeout_secs(),
            extra_args: Vec::new(),
            navigation_jitter_ms: (0, 0),
        }
    }
}

impl BrowserConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Mistral,
    Openai,
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: usize,
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(m), _) => m,
            (None, LlmProvider::Mistral) => DEFAULT_MISTRAL_MODEL,
            (None, LlmProvider::Openai) => DEFAULT_OPENAI_MODEL,
            (None, LlmProvider::Ollama) => DEFAULT_OLLAMA_MODEL,
        }
    }

    pub fn endpoint(&self) -> &str {
        match (&self.endpoint, self.provider) {
            (Some(e), _) => e,
            (None, LlmProvider::Mistral) => "https://api.mistral.ai/v1",
            (None, LlmProvider::Openai) => "https://api.openai.com/v1",
            (None, LlmProvider::Ollama) => "http://localhost:11434",
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    fn requires_token(&self) -> bool {
        !matches!(self.provider, LlmProvider::Ollama)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub emit_stderr: bool,
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            dir: None,
            emit_stderr: true,
            filter: default_filter(),
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            app_name: "encore".to_string(),
            log_dir: self.dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.filter.clone(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5000
}
fn default_database_url() -> String {
    "sqlite://encore.db".into()
}
fn default_max_connections() -> u32 {
    5
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_render_timeout_secs() -> u64 {
    10
}
fn default_filter() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
}

impl EncoreConfig {
    /// Reject values that would only fail later, on the request path.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.browser.render_timeout_secs == 0 {
            return Err(LoadError::Invalid(
                "browser.render_timeout_secs must be positive".into(),
            ));
        }
        let (lo, hi) = self.browser.navigation_jitter_ms;
        if lo > hi {
            return Err(LoadError::Invalid(format!(
                "browser.navigation_jitter_ms: min {lo} exceeds max {hi}"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(LoadError::Invalid(
                "database.max_connections must be positive".into(),
            ));
        }
        if self.llm.requires_token() {
            match self.llm.auth_token.as_deref().map(str::trim) {
                None | Some("") => {
                    return Err(LoadError::Invalid(format!(
                        "llm.auth_token is required for provider {:?}",
                        self.llm.provider
                    )));
                }
                Some(t) if t.contains("${") => {
                    return Err(LoadError::Invalid(
                        "llm.auth_token references an unset environment variable".into(),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct EncoreConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for EncoreConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoreConfigLoader {
    /// Start with no file sources; `ENCORE__` env overrides are applied at [`load`](Self::load).
    ///
    /// ```
    /// use encore_config::{EncoreConfigLoader, LlmProvider};
    ///
    /// let config = EncoreConfigLoader::new()
    ///     .with_yaml_str("llm:\n  provider: ollama\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.llm.provider, LlmProvider::Ollama);
    /// assert_eq!(config.server.port, 5000);
    /// assert_eq!(config.browser.render_timeout_secs, 10);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when absent, so deployments can rely purely on the environment.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use encore_config::{EncoreConfigLoader, StealthLevel};
    ///
    /// let cfg = EncoreConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// browser:
    ///   stealth: maximum
    ///   render_timeout_secs: 20
    /// llm:
    ///   provider: ollama
    ///   model: "llama3.1:8b"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.browser.stealth, StealthLevel::Maximum);
    /// assert_eq!(cfg.browser.render_timeout_secs, 20);
    /// assert_eq!(cfg.llm.model(), "llama3.1:8b");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use encore_config::{EncoreConfigLoader, LlmProvider};
    ///
    /// unsafe { std::env::set_var("DOC_MISTRAL_KEY", "injected-from-env"); }
    ///
    /// let config = EncoreConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   provider: mistral
    ///   auth_token: "${DOC_MISTRAL_KEY}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.llm.provider, LlmProvider::Mistral);
    /// assert_eq!(config.llm.auth_token.as_deref(), Some("injected-from-env"));
    /// assert_eq!(config.llm.model(), "mistral-large-latest");
    /// assert_eq!(config.llm.endpoint(), "https://api.mistral.ai/v1");
    ///
    /// unsafe { std::env::remove_var("DOC_MISTRAL_KEY"); }
    /// ```
    pub fn load(self) -> Result<EncoreConfig, LoadError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: EncoreConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
