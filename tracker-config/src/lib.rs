//! Loader for tracker configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. YAML files or inline snippets (`with_file`, `with_optional_file`, `with_yaml_str`)
//! 2. `TRACKER__`-prefixed environment variables, `__` separating nested keys
//!    (`TRACKER__REDDIT__CLIENT_ID`)
//!
//! `${VAR}` placeholders inside string values are then expanded, and the legacy
//! `REDDIT_CLIENT_ID` / `REDDIT_CLIENT_SECRET` / `REDDIT_USER_AGENT` variables fill
//! any credential that is still unset.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracker_common::observability::{LogConfig, LogFormat};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Inner-Musician-8328";

/// Legacy credential variables, keyed by their field in the `reddit` section.
const LEGACY_REDDIT_ENV: [(&str, &str); 3] = [
    ("client_id", "REDDIT_CLIENT_ID"),
    ("client_secret", "REDDIT_CLIENT_SECRET"),
    ("user_agent", "REDDIT_USER_AGENT"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub version: Option<String>,
    pub reddit: RedditConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub sample: SampleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Credentials and endpoints for the Reddit API.
#[derive(Clone, Deserialize)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl RedditConfig {
    /// Credentials with every other field at its default.
    ///
    /// ```
    /// use tracker_config::{RedditConfig, DEFAULT_USER_AGENT};
    ///
    /// let cfg = RedditConfig::new("id", "secret");
    /// assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    /// assert_eq!(cfg.api_base_url, "https://oauth.reddit.com");
    /// ```
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_agent: default_user_agent(),
            auth_base_url: default_auth_base_url(),
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }

    /// Point both the token endpoint and the API at one base URL (mock servers).
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.auth_base_url = base.clone();
        self.api_base_url = base;
        self
    }
}

impl fmt::Debug for RedditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("auth_base_url", &self.auth_base_url)
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Pacing applied by the collector between records.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            item_delay_ms: default_item_delay_ms(),
        }
    }
}

/// What the `sample` command collects and where it writes it.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleConfig {
    #[serde(default = "default_subreddits")]
    pub subreddits: Vec<String>,
    #[serde(default = "default_sample_limit")]
    pub limit: usize,
    #[serde(default = "default_time_filter")]
    pub time_filter: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            subreddits: default_subreddits(),
            limit: default_sample_limit(),
            time_filter: default_time_filter(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            dir: None,
            stderr: true,
        }
    }
}

impl LoggingConfig {
    /// Translate into the settings understood by `init_logging`.
    pub fn to_log_config(&self, app_name: &'static str) -> LogConfig {
        LogConfig {
            app_name,
            log_dir: self.dir.clone(),
            emit_stderr: self.stderr,
            format: self.format,
            default_filter: self.level.clone(),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_auth_base_url() -> String {
    "https://www.reddit.com".into()
}
fn default_api_base_url() -> String {
    "https://oauth.reddit.com".into()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_max_retries() -> usize {
    2
}
fn default_item_delay_ms() -> u64 {
    100
}
fn default_subreddits() -> Vec<String> {
    ["Python", "programming", "technology", "AskReddit"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_sample_limit() -> usize {
    10
}
fn default_time_filter() -> String {
    "day".into()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data/sample")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
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

/// Fill unset `reddit` credentials from the legacy `REDDIT_*` variables.
fn apply_legacy_env(v: &mut Value) {
    if !v.is_object() {
        *v = Value::Object(Default::default());
    }
    let Some(root) = v.as_object_mut() else {
        return;
    };
    let Some(reddit) = root
        .entry("reddit")
        .or_insert_with(|| Value::Object(Default::default()))
        .as_object_mut()
    else {
        return;
    };
    for (field, var) in LEGACY_REDDIT_ENV {
        let unset = matches!(reddit.get(field), None | Some(Value::Null));
        if !unset {
            continue;
        }
        if let Ok(value) = std::env::var(var) {
            reddit.insert(field.to_string(), Value::String(value));
        }
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct TrackerConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TrackerConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerConfigLoader {
    /// Start with no files; `TRACKER__` env overrides are layered on at `load`.
    ///
    /// ```
    /// use tracker_config::TrackerConfigLoader;
    ///
    /// let cfg = TrackerConfigLoader::new()
    ///     .with_yaml_str("reddit:\n  client_id: abc\n  client_secret: xyz")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.reddit.client_id, "abc");
    /// assert_eq!(cfg.collector.item_delay_ms, 100);
    /// assert_eq!(cfg.sample.subreddits.len(), 4);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so deployments can rely on the environment alone.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// ```
    /// use tracker_config::TrackerConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_REDDIT_SECRET", "injected-from-env"); }
    ///
    /// let cfg = TrackerConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// reddit:
    ///   client_id: "abc"
    ///   client_secret: "${DOC_REDDIT_SECRET}"
    /// sample:
    ///   subreddits: ["rust"]
    ///   limit: 3
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(cfg.reddit.client_secret, "injected-from-env");
    /// assert_eq!(cfg.sample.subreddits, vec!["rust".to_string()]);
    /// assert_eq!(cfg.sample.limit, 3);
    /// assert_eq!(cfg.sample.time_filter, "day");
    ///
    /// unsafe { std::env::remove_var("DOC_REDDIT_SECRET"); }
    /// ```
    pub fn load(self) -> Result<TrackerConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("TRACKER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);
        apply_legacy_env(&mut v);

        // Round-trip through `config` so env-provided strings coerce into numbers/bools.
        Config::builder()
            .add_source(Config::try_from(&v)?)
            .build()?
            .try_deserialize()
    }
}
