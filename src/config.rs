//! Process configuration: TOML sections plus credentials from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::consts::{
    BLS_API_URL, FRED_API_URL, HISTORY_WINDOW, INFLATION_SIGNAL, MODEL_VERSION, OPENAI_API_URL,
    PROMPT_VERSION, SCORING_VERSION,
};
use crate::jobs::MomentumMethod;
use crate::logging::LogConfig;
use crate::narrative::{
    Audience, NarrativeConfig, NarrativeSettings, PrefixPolicy, Tone,
    DEFAULT_EVALUATION_THRESHOLD,
};

pub const FRED_API_KEY_ENV: &str = "FRED_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BLS_API_KEY_ENV: &str = "BLS_API_KEY";

/// Upper bound on `providers.max_retries`
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required credential: set {0}")]
    MissingCredential(&'static str),
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("Invalid config file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProviderConfig,
    #[serde(default)]
    pub narrative: NarrativeAppConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

impl AppConfig {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signal.history_window == 0 {
            return Err(ConfigError::Invalid("signal.history_window must be > 0".into()));
        }
        if !(1..=5).contains(&self.narrative.evaluation_threshold) {
            return Err(ConfigError::Invalid(
                "narrative.evaluation_threshold must be within 1..=5".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.narrative.temperature) {
            return Err(ConfigError::Invalid(
                "narrative.temperature must be within 0.0..=2.0".into(),
            ));
        }
        if self.providers.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "providers.max_retries must be <= {MAX_RETRIES_LIMIT}"
            )));
        }
        if self.narrative.max_words == 0 {
            return Err(ConfigError::Invalid("narrative.max_words must be > 0".into()));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_fred_url")]
    pub fred_base_url: String,
    #[serde(default = "default_bls_url")]
    pub bls_base_url: String,
    #[serde(default = "default_openai_url")]
    pub openai_base_url: String,
    /// Request-level timeout applied to every provider call
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries on transient 5xx responses
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_fred_url() -> String {
    FRED_API_URL.to_string()
}

fn default_bls_url() -> String {
    BLS_API_URL.to_string()
}

fn default_openai_url() -> String {
    OPENAI_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            fred_base_url: default_fred_url(),
            bls_base_url: default_bls_url(),
            openai_base_url: default_openai_url(),
            request_timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NarrativeAppConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default = "default_max_words")]
    pub max_words: u32,
    #[serde(default)]
    pub audience: Audience,
    #[serde(default)]
    pub prefix_policy: PrefixPolicy,
    /// Self-evaluation scores below this trigger the single regeneration
    #[serde(default = "default_evaluation_threshold")]
    pub evaluation_threshold: u8,
}

fn default_model() -> String {
    MODEL_VERSION.to_string()
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_words() -> u32 {
    NarrativeConfig::default().max_words
}

fn default_evaluation_threshold() -> u8 {
    DEFAULT_EVALUATION_THRESHOLD
}

impl Default for NarrativeAppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            tone: Tone::default(),
            max_words: default_max_words(),
            audience: Audience::default(),
            prefix_policy: PrefixPolicy::default(),
            evaluation_threshold: default_evaluation_threshold(),
        }
    }
}

impl NarrativeAppConfig {
    /// Per-invocation defaults for batch runs.
    pub fn narrative_config(&self) -> NarrativeConfig {
        NarrativeConfig {
            tone: self.tone,
            max_words: self.max_words,
            audience: self.audience,
        }
    }

    pub fn settings(&self) -> NarrativeSettings {
        NarrativeSettings {
            temperature: self.temperature,
            prefix_policy: self.prefix_policy,
            evaluation_threshold: self.evaluation_threshold,
        }
    }
}

/// Identity and provenance of the inflation signal.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SignalConfig {
    #[serde(default = "default_signal_type")]
    pub signal_type: String,
    #[serde(default = "default_prompt_version")]
    pub prompt_version: String,
    #[serde(default = "default_scoring_version")]
    pub scoring_version: String,
    /// Trailing history length stored with each snapshot
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default)]
    pub momentum_method: MomentumMethod,
}

fn default_signal_type() -> String {
    INFLATION_SIGNAL.to_string()
}

fn default_prompt_version() -> String {
    PROMPT_VERSION.to_string()
}

fn default_scoring_version() -> String {
    SCORING_VERSION.to_string()
}

fn default_history_window() -> usize {
    HISTORY_WINDOW
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            signal_type: default_signal_type(),
            prompt_version: default_prompt_version(),
            scoring_version: default_scoring_version(),
            history_window: default_history_window(),
            momentum_method: MomentumMethod::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Append-only JSON-lines file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/signals.jsonl")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackfillConfig {
    /// First year requested from BLS
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    /// Summaries are generated only for periods this recent
    #[serde(default = "default_summary_years")]
    pub summary_years: u32,
    /// Deep analyses are generated only for periods this recent
    #[serde(default = "default_deep_months")]
    pub deep_months: u32,
    /// Pause between consecutive generation calls
    #[serde(default = "default_llm_delay_ms")]
    pub llm_delay_ms: u64,
}

fn default_start_year() -> i32 {
    1957
}

fn default_summary_years() -> u32 {
    5
}

fn default_deep_months() -> u32 {
    24
}

fn default_llm_delay_ms() -> u64 {
    800
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            summary_years: default_summary_years(),
            deep_months: default_deep_months(),
            llm_delay_ms: default_llm_delay_ms(),
        }
    }
}

impl BackfillConfig {
    pub fn llm_delay(&self) -> Duration {
        Duration::from_millis(self.llm_delay_ms)
    }
}

/// Provider credentials. Never written to the config file.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub fred_api_key: String,
    pub openai_api_key: String,
    pub bls_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("fred_api_key", &"<redacted>")
            .field("openai_api_key", &"<redacted>")
            .field("bls_api_key", &self.bls_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary lookup. Blank values count
    /// as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Ok(Self {
            fred_api_key: get(FRED_API_KEY_ENV)
                .ok_or(ConfigError::MissingCredential(FRED_API_KEY_ENV))?,
            openai_api_key: get(OPENAI_API_KEY_ENV)
                .ok_or(ConfigError::MissingCredential(OPENAI_API_KEY_ENV))?,
            bls_api_key: get(BLS_API_KEY_ENV),
        })
    }
}
