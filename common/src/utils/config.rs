use std::{str::FromStr, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    Openai,
    Hashed,
}

fn default_embedding_backend() -> EmbeddingBackendKind {
    EmbeddingBackendKind::Openai
}

/// Request-rate quota in `<count>/<window>` form, e.g. "30/minute".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitQuota {
    pub count: u32,
    pub window: Duration,
}

impl FromStr for RateLimitQuota {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, window) = s
            .split_once('/')
            .ok_or_else(|| format!("rate limit '{s}' must be in <count>/<window> form"))?;

        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| format!("rate limit count '{count}' is not a number"))?;
        if count == 0 {
            return Err("rate limit count must be positive".to_string());
        }

        let window = match window.trim() {
            "second" => Duration::from_secs(1),
            "minute" => Duration::from_secs(60),
            "hour" => Duration::from_secs(3600),
            other => return Err(format!("unknown rate limit window '{other}'")),
        };

        Ok(RateLimitQuota { count, window })
    }
}

impl<'de> Deserialize<'de> for RateLimitQuota {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: EmbeddingBackendKind,
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub http_port: u16,
    /// When set, the query endpoints require this key via `X-API-Key` or a
    /// bearer token. Unset means open access.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,
    #[serde(default = "default_chunk_overlap_chars")]
    pub chunk_overlap_chars: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: RateLimitQuota,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_chunk_max_chars() -> usize {
    2000
}

fn default_chunk_overlap_chars() -> usize {
    200
}

fn default_top_k() -> usize {
    5
}

fn default_similarity_threshold() -> f32 {
    0.3
}

fn default_retry_max_attempts() -> usize {
    3
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_rate_limit() -> RateLimitQuota {
    RateLimitQuota {
        count: 30,
        window: Duration::from_secs(60),
    }
}

impl AppConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
