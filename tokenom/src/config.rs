use std::{collections::BTreeMap, fmt, num::NonZeroUsize, path::Path};

use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

use crate::errors::RepoError;

/// Number of random bytes per token when a record type does not configure one.
pub const DEFAULT_TOKEN_BYTE_LENGTH: usize = 8;

/// Validated number of random bytes encoded into a token (always at least 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ByteLength(NonZeroUsize);

impl ByteLength {
    pub const DEFAULT: Self = match NonZeroUsize::new(DEFAULT_TOKEN_BYTE_LENGTH) {
        Some(len) => Self(len),
        None => panic!("default token length must be non-zero"),
    };

    pub fn new(len: i64) -> Result<Self, RepoError> {
        usize::try_from(len)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or_else(|| {
                RepoError::configuration(format!(
                    "token_length must be a positive number greater than 0 (got {len})"
                ))
            })
    }

    pub const fn from_non_zero(len: NonZeroUsize) -> Self {
        Self(len)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ByteLength {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for ByteLength {
    type Error = RepoError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ByteLength> for i64 {
    fn from(value: ByteLength) -> Self {
        value.get() as i64
    }
}

impl fmt::Display for ByteLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per record type token settings. Fixed at type-definition time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default, rename = "token_length")]
    pub token_byte_length: ByteLength,
}

impl TokenConfig {
    /// Builds a config, failing fast when `token_byte_length` is not positive.
    pub fn new(token_byte_length: i64) -> Result<Self, RepoError> {
        Ok(Self {
            token_byte_length: ByteLength::new(token_byte_length)?,
        })
    }

    pub const fn from_byte_length(token_byte_length: ByteLength) -> Self {
        Self { token_byte_length }
    }

    pub fn byte_length(&self) -> ByteLength {
        self.token_byte_length
    }
}

/// Configuration file contents, typically `tokenom.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenomConfig {
    #[serde(default)]
    pub redis: RedisSettings,
    /// Token settings keyed by collection name.
    #[serde(default)]
    pub collections: BTreeMap<String, TokenConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            prefix: default_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "tokenom".to_string()
}

impl RedisSettings {
    /// Get the Redis URL, expanding a `${VAR}` reference from the environment.
    pub fn resolved_url(&self) -> Result<String, RepoError> {
        let url = self.url.as_str();
        if url.starts_with("${") && url.ends_with('}') {
            let var_name = &url[2..url.len() - 1];
            std::env::var(var_name)
                .map_err(|_| RepoError::configuration(format!("environment variable {var_name} not set")))
        } else {
            Ok(url.to_string())
        }
    }

    /// Opens a connection manager on the resolved URL.
    pub async fn connect(&self) -> Result<ConnectionManager, RepoError> {
        let client = redis::Client::open(self.resolved_url()?)?;
        Ok(client.get_connection_manager().await?)
    }
}

impl TokenomConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, RepoError> {
        toml::from_str(content).map_err(|err| RepoError::configuration(format!("failed to parse config: {err}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            RepoError::configuration(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Token settings the file declares for `collection`, if any.
    pub fn collection_config(&self, collection: &str) -> Option<TokenConfig> {
        self.collections.get(collection).copied()
    }

    /// Token settings for `collection`, falling back to the defaults.
    pub fn token_config(&self, collection: &str) -> TokenConfig {
        self.collection_config(collection).unwrap_or_default()
    }
}
