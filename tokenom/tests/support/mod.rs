#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokenom::{ByteLength, ConnectionManager, Repo, Tokenizable, generate_token};

#[derive(Tokenizable, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[tokenizable(service = "shop", collection = "products", token_length = 12)]
pub struct Product {
    #[tokenizable(id)]
    #[serde(default)]
    pub id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    #[tokenizable(token)]
    #[serde(default)]
    pub token: Option<String>,
    #[tokenizable(created_at)]
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[tokenizable(updated_at)]
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(title: &str, price: i64) -> Self {
        Self {
            title: title.to_string(),
            price,
            ..Self::default()
        }
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Lowercase URL-safe alphabet.
pub fn is_token_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
}

static TEST_NAMESPACE_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub struct TestNamespace {
    pub prefix: String,
}

impl TestNamespace {
    pub fn unique() -> Self {
        let idx = TEST_NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
        let salt = generate_token(ByteLength::DEFAULT);
        Self {
            prefix: format!("tokenom_test_{idx}_{}", salt.replace(['-', '_'], "x")),
        }
    }

    pub fn product_repo(&self) -> Repo<Product> {
        Repo::new(self.prefix.clone())
    }

    pub fn pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }
}

/// Connects to `REDIS_URL` (default `redis://127.0.0.1/`); `None` when no server answers.
pub async fn redis_conn() -> Option<ConnectionManager> {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let client = redis::Client::open(url).ok()?;
    let mut ping_conn = match client.get_multiplexed_async_connection().await {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("skipping redis test: {err}");
            return None;
        }
    };
    let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut ping_conn).await;
    if pong.is_err() {
        eprintln!("skipping redis test: server did not answer PING");
        return None;
    }
    client.get_connection_manager().await.ok()
}
