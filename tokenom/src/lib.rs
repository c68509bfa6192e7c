//! Tokenom core library.
//!
//! Gives every record of a tokenizable type a unique, URL-safe, lowercase
//! token: one at creation time through [`Repo::create`], and all missing ones
//! at once through [`Repo::generate_tokens`].

extern crate self as tokenom;

pub mod assigner;
pub mod config;
pub mod errors;
pub mod generator;
pub mod keys;
pub mod registry;
pub mod repository;
pub mod runtime;
pub mod store;
pub mod types;

pub use assigner::{SOFT_RETRY_WARNING_THRESHOLD, TokenAssigner, plan_backfill};
pub use config::{ByteLength, DEFAULT_TOKEN_BYTE_LENGTH, TokenConfig, TokenomConfig};
pub use errors::*;
pub use generator::{OsTokenSource, TokenSource, generate_token};
pub use registry::{Registration, get_descriptor, register_descriptor};
pub use repository::*;
pub use store::{MemoryStore, RecordStore, RedisStore, TokenStore};
pub use tokenom_macros::Tokenizable;
pub use types::{BackfillReport, TokenAssignment, TokenDescriptor, Tokenizable};

// Re-exported so derived code and callers share one version of each
pub use chrono;
pub use redis;
pub use redis::aio::ConnectionManager;

/// Delete all keys matching a pattern (for test cleanup).
///
/// This performs a SCAN + DEL operation to safely delete keys without blocking Redis.
pub async fn cleanup_pattern<C>(conn: &mut C, pattern: &str) -> Result<u64, RepoError>
where
    C: redis::aio::ConnectionLike + Send,
{
    const SCAN_COUNT: usize = 1000;
    let mut cursor: u64 = 0;
    let mut total_deleted: u64 = 0;

    loop {
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(conn)
            .await?;

        if !keys.is_empty() {
            let deleted: u64 = redis::cmd("DEL").arg(&keys).query_async(conn).await?;
            total_deleted += deleted;
        }

        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }

    Ok(total_deleted)
}
