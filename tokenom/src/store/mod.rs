//! Persistence contract the token assigner works against.
//!
//! [`TokenStore`] is everything assignment and backfill need; [`RecordStore`]
//! adds the record lifecycle used by [`crate::repository::Repo`].

use std::collections::HashSet;

use serde_json::Value;

use crate::{errors::RepoError, types::TokenAssignment};

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[allow(async_fn_in_trait)]
pub trait TokenStore {
    /// Whether any record of this type currently holds `token`.
    async fn exists_with_token(&mut self, token: &str) -> Result<bool, RepoError>;

    /// Ids of records whose token is null, in ascending id order.
    async fn ids_with_null_token(&mut self) -> Result<Vec<u64>, RepoError>;

    async fn all_non_null_tokens(&mut self) -> Result<HashSet<String>, RepoError>;

    /// Sets every pair's token in a single atomic write and returns the number
    /// of records updated. Either every pair is applied or none is.
    async fn bulk_set_tokens(&mut self, assignments: &[TokenAssignment]) -> Result<u64, RepoError>;
}

#[allow(async_fn_in_trait)]
pub trait RecordStore: TokenStore {
    /// Inserts a record and returns the id the store assigned to it.
    async fn insert_record(&mut self, token: Option<&str>, payload: Value) -> Result<u64, RepoError>;

    async fn get_record(&mut self, id: u64) -> Result<Option<Value>, RepoError>;

    /// Replaces a stored record. Clearing a previously assigned token is rejected.
    async fn update_record(&mut self, id: u64, token: Option<&str>, payload: Value) -> Result<(), RepoError>;
}

/// Writes the store-owned fields (`id` and the token field) into a record payload.
pub(crate) fn with_record_fields(mut payload: Value, id: u64, token_field: &str, token: Option<&str>) -> Value {
    if let Value::Object(map) = &mut payload {
        map.insert("id".to_string(), Value::from(id));
        map.insert(
            token_field.to_string(),
            token.map_or(Value::Null, |token| Value::String(token.to_string())),
        );
    }
    payload
}
