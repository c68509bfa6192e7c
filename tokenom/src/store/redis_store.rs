use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
};

use redis::{aio::ConnectionLike, cmd};
use serde_json::Value;

use crate::{
    errors::RepoError,
    keys::KeyContext,
    runtime::{
        commands::{CollectionKeys, MutationCommand, RecordCreate, RecordUpdate, TokenBackfill},
        execute_command,
    },
    store::{RecordStore, TokenStore, with_record_fields},
    types::{TokenAssignment, TokenDescriptor},
};

const HSCAN_COUNT: usize = 1024;

/// Redis-backed store for one record type.
///
/// Each record is a hash holding its JSON body under `data` and, once
/// assigned, its token under `token`. The unique index is a hash of
/// token -> id and untokenized ids sit in a sorted set scored by id.
pub struct RedisStore<'a, C>
where
    C: ConnectionLike + Send,
{
    connection: &'a mut C,
    prefix: String,
    service: String,
    collection: String,
    token_field: String,
}

impl<'a, C> RedisStore<'a, C>
where
    C: ConnectionLike + Send,
{
    pub fn new(connection: &'a mut C, prefix: impl Into<String>, descriptor: &TokenDescriptor) -> Self {
        Self {
            connection,
            prefix: prefix.into(),
            service: descriptor.service.clone(),
            collection: descriptor.collection.clone(),
            token_field: descriptor.token_field.clone(),
        }
    }

    pub fn key_context(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, &self.service, &self.collection)
    }

    fn collection_keys(&self) -> CollectionKeys {
        let keys = self.key_context();
        CollectionKeys {
            key_prefix: format!("{}:{}:{}:", self.prefix, self.service, self.collection),
            untokenized_key: keys.untokenized(),
            unique_key: keys.unique(&self.token_field),
            token_field: self.token_field.clone(),
        }
    }

    fn payload_json(payload: &Value) -> Result<String, RepoError> {
        serde_json::to_string(payload).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("failed to serialize record: {err}")),
        })
    }
}

impl<C> TokenStore for RedisStore<'_, C>
where
    C: ConnectionLike + Send,
{
    async fn exists_with_token(&mut self, token: &str) -> Result<bool, RepoError> {
        let key = self.key_context().unique(&self.token_field);
        let exists: bool = cmd("HEXISTS").arg(&key).arg(token).query_async(&mut *self.connection).await?;
        Ok(exists)
    }

    async fn ids_with_null_token(&mut self) -> Result<Vec<u64>, RepoError> {
        let key = self.key_context().untokenized();
        let ids: Vec<u64> = cmd("ZRANGE").arg(&key).arg(0).arg(-1).query_async(&mut *self.connection).await?;
        Ok(ids)
    }

    async fn all_non_null_tokens(&mut self) -> Result<HashSet<String>, RepoError> {
        let key = self.key_context().unique(&self.token_field);
        let mut cursor: u64 = 0;
        let mut tokens = HashSet::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = cmd("HSCAN")
                .arg(&key)
                .arg(cursor)
                .arg("COUNT")
                .arg(HSCAN_COUNT)
                .query_async(&mut *self.connection)
                .await?;
            // HSCAN replies alternate field, value; the fields are the tokens.
            tokens.extend(batch.into_iter().step_by(2));
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(tokens)
    }

    async fn bulk_set_tokens(&mut self, assignments: &[TokenAssignment]) -> Result<u64, RepoError> {
        let command = MutationCommand::BackfillTokens(TokenBackfill {
            keys: self.collection_keys(),
            assignments: assignments.to_vec(),
        });
        let response = execute_command(&mut *self.connection, &command).await?;
        updated_count(&response)
    }
}

fn updated_count(response: &Value) -> Result<u64, RepoError> {
    response.get("updated").and_then(Value::as_u64).ok_or(RepoError::Other {
        message: Cow::Borrowed("backfill script returned no updated count"),
    })
}

impl<C> RecordStore for RedisStore<'_, C>
where
    C: ConnectionLike + Send,
{
    async fn insert_record(&mut self, token: Option<&str>, payload: Value) -> Result<u64, RepoError> {
        let command = MutationCommand::CreateRecord(RecordCreate {
            keys: self.collection_keys(),
            sequence_key: self.key_context().sequence(),
            token: token.map(str::to_string),
            payload_json: Self::payload_json(&payload)?,
        });
        let response = execute_command(&mut *self.connection, &command).await?;
        response.get("id").and_then(Value::as_u64).ok_or(RepoError::Other {
            message: Cow::Borrowed("create script returned no id"),
        })
    }

    async fn get_record(&mut self, id: u64) -> Result<Option<Value>, RepoError> {
        let key = self.key_context().record(id);
        let fields: HashMap<String, String> = cmd("HGETALL").arg(&key).query_async(&mut *self.connection).await?;
        let Some(data) = fields.get("data") else {
            return Ok(None);
        };
        let payload: Value = serde_json::from_str(data).map_err(|err| RepoError::Other {
            message: format!("failed to deserialize record: {err}").into(),
        })?;
        let token = fields.get("token").map(String::as_str);
        Ok(Some(with_record_fields(payload, id, &self.token_field, token)))
    }

    async fn update_record(&mut self, id: u64, token: Option<&str>, payload: Value) -> Result<(), RepoError> {
        let command = MutationCommand::UpdateRecord(RecordUpdate {
            keys: self.collection_keys(),
            key: self.key_context().record(id),
            entity_id: id,
            token: token.map(str::to_string),
            payload_json: Self::payload_json(&payload)?,
        });
        execute_command(&mut *self.connection, &command).await?;
        Ok(())
    }
}
