use std::{borrow::Cow, marker::PhantomData};

use chrono::Utc;
use redis::aio::ConnectionLike;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    assigner::TokenAssigner,
    config::TokenomConfig,
    errors::{RepoError, ValidationError, ValidationResult},
    generator::{OsTokenSource, TokenSource},
    registry::register_descriptor,
    store::{RecordStore, RedisStore, TokenStore},
    types::{BackfillReport, TokenDescriptor, Tokenizable},
};

/// Creation, update and backfill entry points for one tokenizable record type.
///
/// Every record created through a `Repo` passes the before-create hook, which
/// always assigns a fresh token checked against the store.
pub struct Repo<T, G = OsTokenSource> {
    descriptor: TokenDescriptor,
    prefix: String,
    assigner: TokenAssigner<G>,
    _marker: PhantomData<T>,
}

impl<T> Repo<T>
where
    T: Tokenizable,
{
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_source(prefix, OsTokenSource)
    }

    /// Builds a repo from a loaded config file: the key prefix comes from
    /// `[redis]`, and a `[collections.<name>]` entry for `T::COLLECTION`
    /// overrides the derived token length.
    ///
    /// An override that differs from the derived length is re-registered, so
    /// the registry logs the redefinition.
    pub fn from_config(config: &TokenomConfig) -> Self {
        let mut descriptor = T::descriptor();
        if let Some(token_config) = config.collection_config(T::COLLECTION) {
            descriptor.token_config = token_config;
            register_descriptor(&descriptor);
        }
        Self::from_descriptor(config.redis.prefix.clone(), descriptor, OsTokenSource)
    }
}

impl<T, G> Repo<T, G>
where
    T: Tokenizable,
    G: TokenSource,
{
    /// Builds a repo drawing candidates from `source` instead of the OS generator.
    pub fn with_source(prefix: impl Into<String>, source: G) -> Self {
        Self::from_descriptor(prefix, T::descriptor(), source)
    }

    fn from_descriptor(prefix: impl Into<String>, descriptor: TokenDescriptor, source: G) -> Self {
        Self {
            assigner: TokenAssigner::with_source(descriptor.token_config, source),
            descriptor,
            prefix: prefix.into(),
            _marker: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &TokenDescriptor {
        &self.descriptor
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn assigner_mut(&mut self) -> &mut TokenAssigner<G> {
        &mut self.assigner
    }

    /// Redis store for this record type on `conn`.
    pub fn redis_store<'c, C>(&self, conn: &'c mut C) -> RedisStore<'c, C>
    where
        C: ConnectionLike + Send,
    {
        RedisStore::new(conn, self.prefix.clone(), &self.descriptor)
    }

    /// Pattern matching every key of this record type; used for cleanup.
    pub fn collection_pattern(&self) -> String {
        format!("{}:{}:{}:*", self.prefix, self.descriptor.service, self.descriptor.collection)
    }

    /// Before-create hook: replaces whatever token the record carries with a
    /// fresh one that no stored record holds.
    pub async fn before_create<S>(&mut self, store: &mut S, record: &mut T) -> Result<(), RepoError>
    where
        S: TokenStore,
    {
        let token = self.assigner.assign_single(store).await?;
        record.set_token(token);
        Ok(())
    }

    /// Backfills tokens for every stored record of this type that lacks one.
    pub async fn generate_tokens<S>(&mut self, store: &mut S) -> Result<BackfillReport, RepoError>
    where
        S: TokenStore,
    {
        self.assigner.backfill_all(store).await
    }

    pub async fn generate_tokens_with_conn<C>(&mut self, conn: &mut C) -> Result<BackfillReport, RepoError>
    where
        C: ConnectionLike + Send,
    {
        let mut store = RedisStore::new(conn, self.prefix.clone(), &self.descriptor);
        self.assigner.backfill_all(&mut store).await
    }
}

impl<T, G> Repo<T, G>
where
    T: Tokenizable + Serialize + DeserializeOwned,
    G: TokenSource,
{
    /// Creates `record`, returning it with its token and store-assigned id set.
    ///
    /// A store failure while picking the token aborts creation before anything is written.
    pub async fn create<S>(&mut self, store: &mut S, mut record: T) -> Result<T, RepoError>
    where
        S: RecordStore,
    {
        if let Some(id) = record.record_id() {
            return Err(RepoError::InvalidRequest {
                message: format!("record already has id {id}"),
            });
        }
        self.before_create(store, &mut record).await?;

        let now = Utc::now();
        record.touch_created(now);
        record.touch_updated(now);

        let payload = to_payload(&record)?;
        let id = store.insert_record(record.token(), payload).await?;
        record.set_record_id(id);
        Ok(record)
    }

    pub async fn create_with_conn<C>(&mut self, conn: &mut C, record: T) -> Result<T, RepoError>
    where
        C: ConnectionLike + Send,
    {
        let mut store = RedisStore::new(conn, self.prefix.clone(), &self.descriptor);
        self.create(&mut store, record).await
    }

    /// Writes `record` back. A record that has been created must keep its token.
    pub async fn update<S>(&mut self, store: &mut S, mut record: T) -> Result<T, RepoError>
    where
        S: RecordStore,
    {
        self.validate_for_update(&record)?;
        let id = record.record_id().ok_or_else(|| RepoError::InvalidRequest {
            message: "cannot update a record that has not been created".to_string(),
        })?;

        record.touch_updated(Utc::now());
        let payload = to_payload(&record)?;
        store.update_record(id, record.token(), payload).await?;
        Ok(record)
    }

    pub async fn update_with_conn<C>(&mut self, conn: &mut C, record: T) -> Result<T, RepoError>
    where
        C: ConnectionLike + Send,
    {
        let mut store = RedisStore::new(conn, self.prefix.clone(), &self.descriptor);
        self.update(&mut store, record).await
    }

    pub async fn get<S>(&self, store: &mut S, id: u64) -> Result<Option<T>, RepoError>
    where
        S: RecordStore,
    {
        match store.get_record(id).await? {
            Some(value) => {
                let record = serde_json::from_value::<T>(value).map_err(|err| RepoError::Other {
                    message: Cow::Owned(format!("failed to deserialize record: {err}")),
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub async fn get_with_conn<C>(&self, conn: &mut C, id: u64) -> Result<Option<T>, RepoError>
    where
        C: ConnectionLike + Send,
    {
        let mut store = RedisStore::new(conn, self.prefix.clone(), &self.descriptor);
        self.get(&mut store, id).await
    }

    /// Update-time validation: the token must be present.
    pub fn validate_for_update(&self, record: &T) -> ValidationResult<()> {
        match record.token() {
            Some(token) if !token.is_empty() => Ok(()),
            _ => Err(ValidationError::single(
                self.descriptor.token_field.clone(),
                "validation.required",
                "token can't be blank",
            )),
        }
    }
}

fn to_payload<T: Serialize>(record: &T) -> Result<Value, RepoError> {
    serde_json::to_value(record).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("failed to serialize record: {err}")),
    })
}
