use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::{
    errors::RepoError,
    store::{RecordStore, TokenStore, with_record_fields},
    types::{TokenAssignment, TokenDescriptor},
};

#[derive(Debug, Clone)]
struct StoredRecord {
    token: Option<String>,
    payload: Value,
}

/// In-process store for a single record type.
///
/// Mirrors the Redis store: ids are handed out from a sequence, tokens are
/// kept in a unique index and bulk writes are all-or-nothing.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    token_field: String,
    unique_index: bool,
    next_id: u64,
    records: BTreeMap<u64, StoredRecord>,
    tokens: HashMap<String, u64>,
    pending_failure: Option<String>,
    existence_checks: usize,
    bulk_writes: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            token_field: "token".to_string(),
            unique_index: true,
            next_id: 0,
            records: BTreeMap::new(),
            tokens: HashMap::new(),
            pending_failure: None,
            existence_checks: 0,
            bulk_writes: 0,
        }
    }

    pub fn for_descriptor(descriptor: &TokenDescriptor) -> Self {
        Self {
            token_field: descriptor.token_field.clone(),
            ..Self::new()
        }
    }

    /// Drops the unique index backstop; duplicates are then only prevented by the assigner.
    pub fn without_unique_index(mut self) -> Self {
        self.unique_index = false;
        self
    }

    /// Makes the next bulk write fail with `code` without applying anything.
    pub fn fail_next_bulk_write(&mut self, code: impl Into<String>) {
        self.pending_failure = Some(code.into());
    }

    pub fn token_of(&self, id: u64) -> Option<&str> {
        self.records.get(&id).and_then(|record| record.token.as_deref())
    }

    pub fn tokens(&self) -> BTreeMap<u64, Option<String>> {
        self.records
            .iter()
            .map(|(id, record)| (*id, record.token.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn existence_checks(&self) -> usize {
        self.existence_checks
    }

    pub fn bulk_writes(&self) -> usize {
        self.bulk_writes
    }

    fn claim_token(&self, token: &str, id: Option<u64>) -> Result<(), RepoError> {
        if !self.unique_index {
            return Ok(());
        }
        match self.tokens.get(token) {
            Some(owner) if Some(*owner) != id => Err(RepoError::UniqueConstraintViolation {
                fields: vec![self.token_field.clone()],
                values: vec![token.to_string()],
                existing_entity_id: owner.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn with_fields(&self, payload: Value, id: u64, token: Option<&str>) -> Value {
        with_record_fields(payload, id, &self.token_field, token)
    }
}

impl TokenStore for MemoryStore {
    async fn exists_with_token(&mut self, token: &str) -> Result<bool, RepoError> {
        self.existence_checks += 1;
        Ok(self
            .records
            .values()
            .any(|record| record.token.as_deref() == Some(token)))
    }

    async fn ids_with_null_token(&mut self) -> Result<Vec<u64>, RepoError> {
        Ok(self
            .records
            .iter()
            .filter(|(_, record)| record.token.is_none())
            .map(|(id, _)| *id)
            .collect())
    }

    async fn all_non_null_tokens(&mut self) -> Result<HashSet<String>, RepoError> {
        Ok(self
            .records
            .values()
            .filter_map(|record| record.token.clone())
            .collect())
    }

    async fn bulk_set_tokens(&mut self, assignments: &[TokenAssignment]) -> Result<u64, RepoError> {
        if let Some(code) = self.pending_failure.take() {
            return Err(RepoError::Rejected {
                message: "injected bulk write failure".to_string(),
                code,
            });
        }

        let mut batch = HashSet::with_capacity(assignments.len());
        for assignment in assignments {
            let record = self.records.get(&assignment.id).ok_or_else(|| RepoError::NotFound {
                entity_id: Some(assignment.id.to_string()),
            })?;
            if record.token.is_some() {
                return Err(RepoError::Rejected {
                    code: "token_already_assigned".to_string(),
                    message: format!("record {} already has a token", assignment.id),
                });
            }
            self.claim_token(&assignment.token, Some(assignment.id))?;
            if self.unique_index && !batch.insert(assignment.token.as_str()) {
                return Err(RepoError::Rejected {
                    code: "duplicate_token_in_batch".to_string(),
                    message: format!("token {} appears twice in one batch", assignment.token),
                });
            }
        }

        self.bulk_writes += 1;
        for assignment in assignments {
            let payload = match self.records.get(&assignment.id) {
                Some(record) => record.payload.clone(),
                None => continue,
            };
            let payload = self.with_fields(payload, assignment.id, Some(&assignment.token));
            self.records.insert(
                assignment.id,
                StoredRecord {
                    token: Some(assignment.token.clone()),
                    payload,
                },
            );
            self.tokens.insert(assignment.token.clone(), assignment.id);
        }
        Ok(assignments.len() as u64)
    }
}

impl RecordStore for MemoryStore {
    async fn insert_record(&mut self, token: Option<&str>, payload: Value) -> Result<u64, RepoError> {
        if let Some(token) = token {
            self.claim_token(token, None)?;
        }
        self.next_id += 1;
        let id = self.next_id;
        let payload = self.with_fields(payload, id, token);
        if let Some(token) = token {
            self.tokens.insert(token.to_string(), id);
        }
        self.records.insert(
            id,
            StoredRecord {
                token: token.map(str::to_string),
                payload,
            },
        );
        Ok(id)
    }

    async fn get_record(&mut self, id: u64) -> Result<Option<Value>, RepoError> {
        Ok(self.records.get(&id).map(|record| record.payload.clone()))
    }

    async fn update_record(&mut self, id: u64, token: Option<&str>, payload: Value) -> Result<(), RepoError> {
        let previous = self
            .records
            .get(&id)
            .ok_or_else(|| RepoError::NotFound {
                entity_id: Some(id.to_string()),
            })?
            .token
            .clone();

        match (previous.as_deref(), token) {
            (Some(_), None) => {
                return Err(RepoError::Rejected {
                    code: "token_required".to_string(),
                    message: format!("record {id} cannot have its token cleared"),
                });
            }
            (_, Some(token)) => self.claim_token(token, Some(id))?,
            (None, None) => {}
        }

        if let Some(previous) = previous.as_deref().filter(|previous| token != Some(*previous)) {
            self.tokens.remove(previous);
        }
        if let Some(token) = token {
            self.tokens.insert(token.to_string(), id);
        }
        let payload = self.with_fields(payload, id, token);
        self.records.insert(
            id,
            StoredRecord {
                token: token.map(str::to_string),
                payload,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn bulk_write_is_all_or_nothing() {
        let mut store = MemoryStore::new();
        let first = store.insert_record(None, json!({})).await.unwrap();
        let second = store.insert_record(None, json!({})).await.unwrap();
        store.insert_record(Some("taken"), json!({})).await.unwrap();

        let err = store
            .bulk_set_tokens(&[
                TokenAssignment::new(first, "fresh"),
                TokenAssignment::new(second, "taken"),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::UniqueConstraintViolation { .. }));
        assert_eq!(store.token_of(first), None);
        assert_eq!(store.token_of(second), None);
        assert_eq!(store.bulk_writes(), 0);
    }

    #[tokio::test]
    async fn rejects_duplicate_tokens_within_a_batch() {
        let mut store = MemoryStore::new();
        let first = store.insert_record(None, json!({})).await.unwrap();
        let second = store.insert_record(None, json!({})).await.unwrap();

        let err = store
            .bulk_set_tokens(&[TokenAssignment::new(first, "same"), TokenAssignment::new(second, "same")])
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Rejected { ref code, .. } if code == "duplicate_token_in_batch"));
    }

    #[tokio::test]
    async fn refuses_to_clear_a_token() {
        let mut store = MemoryStore::new();
        let id = store.insert_record(Some("abc"), json!({})).await.unwrap();
        let err = store.update_record(id, None, json!({})).await.unwrap_err();
        assert!(matches!(err, RepoError::Rejected { ref code, .. } if code == "token_required"));
        assert_eq!(store.token_of(id), Some("abc"));
    }

    #[tokio::test]
    async fn payload_reflects_assigned_fields() {
        let mut store = MemoryStore::new();
        let id = store.insert_record(None, json!({ "title": "lamp" })).await.unwrap();
        store.bulk_set_tokens(&[TokenAssignment::new(id, "tok")]).await.unwrap();

        let payload = store.get_record(id).await.unwrap().unwrap();
        assert_eq!(payload, json!({ "id": id, "title": "lamp", "token": "tok" }));
        assert!(store.ids_with_null_token().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn without_unique_index_accepts_duplicates() {
        let mut store = MemoryStore::new().without_unique_index();
        store.insert_record(Some("dup"), json!({})).await.unwrap();
        store.insert_record(Some("dup"), json!({})).await.unwrap();
        assert_eq!(store.all_non_null_tokens().await.unwrap().len(), 1);
        assert_eq!(store.len(), 2);
    }
}
