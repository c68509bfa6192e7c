use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;

/// Metadata emitted by `#[derive(Tokenizable)]` for a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub service: String,
    pub collection: String,
    /// Name of the field holding the token, `token` unless renamed.
    pub token_field: String,
    pub token_config: TokenConfig,
}

/// Record types whose instances carry a unique token.
///
/// This trait is automatically implemented by `#[derive(Tokenizable)]`.
pub trait Tokenizable {
    /// The service name this record type belongs to
    const SERVICE: &'static str;

    /// The collection name used for key generation
    const COLLECTION: &'static str;

    /// Descriptor for this type; registers it with the process registry on first use.
    fn descriptor() -> TokenDescriptor;

    /// Store-assigned identifier, `None` until the record has been created.
    fn record_id(&self) -> Option<u64>;
    fn set_record_id(&mut self, id: u64);

    fn token(&self) -> Option<&str>;
    fn set_token(&mut self, token: String);

    fn touch_created(&mut self, _at: DateTime<Utc>) {}
    fn touch_updated(&mut self, _at: DateTime<Utc>) {}
}

/// One `(id, token)` pair written by a backfill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAssignment {
    pub id: u64,
    pub token: String,
}

impl TokenAssignment {
    pub fn new(id: u64, token: impl Into<String>) -> Self {
        Self { id, token: token.into() }
    }
}

/// Outcome of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Pairs written, in the order the ids were retrieved.
    pub assignments: Vec<TokenAssignment>,
    /// Generation rounds needed to reach enough unique candidates.
    pub rounds: usize,
    /// Total candidates drawn from the token source.
    pub generated: usize,
    /// Candidates dropped as duplicates of each other or of existing tokens.
    pub discarded: usize,
}

impl BackfillReport {
    pub fn is_noop(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn assigned(&self) -> usize {
        self.assignments.len()
    }
}
