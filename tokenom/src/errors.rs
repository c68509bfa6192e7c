use std::borrow::Cow;

use thiserror::Error;

/// Top-level error type returned by tokenom stores, assigners and repositories.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Invalid token configuration, detected before any data is touched.
    #[error("configuration error: {message}")]
    Configuration { message: Cow<'static, str> },

    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Unique constraint violation - the value(s) already exist on another record.
    #[error("unique constraint violation: fields {fields:?} with values {values:?} already exist on record '{existing_entity_id}'")]
    UniqueConstraintViolation {
        fields: Vec<String>,
        values: Vec<String>,
        existing_entity_id: String,
    },

    /// The store refused a write as a whole (nothing was applied).
    #[error("store rejected write ({code}): {message}")]
    Rejected { code: String, message: String },

    /// Target record was not found when performing a mutation.
    #[error("record not found")]
    NotFound { entity_id: Option<String> },

    /// Invalid input supplied to a repository operation.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl RepoError {
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` when the store itself refused the write.
    pub fn is_store_rejection(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::UniqueConstraintViolation { .. } | Self::NotFound { .. }
        )
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
