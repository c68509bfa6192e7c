//! Token assignment: rejection sampling for single records and set-based
//! deduplication for backfills.
//!
//! Neither loop has an iteration cap. With the default 8 byte length the
//! token space is 2^64, so a collision on a realistic population is rare and
//! a long run of them points at a misconfigured (too short) length. Both
//! loops log a warning once they pass [`SOFT_RETRY_WARNING_THRESHOLD`] and
//! keep going.

use std::collections::HashSet;

use crate::{
    config::{ByteLength, TokenConfig},
    errors::RepoError,
    generator::{OsTokenSource, TokenSource},
    store::TokenStore,
    types::{BackfillReport, TokenAssignment},
};

/// Collisions (single) or rounds (backfill) after which a warning is logged.
pub const SOFT_RETRY_WARNING_THRESHOLD: usize = 16;

pub struct TokenAssigner<G = OsTokenSource> {
    config: TokenConfig,
    source: G,
}

impl TokenAssigner<OsTokenSource> {
    pub fn new(config: TokenConfig) -> Self {
        Self::with_source(config, OsTokenSource)
    }
}

impl Default for TokenAssigner<OsTokenSource> {
    fn default() -> Self {
        Self::new(TokenConfig::default())
    }
}

impl<G> TokenAssigner<G>
where
    G: TokenSource,
{
    pub fn with_source(config: TokenConfig, source: G) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn source_mut(&mut self) -> &mut G {
        &mut self.source
    }

    /// Draws candidates until one is not held by any record in `store`.
    ///
    /// The result is only known to be free at the moment of the check; two
    /// concurrent creations can still race on the same value unless the store
    /// enforces a unique index on the token.
    pub async fn assign_single<S>(&mut self, store: &mut S) -> Result<String, RepoError>
    where
        S: TokenStore,
    {
        let byte_length = self.config.byte_length();
        let mut collisions = 0usize;
        loop {
            let candidate = self.source.next_token(byte_length);
            if !store.exists_with_token(&candidate).await? {
                return Ok(candidate);
            }
            collisions += 1;
            if collisions == SOFT_RETRY_WARNING_THRESHOLD {
                log::warn!(
                    "{collisions} consecutive token collisions at {byte_length} bytes; \
                     the token length is likely too short for this record type"
                );
            }
        }
    }

    /// Gives every record without a token a fresh, unique one in a single bulk write.
    ///
    /// A second run finds nothing to do and returns an empty report without
    /// drawing a candidate or writing.
    pub async fn backfill_all<S>(&mut self, store: &mut S) -> Result<BackfillReport, RepoError>
    where
        S: TokenStore,
    {
        let ids = store.ids_with_null_token().await?;
        if ids.is_empty() {
            log::debug!("backfill: no records without a token");
            return Ok(BackfillReport::default());
        }

        let existing = store.all_non_null_tokens().await?;
        let byte_length = self.config.byte_length();
        let report = plan_backfill(&ids, &existing, &mut self.source, byte_length);

        let updated = store.bulk_set_tokens(&report.assignments).await?;
        log::info!(
            "backfill: assigned {updated} tokens in {} rounds ({} candidates drawn, {} discarded)",
            report.rounds,
            report.generated,
            report.discarded
        );
        Ok(report)
    }
}

/// Pairs each id, in order, with a distinct candidate absent from `existing`.
///
/// Each round draws only the shortfall and drops candidates already drawn in
/// this run or already held by another record.
pub fn plan_backfill<G>(
    ids: &[u64],
    existing: &HashSet<String>,
    source: &mut G,
    byte_length: ByteLength,
) -> BackfillReport
where
    G: TokenSource + ?Sized,
{
    let mut candidates: Vec<String> = Vec::with_capacity(ids.len());
    let mut drawn: HashSet<String> = HashSet::with_capacity(ids.len());
    let mut report = BackfillReport::default();

    while candidates.len() < ids.len() {
        report.rounds += 1;
        let shortfall = ids.len() - candidates.len();
        for _ in 0..shortfall {
            let candidate = source.next_token(byte_length);
            report.generated += 1;
            if existing.contains(&candidate) || !drawn.insert(candidate.clone()) {
                report.discarded += 1;
                continue;
            }
            candidates.push(candidate);
        }
        log::debug!(
            "backfill round {}: {} of {} candidates unique",
            report.rounds,
            candidates.len(),
            ids.len()
        );
        if report.rounds == SOFT_RETRY_WARNING_THRESHOLD {
            log::warn!(
                "backfill needed {} rounds for {} records at {byte_length} bytes; \
                 the token length is likely too short for this record type",
                report.rounds,
                ids.len()
            );
        }
    }

    report.assignments = ids
        .iter()
        .zip(candidates)
        .map(|(id, token)| TokenAssignment::new(*id, token))
        .collect();
    report
}
