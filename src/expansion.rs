//! Bounded expansion of a document into an inquiry aggregate.
//!
//! 1. Normalize the raw document
//! 2. Fetch the primary record (failure here aborts the inquiry)
//! 3. Extract related documents of the opposite kind
//! 4. Keep the first `max_related` candidates
//! 5. Fetch each candidate; failures are logged and skipped
//! 6. Assemble the aggregate
use crate::config::Config;
use crate::document::normalize;
use crate::errors::AppError;
use crate::extraction::extract_related;
use crate::models::{
    Aggregate, FetchedRecord, PrimaryDocument, RelatedEntity, SkipReason, SkippedDocument,
};
use crate::services::RecordFetcher;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Hard upper bound on related lookups per inquiry.
pub const MAX_RELATED: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionOptions {
    /// Maximum related documents fetched; never above [`MAX_RELATED`].
    pub max_related: usize,
    /// Related lookups in flight at once. `1` fetches strictly one after another.
    pub concurrency: usize,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            max_related: MAX_RELATED,
            concurrency: 1,
        }
    }
}

impl ExpansionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.expansion_concurrency,
            ..Self::default()
        }
    }

    fn limit(&self) -> usize {
        self.max_related.min(MAX_RELATED)
    }

    fn in_flight(&self) -> usize {
        self.concurrency.clamp(1, MAX_RELATED)
    }
}

/// An aggregate plus the related documents that did not make it in.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub aggregate: Aggregate,
    pub skipped: Vec<SkippedDocument>,
}

pub struct Expander {
    fetcher: Arc<dyn RecordFetcher>,
    options: ExpansionOptions,
}

impl Expander {
    pub fn new(fetcher: Arc<dyn RecordFetcher>, options: ExpansionOptions) -> Self {
        Self { fetcher, options }
    }

    /// Builds the aggregate for `raw_document`.
    ///
    /// Fails only with [`AppError::InvalidDocument`] or
    /// [`AppError::PrimaryFetchFailed`]; related lookups that fail are
    /// reported in [`Expansion::skipped`] instead.
    pub async fn expand(&self, raw_document: &str) -> Result<Expansion, AppError> {
        let primary = normalize(raw_document)?;

        let record = self
            .fetcher
            .fetch(primary.kind, &primary.digits)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Primary lookup failed for {} {}: {}",
                    primary.kind,
                    primary.digits,
                    e
                );
                let status = match e.root() {
                    AppError::ProviderError { status, .. } => *status,
                    _ => None,
                };
                AppError::PrimaryFetchFailed {
                    document: primary.digits.clone(),
                    status,
                    reason: e.to_string(),
                }
            })?;

        let related_kind = primary.kind.opposite();
        let relation_label = primary.kind.relation_label();

        let mut candidates = extract_related(primary.kind, &record);
        let overflow = if candidates.len() > self.options.limit() {
            candidates.split_off(self.options.limit())
        } else {
            Vec::new()
        };

        tracing::info!(
            "{} {}: {} related {} candidate(s), {} over the limit",
            primary.kind,
            primary.digits,
            candidates.len(),
            related_kind,
            overflow.len()
        );

        // `buffered` yields in input order whatever the completion order
        let fetcher = self.fetcher.as_ref();
        let results: Vec<(String, Result<FetchedRecord, AppError>)> = stream::iter(candidates)
            .map(move |document| async move {
                let result = fetcher.fetch(related_kind, &document).await;
                (document, result)
            })
            .buffered(self.options.in_flight())
            .collect()
            .await;

        let mut related = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();

        for (document, result) in results {
            match result {
                Ok(record) => related.push(RelatedEntity {
                    kind: related_kind,
                    document,
                    record,
                    relation_label: relation_label.to_string(),
                }),
                Err(e) => {
                    tracing::warn!("Skipping related {} {}: {}", related_kind, document, e);
                    skipped.push(SkippedDocument {
                        kind: related_kind,
                        document,
                        reason: SkipReason::FetchFailed(e.to_string()),
                    });
                }
            }
        }

        skipped.extend(overflow.into_iter().map(|document| SkippedDocument {
            kind: related_kind,
            document,
            reason: SkipReason::LimitExceeded,
        }));

        tracing::info!(
            "{} {}: aggregate built with {} related, {} skipped",
            primary.kind,
            primary.digits,
            related.len(),
            skipped.len()
        );

        Ok(Expansion {
            aggregate: Aggregate {
                primary: PrimaryDocument {
                    kind: primary.kind,
                    document: primary.digits,
                    record,
                },
                related,
            },
            skipped,
        })
    }
}
