//! Expiration Sweeper
//!
//! Reclaims records older than the retention window. Each candidate moves
//! through `Candidate -> BlobDeleted -> MetadataDeleted -> CacheEvicted`:
//!
//! 1. delete the blob and poll until the blob store confirms it is gone
//! 2. delete the metadata row
//! 3. evict the cache entry
//!
//! The blob goes first so that an interruption leaves a row pointing at a
//! missing blob, which the next pass finds and finishes, instead of a blob
//! nothing references. A record whose upload never linked its blob is
//! checked under its derived upload key. Every step is idempotent: an
//! already-absent blob or row counts as done. A failing candidate is logged, skipped and picked up
//! again on the next pass; it never aborts the batch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backends::{BlobStore, MetadataStore};
use crate::cache::MetadataCache;
use crate::config::SweepConfig;
use crate::error::{with_deadline, BackendError, BackendResult};
use crate::models::{FileRecord, RecordId};

/// Last step a candidate completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStage {
    Candidate,
    BlobDeleted,
    MetadataDeleted,
    CacheEvicted,
}

/// Why a candidate could not be swept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    #[error("blob delete failed for '{key}': {source}")]
    BlobDelete { key: String, source: BackendError },

    #[error("existence check failed for '{key}': {source}")]
    ExistenceCheck { key: String, source: BackendError },

    #[error("blob '{key}' still present after {attempts} existence checks")]
    BlobStillPresent { key: String, attempts: u32 },

    #[error("metadata delete failed: {0}")]
    MetadataDelete(BackendError),

    #[error("candidate exceeded its {0:?} budget")]
    BudgetExceeded(Duration),
}

/// A candidate that ended in the error state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub record_id: RecordId,
    /// Last stage reached before the error
    pub stage: SweepStage,
    pub error: SweepError,
}

/// Summary of one sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records selected as past retention
    pub candidates: usize,
    /// Candidates taken all the way to `CacheEvicted`
    pub swept: usize,
    /// Swept candidates whose blob was already gone or never written
    pub blobs_already_absent: usize,
    pub failures: Vec<SweepFailure>,
    /// The candidate listing failed part way; the pass ended early
    pub listing_failed: bool,
}

impl SweepReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

// == Expiration Sweeper ==
pub struct ExpirationSweeper {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    cache: Arc<MetadataCache>,
    config: SweepConfig,
}

impl ExpirationSweeper {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<MetadataCache>,
        config: SweepConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            cache,
            config,
        }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Records created before this instant are past retention.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let retention = TimeDelta::from_std(self.config.retention).ok()?;
        now.checked_sub_signed(retention)
    }

    // == Run Once ==
    /// Runs one full pass over every record past retention.
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let Some(cutoff) = self.cutoff(Utc::now()) else {
            debug!("retention window reaches before the epoch, nothing to sweep");
            return report;
        };

        let mut after = None;
        loop {
            let page = match with_deadline(
                self.config.backend_timeout,
                self.store
                    .list_created_before(cutoff, after, self.config.page_size),
            )
            .await
            {
                Ok(page) => page,
                Err(err) => {
                    error!(error = %err, "failed to list expired records, ending pass");
                    report.listing_failed = true;
                    break;
                }
            };

            let Some(last) = page.last() else {
                break;
            };
            // Keyset cursor: failed candidates stay behind it until the next pass
            after = Some(last.id);
            let last_page = page.len() < self.config.page_size;

            for record in &page {
                report.candidates += 1;
                match self.sweep_candidate(record).await {
                    Ok(blob_was_absent) => {
                        report.swept += 1;
                        if blob_was_absent {
                            report.blobs_already_absent += 1;
                        }
                        info!(
                            record_id = record.id,
                            blob_key = %record.blob_key(),
                            "deleted expired file and metadata"
                        );
                    }
                    Err(failure) => {
                        warn!(
                            record_id = failure.record_id,
                            stage = ?failure.stage,
                            error = %failure.error,
                            "sweep candidate failed, deferring to next pass"
                        );
                        report.failures.push(failure);
                    }
                }
            }

            if last_page {
                break;
            }
        }

        if report.candidates > 0 || report.listing_failed {
            info!(
                candidates = report.candidates,
                swept = report.swept,
                failed = report.failed(),
                "sweep pass complete"
            );
        } else {
            debug!("sweep pass found no expired records");
        }
        report
    }

    /// Drives one record through the deletion protocol under the
    /// per-candidate budget. Returns whether the blob was already absent.
    pub async fn sweep_candidate(
        &self,
        record: &FileRecord,
    ) -> std::result::Result<bool, SweepFailure> {
        let mut stage = SweepStage::Candidate;
        let budget = self.config.candidate_budget;
        let outcome = tokio::time::timeout(budget, self.advance(record, &mut stage)).await;

        let error = match outcome {
            Ok(Ok(blob_was_absent)) => return Ok(blob_was_absent),
            Ok(Err(err)) => err,
            Err(_) => SweepError::BudgetExceeded(budget),
        };
        Err(SweepFailure {
            record_id: record.id,
            stage,
            error,
        })
    }

    async fn advance(
        &self,
        record: &FileRecord,
        stage: &mut SweepStage,
    ) -> std::result::Result<bool, SweepError> {
        // Unlinked records may still own a blob: the link step can fail, or a
        // put can land after its deadline. Check the derived key for those.
        let blob_was_absent = self.delete_blob(&record.blob_key()).await?;
        *stage = SweepStage::BlobDeleted;

        match with_deadline(self.config.backend_timeout, self.store.delete(record.id)).await {
            Ok(_) | Err(BackendError::NotFound(_)) => {}
            Err(err) => return Err(SweepError::MetadataDelete(err)),
        }
        *stage = SweepStage::MetadataDeleted;

        self.cache.invalidate(record.id).await;
        *stage = SweepStage::CacheEvicted;

        Ok(blob_was_absent)
    }

    /// Deletes `key` and waits until the blob store stops reporting it.
    /// Returns true when the blob was already gone before any delete.
    async fn delete_blob(&self, key: &str) -> std::result::Result<bool, SweepError> {
        let present = self
            .retry(|| self.blobs.exists(key))
            .await
            .map_err(|source| SweepError::ExistenceCheck {
                key: key.to_string(),
                source,
            })?;
        if !present {
            debug!(key, "blob already absent");
            return Ok(true);
        }

        match self.retry(|| self.blobs.delete(key)).await {
            Ok(()) | Err(BackendError::NotFound(_)) => {}
            Err(source) => {
                return Err(SweepError::BlobDelete {
                    key: key.to_string(),
                    source,
                })
            }
        }

        self.confirm_absent(key).await?;
        Ok(false)
    }

    async fn confirm_absent(&self, key: &str) -> std::result::Result<(), SweepError> {
        let mut delay = self.config.confirm_backoff;
        let mut last_error = None;

        for attempt in 1..=self.config.confirm_attempts {
            match with_deadline(self.config.backend_timeout, self.blobs.exists(key)).await {
                Ok(false) => return Ok(()),
                Ok(true) => last_error = None,
                Err(err) => last_error = Some(err),
            }
            if attempt < self.config.confirm_attempts {
                debug!(key, attempt, "blob still visible, waiting {:?}", delay);
                tokio::time::sleep(delay).await;
                delay = self.next_delay(delay);
            }
        }

        Err(match last_error {
            Some(source) => SweepError::ExistenceCheck {
                key: key.to_string(),
                source,
            },
            None => SweepError::BlobStillPresent {
                key: key.to_string(),
                attempts: self.config.confirm_attempts,
            },
        })
    }

    /// Retries an idempotent blob call on transient failures.
    async fn retry<T, F, Fut>(&self, mut op: F) -> BackendResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BackendResult<T>>,
    {
        let mut delay = self.config.confirm_backoff;
        let mut attempt = 1;
        loop {
            match with_deadline(self.config.backend_timeout, op()).await {
                Err(err) if err.is_transient() && attempt < self.config.delete_attempts => {
                    debug!(attempt, error = %err, "transient blob store error, retrying");
                    tokio::time::sleep(delay).await;
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        (delay * 2).min(self.config.confirm_max_backoff)
    }
}
