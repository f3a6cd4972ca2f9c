//! Directory sync orchestration
//!
//! A pass fetches the complete remote collection, then upserts every record
//! into the cache. Fetching is all or nothing; writing is per record, so one
//! bad record never stops the others.

use std::sync::Arc;
use std::time::Duration;

use dirmirror_domain::{
    RecordFailure, RemoteRecord, Result, SyncConfig, SyncPhase, SyncReport,
};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::ports::SyncObserver;
use crate::directory::{DirectoryClient, FetchProgress};
use crate::user::UserCache;

/// Runs sync passes from the directory into the cache
pub struct SyncService {
    directory: Arc<dyn DirectoryClient>,
    cache: Arc<dyn UserCache>,
    config: SyncConfig,
    observer: Option<Arc<dyn SyncObserver>>,
    shutdown: CancellationToken,
    pass_token: Mutex<CancellationToken>,
    phase: Mutex<SyncPhase>,
    pass_lock: tokio::sync::Mutex<()>,
}

enum RecordOutcome {
    Synced(String),
    Failed(RecordFailure),
    Skipped,
}

impl SyncService {
    /// Create a new sync service
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        cache: Arc<dyn UserCache>,
        config: SyncConfig,
    ) -> Self {
        let shutdown = CancellationToken::new();
        Self {
            directory,
            cache,
            config,
            observer: None,
            pass_token: Mutex::new(shutdown.child_token()),
            shutdown,
            phase: Mutex::new(SyncPhase::Idle),
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Publish phases and per-record outcomes to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Tie every pass to an externally owned shutdown token.
    ///
    /// Once `token` is cancelled, this and every later pass skips its writes.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.pass_token = Mutex::new(token.child_token());
        self.shutdown = token;
        self
    }

    /// Token that stops the current (or next) pass from issuing further writes.
    ///
    /// Cancelling it affects a single pass; the pass after it starts with a
    /// fresh token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.pass_token.lock().clone()
    }

    /// Phase of the current or most recent pass
    pub fn phase(&self) -> SyncPhase {
        self.phase.lock().clone()
    }

    /// Execute one full sync pass.
    ///
    /// Passes started while another is running wait for it to finish.
    ///
    /// # Errors
    /// Returns the fetch error when the remote collection cannot be read in
    /// full. Per-record failures are reported in the [`SyncReport`], never
    /// as an error.
    #[instrument(skip(self), fields(workers = self.config.workers))]
    pub async fn run(&self) -> Result<SyncReport> {
        let _pass = self.pass_lock.lock().await;

        let token = self.cancellation_token();
        let result = self.run_pass(&token).await;
        if token.is_cancelled() {
            *self.pass_token.lock() = self.shutdown.child_token();
        }
        result
    }

    async fn run_pass(&self, token: &CancellationToken) -> Result<SyncReport> {
        self.set_phase(SyncPhase::Fetching);
        info!("starting directory sync");

        let progress = ObserverProgress { observer: self.observer.as_deref() };
        let progress: &dyn FetchProgress = &progress;
        let records = match self.directory.list_users(Some(progress)).await {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, "directory fetch failed; cache left untouched");
                self.set_phase(SyncPhase::FetchFailed);
                return Err(err);
            }
        };

        let fetched = records.len();
        self.set_phase(SyncPhase::Fetched { records: fetched });

        if fetched == 0 {
            info!("directory returned no users");
            let report = SyncReport::default();
            self.set_phase(report.phase());
            return Ok(report);
        }

        self.set_phase(SyncPhase::Syncing);
        let report = self.write_records(records, token).await;
        self.set_phase(report.phase());

        if report.was_cancelled() {
            warn!(
                synced = report.synced,
                failed = report.failed(),
                skipped = report.skipped,
                "directory sync cancelled"
            );
        } else {
            info!(
                fetched = report.fetched,
                synced = report.synced,
                failed = report.failed(),
                "directory sync completed"
            );
        }

        Ok(report)
    }

    async fn write_records(
        &self,
        records: Vec<RemoteRecord>,
        cancellation: &CancellationToken,
    ) -> SyncReport {
        let fetched = records.len();
        let workers = self.config.workers.max(1);
        let write_timeout = Duration::from_secs(self.config.write_timeout_secs);
        let cache = &*self.cache;

        // `buffered` keeps at most `workers` upserts in flight and yields
        // results in fetch order.
        let outcomes: Vec<RecordOutcome> = stream::iter(records.into_iter().enumerate())
            .map(|(index, record)| async move {
                if cancellation.is_cancelled() {
                    return RecordOutcome::Skipped;
                }
                write_record(cache, index, record, write_timeout).await
            })
            .buffered(workers)
            .collect()
            .await;

        let mut report = SyncReport { fetched, ..SyncReport::default() };
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                RecordOutcome::Synced(id) => {
                    report.synced += 1;
                    if let Some(observer) = &self.observer {
                        observer.on_record_synced(index, &id);
                    }
                }
                RecordOutcome::Failed(failure) => {
                    warn!(
                        index = failure.index,
                        user_id = failure.id.as_deref().unwrap_or("<unknown>"),
                        error = %failure.error,
                        kind = failure.error.label(),
                        "failed to sync user record"
                    );
                    if let Some(observer) = &self.observer {
                        observer.on_record_failed(&failure);
                    }
                    report.failures.push(failure);
                }
                RecordOutcome::Skipped => report.skipped += 1,
            }
        }

        report
    }

    fn set_phase(&self, phase: SyncPhase) {
        debug!(?phase, "sync phase changed");
        if let Some(observer) = &self.observer {
            observer.on_phase(&phase);
        }
        *self.phase.lock() = phase;
    }
}

async fn write_record(
    cache: &dyn UserCache,
    index: usize,
    record: RemoteRecord,
    write_timeout: Duration,
) -> RecordOutcome {
    let id = record.id().map(str::to_owned);

    // The deadline is enforced by the cache inside the unit of work, so a
    // reported failure always means nothing was written.
    let result = match record.into_user() {
        Ok(user) => cache.upsert_within(&user, write_timeout).await.map(|()| user.id),
        Err(err) => Err(err),
    };

    match result {
        Ok(id) => {
            debug!(index, user_id = %id, "user record synced");
            RecordOutcome::Synced(id)
        }
        Err(error) => RecordOutcome::Failed(RecordFailure { index, id, error }),
    }
}

/// Forwards fetch progress to the sync observer, if any.
struct ObserverProgress<'a> {
    observer: Option<&'a dyn SyncObserver>,
}

impl FetchProgress for ObserverProgress<'_> {
    fn on_page(&self, pages: usize, records: usize) {
        debug!(pages, records, "fetched directory page");
        if let Some(observer) = self.observer {
            observer.on_fetch_progress(pages, records);
        }
    }
}
