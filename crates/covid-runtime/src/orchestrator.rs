//! Parallel snapshot ingestion.
//!
//! Each snapshot file is read and rolled up into its own partial [`Store`]
//! on tokio's blocking pool; the partial stores are merged as they complete.
//! Per-date totals come from a single file each, so merge order does not
//! affect the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use covid_core::error::{CovidError, Result};
use covid_core::settings::{DataSource, Settings};
use covid_core::store::Store;
use covid_data::aggregator::SnapshotAggregator;
use covid_data::pipeline::load_remote_store;
use covid_data::reader::{find_snapshot_files, read_snapshot};
use covid_data::remote::RemoteSource;
use covid_data::schema::SchemaNormalizer;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default cap on files read concurrently.
pub const DEFAULT_MAX_PARALLEL: usize = 8;

// ── Public types ──────────────────────────────────────────────────────────────

/// Outcome of [`IngestOrchestrator::ingest_dir`].
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub store: Store,
    pub files_ingested: usize,
    pub files_skipped: usize,
    /// Files that failed, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

impl IngestReport {
    fn empty() -> Self {
        Self {
            store: Store::new(),
            files_ingested: 0,
            files_skipped: 0,
            skipped: Vec::new(),
        }
    }

    /// Record a failed file. `files_skipped` always equals `skipped.len()`.
    fn skip(&mut self, path: PathBuf, reason: String) {
        self.files_skipped += 1;
        self.skipped.push((path, reason));
    }
}

// ── IngestOrchestrator ────────────────────────────────────────────────────────

/// Runs snapshot ingestion on the blocking thread pool.
pub struct IngestOrchestrator {
    normalizer: SchemaNormalizer,
    max_parallel: usize,
}

impl Default for IngestOrchestrator {
    fn default() -> Self {
        Self::new(SchemaNormalizer::default(), DEFAULT_MAX_PARALLEL)
    }
}

impl IngestOrchestrator {
    /// Create an orchestrator. A `max_parallel` of 0 is treated as 1.
    pub fn new(normalizer: SchemaNormalizer, max_parallel: usize) -> Self {
        Self {
            normalizer,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Ingest every snapshot file directly inside `dir`.
    ///
    /// A file that fails to read is logged and counted as skipped; it never
    /// aborts the other files.
    pub async fn ingest_dir(&self, dir: &Path) -> IngestReport {
        let files = find_snapshot_files(dir);
        tracing::info!("Ingesting {} snapshot files from {}", files.len(), dir.display());

        let permits = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        for path in files {
            let normalizer = self.normalizer;
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // Never closed, so acquisition cannot fail.
                let _permit = permits.acquire_owned().await.ok();
                let task_path = path.clone();
                let result = tokio::task::spawn_blocking(move || {
                    ingest_file(&task_path, &normalizer)
                })
                .await;
                (path, result)
            });
        }

        let mut report = IngestReport::empty();

        while let Some(joined) = tasks.join_next().await {
            let (path, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The task owned the path; only the failure survives.
                    tracing::warn!(error = %e, "ingest task failed");
                    report.skip(PathBuf::from("<unknown>"), e.to_string());
                    continue;
                }
            };
            match result {
                Ok(Ok(partial)) => {
                    report.store.merge(partial);
                    report.files_ingested += 1;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    report.skip(path, e.to_string());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reader for {} panicked", path.display());
                    report.skip(path, e.to_string());
                }
            }
        }

        report.skipped.sort();
        tracing::info!(
            "Ingested {} files ({} skipped) into {} locations",
            report.files_ingested,
            report.files_skipped,
            report.store.len()
        );
        report
    }

    /// Build the store for the source `settings` selects.
    ///
    /// The remote source needs a transport; without one this is a
    /// configuration error.
    pub async fn load_store(
        &self,
        settings: &Settings,
        remote: Option<&(dyn RemoteSource + Sync)>,
    ) -> Result<Store> {
        match settings.source {
            DataSource::Snapshots => Ok(self.ingest_dir(&settings.data_dir).await.store),
            DataSource::Remote => {
                let source = remote.ok_or_else(|| {
                    CovidError::Config("remote source selected but no transport given".to_string())
                })?;
                let loaded = load_remote_store(source, &settings.resolved_timezone())?;
                Ok(loaded.store)
            }
        }
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Read one file and reduce it to a partial store.
fn ingest_file(path: &Path, normalizer: &SchemaNormalizer) -> Result<Store> {
    let snapshot = read_snapshot(path, normalizer)?;
    Ok(SnapshotAggregator::aggregate_snapshot(&snapshot))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
