//! Report persistence
//!
//! Manages the results directory shared with the metrics exporter and the
//! dashboard. Every file is replaced atomically: the new content is written
//! to a sibling temp file, synced, then renamed over the target, so readers
//! only ever see the previous or the new version.

use crate::error::{CloudError, Result};
use crate::purge::PurgeOutcome;
use crate::report::{ExporterMetrics, REPORT_VERSION, ReconciliationReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const REPORT_FILE: &str = "reconciliation_report.json";
const EXPORTER_FILE: &str = "cleanup_metrics.json";
const PURGE_OUTCOME_FILE: &str = "purge_outcome.json";
const LOCK_FILE: &str = "purge.lock";

/// Locks older than this are considered abandoned
const STALE_LOCK_HOURS: i64 = 1;

/// Reads and writes the persisted artifacts in the results directory
#[derive(Debug, Clone)]
pub struct ReportStore {
    results_dir: PathBuf,
}

impl ReportStore {
    pub fn new(results_dir: impl AsRef<Path>) -> Self {
        Self {
            results_dir: results_dir.as_ref().to_path_buf(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn report_path(&self) -> PathBuf {
        self.results_dir.join(REPORT_FILE)
    }

    pub fn exporter_path(&self) -> PathBuf {
        self.results_dir.join(EXPORTER_FILE)
    }

    pub fn purge_outcome_path(&self) -> PathBuf {
        self.results_dir.join(PURGE_OUTCOME_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.results_dir.join(LOCK_FILE)
    }

    async fn ensure_results_dir(&self) -> Result<()> {
        if !self.results_dir.exists() {
            fs::create_dir_all(&self.results_dir).await?;
            tracing::debug!("Created results directory: {}", self.results_dir.display());
        }
        Ok(())
    }

    /// Publish a report and the exporter view derived from it
    pub async fn save_report(&self, report: &ReconciliationReport) -> Result<()> {
        self.ensure_results_dir().await?;

        write_json_atomic(&self.report_path(), report).await?;
        write_json_atomic(&self.exporter_path(), &ExporterMetrics::from(report)).await?;

        tracing::debug!(
            path = %self.report_path().display(),
            cleanup_failed = report.cleanup_failed,
            context_cleanup_warning = report.context_cleanup_warning,
            "Published reconciliation report"
        );
        Ok(())
    }

    /// Load the last published report, if any
    pub async fn load_report(&self) -> Result<Option<ReconciliationReport>> {
        let path = self.report_path();
        if !path.exists() {
            tracing::debug!("Report file not found");
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let report: ReconciliationReport = serde_json::from_str(&content)?;

        if report.version > REPORT_VERSION {
            return Err(CloudError::UnsupportedReportVersion {
                found: report.version,
                supported: REPORT_VERSION,
            });
        }

        Ok(Some(report))
    }

    pub async fn save_purge_outcome(&self, outcome: &PurgeOutcome) -> Result<()> {
        self.ensure_results_dir().await?;
        write_json_atomic(&self.purge_outcome_path(), outcome).await?;
        tracing::debug!("Saved purge outcome");
        Ok(())
    }

    pub async fn load_purge_outcome(&self) -> Result<Option<PurgeOutcome>> {
        let path = self.purge_outcome_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Acquire the purge lock for exclusive purge runs
    ///
    /// The lock file is created with `create_new`, so of two concurrent
    /// callers exactly one wins. A lock older than one hour is removed and
    /// creation is retried once.
    pub async fn acquire_purge_lock(&self) -> Result<PurgeLock> {
        self.ensure_results_dir().await?;

        let lock_path = self.lock_path();
        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_vec_pretty(&lock_info)?;

        for attempt in 0..2 {
            if create_lock_file(&lock_path, &content).await? {
                tracing::debug!("Acquired purge lock");
                return Ok(PurgeLock {
                    lock_path,
                    released: false,
                });
            }
            if attempt == 0 {
                remove_stale_lock(&lock_path).await?;
            }
        }

        Err(CloudError::PurgeLocked(
            "lock was taken by a concurrent purge".to_string(),
        ))
    }
}

/// Create the lock file exclusively; `Ok(false)` if it already exists
async fn create_lock_file(path: &Path, content: &[u8]) -> Result<bool> {
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(mut file) => {
            file.write_all(content).await?;
            file.sync_all().await?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove an existing lock if it is stale, or fail with `PurgeLocked`
///
/// An unreadable lock may be one a concurrent caller is still writing, so it
/// is judged by file age instead of content.
async fn remove_stale_lock(path: &Path) -> Result<()> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str::<LockInfo>(&content) {
        Ok(lock_info) => {
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < STALE_LOCK_HOURS {
                return Err(CloudError::PurgeLocked(format!(
                    "locked by {} since {}",
                    lock_info.holder, lock_info.acquired_at
                )));
            }
            tracing::warn!("Removing stale purge lock from {}", lock_info.holder);
        }
        Err(e) => {
            let modified = fs::metadata(path).await?.modified()?;
            let age = modified.elapsed().unwrap_or_default();
            if age.as_secs() < STALE_LOCK_HOURS as u64 * 3600 {
                return Err(CloudError::PurgeLocked(format!(
                    "unreadable lock file {} is less than {} hour old",
                    path.display(),
                    STALE_LOCK_HOURS
                )));
            }
            tracing::warn!("Replacing unreadable purge lock: {}", e);
        }
    }

    // Only remove what was judged stale; a lock re-created meanwhile stays
    if fs::read_to_string(path).await.ok().as_deref() == Some(content.as_str()) {
        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec_pretty(value)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CloudError::ReportWrite {
            path: path.to_path_buf(),
            message: "not a file path".to_string(),
        })?;
    let tmp_path = path.with_file_name(format!(".{}.tmp-{}", file_name, std::process::id()));

    let result = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(CloudError::ReportWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        });
    }

    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the purge lock
pub struct PurgeLock {
    lock_path: PathBuf,
    released: bool,
}

impl PurgeLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released purge lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for PurgeLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
