//! Upload orchestration.
//!
//! Drives a full publish run: load the config once, enumerate the root once,
//! then fan one task per file out over a bounded pool. Each task owns its
//! whole pipeline — resolve metadata, compress when indicated, upload, retry —
//! and reports a per-object [`UploadOutcome`]. Nothing a task does can abort a
//! sibling: the pool always drains the complete file set, and the run's
//! verdict is computed at the end from the aggregated [`PublishReport`].
//!
//! ## Concurrency
//!
//! Tasks are independent and share only the immutable [`SiteConfig`] and the
//! [`ObjectStore`] handle. `buffer_unordered` keeps at most
//! [`PublishOptions::concurrency`] uploads in flight — enough to hide network
//! latency, bounded enough not to flood the storage endpoint or run the
//! process out of file descriptors. Completion order is not defined.
//!
//! ## Failure
//!
//! A failed attempt is retried per [`RetryPolicy`]; only exhaustion marks the
//! object failed. Configuration and enumeration problems, by contrast, abort
//! the run before the first upload — those are build errors, not flaky
//! network.

use crate::compress::compress_file;
use crate::config::{self, ConfigError, SiteConfig};
use crate::metadata;
use crate::retry::{RetryPolicy, with_retry};
use crate::scan::{self, ScanError};
use crate::store::{ObjectStore, StoreError};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Default number of uploads in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Fatal, run-level failure: nothing was uploaded.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Failure of a single upload attempt.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("compression failed: {0}")]
    Compress(std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything one task needs to upload one object. Owned by that task alone.
#[derive(Debug, Clone)]
struct UploadPlan {
    source_path: PathBuf,
    destination_key: String,
    headers: BTreeMap<String, String>,
    should_gzip: bool,
}

/// Per-object result: bytes transmitted, or the last error once retries ran out.
#[derive(Debug)]
pub struct UploadOutcome {
    pub destination_key: String,
    /// Attempts used, successful one included.
    pub attempts: u32,
    pub result: Result<u64, UploadError>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregated results of a publish run.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl PublishReport {
    /// The run succeeded iff every object did.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(UploadOutcome::is_success)
    }

    pub fn bytes_transmitted(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Tuning knobs for a publish run.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Publish every file under `root` to `store`.
///
/// Loads the config and enumerates the tree exactly once; either failing
/// aborts before any upload. The returned report covers every enumerated
/// file, successes and failures alike.
pub async fn publish(
    root: &Path,
    store: Arc<dyn ObjectStore>,
    options: &PublishOptions,
) -> Result<PublishReport, PublishError> {
    let site_config = config::load_config(root)?;
    let keys = scan::list_site_files(root)?;
    info!(objects = keys.len(), root = %root.display(), "starting publish");

    let outcomes = stream::iter(keys.into_iter().map(|key| {
        let store = Arc::clone(&store);
        let site_config = &site_config;
        let retry = &options.retry;
        async move { upload_object(root, key, site_config, store, retry).await }
    }))
    .buffer_unordered(options.concurrency.max(1))
    .collect::<Vec<_>>()
    .await;

    Ok(PublishReport { outcomes })
}

async fn upload_object(
    root: &Path,
    key: String,
    site_config: &SiteConfig,
    store: Arc<dyn ObjectStore>,
    policy: &RetryPolicy,
) -> UploadOutcome {
    let resolved = metadata::resolve_object_metadata(&key, site_config);
    let plan = UploadPlan {
        source_path: root.join(&key),
        destination_key: key.clone(),
        headers: resolved.headers,
        should_gzip: resolved.should_gzip,
    };

    let attempted = with_retry(policy, &key, || attempt(&plan, store.as_ref())).await;
    match &attempted.result {
        Ok(bytes) => {
            debug!(object = %key, attempts = attempted.attempts, bytes, "published")
        }
        Err(e) => {
            error!(
                object = %key,
                attempts = attempted.attempts,
                error = %e,
                "giving up on object"
            )
        }
    }

    UploadOutcome {
        destination_key: key,
        attempts: attempted.attempts,
        result: attempted.result,
    }
}

/// One upload attempt: compress if called for, PUT, clean up the sibling.
async fn attempt(plan: &UploadPlan, store: &dyn ObjectStore) -> Result<u64, UploadError> {
    if !plan.should_gzip {
        return Ok(store
            .put_object(&plan.destination_key, &plan.source_path, &plan.headers)
            .await?);
    }

    let source = plan.source_path.clone();
    let compressed = tokio::task::spawn_blocking(move || compress_file(&source))
        .await
        .map_err(|e| UploadError::Compress(std::io::Error::other(e)))?
        .map_err(UploadError::Compress)?;

    let result = store
        .put_object(&plan.destination_key, &compressed, &plan.headers)
        .await;

    // The sibling is scoped to this attempt; a retry recreates it.
    if let Err(e) = tokio::fs::remove_file(&compressed).await {
        debug!(path = %compressed.display(), error = %e, "could not remove temp file");
    }

    Ok(result?)
}
