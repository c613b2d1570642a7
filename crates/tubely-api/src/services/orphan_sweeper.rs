//! Background service for removing orphaned video objects.
//!
//! An upload whose metadata write failed leaves its object in the bucket
//! with no record pointing at it. This service runs periodically to:
//! - List every object under the classification prefixes
//! - Subtract the locations referenced by video records
//! - Delete what is left once it is older than the grace period

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use tubely_metadata::VideoRepository;
use tubely_models::{AspectClass, StoredLocation};
use tubely_storage::{ObjectInfo, ObjectStore};

use crate::metrics;
use crate::state::AppState;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Objects listed under the classification prefixes
    pub scanned: usize,
    /// Objects not referenced by any record
    pub unreferenced: usize,
    /// Unreferenced objects deleted
    pub deleted: usize,
}

/// Orphaned object sweeper.
pub struct OrphanSweeper {
    store: Arc<dyn ObjectStore>,
    videos: Arc<dyn VideoRepository>,
    bucket: String,
    interval: Duration,
    grace: Duration,
    enabled: bool,
}

impl OrphanSweeper {
    /// Create a new sweeper.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        videos: Arc<dyn VideoRepository>,
        bucket: impl Into<String>,
        interval: Duration,
        grace: Duration,
    ) -> Self {
        Self {
            store,
            videos,
            bucket: bucket.into(),
            interval,
            grace,
            enabled: true,
        }
    }

    /// Build from application state and its configuration.
    pub fn from_state(state: &AppState) -> Self {
        let mut sweeper = Self::new(
            Arc::clone(&state.storage),
            Arc::clone(&state.videos),
            state.ingest.bucket(),
            state.config.orphan_sweep_interval,
            state.config.orphan_sweep_grace,
        );
        sweeper.enabled = state.config.orphan_sweep_enabled;
        sweeper
    }

    /// Start the background sweep loop.
    ///
    /// This function runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Orphaned object sweeping is disabled");
            return;
        }

        info!(
            "Starting orphan sweeper (interval: {:?}, grace: {:?})",
            self.interval, self.grace
        );

        let mut ticker = interval(self.interval);

        loop {
            ticker.tick().await;

            match self.sweep_once().await {
                Ok(report) if report.unreferenced > 0 => info!(
                    scanned = report.scanned,
                    unreferenced = report.unreferenced,
                    deleted = report.deleted,
                    "Orphan sweep complete"
                ),
                Ok(_) => debug!("Orphan sweep found nothing to do"),
                Err(e) => error!("Orphan sweep error: {:#}", e),
            }
        }
    }

    /// Run a single sweep.
    pub async fn sweep_once(&self) -> anyhow::Result<SweepReport> {
        // List before reading references: a record finalized in between is
        // then seen as referenced rather than orphaned.
        let mut objects: Vec<ObjectInfo> = Vec::new();
        for class in AspectClass::all() {
            objects.extend(self.store.list_objects(&self.bucket, class.prefix()).await?);
        }

        let referenced = self.referenced_keys().await?;
        let now_ms = Utc::now().timestamp_millis().max(0) as u64;
        let grace_ms = self.grace.as_millis() as u64;

        let mut report = SweepReport {
            scanned: objects.len(),
            ..Default::default()
        };

        for object in objects {
            if referenced.contains(&object.key) {
                continue;
            }
            report.unreferenced += 1;

            let Some(modified) = object.last_modified else {
                debug!(key = %object.key, "Skipping orphan without modification time");
                continue;
            };
            if now_ms.saturating_sub(modified) < grace_ms {
                continue;
            }

            match self.store.delete_object(&self.bucket, &object.key).await {
                Ok(()) => {
                    report.deleted += 1;
                    info!(key = %object.key, size = object.size, "Deleted orphaned object");
                }
                Err(e) => warn!(key = %object.key, "Failed to delete orphaned object: {}", e),
            }
        }

        if report.deleted > 0 {
            metrics::record_orphans_swept(report.deleted as u64);
        }

        Ok(report)
    }

    /// Keys in this bucket referenced by any record.
    async fn referenced_keys(&self) -> anyhow::Result<HashSet<String>> {
        let mut keys = HashSet::new();
        for reference in self.videos.referenced_locations().await? {
            match reference.parse::<StoredLocation>() {
                Ok(location) if location.container == self.bucket => {
                    keys.insert(location.key);
                }
                Ok(_) => {}
                Err(e) => warn!(reference = %reference, "Unparseable stored location: {}", e),
            }
        }
        Ok(keys)
    }
}
