//! Download requests and job snapshots.

use chrono::{DateTime, Utc};
use offmap_types::{GeoBounds, ImageQuality, MapId, ZoomRange};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::JobState;

/// Unique identifier for a download job.
pub type JobId = Uuid;

/// What to download for one map.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    /// Map to download.
    pub map_id: MapId,
    /// Region whose tiles are fetched.
    pub bounds: GeoBounds,
    /// Zoom levels whose tiles are fetched.
    pub zoom: ZoomRange,
    /// Also fetch the map's metadata document.
    pub include_metadata: bool,
    /// Also fetch the marker document and every marker icon it references.
    pub include_markers: bool,
    /// Tile quality.
    pub image_quality: ImageQuality,
}

impl DownloadRequest {
    /// Creates a request for full quality tiles plus metadata and markers.
    #[must_use]
    pub fn new(map_id: impl Into<MapId>, bounds: GeoBounds, zoom: ZoomRange) -> Self {
        Self {
            map_id: map_id.into(),
            bounds,
            zoom,
            include_metadata: true,
            include_markers: true,
            image_quality: ImageQuality::Full,
        }
    }

    /// Sets the tile quality.
    #[must_use]
    pub const fn with_quality(mut self, quality: ImageQuality) -> Self {
        self.image_quality = quality;
        self
    }

    /// Sets whether the metadata document is fetched.
    #[must_use]
    pub const fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    /// Sets whether markers and marker icons are fetched.
    #[must_use]
    pub const fn with_markers(mut self, include: bool) -> Self {
        self.include_markers = include;
        self
    }
}

/// Point-in-time view of the download slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Current state.
    pub state: JobState,
    /// Active job, if any.
    pub job_id: Option<JobId>,
    /// Map of the active job, if any.
    pub map_id: Option<MapId>,
    /// Resources processed so far.
    pub completed: u64,
    /// Resources in the job, zero until the URL set is resolved.
    pub expected: u64,
    /// When the active job began.
    pub started_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// Snapshot of an idle manager.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            state: JobState::Available,
            job_id: None,
            map_id: None,
            completed: 0,
            expected: 0,
            started_at: None,
        }
    }

    /// Returns the progress percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.expected == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.expected as f64) * 100.0
    }
}
