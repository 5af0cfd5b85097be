//! The download manager and its worker pool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use offmap_fetch::{
    HttpTransport, TileUrlGenerator, Transport, TransportError, prefetch_marker_icons,
};
use offmap_store::{
    META_INCLUDES_MARKERS, META_INCLUDES_METADATA, ResourceStore, StoreDirectory, StoreError,
    StoreIdentity, StoreRegistry, flag_value,
};
use offmap_types::{ImageQuality, MapId};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::cursor::{ClaimedUrl, UrlCursor};
use crate::listener::ListenerSet;
use crate::progress::JobProgress;
use crate::{
    DownloadError, DownloadListener, DownloadRequest, DownloaderConfig, JobId, JobSnapshot,
    JobState, OfflineTileReader,
};

/// Entry point for offline downloads.
///
/// Owns the store registry, admits at most one download at a time, and fans
/// events out to listeners. Cloning yields another handle to the same
/// manager.
#[derive(Debug, Clone)]
pub struct DownloadManager {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    config: DownloaderConfig,
    directory: StoreDirectory,
    registry: StoreRegistry,
    listeners: ListenerSet,
    transport: Arc<dyn Transport>,
    slot: Mutex<JobSlot>,
    /// Serializes suspend, resume and cancel so workers stopped by one have
    /// drained before the next starts.
    transitions: tokio::sync::Mutex<()>,
}

#[derive(Debug, Default)]
struct JobSlot {
    state: JobState,
    /// Map of a download whose store is still being resolved.
    starting: Option<MapId>,
    active: Option<ActiveJob>,
}

#[derive(Debug)]
struct ActiveJob {
    id: JobId,
    map_id: MapId,
    store: Arc<ResourceStore>,
    created_store: bool,
    /// Metadata flags to set on an existing store once every URL is done.
    added_flags: Vec<&'static str>,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    /// Child of `cancel`, replaced on every resume.
    run: CancellationToken,
    /// Set once the URL set is resolved.
    progress: Option<Arc<JobProgress>>,
    supervisor: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

#[derive(Debug)]
struct TargetStore {
    store: Arc<ResourceStore>,
    created: bool,
    include_metadata: bool,
    include_markers: bool,
}

impl TargetStore {
    fn added_flags(&self) -> Vec<&'static str> {
        if self.created {
            return Vec::new();
        }
        let mut flags = Vec::new();
        if self.include_metadata {
            flags.push(META_INCLUDES_METADATA);
        }
        if self.include_markers {
            flags.push(META_INCLUDES_MARKERS);
        }
        flags
    }
}

impl ActiveJob {
    fn record_added_flags(&self) -> Result<(), StoreError> {
        if self.added_flags.is_empty() {
            return Ok(());
        }
        self.store
            .set_metadata(self.added_flags.iter().map(|name| (*name, flag_value(true))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Processed,
    Interrupted,
}

impl DownloadManager {
    /// Creates a manager over the stores in `config.data_dir`, fetching
    /// through `transport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or listed.
    pub fn new(config: DownloaderConfig, transport: Arc<dyn Transport>) -> Result<Self, DownloadError> {
        let directory = StoreDirectory::new(&config.data_dir)?;
        let registry = StoreRegistry::discover(&directory)?;
        info!(
            data_dir = %directory.root().display(),
            stores = registry.len(),
            "download manager ready"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                directory,
                registry,
                listeners: ListenerSet::default(),
                transport,
                slot: Mutex::new(JobSlot::default()),
                transitions: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Creates a manager fetching over HTTP with `config.client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the data
    /// directory cannot be used.
    pub fn with_http(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let transport = HttpTransport::new(config.client.clone()).map_err(TransportError::from)?;
        Self::new(config, Arc::new(transport))
    }

    /// Returns the manager configuration.
    #[must_use]
    pub fn config(&self) -> &DownloaderConfig {
        &self.shared.config
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> JobState {
        self.shared.slot.lock().state
    }

    /// Returns a snapshot of the active job.
    #[must_use]
    pub fn snapshot(&self) -> JobSnapshot {
        let slot = self.shared.slot.lock();
        let Some(active) = slot.active.as_ref() else {
            return JobSnapshot {
                state: slot.state,
                ..JobSnapshot::idle()
            };
        };
        let progress = active.progress.as_deref();
        JobSnapshot {
            state: slot.state,
            job_id: Some(active.id),
            map_id: Some(active.map_id.clone()),
            completed: progress.map_or(0, JobProgress::completed),
            expected: progress.map_or(0, JobProgress::expected),
            started_at: Some(active.started_at),
        }
    }

    /// Registers a listener.
    pub fn add_listener(&self, listener: Arc<dyn DownloadListener>) {
        self.shared.listeners.add(listener);
    }

    /// Unregisters a listener, returning whether it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn DownloadListener>) -> bool {
        self.shared.listeners.remove(listener)
    }

    /// Returns every registered store ordered by map id.
    #[must_use]
    pub fn list_databases(&self) -> Vec<Arc<ResourceStore>> {
        self.shared.registry.list()
    }

    /// Returns the registered store for `map_id`.
    #[must_use]
    pub fn get_database(&self, map_id: &MapId) -> Option<Arc<ResourceStore>> {
        self.shared.registry.get(map_id)
    }

    /// Returns true if a finished store exists for `map_id`.
    #[must_use]
    pub fn is_offline_map(&self, map_id: &MapId) -> bool {
        self.shared.registry.contains(map_id)
    }

    /// Returns a reader over the registered stores of `map_ids`, in order.
    #[must_use]
    pub fn tile_reader(&self, map_ids: &[MapId]) -> OfflineTileReader {
        let stores = map_ids
            .iter()
            .filter_map(|map_id| self.shared.registry.get(map_id))
            .collect();
        OfflineTileReader::new(self.shared.config.endpoints.clone(), stores)
    }

    /// Invalidates and deletes the store for `map_id`.
    ///
    /// Handles to the store held elsewhere report it as unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if no store is registered, the active download is
    /// writing into it, or its files cannot be deleted.
    pub fn remove_database(&self, map_id: &MapId) -> Result<(), DownloadError> {
        let store = {
            let slot = self.shared.slot.lock();
            if slot.uses_map(map_id) {
                return Err(DownloadError::StoreInUse(map_id.clone()));
            }
            self.shared
                .registry
                .remove(map_id)
                .ok_or_else(|| DownloadError::NotFound(map_id.clone()))?
        };

        store.discard()?;
        info!(%map_id, path = %store.path().display(), "removed offline store");
        Ok(())
    }

    /// Returns the store for `map_id`, creating and registering an empty one
    /// if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing store uses a different quality, the
    /// active download targets the map, or the store cannot be created.
    pub fn create_empty_database(
        &self,
        map_id: &MapId,
        quality: ImageQuality,
    ) -> Result<Arc<ResourceStore>, DownloadError> {
        let slot = self.shared.slot.lock();
        if slot.uses_map(map_id) {
            return Err(DownloadError::StoreInUse(map_id.clone()));
        }

        if let Some(existing) = self.shared.registry.get(map_id) {
            check_quality(&existing, map_id, quality)?;
            return Ok(existing);
        }

        let identity = StoreIdentity::new(map_id.clone(), quality, false, false);
        let store = Arc::new(self.shared.directory.create_store(&identity)?);
        self.shared.registry.insert(Arc::clone(&store))?;
        drop(slot);

        info!(%map_id, %quality, "created empty offline store");
        Ok(store)
    }

    /// Begins downloading `request`.
    ///
    /// Resolves the map's store (creating it if needed) before returning; the
    /// URL set and fetching proceed in the background. Completion is reported
    /// through [`DownloadListener::on_complete`].
    ///
    /// Admission runs on its own task, so dropping the returned future does
    /// not abandon a start already under way.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Busy`] if a download is active,
    /// [`DownloadError::Starting`] if another one is still resolving its
    /// store, and any error that prevented the store from being resolved. In
    /// the latter case listeners also receive the error through
    /// `on_complete`.
    pub async fn begin_downloading(&self, request: DownloadRequest) -> Result<JobId, DownloadError> {
        tokio::spawn(Arc::clone(&self.shared).start(request)).await?
    }

    /// Cancels the active download.
    ///
    /// Waits for every worker to stop, deletes the store if this download
    /// created it, and reports [`DownloadError::Canceled`] to listeners.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidState`] if no download is running or
    /// suspended.
    pub async fn cancel(&self) -> Result<(), DownloadError> {
        let _transition = self.shared.transitions.lock().await;
        let active = {
            let mut slot = self.shared.slot.lock();
            let state = slot.state;
            if !matches!(state, JobState::Running | JobState::Suspended) {
                return Err(DownloadError::InvalidState {
                    action: "cancel",
                    state,
                });
            }
            let Some(active) = slot.active.take() else {
                return Err(DownloadError::InvalidState {
                    action: "cancel",
                    state,
                });
            };
            slot.state = JobState::Canceling;
            active
        };

        self.shared.teardown(active, DownloadError::Canceled).await;
        Ok(())
    }

    /// Suspends the running download, keeping its store and cursor.
    ///
    /// Returns once every worker has stopped. URLs whose fetch was
    /// interrupted are fetched again on resume.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidState`] if no download is running.
    pub async fn suspend(&self) -> Result<(), DownloadError> {
        let _transition = self.shared.transitions.lock().await;
        let (job_id, workers) = {
            let mut slot = self.shared.slot.lock();
            let state = slot.state;
            let Some(active) = slot.active.as_mut().filter(|_| state == JobState::Running) else {
                return Err(DownloadError::InvalidState {
                    action: "suspend",
                    state,
                });
            };
            active.run.cancel();
            let drained = (active.id, std::mem::take(&mut active.workers));
            slot.state = JobState::Suspended;
            drained
        };

        self.shared
            .listeners
            .notify(|l| l.on_state_changed(JobState::Suspended));
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(job = %job_id, error = %e, "worker ended abnormally");
            }
        }
        info!(job = %job_id, "download suspended");
        Ok(())
    }

    /// Resumes a suspended download over the URLs not yet processed.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidState`] if no download is suspended.
    pub async fn resume(&self) -> Result<(), DownloadError> {
        let _transition = self.shared.transitions.lock().await;
        let job_id = {
            let mut slot = self.shared.slot.lock();
            let state = slot.state;
            let Some(active) = slot.active.as_mut().filter(|_| state == JobState::Suspended) else {
                return Err(DownloadError::InvalidState {
                    action: "resume",
                    state,
                });
            };
            active.run = active.cancel.child_token();
            if let Some(progress) = active.progress.clone().filter(|p| !p.is_complete()) {
                self.shared.spawn_workers(active, &progress);
            }
            let job_id = active.id;
            slot.state = JobState::Running;
            job_id
        };

        info!(job = %job_id, "download resumed");
        self.shared
            .listeners
            .notify(|l| l.on_state_changed(JobState::Running));
        Ok(())
    }
}

impl JobSlot {
    fn uses_map(&self, map_id: &MapId) -> bool {
        self.starting.as_ref() == Some(map_id)
            || self.active.as_ref().is_some_and(|a| &a.map_id == map_id)
    }
}

impl Shared {
    /// Admits `request`, resolves its store and launches the supervisor.
    async fn start(self: Arc<Self>, request: DownloadRequest) -> Result<JobId, DownloadError> {
        {
            let mut slot = self.slot.lock();
            if let Some(map_id) = &slot.starting {
                return Err(DownloadError::Starting(map_id.clone()));
            }
            if slot.state != JobState::Available {
                return Err(DownloadError::Busy(slot.state));
            }
            slot.starting = Some(request.map_id.clone());
        }

        let shared = Arc::clone(&self);
        let resolve = request.clone();
        let target = match tokio::task::spawn_blocking(move || shared.resolve_store(&resolve)).await
        {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        };

        let target = match target {
            Ok(target) => target,
            Err(e) => {
                self.fail_start(&request.map_id, &e);
                return Err(e);
            }
        };

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        {
            let mut slot = self.slot.lock();
            slot.starting = None;
            slot.state = JobState::Running;
            slot.active = Some(ActiveJob {
                id,
                map_id: request.map_id.clone(),
                store: Arc::clone(&target.store),
                created_store: target.created,
                added_flags: target.added_flags(),
                started_at: Utc::now(),
                run: cancel.child_token(),
                cancel: cancel.clone(),
                progress: None,
                supervisor: None,
                workers: Vec::new(),
            });
        }

        info!(
            job = %id,
            map_id = %request.map_id,
            bounds = %request.bounds,
            zoom = %request.zoom,
            quality = %request.image_quality,
            new_store = target.created,
            "download started"
        );
        self.listeners
            .notify(|l| l.on_state_changed(JobState::Running));

        let supervisor = tokio::spawn(Arc::clone(&self).supervise(id, request, target, cancel));
        if let Some(active) = self.slot.lock().active.as_mut().filter(|a| a.id == id) {
            active.supervisor = Some(supervisor);
        }

        Ok(id)
    }

    /// Finds or creates the store a request writes into.
    fn resolve_store(&self, request: &DownloadRequest) -> Result<TargetStore, DownloadError> {
        if let Some(store) = self.registry.get(&request.map_id) {
            let identity = check_quality(&store, &request.map_id, request.image_quality)?;

            // The new flags are recorded only when the download finishes.
            return Ok(TargetStore {
                store,
                created: false,
                include_metadata: request.include_metadata && !identity.includes_metadata,
                include_markers: request.include_markers && !identity.includes_markers,
            });
        }

        let identity = StoreIdentity::new(
            request.map_id.clone(),
            request.image_quality,
            request.include_metadata,
            request.include_markers,
        );
        let store = self.directory.create_store(&identity)?;
        Ok(TargetStore {
            store: Arc::new(store),
            created: true,
            include_metadata: request.include_metadata,
            include_markers: request.include_markers,
        })
    }

    /// Reports a download that never started.
    fn fail_start(&self, map_id: &MapId, error: &DownloadError) {
        warn!(%map_id, %error, "download could not start");
        let quality_mismatch = matches!(error, DownloadError::QualityMismatch { .. });

        if quality_mismatch {
            self.slot.lock().starting = None;
        } else {
            {
                let mut slot = self.slot.lock();
                slot.starting = None;
                slot.state = JobState::Canceling;
            }
            self.listeners
                .notify(|l| l.on_state_changed(JobState::Canceling));
            self.slot.lock().state = JobState::Available;
            self.listeners
                .notify(|l| l.on_state_changed(JobState::Available));
        }
        self.listeners.notify(|l| l.on_complete(Err(error)));
    }

    /// Resolves the URL set, then hands the job to the workers.
    async fn supervise(
        self: Arc<Self>,
        job_id: JobId,
        request: DownloadRequest,
        target: TargetStore,
        cancel: CancellationToken,
    ) {
        let endpoints = &self.config.endpoints;
        let map_id = &request.map_id;

        let mut static_urls = Vec::new();
        if target.include_metadata {
            static_urls.push(endpoints.metadata_url(map_id));
        }
        if target.include_markers {
            static_urls.push(endpoints.features_url(map_id));

            let prefetch = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                result = prefetch_marker_icons(self.transport.as_ref(), endpoints, map_id) => result,
            };
            match prefetch {
                Ok(prefetch) => {
                    if !prefetch.is_success() {
                        warn!(url = %prefetch.source_url, status = prefetch.status, "marker document unavailable");
                        self.listeners
                            .notify(|l| l.on_http_status_error(&prefetch.source_url, prefetch.status));
                    }
                    static_urls.extend(prefetch.icon_urls);
                }
                Err(e) => {
                    let url = endpoints.markers_geojson_url(map_id);
                    warn!(%url, error = %e, "marker prefetch failed");
                    self.listeners.notify(|l| l.on_network_error(&url, &e));
                    self.abort(job_id, DownloadError::Transport(e)).await;
                    return;
                }
            }
        }

        let tiles = TileUrlGenerator::new(endpoints.clone(), &request.bounds, request.zoom);
        let cursor = UrlCursor::new(static_urls, tiles, map_id.clone(), request.image_quality);
        let progress = Arc::new(JobProgress::new(job_id, Arc::clone(&target.store), cursor));
        let expected = progress.expected();

        if cancel.is_cancelled() {
            return;
        }
        self.listeners.notify(|l| l.on_initial_count(expected));

        {
            let mut slot = self.slot.lock();
            let state = slot.state;
            let Some(active) = slot.active.as_mut().filter(|a| a.id == job_id) else {
                return;
            };
            active.progress = Some(Arc::clone(&progress));
            if state == JobState::Running && expected > 0 {
                self.spawn_workers(active, &progress);
            }
        }
        info!(job = %job_id, %map_id, expected, "download urls resolved");

        if expected == 0 {
            self.finalize(&progress);
        }
    }

    fn spawn_workers(self: &Arc<Self>, active: &mut ActiveJob, progress: &Arc<JobProgress>) {
        let count = self.config.concurrency.max(1);
        for _ in 0..count {
            let worker = Arc::clone(self).run_worker(Arc::clone(progress), active.run.clone());
            active.workers.push(tokio::spawn(worker));
        }
        debug!(job = %active.id, workers = count, "workers spawned");
    }

    async fn run_worker(self: Arc<Self>, progress: Arc<JobProgress>, run: CancellationToken) {
        let expected = progress.expected();

        while !run.is_cancelled() {
            let Some(claim) = progress.cursor().claim() else {
                break;
            };

            if self.process(&progress, &claim, &run).await == Outcome::Interrupted {
                progress.cursor().release(claim.index);
                break;
            }

            let completed = progress.record_processed();
            self.listeners.notify(|l| l.on_progress(completed, expected));
            if completed == expected {
                self.finalize(&progress);
            }
        }
    }

    /// Skips, fetches and stores one URL.
    async fn process(
        &self,
        progress: &Arc<JobProgress>,
        claim: &ClaimedUrl,
        run: &CancellationToken,
    ) -> Outcome {
        let url = claim.url.as_str();

        let store = Arc::clone(progress.store());
        let key = claim.url.clone();
        match tokio::task::spawn_blocking(move || store.contains(&key)).await {
            Ok(Ok(true)) => {
                trace!(url, "already stored");
                return Outcome::Processed;
            }
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                self.storage_error(url, &e);
                return Outcome::Processed;
            }
            Err(e) => {
                warn!(url, error = %e, "store lookup task failed");
                return Outcome::Processed;
            }
        }

        let response = tokio::select! {
            biased;
            () = run.cancelled() => return Outcome::Interrupted,
            response = self.transport.fetch(url) => response,
        };

        match response {
            Ok(response) if response.is_success() => {
                let job = Arc::clone(progress);
                let key = claim.url.clone();
                let status = response.status;
                let written = tokio::task::spawn_blocking(move || {
                    job.writes()
                        .admit(|| job.store().put(&key, &response.body, status))
                })
                .await;
                match written {
                    Ok(Some(Ok(()))) => debug!(url, status, "stored"),
                    Ok(Some(Err(e))) => self.storage_error(url, &e),
                    Ok(None) => return Outcome::Interrupted,
                    Err(e) => warn!(url, error = %e, "store write task failed"),
                }
            }
            Ok(response) => {
                debug!(url, status = response.status, "unexpected status");
                self.listeners
                    .notify(|l| l.on_http_status_error(url, response.status));
            }
            Err(e) => {
                warn!(url, error = %e, "fetch failed");
                self.listeners.notify(|l| l.on_network_error(url, &e));
            }
        }
        Outcome::Processed
    }

    fn storage_error(&self, url: &str, error: &StoreError) {
        warn!(url, %error, "store access failed");
        self.listeners.notify(|l| l.on_storage_error(url, error));
    }

    /// Registers the job's store and frees the slot; runs once per job.
    fn finalize(&self, progress: &JobProgress) {
        if !progress.try_finalize() {
            return;
        }
        let job_id = progress.job_id();

        let (active, registered) = {
            let mut slot = self.slot.lock();
            let current = slot.active.as_ref().is_some_and(|a| a.id == job_id)
                && matches!(slot.state, JobState::Running | JobState::Suspended);
            if !current {
                return;
            }
            let Some(active) = slot.active.take() else {
                return;
            };
            slot.state = JobState::Available;
            let registered = active
                .record_added_flags()
                .and_then(|()| self.registry.insert(Arc::clone(&active.store)).map(drop));
            (active, registered)
        };

        info!(
            job = %job_id,
            map_id = %active.map_id,
            resources = progress.completed(),
            "download complete"
        );
        self.listeners
            .notify(|l| l.on_state_changed(JobState::Available));
        match registered {
            Ok(()) => self.listeners.notify(|l| l.on_complete(Ok(&active.store))),
            Err(e) => {
                let error = DownloadError::from(e);
                warn!(job = %job_id, %error, "store could not be registered");
                self.listeners.notify(|l| l.on_complete(Err(&error)));
            }
        }
    }

    /// Ends a job from inside its own supervisor after a fatal error.
    async fn abort(&self, job_id: JobId, error: DownloadError) {
        let active = {
            let mut slot = self.slot.lock();
            if !slot.active.as_ref().is_some_and(|a| a.id == job_id) {
                return;
            }
            slot.state = JobState::Canceling;
            slot.active.take()
        };
        let Some(mut active) = active else {
            return;
        };
        // The supervisor is the caller; awaiting it would never finish.
        drop(active.supervisor.take());
        self.teardown(active, error).await;
    }

    /// Stops every task of a job taken out of the slot, then frees the slot.
    ///
    /// Store writes are shut off before listeners hear of the cancellation.
    async fn teardown(&self, mut active: ActiveJob, error: DownloadError) {
        active.cancel.cancel();
        if let Some(progress) = active.progress.clone() {
            if let Err(e) = tokio::task::spawn_blocking(move || progress.writes().close()).await {
                warn!(job = %active.id, error = %e, "closing store writes failed");
            }
        }
        self.listeners
            .notify(|l| l.on_state_changed(JobState::Canceling));
        if let Some(supervisor) = active.supervisor.take() {
            if let Err(e) = supervisor.await {
                warn!(job = %active.id, error = %e, "supervisor ended abnormally");
            }
        }
        for worker in active.workers.drain(..) {
            if let Err(e) = worker.await {
                warn!(job = %active.id, error = %e, "worker ended abnormally");
            }
        }

        let store = Arc::clone(&active.store);
        if active.created_store {
            match tokio::task::spawn_blocking(move || store.discard()).await {
                Ok(Ok(())) => debug!(job = %active.id, "discarded partial store"),
                Ok(Err(e)) => warn!(job = %active.id, error = %e, "failed to discard partial store"),
                Err(e) => warn!(job = %active.id, error = %e, "store cleanup task failed"),
            }
        } else {
            store.close();
        }

        self.slot.lock().state = JobState::Available;
        info!(job = %active.id, map_id = %active.map_id, reason = %error, "download ended");
        self.listeners
            .notify(|l| l.on_state_changed(JobState::Available));
        self.listeners.notify(|l| l.on_complete(Err(&error)));
    }
}

/// Returns the store's identity if it was created at `quality`.
fn check_quality(
    store: &ResourceStore,
    map_id: &MapId,
    quality: ImageQuality,
) -> Result<StoreIdentity, DownloadError> {
    let identity = store
        .identity()
        .ok_or_else(|| StoreError::NotInitialized(store.path().to_path_buf()))?;
    if identity.image_quality != quality {
        return Err(DownloadError::QualityMismatch {
            map_id: map_id.clone(),
            existing: identity.image_quality,
            requested: quality,
        });
    }
    Ok(identity)
}
