//! End-to-end download scenarios against an in-memory transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use offmap_download::{
    DownloadError, DownloadListener, DownloadManager, DownloadRequest, DownloaderConfig, JobState,
};
use offmap_fetch::url::Endpoints;
use offmap_fetch::{FetchResponse, TileUrlGenerator, Transport, TransportError};
use offmap_store::{ResourceStore, StoreError};
use offmap_types::{GeoBounds, ImageQuality, MapId, TileCoord, ZoomRange};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::Semaphore;

const BASE_URL: &str = "http://tiles.test/v4";

const MARKERS: &str = r##"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0, 0]},
     "properties": {"marker-size": "medium", "marker-symbol": "cafe", "marker-color": "#ff8800"}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 1]},
     "properties": {"marker-size": "large", "marker-symbol": "rail", "marker-color": "#0044ff"}},
    {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
     "properties": {"marker-size": "small", "marker-symbol": "bus", "marker-color": "#000000"}}
  ]
}"##;

#[derive(Debug, Clone)]
enum Reply {
    Status(u16, Bytes),
    Fail,
}

/// Serves `payload:<url>` for every URL unless told otherwise. When gated,
/// each fetch consumes one permit before answering.
#[derive(Debug, Default)]
struct FakeTransport {
    replies: Mutex<HashMap<String, Reply>>,
    gate: Option<Arc<Semaphore>>,
    fetched: Mutex<HashMap<String, usize>>,
}

impl FakeTransport {
    fn gated(permits: usize) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(permits));
        let transport = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (transport, gate)
    }

    fn reply(&self, url: impl Into<String>, reply: Reply) {
        self.replies.lock().insert(url.into(), reply);
    }

    fn fetch_count(&self, url: &str) -> usize {
        self.fetched.lock().get(url).copied().unwrap_or(0)
    }

    fn total_fetches(&self) -> usize {
        self.fetched.lock().values().sum()
    }

    fn max_fetches_per_url(&self) -> usize {
        self.fetched.lock().values().copied().max().unwrap_or(0)
    }

    fn reset(&self) {
        self.fetched.lock().clear();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, TransportError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        let reply = self.replies.lock().get(url).cloned();
        *self.fetched.lock().entry(url.to_string()).or_default() += 1;

        match reply {
            Some(Reply::Fail) => Err(TransportError::Connection(format!("unreachable: {url}"))),
            Some(Reply::Status(status, body)) => Ok(FetchResponse::new(status, body)),
            None => Ok(FetchResponse::new(200, Bytes::from(format!("payload:{url}")))),
        }
    }
}

#[derive(Debug, Default)]
struct Recorder {
    states: Mutex<Vec<JobState>>,
    initial_counts: Mutex<Vec<u64>>,
    progress: Mutex<Vec<(u64, u64)>>,
    http_errors: Mutex<Vec<(String, u16)>>,
    network_errors: Mutex<Vec<String>>,
    completions: Mutex<Vec<Result<MapId, String>>>,
}

impl Recorder {
    fn states(&self) -> Vec<JobState> {
        self.states.lock().clone()
    }

    fn completions(&self) -> Vec<Result<MapId, String>> {
        self.completions.lock().clone()
    }

    fn completion_count(&self) -> usize {
        self.completions.lock().len()
    }

    fn max_completed(&self) -> u64 {
        self.progress.lock().iter().map(|&(c, _)| c).max().unwrap_or(0)
    }
}

impl DownloadListener for Recorder {
    fn on_state_changed(&self, state: JobState) {
        self.states.lock().push(state);
    }

    fn on_initial_count(&self, expected: u64) {
        self.initial_counts.lock().push(expected);
    }

    fn on_progress(&self, completed: u64, expected: u64) {
        self.progress.lock().push((completed, expected));
    }

    fn on_network_error(&self, url: &str, _error: &TransportError) {
        self.network_errors.lock().push(url.to_string());
    }

    fn on_http_status_error(&self, url: &str, status: u16) {
        self.http_errors.lock().push((url.to_string(), status));
    }

    fn on_complete(&self, result: Result<&Arc<ResourceStore>, &DownloadError>) {
        let entry = match result {
            Ok(store) => Ok(store.map_id().expect("finished store has a map id")),
            Err(e) => Err(e.to_string()),
        };
        self.completions.lock().push(entry);
    }
}

struct Harness {
    dir: TempDir,
    transport: Arc<FakeTransport>,
    manager: DownloadManager,
    recorder: Arc<Recorder>,
}

impl Harness {
    fn new(transport: FakeTransport, concurrency: usize) -> Self {
        let dir = TempDir::new().unwrap();
        Self::in_dir(dir, Arc::new(transport), concurrency)
    }

    fn in_dir(dir: TempDir, transport: Arc<FakeTransport>, concurrency: usize) -> Self {
        let config = DownloaderConfig::new(dir.path())
            .with_concurrency(concurrency)
            .with_endpoints(endpoints());
        let manager = DownloadManager::new(config, transport.clone()).unwrap();
        let recorder = Arc::new(Recorder::default());
        manager.add_listener(recorder.clone());
        Self {
            dir,
            transport,
            manager,
            recorder,
        }
    }

    fn store_file(&self, map_id: &str) -> std::path::PathBuf {
        self.dir.path().join(format!("{map_id}.db"))
    }

    async fn wait_for_completions(&self, count: usize) {
        wait_for("completion", || self.recorder.completion_count() >= count).await;
    }
}

fn endpoints() -> Endpoints {
    Endpoints::new(BASE_URL)
}

async fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn tiles_only(map_id: &str, bounds: GeoBounds, zoom: ZoomRange) -> DownloadRequest {
    DownloadRequest::new(map_id, bounds, zoom)
        .with_metadata(false)
        .with_markers(false)
}

/// Ten tiles at zoom 3: columns 0 to 4 of rows 0 and 1.
fn ten_tile_bounds() -> GeoBounds {
    GeoBounds::new(70.0, 80.0, -179.0, 10.0).unwrap()
}

fn tile_urls(map_id: &str, bounds: &GeoBounds, zoom: ZoomRange) -> Vec<String> {
    let generator = TileUrlGenerator::new(endpoints(), bounds, zoom);
    let map_id = MapId::from(map_id);
    (0..generator.count())
        .map(|i| generator.url_at(&map_id, ImageQuality::Full, i).unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_tile_download() {
    let harness = Harness::new(FakeTransport::default(), 4);
    let zoom = ZoomRange::single(0).unwrap();
    let tile_url = endpoints().tile_url(
        &MapId::from("acme.map"),
        ImageQuality::Full,
        TileCoord::new(0, 0, 0),
    );

    harness
        .manager
        .begin_downloading(tiles_only("acme.map", GeoBounds::world(), zoom))
        .await
        .unwrap();
    harness.wait_for_completions(1).await;

    assert_eq!(*harness.recorder.initial_counts.lock(), vec![1]);
    assert_eq!(
        harness.recorder.completions(),
        vec![Ok(MapId::from("acme.map"))]
    );
    assert_eq!(
        harness.recorder.states(),
        vec![JobState::Running, JobState::Available]
    );
    assert_eq!(harness.manager.state(), JobState::Available);

    let store = harness
        .manager
        .get_database(&MapId::from("acme.map"))
        .unwrap();
    assert_eq!(
        store.get(&tile_url).unwrap(),
        Some(format!("payload:{tile_url}").into_bytes())
    );
    assert_eq!(store.metadata("mapID").unwrap().as_deref(), Some("acme.map"));
    assert!(harness.manager.is_offline_map(&MapId::from("acme.map")));

    let reader = harness.manager.tile_reader(&[MapId::from("acme.map")]);
    assert!(reader.tile(TileCoord::new(0, 0, 0)).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_second_begin_is_rejected() {
    let (transport, gate) = FakeTransport::gated(0);
    let harness = Harness::new(transport, 2);
    let request = tiles_only("acme.map", GeoBounds::world(), ZoomRange::new(0, 1).unwrap());

    harness
        .manager
        .begin_downloading(request.clone())
        .await
        .unwrap();
    let second = harness.manager.begin_downloading(request).await;
    assert!(matches!(second, Err(DownloadError::Busy(JobState::Running))));

    let snapshot = harness.manager.snapshot();
    assert_eq!(snapshot.state, JobState::Running);
    assert_eq!(snapshot.map_id, Some(MapId::from("acme.map")));

    gate.add_permits(100);
    harness.wait_for_completions(1).await;
    assert!(harness.recorder.completions()[0].is_ok());
    assert_eq!(harness.recorder.max_completed(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_http_error_is_counted_but_not_stored() {
    let harness = Harness::new(FakeTransport::default(), 3);
    let bounds = ten_tile_bounds();
    let zoom = ZoomRange::single(3).unwrap();
    let urls = tile_urls("acme.map", &bounds, zoom);
    assert_eq!(urls.len(), 10);
    harness
        .transport
        .reply(urls[4].clone(), Reply::Status(404, Bytes::new()));

    harness
        .manager
        .begin_downloading(tiles_only("acme.map", bounds, zoom))
        .await
        .unwrap();
    harness.wait_for_completions(1).await;

    assert!(harness.recorder.completions()[0].is_ok());
    assert_eq!(harness.recorder.max_completed(), 10);
    assert_eq!(
        *harness.recorder.http_errors.lock(),
        vec![(urls[4].clone(), 404)]
    );

    let store = harness
        .manager
        .get_database(&MapId::from("acme.map"))
        .unwrap();
    assert_eq!(store.resource_count().unwrap(), 9);
    assert!(!store.contains(&urls[4]).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_network_error_does_not_stop_the_job() {
    let harness = Harness::new(FakeTransport::default(), 2);
    let zoom = ZoomRange::new(0, 1).unwrap();
    let urls = tile_urls("acme.map", &GeoBounds::world(), zoom);
    harness.transport.reply(urls[0].clone(), Reply::Fail);

    harness
        .manager
        .begin_downloading(tiles_only("acme.map", GeoBounds::world(), zoom))
        .await
        .unwrap();
    harness.wait_for_completions(1).await;

    assert!(harness.recorder.completions()[0].is_ok());
    assert_eq!(*harness.recorder.network_errors.lock(), vec![urls[0].clone()]);
    let store = harness
        .manager
        .get_database(&MapId::from("acme.map"))
        .unwrap();
    assert_eq!(store.resource_count().unwrap(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stored_urls_are_not_fetched_again() {
    let harness = Harness::new(FakeTransport::default(), 4);
    let zoom = ZoomRange::new(0, 1).unwrap();
    let request = tiles_only("acme.map", GeoBounds::world(), zoom);

    harness
        .manager
        .begin_downloading(request.clone())
        .await
        .unwrap();
    harness.wait_for_completions(1).await;
    assert_eq!(harness.transport.total_fetches(), 5);

    harness.transport.reset();
    harness.manager.begin_downloading(request).await.unwrap();
    harness.wait_for_completions(2).await;

    assert!(harness.recorder.completions()[1].is_ok());
    assert_eq!(harness.transport.total_fetches(), 0);
    assert_eq!(harness.manager.list_databases().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_prefilled_store_only_fetches_missing_urls() {
    let harness = Harness::new(FakeTransport::default(), 4);
    let map_id = MapId::from("acme.map");
    let zoom = ZoomRange::new(0, 1).unwrap();
    let urls = tile_urls("acme.map", &GeoBounds::world(), zoom);

    let store = harness
        .manager
        .create_empty_database(&map_id, ImageQuality::Full)
        .unwrap();
    store.put(&urls[0], b"seeded", 200).unwrap();
    store.put(&urls[1], b"seeded", 200).unwrap();

    harness
        .manager
        .begin_downloading(tiles_only("acme.map", GeoBounds::world(), zoom))
        .await
        .unwrap();
    harness.wait_for_completions(1).await;

    assert_eq!(harness.transport.total_fetches(), 3);
    assert_eq!(harness.transport.fetch_count(&urls[0]), 0);
    assert_eq!(store.get(&urls[0]).unwrap(), Some(b"seeded".to_vec()));
    assert_eq!(store.resource_count().unwrap(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_finalize_runs_once_with_many_workers() {
    let harness = Harness::new(FakeTransport::default(), 100);
    let zoom = ZoomRange::new(0, 4).unwrap();

    harness
        .manager
        .begin_downloading(tiles_only("acme.map", GeoBounds::world(), zoom))
        .await
        .unwrap();
    harness.wait_for_completions(1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(harness.recorder.completion_count(), 1);
    assert_eq!(harness.recorder.max_completed(), 341);
    let available = harness
        .recorder
        .states()
        .iter()
        .filter(|s| **s == JobState::Available)
        .count();
    assert_eq!(available, 1);
    assert_eq!(harness.transport.max_fetches_per_url(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_removes_new_store() {
    let (transport, gate) = FakeTransport::gated(1);
    let harness = Harness::new(transport, 4);
    let map_id = MapId::from("acme.map");

    harness
        .manager
        .begin_downloading(tiles_only(
            "acme.map",
            GeoBounds::world(),
            ZoomRange::new(0, 2).unwrap(),
        ))
        .await
        .unwrap();
    wait_for("first tile", || harness.recorder.max_completed() >= 1).await;

    harness.manager.cancel().await.unwrap();
    gate.add_permits(100);

    assert_eq!(harness.manager.state(), JobState::Available);
    assert_eq!(
        harness.recorder.states(),
        vec![JobState::Running, JobState::Canceling, JobState::Available]
    );
    let completions = harness.recorder.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(
        completions[0],
        Err(DownloadError::Canceled.to_string())
    );
    assert!(harness.manager.get_database(&map_id).is_none());
    assert!(harness.manager.list_databases().is_empty());
    assert!(!harness.store_file("acme.map").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_keeps_existing_store() {
    let (transport, gate) = FakeTransport::gated(0);
    let harness = Harness::new(transport, 2);
    let map_id = MapId::from("acme.map");
    harness
        .manager
        .create_empty_database(&map_id, ImageQuality::Full)
        .unwrap();

    harness
        .manager
        .begin_downloading(tiles_only(
            "acme.map",
            GeoBounds::world(),
            ZoomRange::single(1).unwrap(),
        ))
        .await
        .unwrap();
    harness.manager.cancel().await.unwrap();
    gate.add_permits(100);

    assert!(harness.manager.get_database(&map_id).is_some());
    assert!(harness.store_file("acme.map").exists());
    assert_eq!(harness.recorder.completions().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_suspend_and_resume_fetch_each_url_once() {
    let (transport, gate) = FakeTransport::gated(3);
    let harness = Harness::new(transport, 4);
    let zoom = ZoomRange::new(0, 2).unwrap();
    let urls = tile_urls("acme.map", &GeoBounds::world(), zoom);

    harness
        .manager
        .begin_downloading(tiles_only("acme.map", GeoBounds::world(), zoom))
        .await
        .unwrap();
    wait_for("three tiles", || harness.recorder.max_completed() >= 3).await;

    harness.manager.suspend().await.unwrap();
    assert_eq!(harness.manager.state(), JobState::Suspended);
    assert_eq!(harness.transport.total_fetches(), 3);
    assert!(harness.recorder.completions().is_empty());

    gate.add_permits(100);
    harness.manager.resume().await.unwrap();
    harness.wait_for_completions(1).await;

    assert!(harness.recorder.completions()[0].is_ok());
    assert_eq!(
        harness.recorder.states(),
        vec![
            JobState::Running,
            JobState::Suspended,
            JobState::Running,
            JobState::Available
        ]
    );
    for url in &urls {
        assert_eq!(harness.transport.fetch_count(url), 1, "{url}");
    }
    let store = harness
        .manager
        .get_database(&MapId::from("acme.map"))
        .unwrap();
    assert_eq!(store.resource_count().unwrap(), 21);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_markers_and_metadata_are_downloaded() {
    let transport = FakeTransport::default();
    let map_id = MapId::from("acme.map");
    transport.reply(
        endpoints().markers_geojson_url(&map_id),
        Reply::Status(200, Bytes::from_static(MARKERS.as_bytes())),
    );
    let harness = Harness::new(transport, 4);

    let request = DownloadRequest::new("acme.map", GeoBounds::world(), ZoomRange::single(0).unwrap());
    harness.manager.begin_downloading(request).await.unwrap();
    harness.wait_for_completions(1).await;

    // metadata + features + two icons + one tile
    assert_eq!(*harness.recorder.initial_counts.lock(), vec![5]);
    let store = harness.manager.get_database(&map_id).unwrap();
    assert_eq!(store.resource_count().unwrap(), 5);
    assert!(
        store
            .contains(&format!("{BASE_URL}/marker/pin-m-cafe+ff8800.png"))
            .unwrap()
    );
    assert!(store.contains(&endpoints().metadata_url(&map_id)).unwrap());

    let identity = store.identity().unwrap();
    assert!(identity.includes_metadata);
    assert!(identity.includes_markers);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_missing_marker_document_is_reported() {
    let transport = FakeTransport::default();
    let map_id = MapId::from("acme.map");
    let markers_url = endpoints().markers_geojson_url(&map_id);
    transport.reply(markers_url.clone(), Reply::Status(404, Bytes::new()));
    let harness = Harness::new(transport, 2);

    let request = DownloadRequest::new("acme.map", GeoBounds::world(), ZoomRange::single(0).unwrap())
        .with_metadata(false);
    harness.manager.begin_downloading(request).await.unwrap();
    harness.wait_for_completions(1).await;

    assert!(harness.recorder.completions()[0].is_ok());
    assert_eq!(*harness.recorder.initial_counts.lock(), vec![2]);
    assert_eq!(*harness.recorder.http_errors.lock(), vec![(markers_url, 404)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unreachable_marker_document_aborts() {
    let transport = FakeTransport::default();
    let map_id = MapId::from("acme.map");
    let markers_url = endpoints().markers_geojson_url(&map_id);
    transport.reply(markers_url.clone(), Reply::Fail);
    let harness = Harness::new(transport, 2);

    let request = DownloadRequest::new("acme.map", GeoBounds::world(), ZoomRange::single(0).unwrap());
    harness.manager.begin_downloading(request).await.unwrap();
    harness.wait_for_completions(1).await;

    assert!(harness.recorder.completions()[0].is_err());
    assert_eq!(*harness.recorder.network_errors.lock(), vec![markers_url]);
    wait_for("slot release", || {
        harness.manager.state() == JobState::Available
    })
    .await;
    assert_eq!(
        harness.recorder.states(),
        vec![JobState::Running, JobState::Canceling, JobState::Available]
    );
    assert!(harness.manager.get_database(&map_id).is_none());
    assert!(!harness.store_file("acme.map").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_quality_mismatch_is_rejected() {
    let harness = Harness::new(FakeTransport::default(), 2);
    let map_id = MapId::from("acme.map");
    harness
        .manager
        .create_empty_database(&map_id, ImageQuality::Png32)
        .unwrap();

    let request = tiles_only("acme.map", GeoBounds::world(), ZoomRange::single(0).unwrap());
    let result = harness.manager.begin_downloading(request).await;

    assert!(matches!(
        result,
        Err(DownloadError::QualityMismatch {
            existing: ImageQuality::Png32,
            requested: ImageQuality::Full,
            ..
        })
    ));
    assert!(harness.recorder.states().is_empty());
    assert_eq!(harness.recorder.completions().len(), 1);
    assert_eq!(harness.manager.state(), JobState::Available);
    assert_eq!(harness.transport.total_fetches(), 0);

    let mismatch = harness
        .manager
        .create_empty_database(&map_id, ImageQuality::Full);
    assert!(matches!(
        mismatch,
        Err(DownloadError::QualityMismatch { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transitions_require_matching_state() {
    let harness = Harness::new(FakeTransport::default(), 2);

    assert!(matches!(
        harness.manager.cancel().await,
        Err(DownloadError::InvalidState { action: "cancel", state: JobState::Available })
    ));
    assert!(matches!(
        harness.manager.suspend().await,
        Err(DownloadError::InvalidState { action: "suspend", .. })
    ));
    assert!(matches!(
        harness.manager.resume().await,
        Err(DownloadError::InvalidState { action: "resume", .. })
    ));
    assert!(harness.recorder.states().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remove_database() {
    let (transport, gate) = FakeTransport::gated(0);
    let harness = Harness::new(transport, 2);
    let map_id = MapId::from("acme.map");
    let request = tiles_only("acme.map", GeoBounds::world(), ZoomRange::single(0).unwrap());

    harness.manager.begin_downloading(request).await.unwrap();
    assert!(matches!(
        harness.manager.remove_database(&map_id),
        Err(DownloadError::StoreInUse(_))
    ));

    gate.add_permits(100);
    harness.wait_for_completions(1).await;
    let store = harness.manager.get_database(&map_id).unwrap();

    harness.manager.remove_database(&map_id).unwrap();
    assert!(harness.manager.list_databases().is_empty());
    assert!(!harness.store_file("acme.map").exists());
    assert!(matches!(store.resource_count(), Err(StoreError::Unavailable(_))));
    assert!(matches!(
        harness.manager.remove_database(&map_id),
        Err(DownloadError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_finished_stores_are_discovered_on_restart() {
    let harness = Harness::new(FakeTransport::default(), 2);
    let request = tiles_only("acme.map", GeoBounds::world(), ZoomRange::single(0).unwrap());
    harness.manager.begin_downloading(request).await.unwrap();
    harness.wait_for_completions(1).await;

    let Harness {
        dir, transport, manager, ..
    } = harness;
    for store in manager.list_databases() {
        store.close();
    }
    drop(manager);

    let restarted = Harness::in_dir(dir, transport, 2);
    let map_ids: Vec<_> = restarted
        .manager
        .list_databases()
        .iter()
        .filter_map(|store| store.map_id())
        .collect();
    assert_eq!(map_ids, vec![MapId::from("acme.map")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_begin_still_settles_the_slot() {
    let harness = Harness::new(FakeTransport::default(), 2);
    let zoom = ZoomRange::single(0).unwrap();

    // Give up on the call while the store is still being resolved.
    let abandoned = tokio::time::timeout(
        Duration::ZERO,
        harness
            .manager
            .begin_downloading(tiles_only("acme.map", GeoBounds::world(), zoom)),
    )
    .await;
    if let Ok(started) = abandoned {
        started.unwrap();
    }
    harness.wait_for_completions(1).await;
    assert_eq!(harness.manager.state(), JobState::Available);

    harness
        .manager
        .begin_downloading(tiles_only("other.map", GeoBounds::world(), zoom))
        .await
        .unwrap();
    harness.wait_for_completions(2).await;

    assert_eq!(
        harness.recorder.completions(),
        vec![Ok(MapId::from("acme.map")), Ok(MapId::from("other.map"))]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_canceled_markers_download_leaves_flags_unset() {
    let (transport, gate) = FakeTransport::gated(1);
    let map_id = MapId::from("acme.map");
    let features_url = endpoints().features_url(&map_id);
    transport.reply(
        endpoints().markers_geojson_url(&map_id),
        Reply::Status(200, Bytes::from_static(MARKERS.as_bytes())),
    );
    let harness = Harness::new(transport, 2);
    let zoom = ZoomRange::single(0).unwrap();

    harness
        .manager
        .begin_downloading(tiles_only("acme.map", GeoBounds::world(), zoom))
        .await
        .unwrap();
    harness.wait_for_completions(1).await;

    // The marker document fetch waits on the gate until the cancel.
    let with_markers =
        DownloadRequest::new("acme.map", GeoBounds::world(), zoom).with_metadata(false);
    harness
        .manager
        .begin_downloading(with_markers.clone())
        .await
        .unwrap();
    harness.manager.cancel().await.unwrap();

    let store = harness.manager.get_database(&map_id).unwrap();
    assert!(!store.identity().unwrap().includes_markers);
    assert!(!store.contains(&features_url).unwrap());

    harness.transport.reset();
    gate.add_permits(100);
    harness
        .manager
        .begin_downloading(with_markers)
        .await
        .unwrap();
    harness.wait_for_completions(3).await;

    assert!(harness.recorder.completions()[2].is_ok());
    assert_eq!(harness.transport.fetch_count(&features_url), 1);
    assert!(store.contains(&features_url).unwrap());
    let identity = store.identity().unwrap();
    assert!(identity.includes_markers);
    assert!(!identity.includes_metadata);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_stops_writes_into_existing_store() {
    let (transport, gate) = FakeTransport::gated(1);
    let harness = Harness::new(transport, 2);
    let map_id = MapId::from("acme.map");
    let store = harness
        .manager
        .create_empty_database(&map_id, ImageQuality::Full)
        .unwrap();

    harness
        .manager
        .begin_downloading(tiles_only(
            "acme.map",
            GeoBounds::world(),
            ZoomRange::new(0, 1).unwrap(),
        ))
        .await
        .unwrap();
    wait_for("first tile", || harness.recorder.max_completed() >= 1).await;

    harness.manager.cancel().await.unwrap();
    gate.add_permits(100);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(harness.transport.total_fetches(), 1);
    assert_eq!(store.resource_count().unwrap(), 1);
    assert!(!store.identity().unwrap().includes_markers);
}
