//! Benchmark utilities for offmap.
//!
//! Downloads run in-process against [`MemoryTransport`], so results measure
//! the manager, the worker pool and the store rather than a remote server.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use offmap_lib::prelude::*;
use offmap_lib::FetchResponse;
use tokio::sync::mpsc;

/// Base URL used for every benchmark download.
pub const BENCH_BASE_URL: &str = "http://bench.invalid/v4";

/// Map id used for every benchmark download.
pub const BENCH_MAP_ID: &str = "bench.map";

/// Transport answering every request with the same payload.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    payload: Bytes,
    latency: Option<Duration>,
}

impl MemoryTransport {
    /// Creates a transport serving `payload_size` bytes per request.
    pub fn new(payload_size: usize) -> Self {
        Self {
            payload: Bytes::from(vec![0x5a; payload_size]),
            latency: None,
        }
    }

    /// Delays every response by `latency`.
    pub const fn with_latency(mut self, latency: Option<Duration>) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, _url: &str) -> Result<FetchResponse, TransportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(FetchResponse::new(200, self.payload.clone()))
    }
}

/// Configuration for a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Region to download.
    pub bounds: GeoBounds,
    /// Zoom levels to download.
    pub zoom: ZoomRange,
    /// Worker count.
    pub concurrency: usize,
    /// Bytes served per tile.
    pub payload_size: usize,
    /// Simulated server latency per request.
    pub latency: Option<Duration>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            bounds: GeoBounds::world(),
            // 341 tiles
            zoom: ZoomRange { min: 0, max: 4 },
            concurrency: 8,
            payload_size: 16 * 1024,
            latency: None,
        }
    }
}

/// Result of a single benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    /// Time from the start request to completion.
    pub duration: Duration,
    /// Resources stored.
    pub resources: u64,
    /// Payload bytes stored.
    pub bytes: u64,
    /// Whether the run was successful.
    pub success: bool,
    /// Error message if failed.
    pub error: Option<String>,
}

impl BenchmarkResult {
    fn failed(duration: Duration, error: impl ToString) -> Self {
        Self {
            duration,
            resources: 0,
            bytes: 0,
            success: false,
            error: Some(error.to_string()),
        }
    }

    /// Calculate throughput in MB/s.
    pub fn throughput_mbps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.bytes as f64 / 1_000_000.0) / secs
        } else {
            0.0
        }
    }

    /// Calculate stored resources per second.
    pub fn resources_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.resources as f64 / secs
        } else {
            0.0
        }
    }
}

struct CompletionSignal(mpsc::UnboundedSender<Result<u64, String>>);

impl DownloadListener for CompletionSignal {
    fn on_complete(&self, result: Result<&Arc<ResourceStore>, &DownloadError>) {
        let outcome = match result {
            Ok(store) => store.resource_count().map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let _ = self.0.send(outcome);
    }
}

/// Downloads the configured region into a fresh store under `data_dir`.
pub async fn run_download(config: &BenchmarkConfig, data_dir: &Path) -> BenchmarkResult {
    let start = Instant::now();

    let transport = MemoryTransport::new(config.payload_size).with_latency(config.latency);
    let downloader = DownloaderConfig::new(data_dir)
        .with_concurrency(config.concurrency)
        .with_endpoints(Endpoints::new(BENCH_BASE_URL));
    let manager = match DownloadManager::new(downloader, Arc::new(transport)) {
        Ok(manager) => manager,
        Err(e) => return BenchmarkResult::failed(start.elapsed(), e),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    manager.add_listener(Arc::new(CompletionSignal(tx)));

    let request = DownloadRequest::new(BENCH_MAP_ID, config.bounds, config.zoom)
        .with_metadata(false)
        .with_markers(false);
    if let Err(e) = manager.begin_downloading(request).await {
        return BenchmarkResult::failed(start.elapsed(), e);
    }

    let outcome = rx.recv().await;
    let duration = start.elapsed();
    match outcome {
        Some(Ok(resources)) => BenchmarkResult {
            duration,
            resources,
            bytes: resources * config.payload_size as u64,
            success: true,
            error: None,
        },
        Some(Err(e)) => BenchmarkResult::failed(duration, e),
        None => BenchmarkResult::failed(duration, "download ended without a result"),
    }
}

/// Format duration for display.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Format bytes for display.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
