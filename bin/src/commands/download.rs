//! Download command implementation.
//!
//! This module drives one download through the download manager, reporting
//! progress with a progress bar and canceling on Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use offmap_lib::prelude::*;
use offmap_lib::TileUrlGenerator;
use tokio::sync::mpsc;

/// Regions with more tiles than this ask for confirmation.
const CONFIRM_THRESHOLD: u64 = 10_000;

/// Options of the download command.
pub(crate) struct DownloadOptions {
    pub(crate) map_id: String,
    pub(crate) region: GeoBounds,
    pub(crate) min_zoom: u8,
    pub(crate) max_zoom: u8,
    pub(crate) quality: ImageQuality,
    pub(crate) include_metadata: bool,
    pub(crate) include_markers: bool,
    pub(crate) concurrency: usize,
    pub(crate) base_url: Option<String>,
    pub(crate) yes: bool,
    pub(crate) quiet: bool,
}

/// Download a map region into its offline store.
pub(crate) async fn download(data_dir: Option<PathBuf>, options: DownloadOptions) -> Result<()> {
    let zoom = ZoomRange::new(options.min_zoom, options.max_zoom)?;

    let mut config = super::config(data_dir).with_concurrency(options.concurrency);
    if let Some(base_url) = &options.base_url {
        config = config.with_endpoints(Endpoints::new(base_url.as_str()));
    }

    let tiles = TileUrlGenerator::new(config.endpoints.clone(), &options.region, zoom).count();
    if !options.quiet {
        println!("Map:     {}", options.map_id);
        println!("Region:  {}", options.region);
        println!("Zoom:    {zoom}");
        println!("Tiles:   {tiles}");
    }

    if tiles > CONFIRM_THRESHOLD && !options.yes {
        let proceed = Confirm::new(&format!("Download {tiles} tiles?"))
            .with_default(false)
            .prompt()
            .context("Confirmation prompt failed")?;
        if !proceed {
            println!("Download cancelled.");
            return Ok(());
        }
    }

    let manager = super::open_manager(config)?;
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let reporter = Arc::new(ProgressReporter::new(options.quiet, done_tx));
    manager.add_listener(reporter.clone());

    let request = DownloadRequest::new(options.map_id.as_str(), options.region, zoom)
        .with_quality(options.quality)
        .with_metadata(options.include_metadata)
        .with_markers(options.include_markers);
    manager
        .begin_downloading(request)
        .await
        .with_context(|| format!("Failed to start downloading {}", options.map_id))?;

    let outcome = tokio::select! {
        biased;
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            reporter.bar.set_message("canceling");
            settle_cancel(manager.cancel().await)?;
            done_rx.recv().await
        }
        outcome = done_rx.recv() => outcome,
    };

    match outcome {
        Some(Ok(resources)) => {
            let failures = reporter.failures.load(Ordering::Relaxed);
            let message = if failures > 0 {
                format!("Stored {resources} resources ({failures} failed)")
            } else {
                format!("Stored {resources} resources")
            };
            reporter.bar.finish_with_message(message);
            Ok(())
        }
        Some(Err(reason)) => {
            reporter.bar.abandon_with_message(reason.clone());
            bail!("Download of {} did not complete: {reason}", options.map_id)
        }
        None => bail!("Download ended without reporting a result"),
    }
}

/// Accepts a cancel that lost the race with the download finishing.
///
/// The outcome is then already on its way to the completion channel.
fn settle_cancel(result: Result<(), DownloadError>) -> Result<()> {
    match result {
        Ok(()) | Err(DownloadError::InvalidState { .. }) => Ok(()),
        Err(e) => Err(e).context("Failed to cancel download"),
    }
}

/// Listener feeding a progress bar and reporting completion.
struct ProgressReporter {
    bar: ProgressBar,
    failures: AtomicU64,
    done: mpsc::UnboundedSender<Result<u64, String>>,
}

impl ProgressReporter {
    fn new(quiet: bool, done: mpsc::UnboundedSender<Result<u64, String>>) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb
        };
        Self {
            bar,
            failures: AtomicU64::new(0),
            done,
        }
    }

    fn record_failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.set_message(format!("{failures} failed"));
    }
}

impl DownloadListener for ProgressReporter {
    fn on_state_changed(&self, state: JobState) {
        tracing::debug!(%state, "download state changed");
    }

    fn on_initial_count(&self, expected: u64) {
        self.bar.set_length(expected);
    }

    fn on_progress(&self, completed: u64, _expected: u64) {
        // Workers report out of order; never move the bar backwards.
        if completed > self.bar.position() {
            self.bar.set_position(completed);
        }
    }

    fn on_network_error(&self, url: &str, error: &TransportError) {
        tracing::info!(url, %error, "fetch failed");
        self.record_failure();
    }

    fn on_http_status_error(&self, url: &str, status: u16) {
        tracing::info!(url, status, "unexpected status");
        self.record_failure();
    }

    fn on_storage_error(&self, url: &str, error: &StoreError) {
        tracing::warn!(url, %error, "store write failed");
        self.record_failure();
    }

    fn on_complete(&self, result: Result<&Arc<ResourceStore>, &DownloadError>) {
        let outcome = match result {
            Ok(store) => store.resource_count().map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        // The receiver is gone only once the command has returned.
        let _ = self.done.send(outcome);
    }
}
