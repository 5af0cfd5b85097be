//! Benchmark runner that outputs a markdown table for the README.
//!
//! Run with: `cargo run --package offmap-bench --bin benchmark_table --release`

use std::time::Duration;

use offmap_bench::{BenchmarkConfig, BenchmarkResult, format_bytes, format_duration, run_download};

/// Number of iterations per benchmark for statistical significance.
const ITERATIONS: u32 = 3;

/// Simulated per-request server latency.
const LATENCY: Duration = Duration::from_millis(5);

#[tokio::main]
async fn main() {
    println!("offmap download benchmark");
    println!("=========================\n");
    println!(
        "Running benchmarks ({ITERATIONS} iterations each, {} simulated latency)...\n",
        format_duration(LATENCY)
    );

    let mut rows = Vec::new();
    for concurrency in [1usize, 4, 16, 64] {
        let config = BenchmarkConfig {
            concurrency,
            latency: Some(LATENCY),
            ..BenchmarkConfig::default()
        };

        let mut results = Vec::new();
        for _ in 0..ITERATIONS {
            let temp_dir = match tempfile::TempDir::new() {
                Ok(dir) => dir,
                Err(e) => {
                    eprintln!("Error: failed to create temporary directory: {e}");
                    std::process::exit(1);
                }
            };
            results.push(run_download(&config, temp_dir.path()).await);
        }
        println!("{concurrency} workers done");
        rows.push((concurrency, results));
    }

    println!("\n## Results\n");
    println!("| Workers | Duration | Resources/s | Stored | Throughput |");
    println!("|---------|----------|-------------|--------|------------|");

    for (concurrency, results) in &rows {
        let Some(avg) = average_results(results) else {
            let error = results
                .iter()
                .find_map(|r| r.error.as_deref())
                .unwrap_or("unknown error");
            println!("| {concurrency} | failed: {error} | | | |");
            continue;
        };
        println!(
            "| {} | {} | {:.0} | {} | {:.1} MB/s |",
            concurrency,
            format_duration(avg.duration),
            avg.resources_per_sec(),
            format_bytes(avg.bytes),
            avg.throughput_mbps()
        );
    }
}

/// Averages the successful runs, or `None` if every run failed.
fn average_results(results: &[BenchmarkResult]) -> Option<BenchmarkResult> {
    let successful: Vec<_> = results.iter().filter(|r| r.success).collect();
    let first = successful.first()?;
    let runs = successful.len() as u32;
    let total: Duration = successful.iter().map(|r| r.duration).sum();

    Some(BenchmarkResult {
        duration: total / runs,
        ..(*first).clone()
    })
}
