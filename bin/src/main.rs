//! offmap CLI - Download map regions for offline use.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use offmap_lib::ImageQuality;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "offmap")]
#[command(about = "Download map regions for offline use", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding offline stores
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a map region into its offline store
    Download {
        /// Map identifier (e.g., acme.streets)
        map_id: String,

        /// Bounding box as minLat,maxLat,minLon,maxLon
        #[arg(long, conflicts_with_all = ["center", "span"])]
        bbox: Option<String>,

        /// Region center as lat,lon (use with --span)
        #[arg(long, requires = "span")]
        center: Option<String>,

        /// Region size in degrees as latSpan,lonSpan (use with --center)
        #[arg(long, requires = "center")]
        span: Option<String>,

        /// Lowest zoom level to download
        #[arg(long, default_value = "0")]
        min_zoom: u8,

        /// Highest zoom level to download
        #[arg(long, default_value = "6")]
        max_zoom: u8,

        /// Tile image quality
        #[arg(long, default_value = "full")]
        quality: ImageQuality,

        /// Skip the map's metadata document
        #[arg(long)]
        no_metadata: bool,

        /// Skip marker features and icons
        #[arg(long)]
        no_markers: bool,

        /// Maximum concurrent requests
        #[arg(long, default_value = "8")]
        concurrency: usize,

        /// Map server base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Skip the confirmation prompt for large regions
        #[arg(long)]
        yes: bool,
    },

    /// List offline stores
    List,

    /// Show details of an offline store
    Info {
        /// Map identifier
        map_id: String,
    },

    /// Delete an offline store
    Remove {
        /// Map identifier
        map_id: String,
    },

    /// Export one tile from an offline store
    Tile {
        /// Map identifier
        map_id: String,

        /// Zoom level
        z: u8,

        /// Tile column
        x: u32,

        /// Tile row
        y: u32,

        /// Output file path. Defaults to <z>-<x>-<y>.<suffix>
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let data_dir = cli.data_dir;
    match command {
        Commands::Download {
            map_id,
            bbox,
            center,
            span,
            min_zoom,
            max_zoom,
            quality,
            no_metadata,
            no_markers,
            concurrency,
            base_url,
            yes,
        } => {
            let region = display::parse_region(bbox.as_deref(), center.as_deref(), span.as_deref())?;
            let options = commands::download::DownloadOptions {
                map_id,
                region,
                min_zoom,
                max_zoom,
                quality,
                include_metadata: !no_metadata,
                include_markers: !no_markers,
                concurrency,
                base_url,
                yes,
                quiet: cli.quiet,
            };
            commands::download::download(data_dir, options).await
        }
        Commands::List => commands::list::list_stores(data_dir),
        Commands::Info { map_id } => commands::info::show_info(data_dir, &map_id),
        Commands::Remove { map_id } => commands::remove::remove_store(data_dir, &map_id, cli.quiet),
        Commands::Tile {
            map_id,
            z,
            x,
            y,
            output,
        } => commands::tile::export_tile(data_dir, &map_id, z, x, y, output),
    }
}
