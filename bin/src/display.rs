//! Argument parsing and output formatting for the offmap CLI.

use anyhow::{Context, Result, bail};
use offmap_lib::GeoBounds;

/// Builds the download region from `--bbox` or `--center`/`--span`.
pub(crate) fn parse_region(
    bbox: Option<&str>,
    center: Option<&str>,
    span: Option<&str>,
) -> Result<GeoBounds> {
    match (bbox, center, span) {
        (Some(bbox), _, _) => {
            let [min_lat, max_lat, min_lon, max_lon] = parse_numbers::<4>(bbox, "--bbox")?;
            Ok(GeoBounds::new(min_lat, max_lat, min_lon, max_lon)?)
        }
        (None, Some(center), Some(span)) => {
            let [lat, lon] = parse_numbers::<2>(center, "--center")?;
            let [lat_span, lon_span] = parse_numbers::<2>(span, "--span")?;
            Ok(GeoBounds::from_center_span(lat, lon, lat_span, lon_span)?)
        }
        _ => bail!("Specify a region with --bbox or with --center and --span"),
    }
}

/// Parses exactly `N` comma separated numbers.
fn parse_numbers<const N: usize>(value: &str, flag: &str) -> Result<[f64; N]> {
    let numbers = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid number '{part}' in {flag}"))
        })
        .collect::<Result<Vec<_>>>()?;

    numbers
        .try_into()
        .map_err(|found: Vec<f64>| anyhow::anyhow!("{flag} expects {N} values, got {}", found.len()))
}

/// Formats a byte count for humans.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Renders a metadata flag.
pub(crate) const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
