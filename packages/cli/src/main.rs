#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tools for the near-miss map.
//!
//! Each subcommand exercises one component against real services or
//! exported documents: road matching, reverse geocoding, polyline
//! decoding, route reconstruction, report aggregation, and marker icon
//! keys. Output is JSON on stdout; logs go to stderr via
//! `pretty_env_logger` (set `RUST_LOG`).

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nearmiss_map_report_models::{ReportKind, Scariness};

/// Near-miss map toolbox.
#[derive(Parser)]
#[command(name = "nearmiss_map_cli")]
#[command(about = "Inspect road matching, geocoding, routes, reports, and icons")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Describe the road nearest to a coordinate.
    Infrastructure {
        /// Latitude in degrees.
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees.
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },

    /// Reverse-geocode a coordinate (requires `MAPBOX_TOKEN`).
    Geocode {
        /// Latitude in degrees.
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees.
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },

    /// Decode an encoded polyline to `[lng, lat]` pairs.
    DecodePolyline {
        /// Encoded polyline.
        encoded: String,

        /// Split into runs wherever consecutive points are further apart
        /// than this many kilometres.
        #[arg(long)]
        split_gaps_km: Option<f64>,
    },

    /// Rebuild route line features from a JSON export of route documents.
    Routes {
        /// JSON file containing an array of route documents.
        file: PathBuf,

        /// Split legacy polylines at gaps larger than this many kilometres.
        #[arg(long)]
        split_gaps_km: Option<f64>,
    },

    /// Merge a JSON export of reports into the filtered report layer.
    Aggregate {
        /// JSON file containing an array of reports.
        file: PathBuf,

        /// Show only this kind (`incident` or `annoyance`).
        #[arg(long)]
        kind: Option<ReportKind>,

        /// Show only reports with this category tag.
        #[arg(long)]
        category: Option<String>,

        /// Show only incidents at this scariness (e.g. `very_scary`).
        #[arg(long)]
        scariness: Option<Scariness>,
    },

    /// List marker icon keys and their pixel size.
    Icons {
        /// Device pixel ratio.
        #[arg(long, default_value_t = 1.0)]
        pixel_ratio: f32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Infrastructure { lat, lng } => commands::infrastructure(lat, lng).await?,
        Commands::Geocode { lat, lng } => commands::geocode(lat, lng).await?,
        Commands::DecodePolyline {
            encoded,
            split_gaps_km,
        } => commands::decode_polyline(&encoded, split_gaps_km)?,
        Commands::Routes {
            file,
            split_gaps_km,
        } => commands::routes(file, split_gaps_km).await?,
        Commands::Aggregate {
            file,
            kind,
            category,
            scariness,
        } => commands::aggregate(file, kind, category, scariness).await?,
        Commands::Icons { pixel_ratio } => commands::icons(pixel_ratio)?,
    }

    Ok(())
}
