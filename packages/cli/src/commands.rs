//! Subcommand implementations.

use std::path::PathBuf;

use nearmiss_map_aggregator::{ReportAggregator, ReportFilters};
use nearmiss_map_geocoder::{MapboxGeocoder, reverse_geocode_or_coordinate, service_registry};
use nearmiss_map_geometry::{decode_polyline as decode, split_at_gaps};
use nearmiss_map_icons::{all_icon_keys, icon_size_px};
use nearmiss_map_infrastructure::{OverpassClient, resolve_infrastructure};
use nearmiss_map_report_models::{LngLat, Report, ReportKind, Scariness};
use nearmiss_map_routes::{
    JsonFileRouteSource, RouteBuildOptions, load_route_features, to_feature_collection,
};
use nearmiss_map_store::{MemoryReportStore, ReportStore};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Queries the primary road-graph service and prints the descriptor of
/// the nearest way, or `null`.
pub async fn infrastructure(lat: f64, lng: f64) -> CommandResult {
    let service = nearmiss_map_infrastructure::service_registry::primary_service()?;
    log::info!("Querying {} around {lat}, {lng}", service.name);
    let client = OverpassClient::from_service(&service)?;

    let descriptor = resolve_infrastructure(&client, LngLat::new(lng, lat)).await;
    if descriptor.is_none() {
        log::info!("No road within {} m", client.radius_m());
    }
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

/// Reverse-geocodes with the first enabled geocoding service.
pub async fn geocode(lat: f64, lng: f64) -> CommandResult {
    let service = service_registry::enabled_services()?
        .into_iter()
        .next()
        .ok_or("No geocoding service is enabled")?;
    let geocoder = MapboxGeocoder::from_service(&service)?;

    let place = reverse_geocode_or_coordinate(&geocoder, LngLat::new(lng, lat)).await;
    println!("{}", serde_json::to_string(&place)?);
    Ok(())
}

/// Prints decoded `[lng, lat]` pairs, optionally split into runs.
pub fn decode_polyline(encoded: &str, split_gaps_km: Option<f64>) -> CommandResult {
    let coords = decode(encoded)?;
    log::info!("Decoded {} points", coords.len());

    let output = match split_gaps_km {
        Some(max_gap_km) => serde_json::to_value(
            split_at_gaps(&coords, max_gap_km)
                .iter()
                .map(|run| run.coords().map(|c| [c.x, c.y]).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        )?,
        None => serde_json::to_value(coords.iter().map(|c| [c.x, c.y]).collect::<Vec<_>>())?,
    };
    println!("{output}");
    Ok(())
}

/// Prints the route line layer rebuilt from an exported file.
pub async fn routes(file: PathBuf, split_gaps_km: Option<f64>) -> CommandResult {
    let source = JsonFileRouteSource::new(file);
    let features = load_route_features(&source, &RouteBuildOptions { split_gaps_km }).await?;
    println!("{}", serde_json::to_string(&to_feature_collection(&features)?)?);
    Ok(())
}

/// Loads exported reports into an in-memory store and prints the
/// filtered report layer with its count text.
pub async fn aggregate(
    file: PathBuf,
    kind: Option<ReportKind>,
    category: Option<String>,
    scariness: Option<Scariness>,
) -> CommandResult {
    let contents = tokio::fs::read_to_string(&file).await?;
    let reports: Vec<Report> = serde_json::from_str(&contents)?;
    log::info!("Importing {} reports from {}", reports.len(), file.display());

    let store = MemoryReportStore::new();
    for report in reports {
        store.import(report).await;
    }

    let mut aggregator = ReportAggregator::new();
    aggregator.set_incidents(store.subscribe_incidents().borrow().clone());
    aggregator.set_annoyances(store.subscribe_annoyances().borrow().clone());
    aggregator.set_filters(ReportFilters {
        kind,
        category,
        scariness,
    });

    let rendered = aggregator.render();
    log::info!("{}", rendered.count_text);
    let output = serde_json::json!({
        "countText": rendered.count_text,
        "incidentCount": rendered.incident_count,
        "annoyanceCount": rendered.annoyance_count,
        "features": rendered.to_feature_collection()?,
    });
    println!("{output}");
    Ok(())
}

/// Prints every marker icon key with its size at `pixel_ratio`.
pub fn icons(pixel_ratio: f32) -> CommandResult {
    let size = icon_size_px(pixel_ratio)?;
    for key in all_icon_keys() {
        println!("{key}\t{size}x{size}");
    }
    Ok(())
}
