// src/handlers/zone.rs

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::zone::{ECONOMIC_ZONES, MAP_CONFIG, find_zone},
    state::Boundaries,
};

/// Lists the six economic zones.
pub async fn list_zones() -> impl IntoResponse {
    Json(&ECONOMIC_ZONES)
}

pub async fn get_zone(Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    find_zone(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Zone '{}' not found", id)))
}

/// Zone MultiPolygons as a GeoJSON FeatureCollection.
///
/// The province data is loaded on the first call. A failed load answers 503
/// and is retried by the next request.
pub async fn get_boundaries(State(boundaries): State<Boundaries>) -> Result<impl IntoResponse, AppError> {
    let data = boundaries.get().await?;
    Ok((
        [(header::CONTENT_TYPE, "application/geo+json")],
        data.zones_geojson.clone(),
    ))
}

/// Distinct province names found in the boundary data.
pub async fn list_provinces(State(boundaries): State<Boundaries>) -> Result<impl IntoResponse, AppError> {
    let data = boundaries.get().await?;
    Ok(Json(data.province_names.clone()))
}

pub async fn get_map_config() -> impl IntoResponse {
    Json(MAP_CONFIG)
}

/// Which table provinces matched the data, which did not, and which provinces
/// belong to no zone.
/// Admin only.
pub async fn match_report(State(boundaries): State<Boundaries>) -> Result<impl IntoResponse, AppError> {
    let data = boundaries.get().await?;
    Ok(Json(data.report.clone()))
}
