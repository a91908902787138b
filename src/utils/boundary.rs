// src/utils/boundary.rs

//! Builds one MultiPolygon per economic zone out of GADM province boundaries.
//!
//! Province polygons are appended, not dissolved: adjacent provinces keep their
//! shared edges and the renderer draws them as one filled region.

use std::collections::{BTreeSet, HashSet};

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::zone::{ECONOMIC_ZONES, ZONE_PROVINCES},
};

pub type Position = Vec<f64>;
pub type Ring = Vec<Position>;
pub type Polygon = Vec<Ring>;

/// A GADM level-1 FeatureCollection (only the parts we read).
#[derive(Debug, Clone, Deserialize)]
pub struct ProvinceCollection {
    pub features: Vec<ProvinceFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvinceFeature {
    pub properties: ProvinceProperties,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvinceProperties {
    #[serde(rename = "NAME_1")]
    pub name: String,
}

/// Raw geometry; coordinates are decoded lazily according to `kind`.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: serde_json::Value,
}

impl Geometry {
    /// Polygons carried by this geometry. Non-areal geometries yield nothing.
    pub fn polygons(&self) -> Result<Vec<Polygon>, serde_json::Error> {
        match self.kind.as_str() {
            "Polygon" => Ok(vec![serde_json::from_value(self.coordinates.clone())?]),
            "MultiPolygon" => serde_json::from_value(self.coordinates.clone()),
            _ => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<ZoneFeature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneFeature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: ZoneProperties,
    pub geometry: MultiPolygon,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneProperties {
    pub id: &'static str,
    pub name: &'static str,
    pub name_vi: &'static str,
    pub color: &'static str,
    pub provinces: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiPolygon {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: Vec<Polygon>,
}

/// Outcome of matching the zone table against the loaded provinces.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchReport {
    pub zones: Vec<ZoneMatch>,
    /// Provinces present in the data but listed under no zone.
    pub unassigned: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ZoneMatch {
    pub zone_id: String,
    pub matched: Vec<String>,
    pub unmatched: Vec<String>,
}

/// Features whose `NAME_1` exactly equals one of `provinces`.
pub fn filter_by_province<'a>(
    features: &'a [ProvinceFeature],
    provinces: &[&str],
) -> Vec<&'a ProvinceFeature> {
    features
        .iter()
        .filter(|f| provinces.contains(&f.properties.name.as_str()))
        .collect()
}

/// Concatenates every polygon of `features` into one coordinate list.
pub fn merge_geometries(features: &[&ProvinceFeature]) -> Vec<Polygon> {
    let mut merged = Vec::new();
    for feature in features {
        match feature.geometry.polygons() {
            Ok(polygons) => merged.extend(polygons),
            Err(e) => tracing::warn!(
                "Skipping malformed geometry for province {}: {}",
                feature.properties.name,
                e
            ),
        }
    }
    merged
}

/// Checks every province in `table` against the names present in `features`.
pub fn match_provinces(features: &[ProvinceFeature], table: &[(&str, &[&str])]) -> MatchReport {
    let present: HashSet<&str> = features.iter().map(|f| f.properties.name.as_str()).collect();

    let zones = table
        .iter()
        .map(|(zone_id, provinces)| {
            let (matched, unmatched): (Vec<&str>, Vec<&str>) =
                provinces.iter().partition(|p| present.contains(*p));
            ZoneMatch {
                zone_id: zone_id.to_string(),
                matched: matched.into_iter().map(str::to_string).collect(),
                unmatched: unmatched.into_iter().map(str::to_string).collect(),
            }
        })
        .collect();

    let assigned: HashSet<&str> = table.iter().flat_map(|(_, p)| p.iter().copied()).collect();
    let unassigned: BTreeSet<String> = present
        .into_iter()
        .filter(|name| !assigned.contains(name))
        .map(str::to_string)
        .collect();

    MatchReport {
        zones,
        unassigned: unassigned.into_iter().collect(),
    }
}

/// Merges the provinces of each zone in `table` into one MultiPolygon feature.
///
/// Unmatched table entries are logged; the zone is still emitted (possibly with
/// an empty coordinate list).
pub fn generate_zone_boundaries(
    features: &[ProvinceFeature],
    table: &'static [(&'static str, &'static [&'static str])],
) -> ZoneCollection {
    let report = match_provinces(features, table);
    for zone in &report.zones {
        if !zone.unmatched.is_empty() {
            tracing::warn!(
                "Zone {} has unmatched provinces: {:?}",
                zone.zone_id,
                zone.unmatched
            );
        }
    }
    if !report.unassigned.is_empty() {
        tracing::warn!("Provinces not assigned to any zone: {:?}", report.unassigned);
    }

    let zone_features = table
        .iter()
        .filter_map(|(zone_id, provinces)| {
            let Some(zone) = ECONOMIC_ZONES.iter().find(|z| z.id == *zone_id) else {
                tracing::warn!("No zone metadata for {}", zone_id);
                return None;
            };
            let selected = filter_by_province(features, provinces);
            Some(ZoneFeature {
                kind: "Feature",
                properties: ZoneProperties {
                    id: zone.id,
                    name: zone.name,
                    name_vi: zone.name_vi,
                    color: zone.color,
                    provinces: *provinces,
                },
                geometry: MultiPolygon {
                    kind: "MultiPolygon",
                    coordinates: merge_geometries(&selected),
                },
            })
        })
        .collect();

    ZoneCollection {
        kind: "FeatureCollection",
        features: zone_features,
    }
}

/// Generates the boundaries for the built-in zone table.
pub fn generate_default(data: &ProvinceCollection) -> ZoneCollection {
    generate_zone_boundaries(&data.features, ZONE_PROVINCES)
}

/// Sorted distinct province names present in the data.
pub fn province_names(data: &ProvinceCollection) -> Vec<String> {
    let names: BTreeSet<&str> = data.features.iter().map(|f| f.properties.name.as_str()).collect();
    names.into_iter().map(str::to_string).collect()
}

/// Everything derived from one load of the province data.
#[derive(Debug)]
pub struct BoundaryData {
    pub zones: ZoneCollection,
    /// `zones` serialized once; responses share the buffer.
    pub zones_geojson: Bytes,
    pub report: MatchReport,
    pub province_names: Vec<String>,
}

impl BoundaryData {
    pub fn build(provinces: &ProvinceCollection) -> Result<Self, AppError> {
        let zones = generate_default(provinces);
        let zones_geojson = serde_json::to_vec(&zones)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        Ok(Self {
            zones,
            zones_geojson: Bytes::from(zones_geojson),
            report: match_provinces(&provinces.features, ZONE_PROVINCES),
            province_names: province_names(provinces),
        })
    }
}

/// Reads the province FeatureCollection from a file path or an http(s) URL.
/// Every failure maps to `Unavailable` so the client can retry.
pub async fn load_provinces(source: &str) -> Result<ProvinceCollection, AppError> {
    tracing::info!("Loading province boundaries from {}", source);

    let raw = if source.starts_with("http://") || source.starts_with("https://") {
        reqwest::get(source)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    } else {
        tokio::fs::read(source).await.map_err(|e| {
            AppError::Unavailable(format!("Cannot read boundary data '{}': {}", source, e))
        })?
    };

    let data: ProvinceCollection = serde_json::from_slice(&raw)
        .map_err(|e| AppError::Unavailable(format!("Invalid boundary data: {}", e)))?;

    tracing::info!("Loaded {} province features", data.features.len());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(x: f64) -> serde_json::Value {
        json!([[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]])
    }

    fn feature(name: &str, geometry: serde_json::Value) -> ProvinceFeature {
        serde_json::from_value(json!({
            "type": "Feature",
            "properties": { "NAME_1": name, "GID_1": format!("VNM.{}_1", name) },
            "geometry": geometry,
        }))
        .unwrap()
    }

    fn polygon(name: &str, x: f64) -> ProvinceFeature {
        feature(name, json!({ "type": "Polygon", "coordinates": square(x) }))
    }

    #[test]
    fn polygon_and_multipolygon_are_appended() {
        let features = vec![
            polygon("HàNội", 0.0),
            feature(
                "HảiPhòng",
                json!({ "type": "MultiPolygon", "coordinates": [square(2.0), square(4.0)] }),
            ),
            polygon("CầnThơ", 9.0),
        ];

        let out = generate_default(&ProvinceCollection { features });
        let zone2 = out.features.iter().find(|f| f.properties.id == "zone-2").unwrap();
        assert_eq!(zone2.geometry.coordinates.len(), 3);
        assert_eq!(zone2.geometry.coordinates[0][0][0], vec![0.0, 0.0]);
        assert_eq!(zone2.geometry.coordinates[2][0][0], vec![4.0, 0.0]);

        let zone6 = out.features.iter().find(|f| f.properties.id == "zone-6").unwrap();
        assert_eq!(zone6.geometry.coordinates.len(), 1);
        assert_eq!(out.features.len(), 6);
    }

    #[test]
    fn near_miss_names_are_not_matched() {
        let features = vec![polygon("Ha Noi", 0.0), polygon("hànội", 1.0)];
        let out = generate_default(&ProvinceCollection { features });
        let zone2 = out.features.iter().find(|f| f.properties.id == "zone-2").unwrap();
        assert!(zone2.geometry.coordinates.is_empty());
    }

    #[test]
    fn non_areal_geometry_contributes_nothing() {
        let features = vec![feature("HàNội", json!({ "type": "Point", "coordinates": [1.0, 2.0] }))];
        let selected: Vec<&ProvinceFeature> = features.iter().collect();
        assert!(merge_geometries(&selected).is_empty());
    }

    #[test]
    fn every_province_is_matched_or_reported() {
        let features = vec![
            polygon("HàGiang", 0.0),
            polygon("KonTum", 1.0),
            polygon("GiaLai", 2.0),
            polygon("Atlantis", 3.0),
        ];
        let report = match_provinces(&features, ZONE_PROVINCES);

        for (zone_id, provinces) in ZONE_PROVINCES {
            let zone = report.zones.iter().find(|z| z.zone_id == *zone_id).unwrap();
            assert_eq!(zone.matched.len() + zone.unmatched.len(), provinces.len());
            for p in *provinces {
                let in_matched = zone.matched.iter().any(|m| m == p);
                let in_unmatched = zone.unmatched.iter().any(|m| m == p);
                assert!(in_matched ^ in_unmatched, "{} must land in exactly one list", p);
            }
        }

        let zone4 = report.zones.iter().find(|z| z.zone_id == "zone-4").unwrap();
        assert_eq!(zone4.matched, vec!["KonTum", "GiaLai"]);
        assert_eq!(report.unassigned, vec!["Atlantis"]);
    }

    #[test]
    fn province_names_are_sorted_and_distinct() {
        let data = ProvinceCollection {
            features: vec![polygon("LongAn", 0.0), polygon("AnGiang", 1.0), polygon("LongAn", 2.0)],
        };
        assert_eq!(province_names(&data), vec!["AnGiang", "LongAn"]);
    }

    #[tokio::test]
    async fn load_from_file_and_build() {
        let path = std::env::temp_dir().join(format!("provinces_{}.json", uuid::Uuid::new_v4()));
        let body = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "NAME_1": "ĐàNẵng" },
                  "geometry": { "type": "Polygon", "coordinates": square(0.0) } }
            ]
        });
        tokio::fs::write(&path, body.to_string()).await.unwrap();

        let data = load_provinces(path.to_str().unwrap()).await.unwrap();
        let built = BoundaryData::build(&data).unwrap();
        assert!(!built.zones_geojson.is_empty());
        assert_eq!(built.province_names, vec!["ĐàNẵng"]);
        assert!(built.report.unassigned.is_empty());
    }

    #[tokio::test]
    async fn missing_source_is_unavailable() {
        let err = load_provinces("/definitely/not/here.json").await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }
}
