// SPDX-License-Identifier: Apache-2.0

use crate::geometry::{MultiPolygon, Point, Ring};
use crate::GeoError;
use amend_model::GeoUnitId;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// One polygon feature from a boundary file, keyed by the unit-id property
/// (`GEOID` for block groups, `TOWN` for municipalities, `NAME` for
/// watersheds).
#[derive(Debug, Clone)]
pub struct GeoFeature {
    pub unit_id: GeoUnitId,
    pub geometry: MultiPolygon,
}

/// Load a GeoJSON FeatureCollection and extract `id_property` from each
/// feature. Features are returned sorted by unit id so downstream
/// first-match resolution is deterministic.
pub fn load_feature_collection(
    path: &Path,
    id_property: &str,
) -> Result<Vec<GeoFeature>, GeoError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| GeoError(format!("{}: {e}", path.display())))?;
    parse_feature_collection(&raw, id_property)
        .map_err(|e| GeoError(format!("{}: {}", path.display(), e.0)))
}

pub fn parse_feature_collection(
    raw: &str,
    id_property: &str,
) -> Result<Vec<GeoFeature>, GeoError> {
    let doc: Value =
        serde_json::from_str(raw).map_err(|e| GeoError(format!("GeoJSON parse error: {e}")))?;
    let features = doc
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| GeoError("GeoJSON document has no features array".to_string()))?;

    let mut out = Vec::with_capacity(features.len());
    for (i, feature) in features.iter().enumerate() {
        let props = feature
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| GeoError(format!("feature {i} has no properties object")))?;
        let raw_id = props
            .get(id_property)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GeoError(format!("feature {i} is missing string property {id_property:?}"))
            })?;
        let unit_id = GeoUnitId::parse(raw_id)
            .map_err(|e| GeoError(format!("feature {i}: {e}")))?;
        let geometry = feature
            .get("geometry")
            .ok_or_else(|| GeoError(format!("feature {i} has no geometry")))?;
        let geometry = parse_geometry(geometry)
            .map_err(|e| GeoError(format!("feature {i} ({unit_id}): {}", e.0)))?;
        out.push(GeoFeature { unit_id, geometry });
    }
    out.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
    Ok(out)
}

fn parse_geometry(geometry: &Value) -> Result<MultiPolygon, GeoError> {
    let geom_type = geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| GeoError("geometry has no type".to_string()))?;
    let coords = geometry
        .get("coordinates")
        .ok_or_else(|| GeoError("geometry has no coordinates".to_string()))?;
    match geom_type {
        "Polygon" => Ok(MultiPolygon {
            polygons: vec![parse_polygon(coords)?],
        }),
        "MultiPolygon" => {
            let parts = coords
                .as_array()
                .ok_or_else(|| GeoError("MultiPolygon coordinates must be an array".to_string()))?;
            let polygons = parts
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(MultiPolygon { polygons })
        }
        other => Err(GeoError(format!(
            "unsupported geometry type {other:?} (expected Polygon or MultiPolygon)"
        ))),
    }
}

fn parse_polygon(coords: &Value) -> Result<(Ring, Vec<Ring>), GeoError> {
    let rings = coords
        .as_array()
        .ok_or_else(|| GeoError("Polygon coordinates must be an array of rings".to_string()))?;
    if rings.is_empty() {
        return Err(GeoError("Polygon has no rings".to_string()));
    }
    let mut parsed = rings.iter().map(parse_ring).collect::<Result<Vec<_>, _>>()?;
    let exterior = parsed.remove(0);
    Ok((exterior, parsed))
}

fn parse_ring(ring: &Value) -> Result<Ring, GeoError> {
    let positions = ring
        .as_array()
        .ok_or_else(|| GeoError("ring must be an array of positions".to_string()))?;
    if positions.len() < 3 {
        return Err(GeoError(format!(
            "ring must have at least 3 positions, got {}",
            positions.len()
        )));
    }
    let mut out = Vec::with_capacity(positions.len());
    for pos in positions {
        let pair = pos
            .as_array()
            .ok_or_else(|| GeoError("position must be [lon, lat]".to_string()))?;
        let lon = pair
            .first()
            .and_then(Value::as_f64)
            .ok_or_else(|| GeoError("position longitude must be a number".to_string()))?;
        let lat = pair
            .get(1)
            .and_then(Value::as_f64)
            .ok_or_else(|| GeoError("position latitude must be a number".to_string()))?;
        out.push(Point::new(lon, lat));
    }
    Ok(Ring(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SQUARES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"TOWN": "Eastville"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[1.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0], [1.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"TOWN": "Westville"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]]
                }
            }
        ]
    }"#;

    #[test]
    fn parses_and_sorts_features_by_unit_id() {
        let features = parse_feature_collection(TWO_SQUARES, "TOWN").expect("parse");
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].unit_id.as_str(), "Eastville");
        assert_eq!(features[1].unit_id.as_str(), "Westville");
        assert!(features[1].geometry.contains(&Point::new(0.5, 0.5)));
        assert!(!features[1].geometry.contains(&Point::new(1.5, 0.5)));
    }

    #[test]
    fn missing_id_property_is_an_error() {
        let err = parse_feature_collection(TWO_SQUARES, "GEOID").unwrap_err();
        assert!(err.0.contains("GEOID"));
    }

    #[test]
    fn unsupported_geometry_type_is_an_error() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"TOWN": "X"},
             "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}
        ]}"#;
        let err = parse_feature_collection(doc, "TOWN").unwrap_err();
        assert!(err.0.contains("unsupported geometry type"));
    }
}
