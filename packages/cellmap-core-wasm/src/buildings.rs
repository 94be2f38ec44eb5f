use geo::Area;
use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::console_log;
use crate::diagnostics::DiagnosticReport;
use crate::error::{MapDataError, Result};
use crate::projection::serialize_ring;

/// Smallest closed ring: a triangle plus its closing vertex
pub const MIN_RING_VERTICES: usize = 4;

/// Buildings endpoint payload, a GeoJSON FeatureCollection.
/// Features stay raw JSON until validation so a bad one is reported on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct BuildingsPayload {
    pub features: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct RawBuildingFeature {
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
    #[serde(default)]
    pub properties: BuildingProperties,
}

impl RawBuildingFeature {
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        RawBuildingFeature::deserialize(value)
            .map_err(|err| MapDataError::malformed(format!("feature is not a GeoJSON Feature: {}", err)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawGeometry {
    Polygon {
        /// `null` vertex values are rejected during validation
        coordinates: Vec<Vec<Vec<Option<f64>>>>,
    },
    #[serde(other)]
    Unsupported,
}

/// Height above ground level arrives as a string, some exports use a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeightValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl HeightValue {
    pub fn parse(&self) -> Result<f64> {
        let value = match self {
            HeightValue::Number(n) => *n,
            HeightValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                MapDataError::malformed(format!("AGL height {:?} is not a number", text))
            })?,
            HeightValue::Other(other) => {
                return Err(MapDataError::malformed(format!("AGL height {} is not a number", other)))
            }
        };
        if !value.is_finite() || value < 0.0 {
            return Err(MapDataError::malformed(format!(
                "AGL height {} must be a finite non-negative number",
                value
            )));
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingProperties {
    #[serde(rename = "AGL", alias = "heightAboveGroundLevel", default)]
    pub agl: Option<HeightValue>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

pub fn parse_buildings_payload(json: &str) -> Result<BuildingsPayload> {
    Ok(serde_json::from_str(json)?)
}

/// A building that passed validation, ready for extrusion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingFeature {
    /// Position in the source feature collection
    pub index: usize,
    /// Closed outer ring; holes are not rendered
    #[serde(serialize_with = "serialize_ring")]
    pub ring: LineString<f64>,
    pub height_agl: f64,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl BuildingFeature {
    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(self.ring.clone(), vec![])
    }
}

fn outer_ring(geometry: Option<&RawGeometry>) -> Result<LineString<f64>> {
    let rings = match geometry {
        Some(RawGeometry::Polygon { coordinates }) => coordinates,
        Some(RawGeometry::Unsupported) => {
            return Err(MapDataError::malformed("geometry is not a Polygon"))
        }
        None => return Err(MapDataError::malformed("feature has no geometry")),
    };
    let outer = rings
        .first()
        .ok_or_else(|| MapDataError::malformed("polygon has no rings"))?;

    if outer.len() < MIN_RING_VERTICES {
        return Err(MapDataError::malformed(format!(
            "ring has {} vertices, at least {} required",
            outer.len(),
            MIN_RING_VERTICES
        )));
    }

    let mut coords = Vec::with_capacity(outer.len());
    for (i, position) in outer.iter().enumerate() {
        match position.as_slice() {
            [Some(x), Some(y), ..] if x.is_finite() && y.is_finite() => coords.push(Coord { x: *x, y: *y }),
            _ => {
                return Err(MapDataError::malformed(format!(
                    "vertex {} is not a finite [lng, lat] position",
                    i
                )))
            }
        }
    }

    let ring = LineString::new(coords);
    if !ring.is_closed() {
        return Err(MapDataError::malformed("ring is not closed"));
    }
    if Polygon::new(ring.clone(), vec![]).unsigned_area() == 0.0 {
        return Err(MapDataError::malformed("ring encloses no area"));
    }
    Ok(ring)
}

/// Validates one raw feature, `index` is its position in the collection
pub fn validate_building(index: usize, raw: &RawBuildingFeature) -> Result<BuildingFeature> {
    let ring = outer_ring(raw.geometry.as_ref())?;
    let height_agl = raw
        .properties
        .agl
        .as_ref()
        .ok_or_else(|| MapDataError::malformed("missing AGL height"))?
        .parse()?;

    Ok(BuildingFeature {
        index,
        ring,
        height_agl,
        properties: raw.properties.other.clone(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingValidation {
    pub buildings: Vec<BuildingFeature>,
    pub diagnostics: DiagnosticReport,
    pub input_count: usize,
}

/// Keeps valid buildings in order; each malformed one is skipped and reported
pub fn validate_buildings(payload: &BuildingsPayload) -> BuildingValidation {
    let mut validation = BuildingValidation {
        buildings: Vec::with_capacity(payload.features.len()),
        diagnostics: DiagnosticReport::new(),
        input_count: payload.features.len(),
    };

    for (index, raw) in payload.features.iter().enumerate() {
        match RawBuildingFeature::from_value(raw).and_then(|feature| validate_building(index, &feature)) {
            Ok(building) => validation.buildings.push(building),
            Err(err) => validation.diagnostics.push(index, &err),
        }
    }

    validation.diagnostics.log_summary("Building validation");
    validation
}

pub fn validate_buildings_json(json: &str) -> Result<String> {
    let payload = parse_buildings_payload(json)?;
    let validation = validate_buildings(&payload);
    console_log!(
        "Validated {} of {} buildings",
        validation.buildings.len(),
        validation.input_count
    );
    Ok(serde_json::to_string(&validation)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn square(agl: serde_json::Value) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": { "AGL": agl },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[30.26, 59.94], [30.261, 59.94], [30.261, 59.941], [30.26, 59.941], [30.26, 59.94]]]
            }
        })
    }

    fn collection(features: Vec<serde_json::Value>) -> BuildingsPayload {
        let json = json!({ "type": "FeatureCollection", "features": features }).to_string();
        parse_buildings_payload(&json).unwrap()
    }

    #[test]
    fn test_valid_building() {
        let payload = collection(vec![square(json!("12.5"))]);
        let validation = validate_buildings(&payload);
        assert!(validation.diagnostics.is_empty());
        assert_eq!(validation.buildings.len(), 1);
        let building = &validation.buildings[0];
        assert_eq!(building.height_agl, 12.5);
        assert_eq!(building.ring.0.len(), 5);
        assert!(building.to_polygon().unsigned_area() > 0.0);
    }

    #[test]
    fn test_height_accepts_numbers_and_alias() {
        let mut feature = square(json!(null));
        feature["properties"] = json!({ "heightAboveGroundLevel": 7, "name": "depot" });
        let payload = collection(vec![feature, square(json!(3))]);
        let validation = validate_buildings(&payload);
        assert_eq!(validation.buildings.len(), 2);
        assert_eq!(validation.buildings[0].height_agl, 7.0);
        assert_eq!(validation.buildings[0].properties.get("name"), Some(&json!("depot")));
        assert_eq!(validation.buildings[1].height_agl, 3.0);
    }

    #[test]
    fn test_bad_heights_are_malformed() {
        let payload = collection(vec![
            square(json!("abc")),
            square(json!("-3")),
            square(json!("")),
            square(json!(null)),
            square(json!("4")),
        ]);
        let validation = validate_buildings(&payload);
        assert_eq!(validation.input_count, 5);
        assert_eq!(validation.buildings.len(), 1);
        assert_eq!(validation.buildings[0].index, 4);
        assert_eq!(validation.diagnostics.count(ErrorKind::MalformedGeometry), 4);
    }

    #[test]
    fn test_bad_rings_are_malformed() {
        let mut unclosed = square(json!("5"));
        unclosed["geometry"]["coordinates"] =
            json!([[[30.26, 59.94], [30.261, 59.94], [30.261, 59.941], [30.26, 59.941]]]);
        let mut too_short = square(json!("5"));
        too_short["geometry"]["coordinates"] = json!([[[30.26, 59.94], [30.261, 59.94], [30.26, 59.94]]]);
        let mut short_position = square(json!("5"));
        short_position["geometry"]["coordinates"] =
            json!([[[30.26, 59.94], [30.261], [30.261, 59.941], [30.26, 59.94]]]);
        let mut flat = square(json!("5"));
        flat["geometry"]["coordinates"] =
            json!([[[30.26, 59.94], [30.261, 59.94], [30.262, 59.94], [30.26, 59.94]]]);
        let mut no_rings = square(json!("5"));
        no_rings["geometry"]["coordinates"] = json!([]);
        let mut line = square(json!("5"));
        line["geometry"] = json!({ "type": "LineString", "coordinates": [[0, 0], [1, 1]] });
        let mut missing = square(json!("5"));
        missing["geometry"] = json!(null);

        let payload = collection(vec![unclosed, too_short, short_position, flat, no_rings, line, missing]);
        let validation = validate_buildings(&payload);
        assert!(validation.buildings.is_empty());
        assert_eq!(validation.diagnostics.len(), 7);
        let messages: Vec<&str> = validation
            .diagnostics
            .entries()
            .iter()
            .map(|d| d.message.as_str())
            .collect();
        assert!(messages[0].contains("not closed"));
        assert!(messages[1].contains("3 vertices"));
        assert!(messages[2].contains("vertex 1"));
        assert!(messages[3].contains("no area"));
        assert!(messages[4].contains("no rings"));
        assert!(messages[5].contains("not a Polygon"));
        assert!(messages[6].contains("no geometry"));
    }

    #[test]
    fn test_mistyped_feature_does_not_fail_collection() {
        let mut null_vertex = square(json!("5"));
        null_vertex["geometry"]["coordinates"] =
            json!([[[30.26, 59.94], [30.261, null], [30.261, 59.941], [30.26, 59.941], [30.26, 59.94]]]);
        let mut text_vertex = square(json!("5"));
        text_vertex["geometry"]["coordinates"] = json!([[[30.26, "59.94"], [30.261, 59.94], [30.26, 59.94], [30.26, 59.94]]]);
        let mut bad_properties = square(json!("5"));
        bad_properties["properties"] = json!([1, 2]);

        let payload = collection(vec![
            square(json!("10")),
            square(json!(true)),
            square(json!({ "value": 3 })),
            null_vertex,
            text_vertex,
            bad_properties,
            json!(42),
        ]);
        let validation = validate_buildings(&payload);
        assert_eq!(validation.input_count, 7);
        assert_eq!(validation.buildings.len(), 1);
        assert_eq!(validation.buildings[0].height_agl, 10.0);
        assert_eq!(validation.diagnostics.count(ErrorKind::MalformedGeometry), 6);
        let indices: Vec<usize> = validation.diagnostics.entries().iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
        assert!(validation.diagnostics.entries()[0].message.contains("AGL height true"));
        assert!(validation.diagnostics.entries()[2].message.contains("vertex 1"));
    }

    #[test]
    fn test_holes_and_altitude_are_dropped() {
        let mut feature = square(json!("9"));
        feature["geometry"]["coordinates"] = json!([
            [[0, 0, 5], [10, 0, 5], [10, 10, 5], [0, 10, 5], [0, 0, 5]],
            [[2, 2], [3, 2], [3, 3], [2, 2]]
        ]);
        let validation = validate_buildings(&collection(vec![feature]));
        assert_eq!(validation.buildings.len(), 1);
        assert_eq!(validation.buildings[0].ring.0[2], Coord { x: 10.0, y: 10.0 });
    }

    #[test]
    fn test_payload_must_be_feature_collection() {
        let err = parse_buildings_payload(&json!({ "type": "Feature" }).to_string()).unwrap_err();
        assert!(matches!(err, MapDataError::Parse(_)));
    }

    #[test]
    fn test_validation_json_output() {
        let json = json!({ "type": "FeatureCollection", "features": [square(json!("2")), square(json!("x"))] });
        let output: serde_json::Value =
            serde_json::from_str(&validate_buildings_json(&json.to_string()).unwrap()).unwrap();
        assert_eq!(output["inputCount"], 2);
        assert_eq!(output["buildings"][0]["heightAgl"], 2.0);
        assert_eq!(output["buildings"][0]["ring"][0], json!([30.26, 59.94]));
        assert_eq!(output["diagnostics"][0]["index"], 1);
    }
}
