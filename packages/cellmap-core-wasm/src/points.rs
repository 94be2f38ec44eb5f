use geo_types::Point;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::console_log;
use crate::diagnostics::DiagnosticReport;
use crate::error::{MapDataError, Result};

/// Named numeric attributes carried from a record to its feature.
/// `None` is a field that was `null` in the payload.
pub type PointProperties = BTreeMap<String, Option<f64>>;

/// One measurement sample as delivered by the points endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPointRecord {
    #[serde(deserialize_with = "nullable_f64")]
    pub longitude: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub latitude: f64,
    #[serde(default)]
    pub height: Option<f64>,
    /// Everything else, e.g. `servingcellrsrp` and `servingcellrsrq`
    #[serde(flatten)]
    pub attributes: PointProperties,
}

impl RawPointRecord {
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height: Some(height),
            attributes: PointProperties::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), Some(value));
        self
    }

    /// Reads one record out of a payload array
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        Ok(RawPointRecord::deserialize(value)?)
    }

    pub fn has_finite_coordinates(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

// A `null` coordinate reads as NaN so the checked converter can report it
fn nullable_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// `{ "data": [...] }` as served by the points endpoint. Records stay raw
/// JSON so the checked converter can report a mistyped one by its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsPayload {
    pub data: Vec<serde_json::Value>,
}

impl PointsPayload {
    /// Every record, failing on the first one that does not fit `RawPointRecord`
    pub fn records(&self) -> Result<Vec<RawPointRecord>> {
        self.data.iter().map(RawPointRecord::from_value).collect()
    }
}

pub fn parse_points_payload(json: &str) -> Result<PointsPayload> {
    Ok(serde_json::from_str(json)?)
}

/// Accepts either the full payload or a bare array of records
pub fn parse_point_values(json: &str) -> Result<Vec<serde_json::Value>> {
    if json.trim_start().starts_with('[') {
        Ok(serde_json::from_str(json)?)
    } else {
        Ok(parse_points_payload(json)?.data)
    }
}

/// Like `parse_point_values`, but every record must be well typed
pub fn parse_point_records(json: &str) -> Result<Vec<RawPointRecord>> {
    parse_point_values(json)?
        .iter()
        .map(RawPointRecord::from_value)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Point")]
pub struct PointGeometry {
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

/// GeoJSON point feature derived 1:1 from a `RawPointRecord`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct PointFeature {
    pub geometry: PointGeometry,
    pub properties: PointProperties,
}

impl PointFeature {
    pub fn from_record(record: &RawPointRecord) -> Self {
        let mut properties = record.attributes.clone();
        properties.insert("height".to_string(), record.height);
        Self {
            geometry: PointGeometry {
                coordinates: [record.longitude, record.latitude],
            },
            properties,
        }
    }

    pub fn longitude(&self) -> f64 {
        self.geometry.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.geometry.coordinates[1]
    }

    pub fn height(&self) -> Option<f64> {
        self.properties.get("height").copied().flatten()
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied().flatten()
    }

    pub fn to_point(&self) -> Point<f64> {
        Point::new(self.longitude(), self.latitude())
    }
}

/// Converts every record, keeping count and order. Records with non-finite
/// coordinates produce features with non-finite coordinates.
pub fn convert_points_to_geojson(records: &[RawPointRecord]) -> Vec<PointFeature> {
    records.iter().map(PointFeature::from_record).collect()
}

/// Output of the checked converter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointConversion {
    pub features: Vec<PointFeature>,
    /// Source array position of each entry in `features`
    pub source_indices: Vec<usize>,
    pub diagnostics: DiagnosticReport,
    pub input_count: usize,
}

impl PointConversion {
    pub fn skipped(&self) -> usize {
        self.input_count - self.features.len()
    }

    /// Features paired with the index of the record they came from
    pub fn indexed_features(&self) -> impl Iterator<Item = (usize, &PointFeature)> {
        self.source_indices.iter().copied().zip(&self.features)
    }
}

fn checked_feature(record: &RawPointRecord) -> Result<PointFeature> {
    if !record.has_finite_coordinates() {
        return Err(MapDataError::InvalidCoordinate {
            longitude: record.longitude,
            latitude: record.latitude,
        });
    }
    Ok(PointFeature::from_record(record))
}

fn collect_checked<I>(input_count: usize, results: I) -> PointConversion
where
    I: Iterator<Item = Result<PointFeature>>,
{
    let mut conversion = PointConversion {
        features: Vec::with_capacity(input_count),
        source_indices: Vec::with_capacity(input_count),
        diagnostics: DiagnosticReport::new(),
        input_count,
    };

    for (index, result) in results.enumerate() {
        match result {
            Ok(feature) => {
                conversion.features.push(feature);
                conversion.source_indices.push(index);
            }
            Err(err) => conversion.diagnostics.push(index, &err),
        }
    }

    conversion.diagnostics.log_summary("Point conversion");
    conversion
}

/// Like `convert_points_to_geojson`, but records with a non-finite longitude
/// or latitude are skipped and reported as `InvalidCoordinate`.
pub fn convert_points_checked(records: &[RawPointRecord]) -> PointConversion {
    collect_checked(records.len(), records.iter().map(checked_feature))
}

/// Checked conversion straight from payload JSON values. A record of the
/// wrong shape (missing longitude, text where a number belongs) is skipped
/// and reported as `Parse` instead of failing the batch.
pub fn convert_point_values_checked(values: &[serde_json::Value]) -> PointConversion {
    collect_checked(
        values.len(),
        values
            .iter()
            .map(|value| RawPointRecord::from_value(value).and_then(|record| checked_feature(&record))),
    )
}

/// Payload JSON in, feature array JSON out
pub fn convert_points_json(json: &str) -> Result<String> {
    let records = parse_point_records(json)?;
    let features = convert_points_to_geojson(&records);
    console_log!("Converted {} points to GeoJSON features", features.len());
    Ok(serde_json::to_string(&features)?)
}

pub fn convert_points_checked_json(json: &str) -> Result<String> {
    let values = parse_point_values(json)?;
    let conversion = convert_point_values_checked(&values);
    console_log!(
        "Converted {} of {} points to GeoJSON features",
        conversion.features.len(),
        conversion.input_count
    );
    Ok(serde_json::to_string(&conversion)?)
}
