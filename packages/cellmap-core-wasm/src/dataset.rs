use geo::BoundingRect;
use geo_types::{Coord, MultiPoint, Point};
use serde::Serialize;

use crate::buildings::{parse_buildings_payload, validate_buildings, BuildingFeature, BuildingsPayload};
use crate::console_log;
use crate::diagnostics::DiagnosticReport;
use crate::error::Result;
use crate::models::DatasetSummary;
use crate::points::{convert_point_values_checked, parse_point_values, PointConversion, PointFeature};

/// A measurement point that survived loading
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPoint {
    /// Position of the record in the points payload
    pub source_index: usize,
    pub feature: PointFeature,
}

/// Buildings and measurement points ready for layer assembly
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapDataset {
    pub buildings: Vec<BuildingFeature>,
    pub points: Vec<LoadedPoint>,
}

/// What happened to each input collection while loading
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub building_input_count: usize,
    pub building_count: usize,
    pub building_diagnostics: DiagnosticReport,
    pub point_input_count: usize,
    pub point_count: usize,
    pub point_diagnostics: DiagnosticReport,
}

impl LoadReport {
    pub fn skipped(&self) -> usize {
        self.building_diagnostics.len() + self.point_diagnostics.len()
    }
}

impl MapDataset {
    /// Parse both endpoint payloads. A payload whose outer shape is wrong
    /// fails the whole load; bad records inside it are skipped and reported.
    pub fn load(buildings_json: &str, points_json: &str) -> Result<(Self, LoadReport)> {
        let buildings = parse_buildings_payload(buildings_json)?;
        let points = parse_point_values(points_json)?;
        Ok(Self::from_payloads(&buildings, &points))
    }

    pub fn from_payloads(buildings: &BuildingsPayload, points: &[serde_json::Value]) -> (Self, LoadReport) {
        let building_validation = validate_buildings(buildings);
        let point_conversion = convert_point_values_checked(points);

        let report = LoadReport {
            building_input_count: building_validation.input_count,
            building_count: building_validation.buildings.len(),
            building_diagnostics: building_validation.diagnostics,
            point_input_count: point_conversion.input_count,
            point_count: point_conversion.features.len(),
            point_diagnostics: point_conversion.diagnostics.clone(),
        };
        console_log!(
            "Loaded map data: {} buildings, {} points ({} skipped)",
            report.building_count,
            report.point_count,
            report.skipped()
        );

        let dataset = MapDataset {
            buildings: building_validation.buildings,
            points: Self::loaded_points(point_conversion),
        };
        (dataset, report)
    }

    fn loaded_points(conversion: PointConversion) -> Vec<LoadedPoint> {
        conversion
            .source_indices
            .into_iter()
            .zip(conversion.features)
            .map(|(source_index, feature)| LoadedPoint { source_index, feature })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty() && self.points.is_empty()
    }

    /// `[min_lng, min_lat, max_lng, max_lat]` over every building vertex and point
    pub fn bounds(&self) -> Option<[f64; 4]> {
        let coords: Vec<Point<f64>> = self
            .buildings
            .iter()
            .flat_map(|b| b.ring.points())
            .chain(self.points.iter().map(|point| point.feature.to_point()))
            .collect();
        let rect = MultiPoint::new(coords).bounding_rect()?;
        let (min, max): (Coord<f64>, Coord<f64>) = (rect.min(), rect.max());
        Some([min.x, min.y, max.x, max.y])
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            building_count: self.buildings.len(),
            point_count: self.points.len(),
            bounds: self.bounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn buildings_json() -> String {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "AGL": "15" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[30.26, 59.94], [30.261, 59.94], [30.261, 59.941], [30.26, 59.941], [30.26, 59.94]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "AGL": "NaN-ish" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[30.27, 59.95], [30.271, 59.95], [30.271, 59.951], [30.27, 59.95]]]
                    }
                }
            ]
        })
        .to_string()
    }

    fn points_json() -> String {
        json!({
            "data": [
                { "latitude": 59.9405, "longitude": 30.2605, "height": 1.5, "servingcellrsrp": -90, "servingcellrsrq": -10 },
                { "latitude": null, "longitude": 30.2606, "height": 1.5, "servingcellrsrp": -91, "servingcellrsrq": -10 },
                { "latitude": 59.9395, "longitude": 30.2590, "height": 2.0, "servingcellrsrp": -97, "servingcellrsrq": -12 }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_load_skips_bad_records() {
        let (dataset, report) = MapDataset::load(&buildings_json(), &points_json()).unwrap();
        assert_eq!(dataset.buildings.len(), 1);
        assert_eq!(dataset.points.len(), 2);
        assert_eq!(report.building_input_count, 2);
        assert_eq!(report.point_input_count, 3);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.building_diagnostics.entries()[0].index, 1);
        assert_eq!(report.point_diagnostics.entries()[0].index, 1);
        let sources: Vec<usize> = dataset.points.iter().map(|p| p.source_index).collect();
        assert_eq!(sources, vec![0, 2]);
    }

    #[test]
    fn test_mistyped_records_do_not_fail_the_load() {
        let buildings = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "AGL": "10" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[30.26, 59.94], [30.261, 59.94], [30.261, 59.941], [30.26, 59.941], [30.26, 59.94]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "AGL": true },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[30.26, 59.94], [30.261, 59.94], [30.261, 59.941], [30.26, 59.941], [30.26, 59.94]]]
                    }
                }
            ]
        })
        .to_string();
        let points = json!({
            "data": [
                { "latitude": 59.9405, "longitude": 30.2605, "height": 1.5 },
                { "latitude": 59.9406, "longitude": 30.2606, "height": "2" }
            ]
        })
        .to_string();

        let (dataset, report) = MapDataset::load(&buildings, &points).unwrap();
        assert_eq!(dataset.buildings.len(), 1);
        assert_eq!(dataset.points.len(), 1);
        assert_eq!(report.building_diagnostics.entries()[0].index, 1);
        assert_eq!(report.point_diagnostics.entries()[0].index, 1);
    }

    #[test]
    fn test_bounds_cover_buildings_and_points() {
        let (dataset, _) = MapDataset::load(&buildings_json(), &points_json()).unwrap();
        assert_eq!(dataset.bounds(), Some([30.259, 59.9395, 30.261, 59.941]));
        let summary = dataset.summary();
        assert_eq!(summary.building_count, 1);
        assert_eq!(summary.point_count, 2);
    }

    #[test]
    fn test_empty_dataset_has_no_bounds() {
        let dataset = MapDataset::default();
        assert!(dataset.is_empty());
        assert_eq!(dataset.bounds(), None);
    }

    #[test]
    fn test_schema_errors_fail_the_load() {
        assert!(MapDataset::load("{}", &points_json()).is_err());
        assert!(MapDataset::load(&buildings_json(), r#"{"data": 5}"#).is_err());
    }
}
