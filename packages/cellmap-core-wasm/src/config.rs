use serde::{Deserialize, Serialize};

use crate::error::{MapDataError, Result};

/// Mean length of one degree of latitude in meters (2 * PI * 6378137 / 360, rounded)
pub const METERS_PER_DEGREE: f64 = 111_320.0;
/// Beyond this latitude the local flat-Earth approximation is not used as-is
pub const DEFAULT_MAX_LATITUDE: f64 = 89.9;
pub const DEFAULT_FOOTPRINT_SIDE_METERS: f64 = 1.0;
pub const DEFAULT_COLUMN_ELEVATION: f64 = 1.8;
pub const DEFAULT_POINT_RADIUS_PIXELS: f64 = 3.0;

pub type Rgba = [u8; 4];

/// Which approximation converts meters to degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EarthModel {
    #[default]
    Spherical,
    Wgs84,
}

/// What the projector does with points poleward of `max_latitude`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LatitudePolicy {
    #[default]
    Clamp,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectionConfig {
    pub meters_per_degree: f64,
    pub earth_model: EarthModel,
    pub max_latitude: f64,
    pub latitude_policy: LatitudePolicy,
    pub footprint_side_meters: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            meters_per_degree: METERS_PER_DEGREE,
            earth_model: EarthModel::Spherical,
            max_latitude: DEFAULT_MAX_LATITUDE,
            latitude_policy: LatitudePolicy::Clamp,
            footprint_side_meters: DEFAULT_FOOTPRINT_SIDE_METERS,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.meters_per_degree.is_finite() || self.meters_per_degree <= 0.0 {
            return Err(MapDataError::InvalidConfig(format!(
                "metersPerDegree must be positive, got {}",
                self.meters_per_degree
            )));
        }
        if !self.max_latitude.is_finite() || self.max_latitude <= 0.0 || self.max_latitude >= 90.0 {
            return Err(MapDataError::InvalidConfig(format!(
                "maxLatitude must be inside (0, 90), got {}",
                self.max_latitude
            )));
        }
        if !self.footprint_side_meters.is_finite() || self.footprint_side_meters <= 0.0 {
            return Err(MapDataError::InvalidConfig(format!(
                "footprintSideMeters must be positive, got {}",
                self.footprint_side_meters
            )));
        }
        Ok(())
    }
}

/// Camera state handed to the renderer together with the layers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            longitude: 30.2622,
            latitude: 59.9406,
            zoom: 14.0,
            pitch: 45.0,
            bearing: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerStyle {
    pub building_fill_3d: Rgba,
    pub building_line_3d: Rgba,
    pub building_opacity_3d: f64,
    pub building_fill_2d: Rgba,
    pub building_line_2d: Rgba,
    pub line_width: f64,
    pub point_fill_3d: Rgba,
    pub point_fill_2d: Rgba,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            building_fill_3d: [0, 0, 0, 60],
            building_line_3d: [0, 0, 0, 80],
            building_opacity_3d: 0.25,
            building_fill_2d: [140, 170, 180, 200],
            building_line_2d: [0, 0, 0, 100],
            line_width: 1.0,
            point_fill_3d: [255, 0, 0, 255],
            point_fill_2d: [0, 0, 255, 200],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneConfig {
    pub projection: ProjectionConfig,
    pub column_elevation: f64,
    pub point_radius_pixels: f64,
    pub style: LayerStyle,
    pub initial_view: ViewState,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig::default(),
            column_elevation: DEFAULT_COLUMN_ELEVATION,
            point_radius_pixels: DEFAULT_POINT_RADIUS_PIXELS,
            style: LayerStyle::default(),
            initial_view: ViewState::default(),
        }
    }
}

impl SceneConfig {
    /// Parse a host supplied config; an empty string means defaults
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.projection.validate()?;
        if !self.column_elevation.is_finite() || self.column_elevation < 0.0 {
            return Err(MapDataError::InvalidConfig(format!(
                "columnElevation must be non-negative, got {}",
                self.column_elevation
            )));
        }
        if !self.point_radius_pixels.is_finite() || self.point_radius_pixels <= 0.0 {
            return Err(MapDataError::InvalidConfig(format!(
                "pointRadiusPixels must be positive, got {}",
                self.point_radius_pixels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(SceneConfig::from_json("").unwrap(), SceneConfig::default());
        assert_eq!(SceneConfig::from_json("{}").unwrap(), SceneConfig::default());
    }

    #[test]
    fn test_partial_config_overrides() {
        let config = SceneConfig::from_json(
            r#"{"projection": {"earthModel": "wgs84", "latitudePolicy": "reject"}, "columnElevation": 3.0}"#,
        )
        .unwrap();
        assert_eq!(config.projection.earth_model, EarthModel::Wgs84);
        assert_eq!(config.projection.latitude_policy, LatitudePolicy::Reject);
        assert_eq!(config.projection.meters_per_degree, METERS_PER_DEGREE);
        assert_eq!(config.column_elevation, 3.0);
        assert_eq!(config.style, LayerStyle::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = SceneConfig::from_json(r#"{"projection": {"maxLatitude": 90}}"#).unwrap_err();
        assert!(matches!(err, MapDataError::InvalidConfig(_)));

        let err = SceneConfig::from_json(r#"{"projection": {"metersPerDegree": -1}}"#).unwrap_err();
        assert!(matches!(err, MapDataError::InvalidConfig(_)));

        let err = SceneConfig::from_json(r#"{"pointRadiusPixels": 0}"#).unwrap_err();
        assert!(matches!(err, MapDataError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = SceneConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, MapDataError::Parse(_)));
    }
}
