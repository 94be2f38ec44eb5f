//! Layer data for the two map views.
//!
//! In 3D, buildings are extruded by their AGL height and every measurement
//! point becomes a short column standing on its projected square footprint.
//! In 2D, buildings are flat and points are screen-space markers.

use geo_types::LineString;
use serde::{Deserialize, Serialize};

use crate::config::{Rgba, SceneConfig, ViewState};
use crate::console_log;
use crate::dataset::MapDataset;
use crate::diagnostics::DiagnosticReport;
use crate::error::Result;
use crate::projection::{serialize_ring, FootprintPolygon, FootprintProjector};

pub const BUILDINGS_LAYER_ID: &str = "buildings";
pub const POINTS_3D_LAYER_ID: &str = "points-3d";
pub const POINTS_2D_LAYER_ID: &str = "points-2d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ViewMode {
    #[serde(rename = "2d")]
    TwoD,
    #[default]
    #[serde(rename = "3d")]
    ThreeD,
}

impl ViewMode {
    pub fn from_is_3d(is_3d: bool) -> Self {
        if is_3d {
            ViewMode::ThreeD
        } else {
            ViewMode::TwoD
        }
    }

    pub fn is_3d(self) -> bool {
        self == ViewMode::ThreeD
    }

    pub fn toggle(self) -> Self {
        match self {
            ViewMode::TwoD => ViewMode::ThreeD,
            ViewMode::ThreeD => ViewMode::TwoD,
        }
    }

    /// Text for the view toggle button
    pub fn label(self) -> &'static str {
        match self {
            ViewMode::TwoD => "2D",
            ViewMode::ThreeD => "3D",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrudedPolygon {
    #[serde(serialize_with = "serialize_ring")]
    pub polygon: LineString<f64>,
    pub elevation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonLayer {
    pub id: &'static str,
    pub extruded: bool,
    pub fill_color: Rgba,
    pub line_color: Rgba,
    pub line_width: f64,
    pub opacity: f64,
    pub polygons: Vec<ExtrudedPolygon>,
}

/// One point column, tagged with the payload index of its measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFootprint {
    pub source_index: usize,
    pub polygon: FootprintPolygon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLayer {
    pub id: &'static str,
    pub fill_color: Rgba,
    pub elevation: f64,
    pub footprints: Vec<ColumnFootprint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterLayer {
    pub id: &'static str,
    pub fill_color: Rgba,
    pub radius_pixels: f64,
    /// `[lng, lat, height]`
    pub positions: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Layer {
    Polygon(PolygonLayer),
    Column(ColumnLayer),
    Scatter(ScatterLayer),
}

impl Layer {
    pub fn id(&self) -> &'static str {
        match self {
            Layer::Polygon(layer) => layer.id,
            Layer::Column(layer) => layer.id,
            Layer::Scatter(layer) => layer.id,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Layer::Polygon(layer) => layer.polygons.len(),
            Layer::Column(layer) => layer.footprints.len(),
            Layer::Scatter(layer) => layer.positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub mode: ViewMode,
    pub toggle_label: &'static str,
    pub view_state: ViewState,
    pub layers: Vec<Layer>,
    /// Points whose footprint could not be projected
    pub diagnostics: DiagnosticReport,
}

impl Scene {
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }
}

fn buildings_layer(dataset: &MapDataset, mode: ViewMode, config: &SceneConfig) -> PolygonLayer {
    let style = &config.style;
    let extruded = mode.is_3d();
    let polygons = dataset
        .buildings
        .iter()
        .map(|building| ExtrudedPolygon {
            polygon: building.ring.clone(),
            elevation: if extruded { building.height_agl } else { 0.0 },
        })
        .collect();

    if extruded {
        PolygonLayer {
            id: BUILDINGS_LAYER_ID,
            extruded,
            fill_color: style.building_fill_3d,
            line_color: style.building_line_3d,
            line_width: style.line_width,
            opacity: style.building_opacity_3d,
            polygons,
        }
    } else {
        PolygonLayer {
            id: BUILDINGS_LAYER_ID,
            extruded,
            fill_color: style.building_fill_2d,
            line_color: style.building_line_2d,
            line_width: style.line_width,
            opacity: 1.0,
            polygons,
        }
    }
}

fn column_layer(dataset: &MapDataset, config: &SceneConfig, diagnostics: &mut DiagnosticReport) -> Result<ColumnLayer> {
    let projector = FootprintProjector::from_config(&config.projection)?;
    let mut footprints = Vec::with_capacity(dataset.points.len());
    for point in &dataset.points {
        let feature = &point.feature;
        match projector.footprint(feature.longitude(), feature.latitude()) {
            Ok(polygon) => footprints.push(ColumnFootprint {
                source_index: point.source_index,
                polygon,
            }),
            Err(err) => diagnostics.push(point.source_index, &err),
        }
    }

    Ok(ColumnLayer {
        id: POINTS_3D_LAYER_ID,
        fill_color: config.style.point_fill_3d,
        elevation: config.column_elevation,
        footprints,
    })
}

fn scatter_layer(dataset: &MapDataset, config: &SceneConfig) -> ScatterLayer {
    let positions = dataset
        .points
        .iter()
        .map(|point| {
            let feature = &point.feature;
            let height = feature.height().filter(|h| h.is_finite()).unwrap_or(0.0);
            [feature.longitude(), feature.latitude(), height]
        })
        .collect();

    ScatterLayer {
        id: POINTS_2D_LAYER_ID,
        fill_color: config.style.point_fill_2d,
        radius_pixels: config.point_radius_pixels,
        positions,
    }
}

/// Assemble the layers for `mode`. Fails only on an invalid projection config.
pub fn build_scene(dataset: &MapDataset, mode: ViewMode, config: &SceneConfig) -> Result<Scene> {
    let mut diagnostics = DiagnosticReport::new();
    let mut layers = vec![Layer::Polygon(buildings_layer(dataset, mode, config))];

    match mode {
        ViewMode::ThreeD => layers.push(Layer::Column(column_layer(dataset, config, &mut diagnostics)?)),
        ViewMode::TwoD => layers.push(Layer::Scatter(scatter_layer(dataset, config))),
    }

    let view_state = ViewState {
        pitch: if mode.is_3d() { config.initial_view.pitch } else { 0.0 },
        ..config.initial_view
    };

    diagnostics.log_summary("Footprint projection");
    console_log!(
        "Built {} scene: {}",
        mode.label(),
        layers
            .iter()
            .map(|layer| format!("{}={}", layer.id(), layer.len()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(Scene {
        mode,
        toggle_label: mode.label(),
        view_state,
        layers,
        diagnostics,
    })
}
