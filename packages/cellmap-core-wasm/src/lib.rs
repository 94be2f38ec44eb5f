use js_sys::Float64Array;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

// Create a console module for logging
pub mod console;
pub mod config;
pub mod error;
pub mod diagnostics;
// Coordinate projector: point -> square footprint ring
pub mod projection;
// Feature converter: raw point records -> GeoJSON point features
pub mod points;
pub mod buildings;
pub mod dataset;
pub mod scene;
pub mod models;
mod module_state;

pub use buildings::{validate_buildings as validate_building_features, BuildingFeature, BuildingsPayload};
pub use config::{ProjectionConfig, SceneConfig};
pub use dataset::{LoadReport, LoadedPoint, MapDataset};
pub use error::MapDataError;
pub use points::{
    convert_points_checked as convert_point_records_checked,
    convert_points_to_geojson as convert_point_records, PointFeature, RawPointRecord,
};
pub use projection::{
    point_to_footprint_polygon as footprint_polygon, DegreeScale, FootprintPolygon, FootprintProjector,
};
pub use scene::{build_scene, Scene, ViewMode};

use module_state::ModuleState;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

// Use the macro from our console module
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => ($crate::console::warn(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("WASM module initialized successfully");
    });
}

#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Points payload (`{ data: [...] }` or a bare array) to a GeoJSON feature
/// array, one feature per record in input order.
#[wasm_bindgen]
pub fn convert_points_to_geojson(points_json: &str) -> Result<JsValue, JsValue> {
    let json = points::convert_points_json(points_json)?;
    Ok(JsValue::from_str(&json))
}

/// Like `convert_points_to_geojson`, but records with invalid coordinates are
/// skipped and listed under `diagnostics`.
#[wasm_bindgen]
pub fn convert_points_checked(points_json: &str) -> Result<JsValue, JsValue> {
    let json = points::convert_points_checked_json(points_json)?;
    Ok(JsValue::from_str(&json))
}

/// Closed 5-vertex `[lng, lat]` ring around a point, `side_meters` defaults to 1
#[wasm_bindgen]
pub fn point_to_footprint_polygon(lng: f64, lat: f64, side_meters: Option<f64>) -> Result<JsValue, JsValue> {
    let footprint = ModuleState::with(|state| {
        let projector = FootprintProjector::from_config(&state.config.projection)?;
        let side = side_meters.unwrap_or(projector.side_meters());
        projector.footprint_with_side(lng, lat, side)
    })?;
    Ok(to_value(&footprint.vertices())?)
}

/// Same ring as a flat `[lng0, lat0, ..., lng4, lat4]` typed array
#[wasm_bindgen]
pub fn footprint_ring_flat(lng: f64, lat: f64, side_meters: Option<f64>) -> Result<Float64Array, JsValue> {
    let footprint = ModuleState::with(|state| {
        let projector = FootprintProjector::from_config(&state.config.projection)?;
        let side = side_meters.unwrap_or(projector.side_meters());
        projector.footprint_with_side(lng, lat, side)
    })?;
    Ok(Float64Array::from(footprint.to_flat().as_slice()))
}

#[wasm_bindgen]
pub fn validate_buildings(buildings_json: &str) -> Result<JsValue, JsValue> {
    let json = buildings::validate_buildings_json(buildings_json)?;
    Ok(JsValue::from_str(&json))
}

/// Replace the scene/projection settings; `""` restores defaults
#[wasm_bindgen]
pub fn set_config(config_json: &str) -> Result<(), JsValue> {
    ModuleState::with_mut(|state| state.set_config(config_json))?;
    console_log!("Scene config updated");
    Ok(())
}

/// Load both endpoint payloads and return the load report as JSON
#[wasm_bindgen]
pub fn load_map_data(buildings_json: &str, points_json: &str) -> Result<JsValue, JsValue> {
    let report = ModuleState::with_mut(|state| state.load(buildings_json, points_json))?;
    let json = serde_json::to_string(&report).map_err(MapDataError::from)?;
    Ok(JsValue::from_str(&json))
}

#[wasm_bindgen]
pub fn set_view_mode(is_3d: bool) {
    ModuleState::with_mut(|state| state.set_view_mode(ViewMode::from_is_3d(is_3d)));
}

/// Flip between 2D and 3D, returns true when the new mode is 3D
#[wasm_bindgen]
pub fn toggle_view_mode() -> bool {
    ModuleState::with_mut(|state| state.toggle_view_mode()).is_3d()
}

/// Layers for the current view mode as JSON
#[wasm_bindgen]
pub fn get_scene() -> Result<JsValue, JsValue> {
    let scene = ModuleState::with(|state| state.scene())?;
    let json = serde_json::to_string(&scene).map_err(MapDataError::from)?;
    Ok(JsValue::from_str(&json))
}

#[wasm_bindgen]
pub fn get_dataset_summary() -> Result<JsValue, JsValue> {
    let status = ModuleState::with(|state| state.status());
    Ok(to_value(&status)?)
}

#[wasm_bindgen]
pub fn clear_map_data() -> bool {
    ModuleState::with_mut(|state| state.clear());
    true
}
