// This is the models module containing shared response structures
use serde::Serialize;

use crate::scene::ViewMode;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub building_count: usize,
    pub point_count: usize,
    /// [minLng, minLat, maxLng, maxLat]
    pub bounds: Option<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub loaded: bool,
    pub view_mode: ViewMode,
    pub summary: DatasetSummary,
}
