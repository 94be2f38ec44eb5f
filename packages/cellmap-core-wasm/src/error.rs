use thiserror::Error;

/// Result type for map data operations
pub type Result<T> = std::result::Result<T, MapDataError>;

/// Errors that can occur while turning fetched payloads into map features
#[derive(Error, Debug)]
pub enum MapDataError {
    #[error("Malformed geometry: {reason}")]
    MalformedGeometry { reason: String },

    #[error("Latitude {latitude} is outside the projectable range of +/-{limit} degrees")]
    OutOfDomain { latitude: f64, limit: f64 },

    #[error("Invalid coordinate: ({longitude}, {latitude})")]
    InvalidCoordinate { longitude: f64, latitude: f64 },

    #[error("Footprint side length must be a positive finite number of meters, got {0}")]
    InvalidSideLength(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse payload: {0}")]
    Parse(#[from] serde_json::Error),
}

impl MapDataError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        MapDataError::MalformedGeometry {
            reason: reason.into(),
        }
    }

    /// Short stable name used when grouping diagnostics
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapDataError::MalformedGeometry { .. } => ErrorKind::MalformedGeometry,
            MapDataError::OutOfDomain { .. } => ErrorKind::OutOfDomain,
            MapDataError::InvalidCoordinate { .. } => ErrorKind::InvalidCoordinate,
            MapDataError::InvalidSideLength(_) => ErrorKind::InvalidSideLength,
            MapDataError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            MapDataError::Parse(_) => ErrorKind::Parse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    MalformedGeometry,
    OutOfDomain,
    InvalidCoordinate,
    InvalidSideLength,
    InvalidConfig,
    Parse,
}

impl From<MapDataError> for wasm_bindgen::JsValue {
    fn from(err: MapDataError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
