//! Local equirectangular projection used to inflate a measurement point into a
//! small square footprint for extruded rendering.
//!
//! Over a few meters the Earth is treated as flat: one degree of latitude is a
//! fixed number of meters and one degree of longitude shrinks with the cosine
//! of the latitude. That breaks down towards the poles, so the projector has an
//! explicit latitude limit and a policy for points beyond it.

use geo::Centroid;
use geo_types::{coord, Coord, LineString, Point, Polygon};
use serde::ser::{Serialize, Serializer};

use crate::config::{
    EarthModel, LatitudePolicy, ProjectionConfig, DEFAULT_FOOTPRINT_SIDE_METERS,
    DEFAULT_MAX_LATITUDE, METERS_PER_DEGREE,
};
use crate::error::{MapDataError, Result};

/// Number of vertices in a closed footprint ring
pub const FOOTPRINT_VERTEX_COUNT: usize = 5;

/// Converts between meters and degrees around a given latitude
pub trait DegreeScale {
    /// Ground length in meters of one degree of (latitude, longitude) at `latitude` degrees
    fn meters_per_degree(&self, latitude: f64) -> (f64, f64);
}

/// Spherical approximation with a constant meridian degree length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalScale {
    pub meters_per_degree: f64,
}

impl Default for SphericalScale {
    fn default() -> Self {
        Self {
            meters_per_degree: METERS_PER_DEGREE,
        }
    }
}

impl DegreeScale for SphericalScale {
    fn meters_per_degree(&self, latitude: f64) -> (f64, f64) {
        let lat_rad = latitude.to_radians();
        (self.meters_per_degree, self.meters_per_degree * lat_rad.cos())
    }
}

/// Series expansion of the WGS84 ellipsoid degree lengths
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Wgs84Scale;

impl DegreeScale for Wgs84Scale {
    fn meters_per_degree(&self, latitude: f64) -> (f64, f64) {
        let lat = latitude.to_radians();
        let lat_m = 111_132.92 - 559.82 * (2.0 * lat).cos() + 1.175 * (4.0 * lat).cos();
        let lng_m = 111_412.84 * lat.cos() - 93.5 * (3.0 * lat).cos();
        (lat_m, lng_m)
    }
}

/// Runtime selectable scale, built from `EarthModel`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EarthScale {
    Spherical(SphericalScale),
    Wgs84(Wgs84Scale),
}

impl Default for EarthScale {
    fn default() -> Self {
        EarthScale::Spherical(SphericalScale::default())
    }
}

impl DegreeScale for EarthScale {
    fn meters_per_degree(&self, latitude: f64) -> (f64, f64) {
        match self {
            EarthScale::Spherical(scale) => scale.meters_per_degree(latitude),
            EarthScale::Wgs84(scale) => scale.meters_per_degree(latitude),
        }
    }
}

/// Closed square ring: bottom-left, bottom-right, top-right, top-left, bottom-left
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintPolygon {
    ring: LineString<f64>,
}

impl FootprintPolygon {
    fn from_corners(min: Coord<f64>, max: Coord<f64>) -> Self {
        let ring = LineString::new(vec![
            coord! { x: min.x, y: min.y },
            coord! { x: max.x, y: min.y },
            coord! { x: max.x, y: max.y },
            coord! { x: min.x, y: max.y },
            coord! { x: min.x, y: min.y },
        ]);
        Self { ring }
    }

    pub fn ring(&self) -> &LineString<f64> {
        &self.ring
    }

    /// Vertices as `[lng, lat]` pairs, closing vertex included
    pub fn vertices(&self) -> Vec<[f64; 2]> {
        self.ring.coords().map(|c| [c.x, c.y]).collect()
    }

    /// Flat `[lng0, lat0, lng1, lat1, ...]` buffer for typed-array transfer
    pub fn to_flat(&self) -> Vec<f64> {
        self.ring.coords().flat_map(|c| [c.x, c.y]).collect()
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(self.ring.clone(), vec![])
    }

    pub fn centroid(&self) -> Option<Point<f64>> {
        self.to_polygon().centroid()
    }
}

impl Serialize for FootprintPolygon {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_ring(&self.ring, serializer)
    }
}

/// Writes a ring as `[[lng, lat], ...]`, the shape the renderer expects
pub(crate) fn serialize_ring<S: Serializer>(
    ring: &LineString<f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(ring.coords().map(|c| [c.x, c.y]))
}

/// Builds footprint rings around points using a `DegreeScale`
#[derive(Debug, Clone)]
pub struct FootprintProjector<S = EarthScale> {
    scale: S,
    max_latitude: f64,
    policy: LatitudePolicy,
    side_meters: f64,
}

impl Default for FootprintProjector<EarthScale> {
    fn default() -> Self {
        Self::new(EarthScale::default())
    }
}

impl FootprintProjector<EarthScale> {
    pub fn from_config(config: &ProjectionConfig) -> Result<Self> {
        config.validate()?;
        let scale = match config.earth_model {
            EarthModel::Spherical => EarthScale::Spherical(SphericalScale {
                meters_per_degree: config.meters_per_degree,
            }),
            EarthModel::Wgs84 => EarthScale::Wgs84(Wgs84Scale),
        };
        Ok(Self::new(scale)
            .with_max_latitude(config.max_latitude)
            .with_policy(config.latitude_policy)
            .with_side_meters(config.footprint_side_meters))
    }
}

impl<S: DegreeScale> FootprintProjector<S> {
    pub fn new(scale: S) -> Self {
        Self {
            scale,
            max_latitude: DEFAULT_MAX_LATITUDE,
            policy: LatitudePolicy::Clamp,
            side_meters: DEFAULT_FOOTPRINT_SIDE_METERS,
        }
    }

    pub fn with_max_latitude(mut self, max_latitude: f64) -> Self {
        self.max_latitude = max_latitude;
        self
    }

    pub fn with_policy(mut self, policy: LatitudePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_side_meters(mut self, side_meters: f64) -> Self {
        self.side_meters = side_meters;
        self
    }

    pub fn side_meters(&self) -> f64 {
        self.side_meters
    }

    /// Degrees per meter along (longitude, latitude) at `latitude`.
    ///
    /// Under `LatitudePolicy::Clamp` the scale of the nearest allowed latitude
    /// is used, so the ring gets wider in ground meters than requested there.
    pub fn degrees_per_meter(&self, latitude: f64) -> Result<(f64, f64)> {
        if !latitude.is_finite() {
            return Err(MapDataError::InvalidCoordinate {
                longitude: f64::NAN,
                latitude,
            });
        }
        if latitude.abs() > 90.0 {
            return Err(MapDataError::OutOfDomain {
                latitude,
                limit: 90.0,
            });
        }

        let effective = if latitude.abs() > self.max_latitude {
            match self.policy {
                LatitudePolicy::Reject => {
                    return Err(MapDataError::OutOfDomain {
                        latitude,
                        limit: self.max_latitude,
                    })
                }
                LatitudePolicy::Clamp => latitude.clamp(-self.max_latitude, self.max_latitude),
            }
        } else {
            latitude
        };

        let (lat_m, lng_m) = self.scale.meters_per_degree(effective);
        if !(lat_m.is_finite() && lng_m.is_finite() && lat_m > 0.0 && lng_m > 0.0) {
            return Err(MapDataError::OutOfDomain {
                latitude,
                limit: self.max_latitude,
            });
        }
        Ok((1.0 / lng_m, 1.0 / lat_m))
    }

    /// Footprint with the projector's configured side length
    pub fn footprint(&self, lng: f64, lat: f64) -> Result<FootprintPolygon> {
        self.footprint_with_side(lng, lat, self.side_meters)
    }

    /// Vertex longitudes are not wrapped: a ring around a point within half a
    /// side of the antimeridian has vertices just past +/-180 so that it stays
    /// one contiguous square for the renderer.
    pub fn footprint_with_side(&self, lng: f64, lat: f64, side_meters: f64) -> Result<FootprintPolygon> {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(MapDataError::InvalidCoordinate {
                longitude: lng,
                latitude: lat,
            });
        }
        if !side_meters.is_finite() || side_meters <= 0.0 {
            return Err(MapDataError::InvalidSideLength(side_meters));
        }

        let (d_lng, d_lat) = self.degrees_per_meter(lat)?;
        let half_lng = d_lng * side_meters / 2.0;
        let half_lat = d_lat * side_meters / 2.0;

        // Clamped rings near a pole must not step past it; longitudes run on past 180
        let min = coord! { x: lng - half_lng, y: (lat - half_lat).max(-90.0) };
        let max = coord! { x: lng + half_lng, y: (lat + half_lat).min(90.0) };
        Ok(FootprintPolygon::from_corners(min, max))
    }
}

/// Square footprint around a point with the default spherical projector.
/// `side_meters` defaults to one meter.
pub fn point_to_footprint_polygon(lng: f64, lat: f64, side_meters: Option<f64>) -> Result<FootprintPolygon> {
    let side = side_meters.unwrap_or(DEFAULT_FOOTPRINT_SIDE_METERS);
    FootprintProjector::default().footprint_with_side(lng, lat, side)
}
