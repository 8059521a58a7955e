//! Geographic coordinate type and the grid → map projection.
//!
//! `GeoPoint` uses `f32` latitude/longitude.  At the equator this gives
//! ~1 m precision, far finer than one grid cell.

use serde::{Deserialize, Serialize};

use crate::GridPos;

/// Degrees of latitude per grid cell (≈ one mile north/south).
const LAT_PER_CELL: f32 = 0.0145;
/// Degrees of longitude per grid cell (≈ one mile east/west at 47.6° N).
const LON_PER_CELL: f32 = 0.018;

/// A WGS-84 geographic coordinate stored as single-precision floats.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f32,
    pub lon: f32,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f32, lon: f32) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── GridProjection ────────────────────────────────────────────────────────────

/// Linear projection from grid cells onto a map, centred on `center`.
///
/// The grid's midpoint (`grid_miles / 2`) lands on `center`; each cell moves
/// a fixed number of degrees.  Good enough for drawing markers at city scale,
/// not for navigation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridProjection {
    pub center:     GeoPoint,
    pub grid_miles: f32,
}

impl Default for GridProjection {
    /// SODO, Seattle; 20-mile grid.
    fn default() -> Self {
        Self {
            center:     GeoPoint::new(47.5952, -122.3301),
            grid_miles: 20.0,
        }
    }
}

impl GridProjection {
    pub fn to_geo(&self, pos: GridPos) -> GeoPoint {
        let half = self.grid_miles / 2.0;
        GeoPoint {
            lat: self.center.lat + (pos.y as f32 - half) * LAT_PER_CELL,
            lon: self.center.lon + (pos.x as f32 - half) * LON_PER_CELL,
        }
    }

    /// Project a whole route, e.g. for a path layer.
    pub fn project_route(&self, route: &[GridPos]) -> Vec<GeoPoint> {
        route.iter().map(|&p| self.to_geo(p)).collect()
    }
}
