//! Tile addressing, tile → bounding box math and WMTS tile matrix definitions.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, CrsCode};

/// WGS84 semi-major axis used by spherical Web Mercator.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Equatorial circumference in Web Mercator meters (`2πR`).
pub const EARTH_CIRCUMFERENCE_METERS: f64 = 2.0 * PI * EARTH_RADIUS_METERS;

/// Half of the Web Mercator world extent (`πR`).
pub const WEB_MERCATOR_HALF_EXTENT: f64 = EARTH_CIRCUMFERENCE_METERS / 2.0;

/// Scale denominator of the GoogleMapsCompatible matrix at zoom 0.
pub const WEB_MERCATOR_Z0_SCALE: f64 = 559_082_264.028_717_8;

/// Deepest zoom level accepted anywhere in configuration.
pub const MAX_ZOOM: u32 = 24;

/// A tile address as handed out by the rendering host (z/x/y, row 0 at the top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddress {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Zoom level
    pub z: u32,
}

impl TileAddress {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Row index counted from the bottom (TMS convention).
    pub fn tms_y(&self) -> u32 {
        tms_flip_y(self.y, self.z)
    }
}

/// Flip a row between XYZ (top-left origin) and TMS (bottom-left origin).
///
/// `y' = 2^z − 1 − y`; the operation is its own inverse. Rows outside the
/// matrix saturate at 0 instead of wrapping.
pub fn tms_flip_y(y: u32, z: u32) -> u32 {
    let n = 1u64 << z.min(63);
    (n.saturating_sub(1).saturating_sub(y as u64)).min(u32::MAX as u64) as u32
}

/// Compute the bounding box of a tile in the native units of `crs`.
///
/// Web Mercator yields meters; EPSG:4326 and CRS:84 yield degrees using the
/// inverse Mercator latitude for the row edges. Any other CRS is treated as
/// Web Mercator. The returned box is always `minx,miny,maxx,maxy`; axis-order
/// correction for a particular protocol version happens at serialization.
pub fn tile_to_bbox(address: TileAddress, crs: &CrsCode) -> BoundingBox {
    if crs.is_geographic() {
        geographic_tile_bbox(address)
    } else {
        web_mercator_tile_bbox(address)
    }
}

/// Web Mercator tile bounds in meters.
pub fn web_mercator_tile_bbox(address: TileAddress) -> BoundingBox {
    let n = 2f64.powi(address.z as i32);
    let span = EARTH_CIRCUMFERENCE_METERS / n;

    let min_x = address.x as f64 * span - WEB_MERCATOR_HALF_EXTENT;
    let max_x = (address.x as f64 + 1.0) * span - WEB_MERCATOR_HALF_EXTENT;
    let max_y = WEB_MERCATOR_HALF_EXTENT - address.y as f64 * span;
    let min_y = WEB_MERCATOR_HALF_EXTENT - (address.y as f64 + 1.0) * span;

    BoundingBox::new(min_x, min_y, max_x, max_y)
}

/// Web Mercator tile bounds expressed in lon/lat degrees.
pub fn geographic_tile_bbox(address: TileAddress) -> BoundingBox {
    let n = 2f64.powi(address.z as i32);

    let lon_min = address.x as f64 / n * 360.0 - 180.0;
    let lon_max = (address.x as f64 + 1.0) / n * 360.0 - 180.0;
    let lat_max = row_to_latitude(address.y as f64, n);
    let lat_min = row_to_latitude(address.y as f64 + 1.0, n);

    BoundingBox::new(lon_min, lat_min, lon_max, lat_max)
}

fn row_to_latitude(row: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * row / n)).sinh().atan().to_degrees()
}

/// A single tile matrix (zoom level) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMatrix {
    /// Identifier as used in `{TileMatrix}` substitutions
    pub identifier: String,

    /// Scale denominator
    pub scale_denominator: f64,

    /// Top-left corner coordinates
    pub top_left_corner: (f64, f64),

    /// Tile width in pixels
    pub tile_width: u32,

    /// Tile height in pixels
    pub tile_height: u32,

    /// Number of tile columns
    pub matrix_width: u32,

    /// Number of tile rows
    pub matrix_height: u32,
}

/// A complete tile matrix set definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMatrixSet {
    /// Identifier for the tile matrix set
    pub identifier: String,

    /// Supported CRS exactly as advertised
    pub supported_crs: String,

    /// Well-known scale set URI (optional)
    pub well_known_scale_set: Option<String>,

    /// Individual tile matrices, index 0 is the lowest zoom
    pub tile_matrices: Vec<TileMatrix>,
}

impl TileMatrixSet {
    /// Parsed form of [`TileMatrixSet::supported_crs`].
    pub fn crs(&self) -> CrsCode {
        CrsCode::parse(&self.supported_crs)
    }
}

/// Sort matrices by descending scale denominator (coarsest first).
pub fn sort_matrices_by_zoom(matrices: &mut [TileMatrix]) {
    matrices.sort_by(|a, b| b.scale_denominator.total_cmp(&a.scale_denominator));
}

/// Pick the matrix for a zoom level, falling back to the deepest one when
/// the requested zoom exceeds the list.
pub fn matrix_for_zoom(matrices: &[TileMatrix], zoom: u32) -> Option<&TileMatrix> {
    matrices.get(zoom as usize).or_else(|| matrices.last())
}
