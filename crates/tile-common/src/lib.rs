//! Common types and tile math shared across the raster-source crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod tile;

pub use bbox::BoundingBox;
pub use crs::{AxisOrder, CrsCode, WmsVersion};
pub use error::{
    ConfigError, ConfigErrorCode, NetworkError, ParseError, SourceError, SourceResult,
};
pub use tile::{tile_to_bbox, TileAddress, TileMatrix, TileMatrixSet};
