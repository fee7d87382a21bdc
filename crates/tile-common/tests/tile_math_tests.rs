//! Tile → bounding box math across CRSes and protocol versions.

use test_utils::assert_approx_eq;
use tile_common::bbox::BoundingBox;
use tile_common::tile::{
    geographic_tile_bbox, tile_to_bbox, web_mercator_tile_bbox, TileAddress,
    WEB_MERCATOR_HALF_EXTENT,
};
use tile_common::{AxisOrder, CrsCode, WmsVersion};

// ============================================================================
// Web Mercator ordering and adjacency
// ============================================================================

#[test]
fn test_web_mercator_bbox_is_strictly_ordered() {
    for z in 0..=6u32 {
        let n = 1u32 << z;
        for x in 0..n {
            for y in 0..n {
                let bbox = web_mercator_tile_bbox(TileAddress::new(x, y, z));
                assert!(bbox.min_x < bbox.max_x, "x order at {}/{}/{}", z, x, y);
                assert!(bbox.min_y < bbox.max_y, "y order at {}/{}/{}", z, x, y);
            }
        }
    }
}

#[test]
fn test_adjacent_columns_share_an_edge() {
    for z in 1..=10u32 {
        let n = 1u32 << z;
        for x in 0..n.min(64) - 1 {
            let left = web_mercator_tile_bbox(TileAddress::new(x, 0, z));
            let right = web_mercator_tile_bbox(TileAddress::new(x + 1, 0, z));
            assert_eq!(left.max_x, right.min_x, "z={} x={}", z, x);
        }
    }
}

#[test]
fn test_adjacent_rows_share_an_edge() {
    for z in 1..=10u32 {
        let n = 1u32 << z;
        for y in 0..n.min(64) - 1 {
            let upper = web_mercator_tile_bbox(TileAddress::new(0, y, z));
            let lower = web_mercator_tile_bbox(TileAddress::new(0, y + 1, z));
            assert_eq!(upper.min_y, lower.max_y, "z={} y={}", z, y);
        }
    }
}

#[test]
fn test_row_zero_is_northernmost() {
    let north = web_mercator_tile_bbox(TileAddress::new(0, 0, 2));
    let south = web_mercator_tile_bbox(TileAddress::new(0, 3, 2));
    assert!(north.max_y > south.max_y);
    assert_approx_eq!(north.max_y, WEB_MERCATOR_HALF_EXTENT, 1e-6);
    assert_approx_eq!(south.min_y, -WEB_MERCATOR_HALF_EXTENT, 1e-6);
}

#[test]
fn test_aliases_share_math() {
    let addr = TileAddress::new(7, 3, 5);
    let a = tile_to_bbox(addr, &CrsCode::parse("EPSG:3857"));
    let b = tile_to_bbox(addr, &CrsCode::parse("EPSG:900913"));
    assert_eq!(a, b);
}

// ============================================================================
// Geographic CRS
// ============================================================================

#[test]
fn test_geographic_zoom_zero() {
    let bbox = tile_to_bbox(TileAddress::new(0, 0, 0), &CrsCode::Epsg4326);
    assert_eq!(bbox.min_x, -180.0);
    assert_eq!(bbox.max_x, 180.0);
    assert_approx_eq!(bbox.max_y, 85.0511287798, 1e-6);
    assert_approx_eq!(bbox.min_y, -85.0511287798, 1e-6);
}

#[test]
fn test_crs84_matches_epsg4326_bounds() {
    let addr = TileAddress::new(12, 5, 5);
    assert_eq!(
        tile_to_bbox(addr, &CrsCode::Crs84),
        tile_to_bbox(addr, &CrsCode::Epsg4326)
    );
    assert_eq!(tile_to_bbox(addr, &CrsCode::Crs84), geographic_tile_bbox(addr));
}

#[test]
fn test_geographic_adjacent_tiles_share_longitudes() {
    let a = geographic_tile_bbox(TileAddress::new(3, 1, 3));
    let b = geographic_tile_bbox(TileAddress::new(4, 1, 3));
    assert_eq!(a.max_x, b.min_x);
}

// ============================================================================
// Axis order serialization
// ============================================================================

#[test]
fn test_axis_order_wms_130_epsg4326_is_lon_lat() {
    let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
    let order = CrsCode::Epsg4326.axis_order(WmsVersion::V1_3_0);
    assert_eq!(bbox.to_wms_string(order), "-180,-90,180,90");
}

#[test]
fn test_axis_order_wms_111_epsg4326_is_lat_lon() {
    let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
    let order = CrsCode::Epsg4326.axis_order(WmsVersion::V1_1_1);
    assert_eq!(order, AxisOrder::LatLon);
    assert_eq!(bbox.to_wms_string(order), "-90,-180,90,180");
}

#[test]
fn test_axis_order_web_mercator_never_swaps() {
    for version in [WmsVersion::V1_1_1, WmsVersion::V1_3_0] {
        assert_eq!(CrsCode::Epsg3857.axis_order(version), AxisOrder::XY);
    }
}
