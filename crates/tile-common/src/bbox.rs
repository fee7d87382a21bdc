//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::crs::AxisOrder;

/// A geographic or projected bounding box.
///
/// For geographic CRS (EPSG:4326, CRS:84), coordinates are in degrees.
/// For projected CRS (EPSG:3857, etc.), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// `[minX, minY, maxX, maxY]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Serialize for a `BBOX`/`bbox` query parameter in the given axis order.
    ///
    /// This is the last step before URL construction; the box itself is
    /// always stored as `minx,miny,maxx,maxy`.
    pub fn to_wms_string(&self, order: AxisOrder) -> String {
        match order {
            AxisOrder::XY => format!(
                "{},{},{},{}",
                self.min_x, self.min_y, self.max_x, self.max_y
            ),
            AxisOrder::LatLon => format!(
                "{},{},{},{}",
                self.min_y, self.min_x, self.max_y, self.max_x
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_ordered_string() {
        let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        assert_eq!(bbox.to_wms_string(AxisOrder::XY), "-180,-90,180,90");
        assert_eq!(bbox.to_wms_string(AxisOrder::LatLon), "-90,-180,90,180");
    }
}
