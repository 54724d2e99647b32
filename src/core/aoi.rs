//! Area of interest shared by every query, clip and export.

use geo::{Area, BooleanOps, BoundingRect, ChamberlainDuquetteArea, Contains, LineString, MultiPolygon, Point, Polygon};

use crate::types::{BoundingBox, SarError, SarResult};

/// Mutable multi-polygon owned by the workflow controller.
///
/// Drawn shapes are merged in with a boolean union, deleted shapes are cut
/// out with a boolean difference. The geometry only becomes empty through
/// [`AreaOfInterest::reset`] or by removing everything it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    geometry: MultiPolygon<f64>,
}

impl Default for AreaOfInterest {
    fn default() -> Self {
        Self::empty()
    }
}

impl AreaOfInterest {
    pub fn empty() -> Self {
        Self {
            geometry: MultiPolygon::new(Vec::new()),
        }
    }

    pub fn from_polygon(polygon: Polygon<f64>) -> Self {
        Self {
            geometry: MultiPolygon::new(vec![polygon]),
        }
    }

    pub fn from_bounds(bbox: &BoundingBox) -> Self {
        Self::from_polygon(polygon_from_coords(&bbox.corners()))
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Union-extend with a newly drawn shape.
    pub fn add(&mut self, shape: &MultiPolygon<f64>) {
        self.geometry = self.geometry.union(shape);
        log::debug!("AOI extended to {} polygon(s)", self.geometry.0.len());
    }

    pub fn add_polygon(&mut self, polygon: Polygon<f64>) {
        self.add(&MultiPolygon::new(vec![polygon]));
    }

    /// Difference-reduce by a deleted shape.
    pub fn remove(&mut self, shape: &MultiPolygon<f64>) {
        self.geometry = self.geometry.difference(shape);
        log::debug!("AOI reduced to {} polygon(s)", self.geometry.0.len());
    }

    pub fn remove_polygon(&mut self, polygon: Polygon<f64>) {
        self.remove(&MultiPolygon::new(vec![polygon]));
    }

    pub fn reset(&mut self) {
        self.geometry = MultiPolygon::new(Vec::new());
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty() || self.geometry.unsigned_area() <= 0.0
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        if self.is_empty() {
            return None;
        }
        self.geometry.bounding_rect().map(|rect| BoundingBox {
            min_lon: rect.min().x,
            max_lon: rect.max().x,
            min_lat: rect.min().y,
            max_lat: rect.max().y,
        })
    }

    /// The four bounding-box corners every query is filtered against.
    pub fn corners(&self) -> SarResult<[(f64, f64); 4]> {
        self.bounds()
            .map(|bbox| bbox.corners())
            .ok_or_else(|| SarError::Validation("Area of interest is empty".to_string()))
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.geometry.contains(&Point::new(lon, lat))
    }

    /// Approximate surface area in square meters.
    pub fn area_m2(&self) -> f64 {
        self.geometry.chamberlain_duquette_unsigned_area()
    }

    /// Exterior ring vertices of the first polygon, as (lon, lat).
    pub fn vertices(&self) -> Vec<(f64, f64)> {
        self.geometry
            .0
            .first()
            .map(|polygon| polygon.exterior().coords().map(|c| (c.x, c.y)).collect())
            .unwrap_or_default()
    }
}

/// Build a closed polygon without holes from (lon, lat) vertices.
pub fn polygon_from_coords(coords: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(LineString::from(coords.to_vec()), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon_from_coords(&[(x0, y0), (x0 + size, y0), (x0 + size, y0 + size), (x0, y0 + size)])
    }

    #[test]
    fn test_add_extends_bounds() {
        let mut aoi = AreaOfInterest::empty();
        assert!(aoi.is_empty());
        assert!(aoi.corners().is_err());

        aoi.add_polygon(square(6.0, 50.0, 0.1));
        aoi.add_polygon(square(6.2, 50.0, 0.1));
        assert!(!aoi.is_empty());

        let bbox = aoi.bounds().unwrap();
        assert!((bbox.min_lon - 6.0).abs() < 1e-9);
        assert!((bbox.max_lon - 6.3).abs() < 1e-9);
        assert!(aoi.contains(6.05, 50.05));
        assert!(!aoi.contains(6.15, 50.05));
    }

    #[test]
    fn test_remove_whole_area_empties() {
        let mut aoi = AreaOfInterest::empty();
        aoi.add_polygon(square(6.0, 50.0, 0.1));
        aoi.remove_polygon(square(5.9, 49.9, 0.3));
        assert!(aoi.is_empty());
        assert!(aoi.bounds().is_none());
    }

    #[test]
    fn test_partial_remove_keeps_rest() {
        let mut aoi = AreaOfInterest::empty();
        aoi.add_polygon(square(6.0, 50.0, 0.2));
        aoi.remove_polygon(square(6.1, 50.0, 0.1));
        assert!(!aoi.is_empty());
        assert!(aoi.contains(6.05, 50.05));
        assert!(!aoi.contains(6.15, 50.05));
        assert!(aoi.contains(6.15, 50.15));
    }

    #[test]
    fn test_area_is_plausible() {
        // 0.01 x 0.01 degrees near 50N is roughly 1.1 km x 0.7 km
        let aoi = AreaOfInterest::from_polygon(square(6.0, 50.0, 0.01));
        let area = aoi.area_m2();
        assert!(area > 0.5e6 && area < 1.2e6, "area = {}", area);
        assert_eq!(aoi.vertices().len(), 5);
    }
}
