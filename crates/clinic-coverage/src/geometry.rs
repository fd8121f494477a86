//! Great-circle distance, centroids and containment over WGS84 lon/lat degrees
//!
//! Area geometry is carried as `geo` polygons; rings are closed on
//! construction, so the closing vertex is always part of the ring.

use crate::EARTH_RADIUS_KM;
use geo::{Contains, Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

/// A WGS84 position, longitude first (GeoJSON order)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self::new(lon, lat)
    }
}

impl From<Coord<f64>> for Point {
    fn from(coord: Coord<f64>) -> Self {
        Self::new(coord.x, coord.y)
    }
}

impl From<Point> for Coord<f64> {
    fn from(point: Point) -> Self {
        Coord { x: point.lon, y: point.lat }
    }
}

impl From<Point> for geo::Point<f64> {
    fn from(point: Point) -> Self {
        geo::Point::new(point.lon, point.lat)
    }
}

/// Area geometry carried by population cells and district boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "polygons")]
pub enum Geometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Geometry {
    /// Vertex mean of the exterior ring. Multi-polygons have no single ring
    /// and yield `None`.
    pub fn centroid(&self) -> Option<Point> {
        match self {
            Geometry::Polygon(polygon) => centroid(polygon.exterior()),
            Geometry::MultiPolygon(_) => None,
        }
    }

    /// Every ring has at least three distinct vertices and all coordinates are finite
    pub fn is_well_formed(&self) -> bool {
        match self {
            Geometry::Polygon(polygon) => polygon_is_well_formed(polygon),
            Geometry::MultiPolygon(polygons) => {
                !polygons.0.is_empty() && polygons.iter().all(polygon_is_well_formed)
            }
        }
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        match self {
            Geometry::Polygon(polygon) => std::slice::from_ref(polygon),
            Geometry::MultiPolygon(polygons) => &polygons.0,
        }
    }
}

/// Haversine distance between two points in km
pub fn distance_km(a: Point, b: Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    // Rounding can push near-antipodal inputs past 1
    let h = ((dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2)).min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Arithmetic mean of the ring's vertices.
///
/// Not area-weighted. The closing vertex counts like any other, so a closed
/// square ring is pulled slightly toward its first corner.
pub fn centroid(ring: &LineString<f64>) -> Option<Point> {
    if ring.0.is_empty() {
        return None;
    }
    let n = ring.0.len() as f64;
    let (sum_lon, sum_lat) = ring
        .coords()
        .fold((0.0, 0.0), |(lon, lat), c| (lon + c.x, lat + c.y));
    let c = Point::new(sum_lon / n, sum_lat / n);
    c.is_finite().then_some(c)
}

/// Point-in-polygon test; holes subtract and multi-polygons are a union
pub fn point_in_polygon(point: Point, geometry: &Geometry) -> bool {
    let point = geo::Point::from(point);
    match geometry {
        Geometry::Polygon(polygon) => polygon.contains(&point),
        Geometry::MultiPolygon(polygons) => polygons.contains(&point),
    }
}

fn polygon_is_well_formed(polygon: &Polygon<f64>) -> bool {
    ring_is_well_formed(polygon.exterior()) && polygon.interiors().iter().all(ring_is_well_formed)
}

/// Closed ring: three distinct vertices plus the closing one
fn ring_is_well_formed(ring: &LineString<f64>) -> bool {
    ring.0.len() >= 4 && ring.coords().all(|c| c.x.is_finite() && c.y.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> LineString<f64> {
        LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)])
    }

    #[test]
    fn test_distance_zero_and_symmetric() {
        let almaty = Point::new(76.9286, 43.2567);
        let astana = Point::new(71.4491, 51.1694);

        assert_eq!(distance_km(almaty, almaty), 0.0);
        assert!((distance_km(almaty, astana) - distance_km(astana, almaty)).abs() < 1e-9);
        // Almaty to Astana: ~970 km
        assert!((distance_km(almaty, astana) - 970.0).abs() < 30.0);
    }

    #[test]
    fn test_distance_antipodal_is_finite() {
        let d = distance_km(Point::new(0.0, 0.0), Point::new(180.0, 0.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_centroid_is_vertex_mean() {
        // Closing vertex is counted
        assert_eq!(centroid(&square(0.0, 2.0)), Some(Point::new(0.8, 0.8)));

        // Polygon::new closes an open ring, so the result matches the closed form
        let open = Polygon::new(LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]), vec![]);
        assert_eq!(Geometry::Polygon(open).centroid(), Some(Point::new(0.8, 0.8)));

        assert_eq!(centroid(&LineString::new(vec![])), None);
    }

    #[test]
    fn test_multipolygon_has_no_centroid() {
        let geometry = Geometry::MultiPolygon(MultiPolygon::new(vec![Polygon::new(square(0.0, 1.0), vec![])]));
        assert_eq!(geometry.centroid(), None);
    }

    #[test]
    fn test_point_in_polygon_with_hole() {
        let geometry = Geometry::Polygon(Polygon::new(square(0.0, 10.0), vec![square(4.0, 6.0)]));

        assert!(point_in_polygon(Point::new(2.0, 2.0), &geometry));
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &geometry));
        assert!(!point_in_polygon(Point::new(11.0, 5.0), &geometry));
    }

    #[test]
    fn test_point_in_multipolygon() {
        let geometry = Geometry::MultiPolygon(MultiPolygon::new(vec![
            Polygon::new(square(0.0, 1.0), vec![]),
            Polygon::new(square(5.0, 6.0), vec![]),
        ]));

        assert!(point_in_polygon(Point::new(0.5, 0.5), &geometry));
        assert!(point_in_polygon(Point::new(5.5, 5.5), &geometry));
        assert!(!point_in_polygon(Point::new(3.0, 3.0), &geometry));
    }

    #[test]
    fn test_well_formed() {
        let good = Geometry::Polygon(Polygon::new(square(0.0, 1.0), vec![]));
        assert!(good.is_well_formed());

        let degenerate = Geometry::Polygon(Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]), vec![]));
        assert!(!degenerate.is_well_formed());

        let nan = Geometry::Polygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (f64::NAN, 1.0), (1.0, 1.0)]),
            vec![],
        ));
        assert!(!nan.is_well_formed());

        assert!(!Geometry::MultiPolygon(MultiPolygon::new(vec![])).is_well_formed());
    }
}
