//! Area geometry decoding from WKT/EWKT text and GeoJSON geometry objects
//!
//! The population grid backend serialises cells as PostGIS EWKT
//! (`SRID=4326;MULTIPOLYGON(((...)))`). Only `POLYGON` and `MULTIPOLYGON` are
//! meaningful for coverage; every other type is rejected.

use crate::geometry::Geometry;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WktError {
    #[error("empty geometry text")]
    Empty,
    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),
    #[error("expected {expected} at offset {offset}")]
    Syntax { offset: usize, expected: &'static str },
    #[error("invalid number {0:?}")]
    BadNumber(String),
    #[error("position needs at least 2 ordinates, got {0}")]
    ShortPosition(usize),
    #[error("invalid GeoJSON geometry: {0}")]
    InvalidGeoJson(String),
}

/// Drop a leading `SRID=<n>;` prefix
pub fn strip_srid(text: &str) -> &str {
    let trimmed = text.trim_start();
    if trimmed.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("SRID=")) {
        if let Some(idx) = trimmed.find(';') {
            return &trimmed[idx + 1..];
        }
    }
    trimmed
}

/// Parse `POLYGON` / `MULTIPOLYGON` WKT, with or without an SRID prefix.
/// Z and M ordinates are accepted and discarded.
pub fn parse_wkt(text: &str) -> Result<Geometry, WktError> {
    let body = strip_srid(text).trim();
    if body.is_empty() {
        return Err(WktError::Empty);
    }

    let keyword_end = body
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(body.len());
    let keyword = body[..keyword_end].to_ascii_uppercase();

    let mut parser = Parser::new(body, keyword_end);
    parser.skip_dimension_tag();
    if parser.eat_keyword("EMPTY") {
        return Err(WktError::Empty);
    }

    let geometry = match keyword.as_str() {
        "POLYGON" => Geometry::Polygon(parser.polygon()?),
        "MULTIPOLYGON" => Geometry::MultiPolygon(MultiPolygon::new(parser.list(Parser::polygon)?)),
        "" => return Err(WktError::Syntax { offset: 0, expected: "geometry keyword" }),
        other => return Err(WktError::UnsupportedType(other.to_string())),
    };

    parser.skip_ws();
    if !parser.at_end() {
        return Err(WktError::Syntax { offset: parser.pos, expected: "end of input" });
    }
    Ok(geometry)
}

/// Convert a GeoJSON `Polygon` / `MultiPolygon` geometry
pub fn from_geojson(geometry: &geojson::Geometry) -> Result<Geometry, WktError> {
    let polygons = match &geometry.value {
        geojson::Value::Polygon(rings) => std::slice::from_ref(rings),
        geojson::Value::MultiPolygon(polygons) => polygons.as_slice(),
        other => return Err(WktError::UnsupportedType(geojson_type_name(other).to_string())),
    };
    // Conversion indexes x and y directly
    if polygons.iter().flatten().flatten().any(|position| position.len() < 2) {
        return Err(WktError::InvalidGeoJson("position with fewer than two coordinates".to_string()));
    }

    let converted: geo::Geometry<f64> = geometry
        .value
        .clone()
        .try_into()
        .map_err(|e: geojson::Error| WktError::InvalidGeoJson(e.to_string()))?;
    match converted {
        geo::Geometry::Polygon(polygon) => Ok(Geometry::Polygon(polygon)),
        geo::Geometry::MultiPolygon(polygons) => Ok(Geometry::MultiPolygon(polygons)),
        _ => Err(WktError::UnsupportedType(geojson_type_name(&geometry.value).to_string())),
    }
}

fn geojson_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, pos: usize) -> Self {
        Self { input, pos }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, ch: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char, expected: &'static str) -> Result<(), WktError> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(WktError::Syntax { offset: self.pos, expected })
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let matched = self
            .rest()
            .get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword));
        if matched {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn skip_dimension_tag(&mut self) {
        if !self.eat_keyword("ZM") && !self.eat_keyword("Z") {
            self.eat_keyword("M");
        }
    }

    /// `( item , item , ... )`
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T, WktError>) -> Result<Vec<T>, WktError> {
        self.expect('(', "'('")?;
        let mut items = vec![item(self)?];
        while self.eat(',') {
            items.push(item(self)?);
        }
        self.expect(')', "')' or ','")?;
        Ok(items)
    }

    fn polygon(&mut self) -> Result<Polygon<f64>, WktError> {
        let mut rings = self.list(Self::ring)?.into_iter();
        let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
        Ok(Polygon::new(exterior, rings.collect()))
    }

    fn ring(&mut self) -> Result<LineString<f64>, WktError> {
        self.list(Self::position).map(LineString::new)
    }

    fn position(&mut self) -> Result<Coord<f64>, WktError> {
        let mut ordinates = Vec::with_capacity(4);
        loop {
            self.skip_ws();
            let rest = self.rest();
            let len = rest
                .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
                .unwrap_or(rest.len());
            if len == 0 {
                break;
            }
            let token = &rest[..len];
            let value: f64 = token
                .parse()
                .map_err(|_| WktError::BadNumber(token.to_string()))?;
            ordinates.push(value);
            self.pos += len;
        }

        match ordinates.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            short => Err(WktError::ShortPosition(short.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_polygon() {
        let geometry = parse_wkt("POLYGON((76.9 43.2, 77.0 43.2, 77.0 43.3, 76.9 43.2))").unwrap();
        match geometry {
            Geometry::Polygon(polygon) => {
                assert_eq!(polygon.exterior().0.len(), 4);
                assert_eq!(polygon.exterior().0[1], Coord { x: 77.0, y: 43.2 });
                assert!(polygon.interiors().is_empty());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_srid_prefix_is_stripped() {
        let plain = parse_wkt("MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)))").unwrap();
        let prefixed = parse_wkt("SRID=4326;MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)))").unwrap();
        assert_eq!(plain, prefixed);
    }

    #[test]
    fn test_parse_multipolygon_with_hole() {
        let text = "MULTIPOLYGON (((0 0, 10 0, 10 10, 0 10, 0 0), (4 4, 6 4, 6 6, 4 6, 4 4)), ((20 20, 21 20, 21 21, 20 20)))";
        let geometry = parse_wkt(text).unwrap();
        let polygons = geometry.polygons();
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert!(geometry.is_well_formed());
    }

    #[test]
    fn test_z_ordinates_are_dropped() {
        let geometry = parse_wkt("polygon z ((0 0 5, 1 0 5, 1 1 5, 0 0 5))").unwrap();
        assert_eq!(geometry.polygons()[0].exterior().0[2], Coord { x: 1.0, y: 1.0 });
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(parse_wkt(""), Err(WktError::Empty));
        assert_eq!(parse_wkt("SRID=4326;"), Err(WktError::Empty));
        assert_eq!(parse_wkt("POLYGON EMPTY"), Err(WktError::Empty));
        assert!(matches!(parse_wkt("POINT(1 2)"), Err(WktError::UnsupportedType(t)) if t == "POINT"));
        assert!(matches!(parse_wkt("POLYGON((0 0, 1 0, 1 1"), Err(WktError::Syntax { .. })));
        assert!(matches!(parse_wkt("POLYGON((0 0, 1 x, 1 1, 0 0))"), Err(WktError::ShortPosition(1))));
        assert!(matches!(parse_wkt("POLYGON((0 0, 1 --1, 1 1, 0 0))"), Err(WktError::BadNumber(_))));
        assert!(matches!(parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 0)) trailing"), Err(WktError::Syntax { .. })));
    }

    #[test]
    fn test_from_geojson() {
        let geometry: geojson::Geometry = serde_json::from_str(
            r#"{"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]}"#,
        )
        .unwrap();
        let converted = from_geojson(&geometry).unwrap();
        assert_eq!(converted, parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 0))").unwrap());

        let point: geojson::Geometry =
            serde_json::from_str(r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#).unwrap();
        assert_eq!(from_geojson(&point), Err(WktError::UnsupportedType("Point".to_string())));

        let short = geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![1.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ]]));
        assert!(matches!(from_geojson(&short), Err(WktError::InvalidGeoJson(_))));
    }

    #[test]
    fn test_from_geojson_multipolygon_with_hole() {
        let geometry: geojson::Geometry = serde_json::from_str(
            r#"{"type": "MultiPolygon", "coordinates": [
                [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]], [[4, 4], [6, 4], [6, 6], [4, 6], [4, 4]]],
                [[[20, 20], [21, 20], [21, 21], [20, 20]]]
            ]}"#,
        )
        .unwrap();
        let converted = from_geojson(&geometry).unwrap();

        assert_eq!(converted.polygons().len(), 2);
        assert_eq!(converted.polygons()[0].interiors().len(), 1);
        assert!(!crate::geometry::point_in_polygon(crate::geometry::Point::new(5.0, 5.0), &converted));
    }
}
