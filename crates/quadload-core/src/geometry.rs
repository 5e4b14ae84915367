//! Geo sub-document derived from WKT literals.
//!
//! Decoding WKT is a pluggable capability ([`GeometryParser`]); the default
//! [`WktParser`] goes through the `wkt` crate into `geo-types`. The shape
//! written to the store only needs coordinate rings and points, so any
//! decoder producing a `geo_types::Geometry` fits.

use std::str::FromStr;

use geo_types::{Coord, Geometry, Polygon};
use serde::{Deserialize, Serialize};

/// `[x, y]` pair as persisted
pub type Position = [f64; 2];

/// Geo sub-document stored under the `location` key.
///
/// Serializes as `{"type": "Point", "coordinates": [x, y]}` and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeoShape {
    Point(Position),
    LineString(Vec<Position>),
    /// Exterior ring first, then interior rings in source order
    Polygon(Vec<Vec<Position>>),
}

impl GeoShape {
    /// Project a decoded geometry onto the persisted shape.
    ///
    /// Polygons keep their rings. Anything else collapses to its ordered
    /// coordinate sequence: a single coordinate becomes a point, more become
    /// a line string. Geometries without coordinates are rejected.
    pub fn from_geometry(geom: &Geometry<f64>) -> Result<Self, GeometryError> {
        if let Geometry::Polygon(poly) = geom {
            return polygon_shape(poly);
        }
        let mut coords = Vec::new();
        collect_coords(geom, &mut coords);
        match coords.as_slice() {
            [] => Err(GeometryError::new("geometry has no coordinates")),
            [single] => Ok(Self::Point(*single)),
            _ => Ok(Self::LineString(coords)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::Polygon(_) => "Polygon",
        }
    }
}

/// Decoder failure for a geometry literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryError(String);

impl GeometryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for GeometryError {}

/// Capability: decode geometry literal text into coordinates
pub trait GeometryParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Geometry<f64>, GeometryError>;
}

/// Default WKT decoder backed by the `wkt` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct WktParser;

impl GeometryParser for WktParser {
    fn parse(&self, text: &str) -> Result<Geometry<f64>, GeometryError> {
        wkt::Wkt::<f64>::from_str(text)
            .map_err(|e| GeometryError::new(format!("{e:?}")))
            .and_then(|w| {
                w.try_into()
                    .map_err(|e: wkt::conversion::Error| GeometryError::new(format!("{e:?}")))
            })
    }
}

fn position(c: &Coord<f64>) -> Position {
    [c.x, c.y]
}

fn polygon_shape(poly: &Polygon<f64>) -> Result<GeoShape, GeometryError> {
    let exterior: Vec<Position> = poly.exterior().coords().map(position).collect();
    if exterior.is_empty() {
        return Err(GeometryError::new("polygon has no exterior ring"));
    }
    let mut rings = Vec::with_capacity(1 + poly.interiors().len());
    rings.push(exterior);
    for hole in poly.interiors() {
        rings.push(hole.coords().map(position).collect());
    }
    Ok(GeoShape::Polygon(rings))
}

fn collect_polygon(poly: &Polygon<f64>, out: &mut Vec<Position>) {
    out.extend(poly.exterior().coords().map(position));
    for hole in poly.interiors() {
        out.extend(hole.coords().map(position));
    }
}

fn collect_coords(geom: &Geometry<f64>, out: &mut Vec<Position>) {
    match geom {
        Geometry::Point(p) => out.push(position(&p.0)),
        Geometry::Line(l) => {
            out.push(position(&l.start));
            out.push(position(&l.end));
        }
        Geometry::LineString(ls) => out.extend(ls.coords().map(position)),
        Geometry::Polygon(poly) => collect_polygon(poly, out),
        Geometry::MultiPoint(mp) => out.extend(mp.iter().map(|p| position(&p.0))),
        Geometry::MultiLineString(mls) => {
            for ls in mls {
                out.extend(ls.coords().map(position));
            }
        }
        Geometry::MultiPolygon(mpoly) => {
            for poly in mpoly {
                collect_polygon(poly, out);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                collect_coords(g, out);
            }
        }
        Geometry::Rect(r) => collect_polygon(&r.to_polygon(), out),
        Geometry::Triangle(t) => collect_polygon(&t.to_polygon(), out),
    }
}
