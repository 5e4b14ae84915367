//! Statement → document projection.
//!
//! Pure apart from the insert timestamp, which is wall-clock at call time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentId, EMPTY_METADATA, FieldHashes, hash32};
use crate::error::SerializeError;
use crate::geometry::{GeoShape, GeometryParser, WktParser};
use crate::statement::{GEO_WKT_LITERAL, Object, Statement, XSD_ANY_URI};

/// How WKT literals are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeoMode {
    /// No geo sub-document is ever written
    Off,
    /// Attach geo when the literal parses; otherwise warn and insert without it
    #[default]
    BestEffort,
    /// Drop the statement when its geometry cannot be parsed
    Mandatory,
}

/// Serializer switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializerOptions {
    /// Attach `*_hash_32` fields for indexed equality lookups
    pub hashed_fields: bool,
    pub geo: GeoMode,
}

/// Turns statements into store documents.
///
/// Cheap to share across worker threads.
#[derive(Clone)]
pub struct Serializer {
    options: SerializerOptions,
    geometry: Arc<dyn GeometryParser>,
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(SerializerOptions::default())
    }
}

impl Serializer {
    /// Serializer using the built-in WKT decoder
    pub fn new(options: SerializerOptions) -> Self {
        Self::with_geometry_parser(options, Arc::new(WktParser))
    }

    pub fn with_geometry_parser(
        options: SerializerOptions,
        geometry: Arc<dyn GeometryParser>,
    ) -> Self {
        Self { options, geometry }
    }

    /// Project one statement onto its document.
    ///
    /// Returns `Err` for statements that must be skipped: an unparseable
    /// geometry in [`GeoMode::Mandatory`], or an object of unexpected shape.
    pub fn serialize(&self, statement: &Statement) -> Result<Document, SerializeError> {
        let context = statement.context_str();
        let (object, object_type) = match &statement.object {
            Object::Iri(iri) => (iri.as_str(), XSD_ANY_URI),
            Object::Literal { lexical, datatype } => {
                if datatype.is_empty() {
                    return Err(SerializeError::InvalidObject {
                        statement: statement.to_string(),
                        message: "literal without datatype".to_string(),
                    });
                }
                (lexical.as_str(), datatype.as_str())
            }
        };

        let id = DocumentId::for_content(&statement.subject, &statement.predicate, object, context);

        let hashes = self.options.hashed_fields.then(|| FieldHashes {
            subject: hash32(&statement.subject),
            predicate: hash32(&statement.predicate),
            object: hash32(object),
        });

        let geo = if self.options.geo != GeoMode::Off && object_type == GEO_WKT_LITERAL {
            self.geo_shape(statement, object)?
        } else {
            None
        };

        Ok(Document {
            id,
            subject: statement.subject.clone(),
            predicate: statement.predicate.clone(),
            object: object.to_string(),
            object_type: object_type.to_string(),
            context: context.to_string(),
            statement_metadata: EMPTY_METADATA.to_string(),
            document_visibility: Vec::new(),
            insert_timestamp: chrono::Utc::now().timestamp_millis(),
            hashes,
            geo,
        })
    }

    fn geo_shape(
        &self,
        statement: &Statement,
        wkt: &str,
    ) -> Result<Option<GeoShape>, SerializeError> {
        let parsed = self
            .geometry
            .parse(wkt)
            .and_then(|geom| GeoShape::from_geometry(&geom));
        match parsed {
            Ok(shape) => Ok(Some(shape)),
            Err(e) if self.options.geo == GeoMode::Mandatory => Err(SerializeError::Geometry {
                statement: statement.to_string(),
                message: e.to_string(),
            }),
            Err(e) => {
                log::warn!("Failed to parse geo statement {statement}: {e}; inserting without location");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryError;
    use crate::statement::XSD_STRING;

    fn wkt(text: &str) -> Statement {
        Statement::new(
            "urn:feature:1",
            "http://www.opengis.net/ont/geosparql#asWKT",
            Object::literal(text, GEO_WKT_LITERAL),
        )
    }

    fn with_geo(geo: GeoMode) -> Serializer {
        Serializer::new(SerializerOptions {
            hashed_fields: false,
            geo,
        })
    }

    #[test]
    fn iri_object_is_any_uri() {
        let st = Statement::new("urn:s", "urn:p", Object::iri("urn:o"));
        let doc = Serializer::default().serialize(&st).unwrap();
        assert_eq!(doc.object, "urn:o");
        assert_eq!(doc.object_type, XSD_ANY_URI);
        assert_eq!(doc.context, "");
    }

    #[test]
    fn literal_keeps_datatype() {
        let st = Statement::new("s:a", "p:b", Object::string("hello")).in_graph("urn:g");
        let doc = Serializer::default().serialize(&st).unwrap();
        assert_eq!(doc.object, "hello");
        assert_eq!(doc.object_type, XSD_STRING);
        assert_eq!(doc.context, "urn:g");
        assert_eq!(doc.statement_metadata, "");
        assert!(doc.document_visibility.is_empty());
        assert!(doc.hashes.is_none());
        assert!(doc.geo.is_none());
    }

    #[test]
    fn id_is_deterministic() {
        let st = Statement::new("s:a", "p:b", Object::string("hello"));
        let ser = Serializer::default();
        let a = ser.serialize(&st).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = ser.serialize(&st).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, DocumentId::for_content("s:a", "p:b", "hello", ""));
    }

    #[test]
    fn context_changes_id() {
        let ser = Serializer::default();
        let st = Statement::new("s:a", "p:b", Object::string("hello"));
        let a = ser.serialize(&st).unwrap();
        let b = ser.serialize(&st.clone().in_graph("urn:g")).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn hashed_fields() {
        let ser = Serializer::new(SerializerOptions {
            hashed_fields: true,
            geo: GeoMode::Off,
        });
        let doc = ser
            .serialize(&Statement::new("s:a", "p:b", Object::iri("o:c")))
            .unwrap();
        let hashes = doc.hashes.unwrap();
        assert_eq!(hashes.subject, hash32("s:a"));
        assert_eq!(hashes.predicate, hash32("p:b"));
        assert_eq!(hashes.object, hash32("o:c"));
    }

    #[test]
    fn point_geo() {
        let doc = with_geo(GeoMode::BestEffort)
            .serialize(&wkt("POINT (10 20)"))
            .unwrap();
        assert_eq!(doc.geo, Some(GeoShape::Point([10.0, 20.0])));
    }

    #[test]
    fn polygon_geo_rings() {
        let doc = with_geo(GeoMode::Mandatory)
            .serialize(&wkt(
                "POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 2 1, 2 2, 1 1))",
            ))
            .unwrap();
        let Some(GeoShape::Polygon(rings)) = doc.geo else {
            panic!("expected polygon");
        };
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[1].len(), 4);
    }

    #[test]
    fn line_geo() {
        let doc = with_geo(GeoMode::BestEffort)
            .serialize(&wkt("LINESTRING (0 0, 1 1)"))
            .unwrap();
        assert_eq!(doc.geo.map(|g| g.kind()), Some("LineString"));
    }

    #[test]
    fn geo_off_skips_parsing() {
        let doc = with_geo(GeoMode::Off).serialize(&wkt("garbage")).unwrap();
        assert!(doc.geo.is_none());
    }

    #[test]
    fn best_effort_keeps_document() {
        let doc = with_geo(GeoMode::BestEffort)
            .serialize(&wkt("POINT (10"))
            .unwrap();
        assert!(doc.geo.is_none());
        assert_eq!(doc.object, "POINT (10");
    }

    #[test]
    fn mandatory_drops_statement() {
        let err = with_geo(GeoMode::Mandatory)
            .serialize(&wkt("POINT (10"))
            .unwrap_err();
        assert!(matches!(err, SerializeError::Geometry { .. }));
    }

    #[test]
    fn non_wkt_literal_ignores_geo() {
        let st = Statement::new("s", "p", Object::string("POINT (1 2)"));
        let doc = with_geo(GeoMode::Mandatory).serialize(&st).unwrap();
        assert!(doc.geo.is_none());
    }

    #[test]
    fn empty_datatype_is_invalid() {
        let st = Statement::new("s", "p", Object::literal("x", ""));
        let err = Serializer::default().serialize(&st).unwrap_err();
        assert!(matches!(err, SerializeError::InvalidObject { .. }));
    }

    struct AlwaysOrigin;

    impl GeometryParser for AlwaysOrigin {
        fn parse(&self, _text: &str) -> Result<geo_types::Geometry<f64>, GeometryError> {
            Ok(geo_types::Geometry::Point(geo_types::Point::new(0.0, 0.0)))
        }
    }

    #[test]
    fn pluggable_geometry_parser() {
        let ser = Serializer::with_geometry_parser(
            SerializerOptions {
                hashed_fields: false,
                geo: GeoMode::Mandatory,
            },
            Arc::new(AlwaysOrigin),
        );
        let doc = ser.serialize(&wkt("anything")).unwrap();
        assert_eq!(doc.geo, Some(GeoShape::Point([0.0, 0.0])));
    }
}
