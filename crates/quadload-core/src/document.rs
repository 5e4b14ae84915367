//! Persisted document layout and content-hash identifiers

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::geometry::GeoShape;

/// Placeholder for statement-level metadata (reserved)
pub const EMPTY_METADATA: &str = "";

/// SHA-256 of a UTF-8 string.
pub fn hash256(s: &str) -> [u8; 32] {
    Sha256::digest(s.as_bytes()).into()
}

/// First 4 bytes of [`hash256`], for indexed equality lookups.
pub fn hash32(s: &str) -> ShortHash {
    let full = hash256(s);
    ShortHash([full[0], full[1], full[2], full[3]])
}

macro_rules! hex_bytes {
    ($name:ident, $len:expr) => {
        impl $name {
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Option<Self> {
                let mut buf = [0u8; $len];
                hex::decode_to_slice(s, &mut buf).ok()?;
                Some(Self(buf))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        // Hex in human-readable formats (JSON), raw bytes otherwise
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                use serde::de::Error;
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    Self::from_hex(&s)
                        .ok_or_else(|| D::Error::custom(format!("invalid hex digest: {s}")))
                } else {
                    let bytes = Vec::<u8>::deserialize(deserializer)?;
                    let arr: [u8; $len] = bytes
                        .try_into()
                        .map_err(|_| D::Error::custom("invalid digest length"))?;
                    Ok(Self(arr))
                }
            }
        }
    };
}

/// 32-byte document identifier: SHA-256 over the statement content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId([u8; 32]);

hex_bytes!(DocumentId, 32);

impl DocumentId {
    /// Identifier of `subject predicate object context`, space separated.
    ///
    /// Stable across runs and implementations; the timestamp never
    /// participates.
    pub fn for_content(subject: &str, predicate: &str, object: &str, context: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(subject.as_bytes());
        hasher.update(b" ");
        hasher.update(predicate.as_bytes());
        hasher.update(b" ");
        hasher.update(object.as_bytes());
        hasher.update(b" ");
        hasher.update(context.as_bytes());
        Self(hasher.finalize().into())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// 4-byte field hash (`*_hash_32` fields)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortHash([u8; 4]);

hex_bytes!(ShortHash, 4);

/// Hashed copies of the statement fields, present in hashed-field mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldHashes {
    #[serde(rename = "subject_hash_32")]
    pub subject: ShortHash,
    #[serde(rename = "predicate_hash_32")]
    pub predicate: ShortHash,
    #[serde(rename = "object_hash_32")]
    pub object: ShortHash,
}

/// Persisted projection of a statement.
///
/// Field names are the store schema and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(rename = "objectType")]
    pub object_type: String,
    pub context: String,
    #[serde(rename = "statementMetadata")]
    pub statement_metadata: String,
    #[serde(rename = "documentVisibility")]
    pub document_visibility: Vec<String>,
    /// Milliseconds since the Unix epoch
    #[serde(rename = "insertTimestamp")]
    pub insert_timestamp: i64,
    #[serde(flatten)]
    pub hashes: Option<FieldHashes>,
    #[serde(rename = "location", skip_serializing_if = "Option::is_none", default)]
    pub geo: Option<GeoShape>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_matches_joined_string_hash() {
        let id = DocumentId::for_content("s:a", "p:b", "hello", "");
        assert_eq!(id.as_bytes(), &hash256("s:a p:b hello "));
    }

    #[test]
    fn id_known_vector() {
        let id = DocumentId::for_content("a", "b", "c", "d");
        assert_eq!(
            id.to_hex(),
            "f82ce1b653e30b1ceb5711bbf75965dd24513011d7daa48bbd8610550154a1fd"
        );
        let id = DocumentId::for_content("s:a", "p:b", "hello", "");
        assert_eq!(
            id.to_hex(),
            "39a497861571f9535905fa6e6fac9018b54247da5de806e1edc53af14ef830da"
        );
    }

    #[test]
    fn id_separator_matters() {
        let a = DocumentId::for_content("ab", "c", "d", "");
        let b = DocumentId::for_content("a", "bc", "d", "");
        assert_ne!(a, b);
    }

    #[test]
    fn hash32_is_prefix() {
        let full = hash256("urn:x");
        assert_eq!(hash32("urn:x").as_bytes(), &full[..4]);
    }

    #[test]
    fn hex_round_trip() {
        let id = DocumentId::for_content("s", "p", "o", "g");
        assert_eq!(DocumentId::from_hex(&id.to_hex()), Some(id));
        assert_eq!(DocumentId::from_hex("zz"), None);
    }

    #[test]
    fn json_field_layout() {
        let doc = Document {
            id: DocumentId::from_bytes([0xab; 32]),
            subject: "s:a".to_string(),
            predicate: "p:b".to_string(),
            object: "hello".to_string(),
            object_type: crate::statement::XSD_STRING.to_string(),
            context: String::new(),
            statement_metadata: EMPTY_METADATA.to_string(),
            document_visibility: Vec::new(),
            insert_timestamp: 1_700_000_000_000,
            hashes: None,
            geo: None,
        };
        let json = serde_json::to_value(&doc).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "_id",
                "context",
                "documentVisibility",
                "insertTimestamp",
                "object",
                "objectType",
                "predicate",
                "statementMetadata",
                "subject"
            ]
        );
        assert_eq!(obj["_id"], "ab".repeat(32));
        assert_eq!(obj["documentVisibility"], serde_json::json!([]));
    }

    #[test]
    fn json_with_hashes_and_geo() {
        let doc = Document {
            id: DocumentId::from_bytes([1; 32]),
            subject: "s".to_string(),
            predicate: "p".to_string(),
            object: "POINT (1 2)".to_string(),
            object_type: crate::statement::GEO_WKT_LITERAL.to_string(),
            context: String::new(),
            statement_metadata: EMPTY_METADATA.to_string(),
            document_visibility: Vec::new(),
            insert_timestamp: 0,
            hashes: Some(FieldHashes {
                subject: hash32("s"),
                predicate: hash32("p"),
                object: hash32("POINT (1 2)"),
            }),
            geo: Some(GeoShape::Point([1.0, 2.0])),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["subject_hash_32"], hash32("s").to_hex());
        assert_eq!(json["location"]["type"], "Point");

        let back: Document = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }
}
