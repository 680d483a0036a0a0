//! The metadata document: everything removed from the stripped core.
//!
//! Serialized as JSON with a top-level `version` (the schema version of
//! the document itself, not the module's version field) and a `sections`
//! mapping. The three structured kinds live under the keys `type`,
//! `import`, and `export` as record lists; every other captured section
//! lives under a `section_<id>` key as `{ "id": <int>, "data": "<base64>" }`.
//!
//! Documents are created whole by the stripper and consumed whole by the
//! reassembler; nothing mutates one in place.

use crate::error::{Error, Result};
use crate::sections::{ExportEntry, ImportEntry, TypeEntry};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version of the metadata document format
pub const METADATA_VERSION: u32 = 1;

/// An opaque section preserved as a base64 byte blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSection {
    /// Section id of the captured payload
    pub id: u8,
    /// Base64-encoded payload bytes
    pub data: String,
}

impl RawSection {
    /// Captures a section payload as base64
    pub fn from_payload(id: u8, payload: &[u8]) -> Self {
        Self {
            id,
            data: BASE64.encode(payload),
        }
    }

    /// Decodes the captured payload back into bytes
    pub fn payload(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(&self.data)?)
    }
}

/// The per-section entries of a metadata document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSections {
    /// Type section records, under the `type` key
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<TypeEntry>>,

    /// Import section records, under the `import` key
    #[serde(rename = "import", default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<ImportEntry>>,

    /// Export section records, under the `export` key
    #[serde(rename = "export", default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<ExportEntry>>,

    /// Raw captures, keyed `section_<id>`
    #[serde(flatten)]
    pub raw: BTreeMap<String, RawSection>,
}

impl MetadataSections {
    /// Returns true if no section entries are present
    pub fn is_empty(&self) -> bool {
        self.types.is_none()
            && self.imports.is_none()
            && self.exports.is_none()
            && self.raw.is_empty()
    }

    /// Number of section entries
    pub fn len(&self) -> usize {
        usize::from(self.types.is_some())
            + usize::from(self.imports.is_some())
            + usize::from(self.exports.is_some())
            + self.raw.len()
    }
}

/// The companion artifact holding everything stripped out of the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Document schema version; always [`METADATA_VERSION`]
    pub version: u32,
    /// Captured sections
    pub sections: MetadataSections,
}

impl Default for MetadataDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataDocument {
    /// Creates an empty document with the current schema version
    pub fn new() -> Self {
        Self {
            version: METADATA_VERSION,
            sections: MetadataSections::default(),
        }
    }

    /// Adds a raw capture under its `section_<id>` key
    pub fn insert_raw(&mut self, id: u8, payload: &[u8]) {
        self.sections
            .raw
            .insert(format!("section_{}", id), RawSection::from_payload(id, payload));
    }

    /// Serializes the document to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes and validates a document from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: MetadataDocument = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Validates the document against the schema rules.
    ///
    /// Checks the schema version, that every raw capture key matches its
    /// embedded id, that ids are in the valid section range, and that
    /// base64 payloads decode cleanly. Called by [`Self::from_json`] and
    /// again by the reassembler, since documents can also be built
    /// programmatically.
    pub fn validate(&self) -> Result<()> {
        if self.version != METADATA_VERSION {
            return Err(Error::malformed_metadata(format!(
                "unsupported document version {}, expected {}",
                self.version, METADATA_VERSION
            )));
        }

        for (key, raw) in &self.sections.raw {
            let expected_key = format!("section_{}", raw.id);
            if *key != expected_key {
                return Err(Error::malformed_metadata(format!(
                    "key '{}' does not match its section id {}",
                    key, raw.id
                )));
            }
            if !(1..=12).contains(&raw.id) {
                return Err(Error::malformed_metadata(format!(
                    "section id {} out of range 1..=12",
                    raw.id
                )));
            }
            raw.payload()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::TypeEntry;
    use pretty_assertions::assert_eq;

    fn sample_document() -> MetadataDocument {
        let mut doc = MetadataDocument::new();
        doc.sections.types = Some(vec![TypeEntry {
            form: 0x60,
            params: vec![-1],
            returns: vec![],
        }]);
        doc.insert_raw(11, &[0x01, 0x02, 0x03]);
        doc
    }

    #[test]
    fn test_json_round_trip() {
        let doc = sample_document();
        let json = doc.to_json().unwrap();
        let restored = MetadataDocument::from_json(&json).unwrap();
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_json_key_layout() {
        let doc = sample_document();
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value["sections"]["type"].is_array());
        assert_eq!(value["sections"]["section_11"]["id"], 11);
        assert_eq!(value["sections"]["section_11"]["data"], "AQID");
        // Absent structured kinds are omitted entirely
        assert!(value["sections"].get("import").is_none());
    }

    #[test]
    fn test_missing_version_rejected() {
        let err = MetadataDocument::from_json(r#"{"sections": {}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedMetadata { .. }));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let err = MetadataDocument::from_json(r#"{"version": 2, "sections": {}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedMetadata { .. }));
    }

    #[test]
    fn test_empty_sections_accepted() {
        let doc = MetadataDocument::from_json(r#"{"version": 1, "sections": {}}"#).unwrap();
        assert!(doc.sections.is_empty());
        assert_eq!(doc.sections.len(), 0);
    }

    #[test]
    fn test_mismatched_raw_key_rejected() {
        let text = r#"{
            "version": 1,
            "sections": { "section_5": { "id": 6, "data": "" } }
        }"#;
        assert!(matches!(
            MetadataDocument::from_json(text),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_out_of_range_id_rejected() {
        let text = r#"{
            "version": 1,
            "sections": { "section_13": { "id": 13, "data": "" } }
        }"#;
        assert!(matches!(
            MetadataDocument::from_json(text),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let text = r#"{
            "version": 1,
            "sections": { "section_11": { "id": 11, "data": "not base64!!" } }
        }"#;
        assert!(matches!(
            MetadataDocument::from_json(text),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_malformed_structured_records_rejected() {
        // An export record with a bogus kind string fails schema validation
        let text = r#"{
            "version": 1,
            "sections": { "export": [{ "field": "f", "kind": "widget", "index": 0 }] }
        }"#;
        assert!(matches!(
            MetadataDocument::from_json(text),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_raw_section_payload_round_trip() {
        let raw = RawSection::from_payload(3, &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(raw.payload().unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
