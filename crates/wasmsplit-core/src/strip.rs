//! Splitting a module into a stripped core and a metadata document.
//!
//! Two policies exist. Normal mode moves the Type, Import, and Export
//! sections into metadata (structurally decoded) and keeps everything
//! else in the core. Aggressive mode keeps only the Code section and
//! moves every other known section out, structurally where the codec
//! supports it and as a raw base64 capture otherwise. An aggressive
//! core is still well-formed module framing, but it is not expected to
//! be independently executable.

use crate::error::Result;
use crate::metadata::MetadataDocument;
use crate::module::{Module, Section, SectionId};
use crate::sections::{
    decode_export_section, decode_import_section, decode_type_section, encode_export_section,
    encode_import_section, encode_type_section,
};
use std::path::Path;
use tracing::{debug, warn};

/// Section removal policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripMode {
    /// Move Type, Import, and Export to metadata; keep the rest
    Normal,
    /// Keep only the Code section; move everything else to metadata
    Aggressive,
}

impl StripMode {
    /// Whether a section of the given kind stays in the stripped core
    pub fn retains(self, id: SectionId) -> bool {
        match self {
            StripMode::Normal => !matches!(
                id,
                SectionId::Type | SectionId::Import | SectionId::Export
            ),
            StripMode::Aggressive => id == SectionId::Code,
        }
    }
}

impl std::fmt::Display for StripMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StripMode::Normal => f.write_str("normal"),
            StripMode::Aggressive => f.write_str("aggressive"),
        }
    }
}

/// Splits a binary module into a stripped core and a metadata document.
///
/// The input is parsed, sections are partitioned by the mode's policy,
/// and the retained sections are re-serialized as a well-formed module
/// in the format's section order. The operation is pure: same inputs,
/// same two outputs, no side effects.
pub fn strip(data: &[u8], mode: StripMode) -> Result<(Vec<u8>, MetadataDocument)> {
    let module = Module::parse(data)?;
    debug!(
        "stripping {} sections in {} mode",
        module.sections.len(),
        mode
    );

    let mut retained = Vec::new();
    let mut doc = MetadataDocument::new();

    for section in module.sections {
        if mode.retains(section.id) {
            debug!("retaining {} section in core", section.id);
            retained.push(section);
            continue;
        }

        match section.id {
            SectionId::Type | SectionId::Import | SectionId::Export => {
                capture_structured(&mut doc, section);
            }
            _ => {
                debug!("capturing {} section as raw bytes", section.id);
                doc.insert_raw(section.id as u8, &section.payload);
            }
        }
    }

    // Known-kind ids are unique, so rank order is total; for input
    // following the format's ordering rule this equals the original
    // relative order, DataCount included
    retained.sort_by_key(|s| s.id.rank());

    let core = Module {
        version: module.version,
        sections: retained,
    }
    .to_bytes();

    debug!(
        "stripped core is {} bytes with {} metadata entries",
        core.len(),
        doc.sections.len()
    );
    Ok((core, doc))
}

/// Attempts a structured capture, verifying the codec reproduces the
/// original payload byte for byte. Any decode failure or re-encode
/// mismatch falls back to a raw capture: a raw blob is always lossless,
/// a lossy structured decode never is.
fn capture_structured(doc: &mut MetadataDocument, section: Section) {
    let round_trip = match section.id {
        SectionId::Type => decode_type_section(&section.payload).map(|entries| {
            let encoded = encode_type_section(&entries);
            doc.sections.types = Some(entries);
            encoded
        }),
        SectionId::Import => decode_import_section(&section.payload).map(|entries| {
            let encoded = encode_import_section(&entries);
            doc.sections.imports = Some(entries);
            encoded
        }),
        SectionId::Export => decode_export_section(&section.payload).map(|entries| {
            let encoded = encode_export_section(&entries);
            doc.sections.exports = Some(entries);
            encoded
        }),
        _ => unreachable!("only structured section kinds reach here"),
    };

    match round_trip {
        Ok(encoded) if encoded == section.payload => {
            debug!("captured {} section structurally", section.id);
        }
        Ok(_) => {
            warn!(
                "{} section does not re-encode to its original bytes, keeping raw capture",
                section.id
            );
            clear_structured(doc, section.id);
            doc.insert_raw(section.id as u8, &section.payload);
        }
        Err(e) => {
            warn!(
                "{} section not structurally decodable ({}), keeping raw capture",
                section.id, e
            );
            doc.insert_raw(section.id as u8, &section.payload);
        }
    }
}

fn clear_structured(doc: &mut MetadataDocument, id: SectionId) {
    match id {
        SectionId::Type => doc.sections.types = None,
        SectionId::Import => doc.sections.imports = None,
        SectionId::Export => doc.sections.exports = None,
        _ => {}
    }
}

/// Strips a module read from a file.
///
/// Convenience wrapper over [`strip`] for callers that work with paths.
pub fn strip_file(
    path: impl AsRef<Path>,
    mode: StripMode,
) -> Result<(Vec<u8>, MetadataDocument)> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| crate::error::Error::file_read(path, e))?;
    strip(&data, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{encode_unsigned, WASM_MAGIC, WASM_VERSION};
    use pretty_assertions::assert_eq;

    fn build_module(sections: &[(u8, &[u8])]) -> Vec<u8> {
        let mut data = WASM_MAGIC.to_vec();
        data.extend_from_slice(&WASM_VERSION.to_le_bytes());
        for (id, payload) in sections {
            data.push(*id);
            data.extend_from_slice(&encode_unsigned(payload.len() as u64));
            data.extend_from_slice(payload);
        }
        data
    }

    /// Header, one empty-signature Type section, one empty Code section
    fn minimal_module() -> Vec<u8> {
        build_module(&[(1, &[0x01, 0x60, 0x00, 0x00]), (10, &[0x00])])
    }

    #[test]
    fn test_normal_mode_moves_type_to_metadata() {
        let input = minimal_module();
        let (core, doc) = strip(&input, StripMode::Normal).unwrap();

        // Core holds only the Code section
        assert_eq!(core, build_module(&[(10, &[0x00])]));

        let types = doc.sections.types.as_ref().unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].form, 0x60);
        assert!(doc.sections.raw.is_empty());
    }

    #[test]
    fn test_aggressive_mode_on_minimal_module() {
        let input = minimal_module();
        let (core, doc) = strip(&input, StripMode::Aggressive).unwrap();

        // Code was the only retained section either way, so the cores match
        let (normal_core, _) = strip(&input, StripMode::Normal).unwrap();
        assert_eq!(core, normal_core);
        assert_eq!(doc.sections.types.as_ref().unwrap().len(), 1);
        assert!(doc.sections.raw.is_empty());
    }

    #[test]
    fn test_aggressive_mode_raw_captures() {
        let input = build_module(&[
            (3, &[0x01, 0x00]),
            (5, &[0x01, 0x00, 0x01]),
            (10, &[0x00]),
            (11, &[0x00]),
        ]);
        let (core, doc) = strip(&input, StripMode::Aggressive).unwrap();

        assert_eq!(core, build_module(&[(10, &[0x00])]));
        assert_eq!(doc.sections.raw.len(), 3);
        assert!(doc.sections.raw.contains_key("section_3"));
        assert!(doc.sections.raw.contains_key("section_5"));
        assert!(doc.sections.raw.contains_key("section_11"));
    }

    #[test]
    fn test_core_keeps_data_count_before_code() {
        let input = build_module(&[
            (12, &[0x01]),
            (10, &[0x01, 0x02, 0x00, 0x0B]),
            (11, &[0x01, 0x01, 0x00]),
        ]);

        let (core, doc) = strip(&input, StripMode::Normal).unwrap();
        // All three sections are retained, in their original order
        assert_eq!(core, input);
        assert!(doc.sections.is_empty());
    }

    #[test]
    fn test_mode_monotonicity() {
        // Aggressive-mode retained sections are a subset of normal mode's
        let input = build_module(&[
            (1, &[0x01, 0x60, 0x00, 0x00]),
            (3, &[0x01, 0x00]),
            (7, &[0x00]),
            (10, &[0x00]),
        ]);

        let (normal_core, _) = strip(&input, StripMode::Normal).unwrap();
        let (aggressive_core, _) = strip(&input, StripMode::Aggressive).unwrap();

        let normal_ids: Vec<u8> = Module::parse(&normal_core)
            .unwrap()
            .sections
            .iter()
            .map(|s| s.id as u8)
            .collect();
        let aggressive_ids: Vec<u8> = Module::parse(&aggressive_core)
            .unwrap()
            .sections
            .iter()
            .map(|s| s.id as u8)
            .collect();

        assert!(aggressive_ids.iter().all(|id| normal_ids.contains(id)));
    }

    #[test]
    fn test_undecodable_export_falls_back_to_raw() {
        // Export payload with an invalid kind tag
        let bad_export = [0x01, 0x01, b'x', 0x09, 0x00];
        let input = build_module(&[(7, &bad_export), (10, &[0x00])]);

        let (_, doc) = strip(&input, StripMode::Normal).unwrap();
        assert!(doc.sections.exports.is_none());
        let raw = doc.sections.raw.get("section_7").unwrap();
        assert_eq!(raw.payload().unwrap(), bad_export);
    }

    #[test]
    fn test_strip_is_pure() {
        let input = minimal_module();
        let first = strip(&input, StripMode::Normal).unwrap();
        let second = strip(&input, StripMode::Normal).unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_strip_propagates_parse_errors() {
        assert!(strip(b"not a module", StripMode::Normal).is_err());
    }

    #[test]
    fn test_retention_policy() {
        assert!(!StripMode::Normal.retains(SectionId::Type));
        assert!(!StripMode::Normal.retains(SectionId::Import));
        assert!(!StripMode::Normal.retains(SectionId::Export));
        assert!(StripMode::Normal.retains(SectionId::Code));
        assert!(StripMode::Normal.retains(SectionId::Data));
        assert!(StripMode::Normal.retains(SectionId::DataCount));

        assert!(StripMode::Aggressive.retains(SectionId::Code));
        assert!(!StripMode::Aggressive.retains(SectionId::Data));
        assert!(!StripMode::Aggressive.retains(SectionId::Function));
    }

    #[test]
    fn test_strip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("module.wasm");
        std::fs::write(&path, minimal_module()).unwrap();

        let (core, doc) = strip_file(&path, StripMode::Normal).unwrap();
        assert_eq!(core, build_module(&[(10, &[0x00])]));
        assert!(doc.sections.types.is_some());

        assert!(strip_file(dir.path().join("missing.wasm"), StripMode::Normal).is_err());
    }
}
