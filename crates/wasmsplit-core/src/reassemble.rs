//! Reconstructing the original binary from a stripped core and its
//! metadata document.
//!
//! The core is parsed for its retained sections, every metadata entry
//! is turned back into a raw section payload, and the merged section
//! list is emitted in the format's section order with minimal varint
//! lengths.
//! For any pair produced by the stripper from a module without custom
//! sections, the output is byte-identical to the original input.

use crate::error::{Error, Result};
use crate::metadata::MetadataDocument;
use crate::module::{Module, Section, SectionId};
use crate::sections::{encode_export_section, encode_import_section, encode_type_section};
use std::path::Path;
use tracing::debug;

/// Merges a stripped core with its metadata document back into the
/// original binary.
///
/// The document is validated before any binary construction; a schema
/// violation aborts with [`Error::MalformedMetadata`] and produces no
/// partial output. A metadata section whose id collides with a section
/// already in the core fails with [`Error::DuplicateSection`].
pub fn reassemble(core: &[u8], metadata: &MetadataDocument) -> Result<Vec<u8>> {
    metadata.validate()?;

    let module = Module::parse(core)?;
    debug!(
        "reassembling {} core sections with {} metadata entries",
        module.sections.len(),
        metadata.sections.len()
    );

    let mut sections = module.sections;

    if let Some(types) = &metadata.sections.types {
        debug!("restoring type section ({} entries)", types.len());
        sections.push(Section::new(SectionId::Type, encode_type_section(types)));
    }
    if let Some(imports) = &metadata.sections.imports {
        debug!("restoring import section ({} entries)", imports.len());
        sections.push(Section::new(
            SectionId::Import,
            encode_import_section(imports),
        ));
    }
    if let Some(exports) = &metadata.sections.exports {
        debug!("restoring export section ({} entries)", exports.len());
        sections.push(Section::new(
            SectionId::Export,
            encode_export_section(exports),
        ));
    }
    for raw in metadata.sections.raw.values() {
        debug!("restoring section {} from raw capture", raw.id);
        // Validation already bounds the id to 1..=12
        let id = SectionId::try_from(raw.id)?;
        sections.push(Section::new(id, raw.payload()?));
    }

    let mut seen = [false; 13];
    for section in &sections {
        let id = section.id as u8;
        if seen[id as usize] {
            return Err(Error::DuplicateSection { id });
        }
        seen[id as usize] = true;
    }

    // The format mandates a fixed section order, with DataCount ranked
    // between Element and Code; ties cannot occur past the duplicate
    // check above
    sections.sort_by_key(|s| s.id.rank());

    let output = Module {
        version: module.version,
        sections,
    }
    .to_bytes();

    debug!("reassembled module is {} bytes", output.len());
    Ok(output)
}

/// Reassembles from a stripped core file and a metadata JSON file.
///
/// Convenience wrapper over [`reassemble`] for callers that work with
/// paths.
pub fn reassemble_file(
    core_path: impl AsRef<Path>,
    metadata_path: impl AsRef<Path>,
) -> Result<Vec<u8>> {
    let core_path = core_path.as_ref();
    let metadata_path = metadata_path.as_ref();

    let core =
        std::fs::read(core_path).map_err(|e| Error::file_read(core_path, e))?;
    let text = std::fs::read_to_string(metadata_path)
        .map_err(|e| Error::file_read(metadata_path, e))?;
    let metadata = MetadataDocument::from_json(&text)?;

    reassemble(&core, &metadata)
}
