//! WebAssembly module framing: header validation and section walking.
//!
//! A module is a 4-byte magic (`\0asm`), a 4-byte little-endian version,
//! and a sequence of sections, each framed as a 1-byte id, an unsigned
//! LEB128 payload length, and that many payload bytes. This module only
//! understands the framing; section payloads stay opaque here.
//!
//! Custom sections (id 0) are skipped during parsing and never restored,
//! so modules carrying name or debug sections do not round-trip. This is
//! a deliberate, documented limitation of the splitting scheme.

pub mod varint;

use crate::error::{Error, Result};
use tracing::{debug, trace};

pub use varint::{decode_signed, decode_unsigned, encode_signed, encode_unsigned};

/// The 4-byte magic constant at the start of every module (`\0asm`)
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];

/// The only supported module version
pub const WASM_VERSION: u32 = 1;

/// Section id of custom sections, which are dropped during parsing
pub const CUSTOM_SECTION_ID: u8 = 0;

/// Known-kind section ids of the binary format
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SectionId {
    /// Function signatures
    Type = 1,
    /// Imported functions, tables, memories, and globals
    Import = 2,
    /// Type indices of the module's own functions
    Function = 3,
    /// Table definitions
    Table = 4,
    /// Linear memory definitions
    Memory = 5,
    /// Global variable definitions
    Global = 6,
    /// Exported functions, tables, memories, and globals
    Export = 7,
    /// Start function index
    Start = 8,
    /// Element segments
    Element = 9,
    /// Function bodies
    Code = 10,
    /// Data segments
    Data = 11,
    /// Data segment count
    DataCount = 12,
}

impl TryFrom<u8> for SectionId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(SectionId::Type),
            2 => Ok(SectionId::Import),
            3 => Ok(SectionId::Function),
            4 => Ok(SectionId::Table),
            5 => Ok(SectionId::Memory),
            6 => Ok(SectionId::Global),
            7 => Ok(SectionId::Export),
            8 => Ok(SectionId::Start),
            9 => Ok(SectionId::Element),
            10 => Ok(SectionId::Code),
            11 => Ok(SectionId::Data),
            12 => Ok(SectionId::DataCount),
            _ => Err(Error::UnknownSectionId { id: value }),
        }
    }
}

impl SectionId {
    /// Position of this section kind in the format's mandated section
    /// order.
    ///
    /// Ranks mostly follow the ids, with one exception: the DataCount
    /// section (id 12) sits between Element and Code. Sorting by raw id
    /// would misplace it.
    pub fn rank(self) -> u8 {
        match self {
            SectionId::DataCount => 10,
            SectionId::Code => 11,
            SectionId::Data => 12,
            other => other as u8,
        }
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SectionId::Type => "type",
            SectionId::Import => "import",
            SectionId::Function => "function",
            SectionId::Table => "table",
            SectionId::Memory => "memory",
            SectionId::Global => "global",
            SectionId::Export => "export",
            SectionId::Start => "start",
            SectionId::Element => "element",
            SectionId::Code => "code",
            SectionId::Data => "data",
            SectionId::DataCount => "data count",
        };
        f.write_str(name)
    }
}

/// A known-kind section: id plus opaque payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section kind
    pub id: SectionId,
    /// Raw payload bytes, without the id byte or length prefix
    pub payload: Vec<u8>,
}

impl Section {
    /// Creates a new section
    pub fn new(id: SectionId, payload: Vec<u8>) -> Self {
        Self { id, payload }
    }

    /// Appends this section's framing (id byte, varint length, payload)
    /// to the output buffer
    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.id as u8);
        out.extend_from_slice(&encode_unsigned(self.payload.len() as u64));
        out.extend_from_slice(&self.payload);
    }
}

/// A parsed module: version plus ordered known-kind sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Module version, preserved verbatim from the header
    pub version: u32,
    /// Sections in the order they were encountered
    pub sections: Vec<Section>,
}

impl Module {
    /// Parse a binary module.
    ///
    /// Validates the magic and version, then walks the section framing.
    /// Custom sections are skipped; any known-kind id appearing twice is
    /// rejected. The stream must end exactly on a section boundary.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::malformed_header(format!(
                "module is {} bytes, need at least 8 for magic and version",
                data.len()
            )));
        }

        if data[0..4] != WASM_MAGIC {
            return Err(Error::malformed_header(format!(
                "bad magic {:02X?}, expected {:02X?}",
                &data[0..4],
                WASM_MAGIC
            )));
        }

        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != WASM_VERSION {
            return Err(Error::malformed_header(format!(
                "unsupported version {}, expected {}",
                version, WASM_VERSION
            )));
        }

        let mut sections = Vec::new();
        let mut seen = [false; 13];
        let mut pos = 8;

        while pos < data.len() {
            let id_byte = data[pos];
            pos += 1;

            let (length, varint_len) = decode_unsigned(&data[pos..])
                .map_err(|_| Error::malformed_encoding(pos))?;
            pos += varint_len;

            let length = length as usize;
            let available = data.len() - pos;
            if length > available {
                return Err(Error::TruncatedSection {
                    id: id_byte,
                    declared: length,
                    available,
                });
            }

            let payload = data[pos..pos + length].to_vec();
            pos += length;

            if id_byte == CUSTOM_SECTION_ID {
                // Dropped unconditionally; name/debug data does not survive
                trace!("skipping custom section ({} bytes)", length);
                continue;
            }

            let id = SectionId::try_from(id_byte)?;
            if seen[id_byte as usize] {
                return Err(Error::DuplicateSection { id: id_byte });
            }
            seen[id_byte as usize] = true;

            trace!("found {} section ({} bytes)", id, length);
            sections.push(Section::new(id, payload));
        }

        debug!("parsed module: {} sections", sections.len());
        Ok(Module { version, sections })
    }

    /// Serialize the module back into binary form.
    ///
    /// Emits the magic, the version, and each section in stored order,
    /// re-encoding every length as a minimal varint.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_total: usize = self.sections.iter().map(|s| s.payload.len()).sum();
        let mut out = Vec::with_capacity(8 + payload_total + self.sections.len() * 5);

        out.extend_from_slice(&WASM_MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        for section in &self.sections {
            section.write_to(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header() -> Vec<u8> {
        let mut data = WASM_MAGIC.to_vec();
        data.extend_from_slice(&WASM_VERSION.to_le_bytes());
        data
    }

    fn framed(id: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![id];
        out.extend_from_slice(&encode_unsigned(payload.len() as u64));
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_parse_empty_module() {
        let module = Module::parse(&header()).unwrap();
        assert_eq!(module.version, 1);
        assert!(module.sections.is_empty());
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert!(matches!(
            Module::parse(b"\0asm"),
            Err(Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut data = header();
        data[0] = b'x';
        assert!(matches!(
            Module::parse(&data),
            Err(Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_version() {
        let mut data = WASM_MAGIC.to_vec();
        data.extend_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            Module::parse(&data),
            Err(Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_parse_sections_in_order() {
        let mut data = header();
        data.extend_from_slice(&framed(1, &[0x00]));
        data.extend_from_slice(&framed(10, &[0x00]));

        let module = Module::parse(&data).unwrap();
        assert_eq!(module.sections.len(), 2);
        assert_eq!(module.sections[0].id, SectionId::Type);
        assert_eq!(module.sections[1].id, SectionId::Code);
    }

    #[test]
    fn test_parse_drops_custom_sections() {
        let mut data = header();
        data.extend_from_slice(&framed(0, b"name"));
        data.extend_from_slice(&framed(10, &[0x00]));
        data.extend_from_slice(&framed(0, b"debug"));

        let module = Module::parse(&data).unwrap();
        assert_eq!(module.sections.len(), 1);
        assert_eq!(module.sections[0].id, SectionId::Code);
    }

    #[test]
    fn test_parse_truncated_section() {
        let mut data = header();
        // Section id 10, declared length 100, only 3 payload bytes follow
        data.push(10);
        data.push(100);
        data.extend_from_slice(&[1, 2, 3]);

        match Module::parse(&data) {
            Err(Error::TruncatedSection {
                id,
                declared,
                available,
            }) => {
                assert_eq!(id, 10);
                assert_eq!(declared, 100);
                assert_eq!(available, 3);
            }
            other => panic!("expected TruncatedSection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_non_terminating_length() {
        let mut data = header();
        data.push(10);
        data.push(0x80); // continuation bit set, stream ends

        assert!(matches!(
            Module::parse(&data),
            Err(Error::MalformedEncoding { .. })
        ));
    }

    #[test]
    fn test_parse_duplicate_section() {
        let mut data = header();
        data.extend_from_slice(&framed(3, &[0x00]));
        data.extend_from_slice(&framed(3, &[0x00]));

        assert!(matches!(
            Module::parse(&data),
            Err(Error::DuplicateSection { id: 3 })
        ));
    }

    #[test]
    fn test_parse_unknown_section_id() {
        let mut data = header();
        data.extend_from_slice(&framed(13, &[]));

        assert!(matches!(
            Module::parse(&data),
            Err(Error::UnknownSectionId { id: 13 })
        ));
    }

    #[test]
    fn test_round_trip_without_custom_sections() {
        let mut data = header();
        data.extend_from_slice(&framed(1, &[0x01, 0x60, 0x00, 0x00]));
        data.extend_from_slice(&framed(3, &[0x01, 0x00]));
        data.extend_from_slice(&framed(10, &[0x01, 0x02, 0x00, 0x0B]));

        let module = Module::parse(&data).unwrap();
        assert_eq!(module.to_bytes(), data);
    }

    #[test]
    fn test_section_rank_places_data_count_before_code() {
        assert!(SectionId::DataCount.rank() < SectionId::Code.rank());
        assert!(SectionId::Code.rank() < SectionId::Data.rank());
        assert!(SectionId::Element.rank() < SectionId::DataCount.rank());

        // Ranks are distinct across all kinds
        let mut ranks: Vec<u8> = (1..=12)
            .map(|id| SectionId::try_from(id).unwrap().rank())
            .collect();
        ranks.sort_unstable();
        ranks.dedup();
        assert_eq!(ranks.len(), 12);
    }

    #[test]
    fn test_section_id_display() {
        assert_eq!(SectionId::Type.to_string(), "type");
        assert_eq!(SectionId::DataCount.to_string(), "data count");
    }
}
