//! Structured codecs for the Type, Import, and Export sections.
//!
//! These are the only three section kinds whose payloads get decoded
//! into record lists for the metadata document; everything else stays
//! opaque. Each decoder has an exact inverse encoder: same record
//! order, same minimal varint forms, same tag bytes. The stripper
//! verifies the bijection by re-encoding and comparing, and falls back
//! to a raw byte capture on any mismatch, so a lossy decode can never
//! corrupt the reassembled binary.
//!
//! Record shapes mirror the binary layout one to one and derive serde
//! traits so the metadata codec can embed them directly.

use crate::error::{Error, Result};
use crate::module::varint::{decode_signed, decode_unsigned, encode_signed, encode_unsigned};
use serde::{Deserialize, Serialize};

/// One function signature from the Type section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    /// Form tag byte (0x60 for function types)
    pub form: u8,
    /// Parameter value types, as signed value-type codes
    pub params: Vec<i64>,
    /// Result value types, as signed value-type codes
    pub returns: Vec<i64>,
}

/// Size bounds of a table or memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Initial size
    pub initial: u32,
    /// Optional maximum size; presence maps to flags bit 0 in binary form
    pub max: Option<u32>,
}

/// Kind-tagged import descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImportKind {
    /// Imported function, referencing a Type section entry
    Function {
        /// Index into the Type section
        type_idx: u32,
    },
    /// Imported table
    Table {
        /// Element type, as a signed value-type code
        elem_type: i64,
        /// Table size bounds
        limits: Limits,
    },
    /// Imported linear memory
    Memory {
        /// Memory size bounds, in pages
        limits: Limits,
    },
    /// Imported global
    Global {
        /// Content value type, as a signed value-type code
        content_type: i64,
        /// Mutability flag (0 immutable, 1 mutable)
        mutability: u32,
    },
}

impl ImportKind {
    /// The kind tag byte used in binary form
    fn tag(&self) -> u8 {
        match self {
            ImportKind::Function { .. } => 0,
            ImportKind::Table { .. } => 1,
            ImportKind::Memory { .. } => 2,
            ImportKind::Global { .. } => 3,
        }
    }
}

/// One record from the Import section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEntry {
    /// Module name
    pub module: String,
    /// Field name within the module
    pub field: String,
    /// What is being imported
    #[serde(flatten)]
    pub kind: ImportKind,
}

/// What an export refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalKind {
    /// Function export
    Function,
    /// Table export
    Table,
    /// Memory export
    Memory,
    /// Global export
    Global,
}

impl ExternalKind {
    /// The kind tag byte used in binary form
    fn tag(self) -> u8 {
        match self {
            ExternalKind::Function => 0,
            ExternalKind::Table => 1,
            ExternalKind::Memory => 2,
            ExternalKind::Global => 3,
        }
    }

    fn from_tag(tag: u8) -> std::result::Result<Self, String> {
        match tag {
            0 => Ok(ExternalKind::Function),
            1 => Ok(ExternalKind::Table),
            2 => Ok(ExternalKind::Memory),
            3 => Ok(ExternalKind::Global),
            _ => Err(format!("unknown external kind tag {}", tag)),
        }
    }
}

/// One record from the Export section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    /// Exported name
    pub field: String,
    /// What the export refers to
    pub kind: ExternalKind,
    /// Index into the corresponding index space
    pub index: u32,
}

/// Sequential reader over a section payload.
///
/// Errors are plain strings; the decode entry points wrap them into
/// [`Error::UnsupportedStructuredLayout`].
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn u8(&mut self) -> std::result::Result<u8, String> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| format!("unexpected end of payload at offset {}", self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, n: usize) -> std::result::Result<&'a [u8], String> {
        if self.data.len() - self.pos < n {
            return Err(format!(
                "unexpected end of payload at offset {}: need {} more bytes",
                self.pos, n
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn varu32(&mut self) -> std::result::Result<u32, String> {
        let (value, len) = decode_unsigned(&self.data[self.pos..])
            .map_err(|_| format!("invalid varint at offset {}", self.pos))?;
        let value = u32::try_from(value)
            .map_err(|_| format!("value {} at offset {} exceeds u32 range", value, self.pos))?;
        self.pos += len;
        Ok(value)
    }

    fn vari64(&mut self) -> std::result::Result<i64, String> {
        let (value, len) = decode_signed(&self.data[self.pos..])
            .map_err(|_| format!("invalid signed varint at offset {}", self.pos))?;
        self.pos += len;
        Ok(value)
    }

    /// Length-prefixed UTF-8 name
    fn name(&mut self) -> std::result::Result<String, String> {
        let len = self.varu32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| "name is not valid UTF-8".to_string())
    }

    fn limits(&mut self) -> std::result::Result<Limits, String> {
        let flags = self.varu32()?;
        if flags > 1 {
            return Err(format!("unsupported limits flags {}", flags));
        }
        let initial = self.varu32()?;
        let max = if flags & 1 != 0 {
            Some(self.varu32()?)
        } else {
            None
        };
        Ok(Limits { initial, max })
    }
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(&encode_unsigned(name.len() as u64));
    out.extend_from_slice(name.as_bytes());
}

fn write_limits(out: &mut Vec<u8>, limits: &Limits) {
    out.extend_from_slice(&encode_unsigned(u64::from(limits.max.is_some())));
    out.extend_from_slice(&encode_unsigned(u64::from(limits.initial)));
    if let Some(max) = limits.max {
        out.extend_from_slice(&encode_unsigned(u64::from(max)));
    }
}

/// Decode a Type section payload into signature records
pub fn decode_type_section(payload: &[u8]) -> Result<Vec<TypeEntry>> {
    decode_type_inner(payload).map_err(|e| Error::unsupported_layout("type", e))
}

fn decode_type_inner(payload: &[u8]) -> std::result::Result<Vec<TypeEntry>, String> {
    let mut r = Reader::new(payload);
    let count = r.varu32()?;
    let mut entries = Vec::with_capacity(count.min(1024) as usize);

    for _ in 0..count {
        let form = r.u8()?;
        let param_count = r.varu32()?;
        let mut params = Vec::with_capacity(param_count.min(1024) as usize);
        for _ in 0..param_count {
            params.push(r.vari64()?);
        }
        let return_count = r.varu32()?;
        let mut returns = Vec::with_capacity(return_count.min(1024) as usize);
        for _ in 0..return_count {
            returns.push(r.vari64()?);
        }
        entries.push(TypeEntry {
            form,
            params,
            returns,
        });
    }

    if !r.is_empty() {
        return Err(format!("trailing bytes after {} entries", count));
    }
    Ok(entries)
}

/// Encode signature records back into a Type section payload
pub fn encode_type_section(entries: &[TypeEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&encode_unsigned(entries.len() as u64));
    for entry in entries {
        out.push(entry.form);
        out.extend_from_slice(&encode_unsigned(entry.params.len() as u64));
        for &param in &entry.params {
            out.extend_from_slice(&encode_signed(param));
        }
        out.extend_from_slice(&encode_unsigned(entry.returns.len() as u64));
        for &ret in &entry.returns {
            out.extend_from_slice(&encode_signed(ret));
        }
    }
    out
}

/// Decode an Import section payload into import records
pub fn decode_import_section(payload: &[u8]) -> Result<Vec<ImportEntry>> {
    decode_import_inner(payload).map_err(|e| Error::unsupported_layout("import", e))
}

fn decode_import_inner(payload: &[u8]) -> std::result::Result<Vec<ImportEntry>, String> {
    let mut r = Reader::new(payload);
    let count = r.varu32()?;
    let mut entries = Vec::with_capacity(count.min(1024) as usize);

    for _ in 0..count {
        let module = r.name()?;
        let field = r.name()?;
        let tag = r.u8()?;

        let kind = match tag {
            0 => ImportKind::Function {
                type_idx: r.varu32()?,
            },
            1 => ImportKind::Table {
                elem_type: r.vari64()?,
                limits: r.limits()?,
            },
            2 => ImportKind::Memory { limits: r.limits()? },
            3 => ImportKind::Global {
                content_type: r.vari64()?,
                mutability: r.varu32()?,
            },
            _ => return Err(format!("unknown import kind tag {}", tag)),
        };

        entries.push(ImportEntry {
            module,
            field,
            kind,
        });
    }

    if !r.is_empty() {
        return Err(format!("trailing bytes after {} entries", count));
    }
    Ok(entries)
}

/// Encode import records back into an Import section payload
pub fn encode_import_section(entries: &[ImportEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&encode_unsigned(entries.len() as u64));
    for entry in entries {
        write_name(&mut out, &entry.module);
        write_name(&mut out, &entry.field);
        out.push(entry.kind.tag());
        match &entry.kind {
            ImportKind::Function { type_idx } => {
                out.extend_from_slice(&encode_unsigned(u64::from(*type_idx)));
            }
            ImportKind::Table { elem_type, limits } => {
                out.extend_from_slice(&encode_signed(*elem_type));
                write_limits(&mut out, limits);
            }
            ImportKind::Memory { limits } => {
                write_limits(&mut out, limits);
            }
            ImportKind::Global {
                content_type,
                mutability,
            } => {
                out.extend_from_slice(&encode_signed(*content_type));
                out.extend_from_slice(&encode_unsigned(u64::from(*mutability)));
            }
        }
    }
    out
}

/// Decode an Export section payload into export records
pub fn decode_export_section(payload: &[u8]) -> Result<Vec<ExportEntry>> {
    decode_export_inner(payload).map_err(|e| Error::unsupported_layout("export", e))
}

fn decode_export_inner(payload: &[u8]) -> std::result::Result<Vec<ExportEntry>, String> {
    let mut r = Reader::new(payload);
    let count = r.varu32()?;
    let mut entries = Vec::with_capacity(count.min(1024) as usize);

    for _ in 0..count {
        let field = r.name()?;
        let kind = ExternalKind::from_tag(r.u8()?)?;
        let index = r.varu32()?;
        entries.push(ExportEntry { field, kind, index });
    }

    if !r.is_empty() {
        return Err(format!("trailing bytes after {} entries", count));
    }
    Ok(entries)
}

/// Encode export records back into an Export section payload
pub fn encode_export_section(entries: &[ExportEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&encode_unsigned(entries.len() as u64));
    for entry in entries {
        write_name(&mut out, &entry.field);
        out.push(entry.kind.tag());
        out.extend_from_slice(&encode_unsigned(u64::from(entry.index)));
    }
    out
}
