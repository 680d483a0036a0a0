//! # wasmsplit-core
//!
//! A library for splitting WebAssembly modules into a stripped core
//! binary plus a structured metadata document, and reassembling the
//! exact original binary from the two artifacts.
//!
//! This crate provides the core functionality for:
//! - Parsing module framing (header plus ordered sections)
//! - Stripping sections out of the core under two policies
//! - Encoding removed sections into a JSON metadata document
//! - Merging core and metadata back into a byte-identical module
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`module`]: Module framing and the LEB128 varint codec
//! - [`sections`]: Structured codecs for the Type/Import/Export sections
//! - [`strip`]: Section removal policies and the stripper
//! - [`metadata`]: The metadata document and its JSON codec
//! - [`reassemble`]: Reconstruction of the original binary
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use wasmsplit_core::{reassemble, strip, StripMode};
//! use std::fs;
//!
//! let data = fs::read("module.wasm")?;
//!
//! // Split into a minimal core and a metadata document
//! let (core, metadata) = strip(&data, StripMode::Normal)?;
//! fs::write("module.stripped.wasm", &core)?;
//! fs::write("module.meta.json", metadata.to_json()?)?;
//!
//! // Later: restore the original bytes
//! let restored = reassemble(&core, &metadata)?;
//! assert_eq!(restored, data);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Limitations
//!
//! Custom sections (id 0) are dropped during parsing and never
//! restored, so modules carrying name or debug sections do not round
//! trip. An aggressive-mode core is well-formed framing but is not
//! expected to be independently executable.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod metadata;
pub mod module;
pub mod reassemble;
pub mod sections;
pub mod strip;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use metadata::{MetadataDocument, MetadataSections, RawSection, METADATA_VERSION};
pub use module::{Module, Section, SectionId, WASM_MAGIC, WASM_VERSION};
pub use reassemble::{reassemble, reassemble_file};
pub use strip::{strip, strip_file, StripMode};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
