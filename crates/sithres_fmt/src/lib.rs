//! Readers for the Sith engine's proprietary resource formats.
//!
//! Two generic decoding engines sit at the bottom:
//!  - [`schema`] — declarative binary layouts applied to byte buffers
//!  - [`text`] — repeated capture-group matching over text documents
//!
//! The concrete formats are built on top of them:
//!  - [`mat`] — `MAT` material containers (texture directory + pixel grids)
//!  - [`geo`] — the georesource section of level documents
//!  - [`mesh`] — assembly of decoded geometry into an exportable mesh

pub mod geo;
pub mod mat;
pub mod mesh;
pub mod schema;
pub mod text;

use thiserror::Error;

/// Decoding failures. Every variant is fatal to the decode call that raised
/// it; no partially decoded data escapes. Recoverable integrity problems
/// (vertex-count mismatches, unknown subsections) are logged instead of
/// reported here.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A fixed-width read ran past the end of the buffer.
    #[error("input ends inside `{field}` ({needed} bytes needed, {remaining} left)")]
    TruncatedInput {
        field: String,
        needed: usize,
        remaining: usize,
    },

    /// A computed array, byte-run or skip length is negative or larger than
    /// what's left in the buffer.
    #[error("computed length {length} for `{field}` is out of range")]
    InvalidLength { field: String, length: i64 },

    /// A magic, version or sentinel field did not hold its required value.
    #[error("`{field}` failed validation (expected {expected}, got {actual})")]
    ValidationFailed {
        field: String,
        expected: String,
        actual: String,
    },

    /// The named text section is missing from the document.
    #[error("section `{0}` not found in document")]
    SectionNotFound(String),

    /// A match pattern failed to compile.
    #[error("bad match pattern")]
    BadPattern(#[from] regex::Error),

    /// Lookup of a field the schema or pattern never produced.
    #[error("no field `{0}` in decoded record")]
    MissingField(String),

    /// A field holds a different kind of value than the accessor asked for.
    #[error("field `{field}` is not {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    /// A captured substring failed numeric conversion.
    #[error("unreadable number in {0}")]
    BadNumber(&'static str),
}
