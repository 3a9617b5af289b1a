//! Scholar Processing Library
//!
//! Ingestion-side transforms for uploaded documents:
//!
//! - `classify`: maps a declared media type and filename to a [`FormatClass`]
//! - `document`: normalizes a file into PDF (Word conversion, placeholder notices)
//!   or passes it through unchanged
//! - `compression`: the gzip codec applied to every stored object
//!
//! Everything here is synchronous and CPU-bound; async callers run it on the
//! blocking thread pool.

pub mod classify;
pub mod compression;
pub mod document;

pub use classify::{classify, FormatClass};
pub use compression::{compress, decompress, DecodeError};
pub use document::{ConversionError, DocumentNormalizer, HtmlRenderer, PdfRenderer};
