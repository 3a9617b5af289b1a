//! Document normalization
//!
//! Converts uploads into a servable form: Word documents are rendered to PDF,
//! unsupported formats get a PDF notice in their place, and PDF, plain text and
//! PowerPoint files pass through unchanged.

pub mod docx;
pub mod normalizer;
pub mod placeholder;
pub mod render;

pub use normalizer::DocumentNormalizer;
pub use render::PdfRenderer;

use thiserror::Error;

/// Page margin shared by the generated stylesheet and the PDF layout.
pub const PAGE_MARGIN_CM: f32 = 2.0;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Invalid Word document: {0}")]
    InvalidDocument(String),

    #[error("Malformed document markup: {0}")]
    Markup(String),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}

/// Turns an XHTML document into PDF bytes.
pub trait HtmlRenderer: Send + Sync {
    fn render(&self, html: &str) -> Result<Vec<u8>, ConversionError>;
}
