use scholar_core::constants::PDF_MIME;
use scholar_core::{FileSource, NormalizedDocument};
use std::sync::Arc;

use super::docx::docx_to_html;
use super::placeholder::{pdf_filename, placeholder_html};
use super::{ConversionError, HtmlRenderer, PdfRenderer};
use crate::classify::FormatClass;

/// Normalizes an upload according to its [`FormatClass`].
///
/// Cheap to clone; the renderer is shared.
#[derive(Clone)]
pub struct DocumentNormalizer {
    renderer: Arc<dyn HtmlRenderer>,
}

impl Default for DocumentNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(PdfRenderer::new()))
    }
}

impl DocumentNormalizer {
    pub fn new(renderer: Arc<dyn HtmlRenderer>) -> Self {
        Self { renderer }
    }

    pub fn normalize<S: FileSource + ?Sized>(
        &self,
        file: &S,
        class: FormatClass,
    ) -> Result<NormalizedDocument, ConversionError> {
        match class {
            FormatClass::Pdf | FormatClass::PlainText | FormatClass::PowerPoint => {
                Ok(NormalizedDocument {
                    bytes: file.bytes().to_vec(),
                    display_name: file.filename().to_string(),
                    media_type: file.media_type().to_string(),
                })
            }
            FormatClass::Word => {
                let html = docx_to_html(file.bytes())?;
                let pdf = self.renderer.render(&html)?;
                tracing::info!(
                    filename = %file.filename(),
                    source_bytes = file.bytes().len(),
                    pdf_bytes = pdf.len(),
                    "Converted Word document to PDF"
                );
                Ok(NormalizedDocument {
                    bytes: pdf,
                    display_name: pdf_filename(file.filename()),
                    media_type: PDF_MIME.to_string(),
                })
            }
            FormatClass::Unsupported => {
                let pdf = self.renderer.render(&placeholder_html(file.filename()))?;
                tracing::info!(
                    filename = %file.filename(),
                    media_type = %file.media_type(),
                    "Replaced unsupported document with a notice page"
                );
                Ok(NormalizedDocument {
                    bytes: pdf,
                    display_name: pdf_filename(file.filename()),
                    media_type: PDF_MIME.to_string(),
                })
            }
        }
    }
}
