//! Format classification for uploaded files.

use scholar_core::constants::{PDF_MIME, TEXT_PLAIN_MIME};

/// What the normalizer should do with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    Pdf,
    PlainText,
    Word,
    PowerPoint,
    Unsupported,
}

/// Classify an upload by its declared media type, falling back to the filename
/// extension for office formats. Never fails: anything unrecognized is
/// [`FormatClass::Unsupported`].
pub fn classify(declared_media_type: &str, display_name: &str) -> FormatClass {
    let media_type = declared_media_type.trim().to_ascii_lowercase();
    let name = display_name.trim().to_ascii_lowercase();

    if media_type == PDF_MIME {
        return FormatClass::Pdf;
    }
    if media_type == TEXT_PLAIN_MIME {
        return FormatClass::PlainText;
    }
    if media_type.contains("wordprocessingml")
        || media_type.contains("msword")
        || name.ends_with(".docx")
        || name.ends_with(".doc")
    {
        return FormatClass::Word;
    }
    if media_type.contains("presentationml")
        || media_type.contains("ms-powerpoint")
        || name.ends_with(".pptx")
        || name.ends_with(".ppt")
    {
        return FormatClass::PowerPoint;
    }

    FormatClass::Unsupported
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_core::constants::{
        POWERPOINT_LEGACY_MIME, POWERPOINT_MIME, WORD_LEGACY_MIME, WORD_MIME,
    };

    #[test]
    fn test_exact_media_types() {
        assert_eq!(classify(PDF_MIME, "notes.bin"), FormatClass::Pdf);
        assert_eq!(classify(TEXT_PLAIN_MIME, "notes"), FormatClass::PlainText);
        assert_eq!(classify(WORD_MIME, "notes"), FormatClass::Word);
        assert_eq!(classify(WORD_LEGACY_MIME, "notes"), FormatClass::Word);
        assert_eq!(classify(POWERPOINT_MIME, "deck"), FormatClass::PowerPoint);
        assert_eq!(
            classify(POWERPOINT_LEGACY_MIME, "deck"),
            FormatClass::PowerPoint
        );
    }

    #[test]
    fn test_extension_fallback_is_case_insensitive() {
        assert_eq!(
            classify("application/octet-stream", "Essay.DOCX"),
            FormatClass::Word
        );
        assert_eq!(classify("", "old.doc"), FormatClass::Word);
        assert_eq!(classify("", "Lecture.PPT"), FormatClass::PowerPoint);
        assert_eq!(classify("", "lecture.pptx"), FormatClass::PowerPoint);
    }

    #[test]
    fn test_pdf_requires_exact_media_type() {
        // Only the declared type decides PDF; the name does not.
        assert_eq!(
            classify("application/octet-stream", "paper.pdf"),
            FormatClass::Unsupported
        );
        assert_eq!(
            classify("text/plain; charset=utf-8", "readme"),
            FormatClass::Unsupported
        );
    }

    #[test]
    fn test_classification_is_total() {
        let media_types = ["", "image/png", "application/zip", "???", "APPLICATION/PDF"];
        let names = ["", "sheet.xlsx", ".", "no-extension", "a.b.c"];
        for media_type in media_types {
            for name in names {
                // Must return without panicking for every input.
                let _ = classify(media_type, name);
            }
        }
        assert_eq!(classify("image/png", "sheet.xlsx"), FormatClass::Unsupported);
        assert_eq!(classify("APPLICATION/PDF", ""), FormatClass::Pdf);
    }
}
