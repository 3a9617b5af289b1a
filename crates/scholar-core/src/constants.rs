//! Media types, key layout and delivery defaults shared across crates.

pub const PDF_MIME: &str = "application/pdf";
pub const TEXT_PLAIN_MIME: &str = "text/plain";
pub const WORD_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const WORD_LEGACY_MIME: &str = "application/msword";
pub const POWERPOINT_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const POWERPOINT_LEGACY_MIME: &str = "application/vnd.ms-powerpoint";
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";
pub const GZIP_MIME: &str = "application/gzip";

/// Prefix of every stored document key.
pub const DOCUMENT_KEY_PREFIX: &str = "documents";

/// Suffix marking a gzip-compressed object.
pub const COMPRESSED_SUFFIX: &str = ".gz";

pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 1800;
pub const DEFAULT_CACHE_SWEEP_SECS: u64 = 60;
/// Documents held by the delivery cache before the least recently used is dropped.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 256;

/// Map a bare file extension (no dot) to the content type served for it.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => PDF_MIME,
        "docx" => WORD_MIME,
        "pptx" => POWERPOINT_MIME,
        "txt" => TEXT_PLAIN_MIME,
        _ => OCTET_STREAM_MIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for_extension("pdf"), PDF_MIME);
        assert_eq!(content_type_for_extension("DOCX"), WORD_MIME);
        assert_eq!(content_type_for_extension("pptx"), POWERPOINT_MIME);
        assert_eq!(content_type_for_extension("txt"), TEXT_PLAIN_MIME);
        assert_eq!(content_type_for_extension("gz"), OCTET_STREAM_MIME);
        assert_eq!(content_type_for_extension(""), OCTET_STREAM_MIME);
    }
}
