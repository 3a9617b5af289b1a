//! Notice page substituted for formats that cannot be converted.

/// Single-page XHTML notice naming the original file.
pub fn placeholder_html(original_filename: &str) -> String {
    let name = html_escape::encode_safe(original_filename);
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"/><title>{name}</title></head>\
         <body><h2>Preview unavailable</h2>\
         <p><strong>{name}</strong></p>\
         <p>This file type cannot be displayed in the browser. \
         Download the original file to view it.</p></body></html>",
        name = name
    )
}

/// `notes.xlsx` -> `notes.pdf`; a name without an extension just gains one.
pub fn pdf_filename(original_filename: &str) -> String {
    let stem = match original_filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => original_filename,
    };
    format!("{}.pdf", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_is_escaped() {
        let html = placeholder_html("<script>alert(\"x\")</script>&.txt");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp;.txt"));
        assert!(!html.contains("\"x\""));
        assert!(html.contains("Download the original file to view it"));
    }

    #[test]
    fn test_pdf_filename() {
        assert_eq!(pdf_filename("sheet.xlsx"), "sheet.pdf");
        assert_eq!(pdf_filename("archive.tar.gz"), "archive.tar.pdf");
        assert_eq!(pdf_filename("README"), "README.pdf");
        assert_eq!(pdf_filename(".hidden"), ".hidden.pdf");
    }
}
