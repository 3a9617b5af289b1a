//! Upload fixtures.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// A `.docx` with a heading and one body paragraph.
pub fn create_test_docx(heading: &str, body: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    writer
        .start_file("[Content_Types].xml", options)
        .expect("start content types");
    writer
        .write_all(b"<?xml version=\"1.0\"?><Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"/>")
        .expect("write content types");
    writer
        .start_file("word/document.xml", options)
        .expect("start document part");
    writer
        .write_all(
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>\
                 <w:p><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>\
                 <w:p><w:r><w:t>{}</w:t></w:r></w:p>\
                 </w:body></w:document>",
                heading, body
            )
            .as_bytes(),
        )
        .expect("write document part");
    writer.finish().expect("finish docx").into_inner()
}

pub fn create_test_pdf() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\ntrailer << /Root 1 0 R >>\n%%EOF\n".to_vec()
}
