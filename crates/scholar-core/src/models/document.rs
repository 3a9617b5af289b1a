use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::StoredObjectKey;

/// Metadata row for an uploaded document.
///
/// The pipeline only reads `file_path` and `title`; the rest belongs to the
/// surrounding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub file_path: StoredObjectKey,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Filename offered to clients: `{title}.{inner extension}`.
    pub fn display_filename(&self) -> String {
        match self.file_path.inner_extension() {
            Some(ext) => format!("{}.{}", self.title, ext),
            None => self.title.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    pub file_path: String,
    pub content_type: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl From<DocumentRecord> for DocumentResponse {
    fn from(doc: DocumentRecord) -> Self {
        DocumentResponse {
            filename: doc.display_filename(),
            id: doc.id,
            title: doc.title,
            file_path: doc.file_path.into_string(),
            content_type: doc.content_type,
            created_at: doc.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> DocumentRecord {
        DocumentRecord {
            id: "doc1".to_string(),
            owner_id: "u1".to_string(),
            title: "Lecture 3".to_string(),
            file_path: StoredObjectKey::from_raw(path),
            content_type: "application/pdf".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_filename_uses_inner_extension() {
        let doc = record("documents/u1/1700000000-notes.pdf.gz");
        assert_eq!(doc.display_filename(), "Lecture 3.pdf");
    }

    #[test]
    fn test_response_from_record() {
        let response = DocumentResponse::from(record("documents/u1/1-slides.pptx.gz"));
        assert_eq!(response.filename, "Lecture 3.pptx");
        assert_eq!(response.file_path, "documents/u1/1-slides.pptx.gz");
    }
}
