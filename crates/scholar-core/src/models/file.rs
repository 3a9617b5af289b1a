use std::io;
use std::path::Path;

/// A value that can produce a byte payload, a filename and a media type.
///
/// Implemented once per input environment (multipart uploads, files on disk) so the
/// pipeline never branches on where a file came from.
pub trait FileSource {
    fn bytes(&self) -> &[u8];
    fn filename(&self) -> &str;
    fn media_type(&self) -> &str;
}

/// A file as submitted by a client. Lives for one conversion request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub display_name: String,
    pub declared_media_type: String,
}

impl UploadedFile {
    pub fn new(
        bytes: Vec<u8>,
        display_name: impl Into<String>,
        declared_media_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            display_name: display_name.into(),
            declared_media_type: declared_media_type.into(),
        }
    }
}

impl FileSource for UploadedFile {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn filename(&self) -> &str {
        &self.display_name
    }

    fn media_type(&self) -> &str {
        &self.declared_media_type
    }
}

/// A file read from the local filesystem.
#[derive(Debug, Clone)]
pub struct DiskFile {
    data: Vec<u8>,
    name: String,
    media_type: String,
}

impl DiskFile {
    /// Read `path` into memory. The filename is the last path component.
    pub fn read(path: impl AsRef<Path>, media_type: impl Into<String>) -> io::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
            })?;
        Ok(Self {
            data,
            name,
            media_type: media_type.into(),
        })
    }
}

impl From<DiskFile> for UploadedFile {
    fn from(file: DiskFile) -> Self {
        Self::new(file.data, file.name, file.media_type)
    }
}

impl FileSource for DiskFile {
    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn filename(&self) -> &str {
        &self.name
    }

    fn media_type(&self) -> &str {
        &self.media_type
    }
}

/// Output of classification + conversion, consumed once by the compression codec.
///
/// `media_type` is always PDF, plain text, or the declared type of an office file
/// that was left unconverted.
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    pub bytes: Vec<u8>,
    pub display_name: String,
    pub media_type: String,
}
