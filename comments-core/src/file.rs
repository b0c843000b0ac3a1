//! Attachment rules and data URL conversion.

use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use comments_boundary::NewAttachment;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

pub const DEFAULT_ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "text/plain"];

pub const MSG_READ_FAILED: &str = "Failed to read file";

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;

/// Anything that carries a MIME type and a byte size.
pub trait FileLike {
    fn mime(&self) -> &str;
    fn size(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConstraints {
    pub allowed_types: Vec<String>,
    pub max_size: u64,
}

impl Default for FileConstraints {
    fn default() -> Self {
        Self {
            allowed_types: DEFAULT_ALLOWED_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FileConstraints {
    fn allowed_extensions(&self) -> String {
        self.allowed_types
            .iter()
            .map(|t| {
                if let Some(subtype) = t.strip_prefix("image/") {
                    subtype
                } else if t == "text/plain" {
                    "txt"
                } else {
                    t.as_str()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileInvalidation {
    #[error("Unsupported file type. Allowed types: {allowed}")]
    Type { allowed: String },
    #[error("File is too large. Maximum size is {max}")]
    Size { max: String },
}

/// Checks the MIME type first and the size second.
pub fn validate_file<F>(file: &F, constraints: &FileConstraints) -> Result<(), FileInvalidation>
where
    F: FileLike + ?Sized,
{
    if !constraints.allowed_types.iter().any(|t| t == file.mime()) {
        return Err(FileInvalidation::Type {
            allowed: constraints.allowed_extensions(),
        });
    }
    if file.size() > constraints.max_size {
        let max = i64::try_from(constraints.max_size).unwrap_or(i64::MAX);
        return Err(FileInvalidation::Size {
            max: format_file_size(max),
        });
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_file_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 bytes".to_string();
    }
    let value = bytes as f64;
    if value < KB {
        format!("{bytes} bytes")
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else if value < GB {
        format!("{:.1} MB", value / MB)
    } else {
        format!("{:.1} GB", value / GB)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    #[error("Failed to convert image data")]
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[must_use]
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn parse_data_url(data_url: &str) -> Result<DataUrl, DataUrlError> {
    let (header, payload) = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or(DataUrlError::Malformed)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(DataUrlError::Malformed)?;
    let mime = mime.split(';').next().unwrap_or_default().to_string();
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| DataUrlError::Malformed)?;
    Ok(DataUrl { mime, bytes })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Text,
}

impl FileKind {
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else {
            Self::Text
        }
    }
}

/// A validated file that is held by a comment form until submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    pub name: String,
    pub mime: String,
    pub kind: FileKind,
    content: Vec<u8>,
    preview: Option<String>,
}

impl AttachedFile {
    #[must_use]
    pub fn new(name: impl Into<String>, mime: impl Into<String>, content: Vec<u8>) -> Self {
        let mime = mime.into();
        let kind = FileKind::from_mime(&mime);
        let preview = (kind == FileKind::Image).then(|| to_data_url(&mime, &content));
        Self {
            name: name.into(),
            mime,
            kind,
            content,
            preview,
        }
    }

    /// Builds an attachment from a data URL as produced by a browser file reader.
    pub fn from_data_url(name: impl Into<String>, data_url: String) -> Result<Self, DataUrlError> {
        let DataUrl { mime, bytes } = parse_data_url(&data_url)?;
        let kind = FileKind::from_mime(&mime);
        let preview = (kind == FileKind::Image).then_some(data_url);
        Ok(Self {
            name: name.into(),
            mime,
            kind,
            content: bytes,
            preview,
        })
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    #[must_use]
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    /// Images are uploaded from their preview, everything else as is.
    pub fn upload_bytes(&self) -> Result<Cow<'_, [u8]>, DataUrlError> {
        match (&self.kind, &self.preview) {
            (FileKind::Image, Some(preview)) => Ok(Cow::Owned(parse_data_url(preview)?.bytes)),
            _ => Ok(Cow::Borrowed(&self.content)),
        }
    }

    pub fn to_new_attachment(&self) -> Result<NewAttachment, DataUrlError> {
        Ok(NewAttachment {
            file_name: self.name.clone(),
            mime: self.mime.clone(),
            bytes: self.upload_bytes()?.into_owned(),
        })
    }
}

impl FileLike for AttachedFile {
    fn mime(&self) -> &str {
        &self.mime
    }
    fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Meta(&'static str, u64);

    impl FileLike for Meta {
        fn mime(&self) -> &str {
            self.0
        }
        fn size(&self) -> u64 {
            self.1
        }
    }

    #[test]
    fn accept_default_types_within_limit() {
        let constraints = FileConstraints::default();
        for mime in DEFAULT_ALLOWED_TYPES {
            assert!(validate_file(&Meta(*mime, 1024), &constraints).is_ok());
        }
        assert!(validate_file(&Meta("image/png", DEFAULT_MAX_FILE_SIZE), &constraints).is_ok());
    }

    #[test]
    fn reject_unsupported_type() {
        let err = validate_file(&Meta("application/pdf", 10), &FileConstraints::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported file type. Allowed types: jpeg, png, gif, txt"
        );
    }

    #[test]
    fn reject_too_large_file() {
        let err = validate_file(
            &Meta("image/jpeg", DEFAULT_MAX_FILE_SIZE + 1),
            &FileConstraints::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "File is too large. Maximum size is 5.0 MB");
    }

    #[test]
    fn type_check_comes_before_size_check() {
        let err = validate_file(&Meta("video/mp4", u64::MAX), &FileConstraints::default())
            .unwrap_err();
        assert!(matches!(err, FileInvalidation::Type { .. }));
    }

    #[test]
    fn custom_constraints() {
        let constraints = FileConstraints {
            allowed_types: vec!["application/pdf".into(), "image/webp".into()],
            max_size: 100,
        };
        let err = validate_file(&Meta("image/png", 1), &constraints).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported file type. Allowed types: application/pdf, webp"
        );
        let err = validate_file(&Meta("application/pdf", 101), &constraints).unwrap_err();
        assert_eq!(err.to_string(), "File is too large. Maximum size is 100 bytes");
    }

    #[test]
    fn format_sizes() {
        assert_eq!(format_file_size(0), "0 bytes");
        assert_eq!(format_file_size(-5), "0 bytes");
        assert_eq!(format_file_size(1), "1 bytes");
        assert_eq!(format_file_size(1023), "1023 bytes");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn data_url_conversion() {
        let url = to_data_url("text/plain", b"hello");
        assert_eq!(url, "data:text/plain;base64,aGVsbG8=");
        let DataUrl { mime, bytes } = parse_data_url(&url).unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn data_url_with_parameters() {
        let DataUrl { mime, bytes } =
            parse_data_url("data:text/plain;charset=utf-8;base64,aGk=").unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn malformed_data_urls() {
        assert_eq!(parse_data_url("hello"), Err(DataUrlError::Malformed));
        assert_eq!(
            parse_data_url("data:image/png,rawdata"),
            Err(DataUrlError::Malformed)
        );
        assert_eq!(
            parse_data_url("data:image/png;base64,@@@"),
            Err(DataUrlError::Malformed)
        );
        assert_eq!(
            DataUrlError::Malformed.to_string(),
            "Failed to convert image data"
        );
    }

    #[test]
    fn image_attachment_has_preview() {
        let file = AttachedFile::new("cat.png", "image/png", vec![1, 2, 3]);
        assert_eq!(file.kind, FileKind::Image);
        assert_eq!(file.preview(), Some("data:image/png;base64,AQID"));
        assert_eq!(file.upload_bytes().unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(file.size(), 3);
    }

    #[test]
    fn text_attachment_has_no_preview() {
        let file = AttachedFile::new("notes.txt", "text/plain", b"note".to_vec());
        assert_eq!(file.kind, FileKind::Text);
        assert!(file.preview().is_none());
        let attachment = file.to_new_attachment().unwrap();
        assert_eq!(attachment.file_name, "notes.txt");
        assert_eq!(attachment.bytes, b"note");
    }

    #[test]
    fn attachment_from_data_url() {
        let file =
            AttachedFile::from_data_url("dot.gif", "data:image/gif;base64,R0lG".to_string())
                .unwrap();
        assert_eq!(file.mime, "image/gif");
        assert_eq!(file.content(), b"GIF");
        assert_eq!(file.preview(), Some("data:image/gif;base64,R0lG"));
    }
}
