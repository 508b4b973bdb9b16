//! File acceptance rules applied before any decode work begins.

use std::rc::Rc;

use crate::error::ValidationError;
use crate::session::state::SelectedImage;

/// 10 MiB upload limit.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
];

/// A file as handed over by the input surface (picker or drag-and-drop).
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), bytes }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

pub fn is_accepted_mime(mime_type: &str) -> bool {
    ACCEPTED_MIME_TYPES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(mime_type.trim()))
}

/// MIME type for a file name's image extension, for callers that only have
/// a path.
pub fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => return None,
    })
}

/// Accept or reject a candidate file.
///
/// Size is checked before type so an oversize upload reports `TooLarge`
/// whatever its MIME type.
pub fn validate(file: Option<CandidateFile>) -> Result<SelectedImage, ValidationError> {
    let file = match file {
        Some(f) if !f.bytes.is_empty() => f,
        _ => return Err(ValidationError::Empty),
    };

    let size_bytes = file.size_bytes();
    if size_bytes > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge { size_bytes });
    }
    if !is_accepted_mime(&file.mime_type) {
        return Err(ValidationError::WrongType { mime_type: file.mime_type });
    }

    Ok(SelectedImage::new(
        file.name,
        file.mime_type.trim().to_ascii_lowercase(),
        Rc::from(file.bytes.into_boxed_slice()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(mime: &str, len: usize) -> Option<CandidateFile> {
        Some(CandidateFile::new("qr.png", mime, vec![0u8; len]))
    }

    #[test]
    fn missing_file_is_empty() {
        assert_eq!(validate(None).unwrap_err(), ValidationError::Empty);
    }

    #[test]
    fn zero_byte_file_is_empty() {
        assert_eq!(validate(file("image/png", 0)).unwrap_err(), ValidationError::Empty);
    }

    #[test]
    fn accepts_every_listed_type_case_insensitively() {
        for mime in ACCEPTED_MIME_TYPES {
            assert!(validate(file(mime, 16)).is_ok(), "{mime} should pass");
            assert!(validate(file(&mime.to_uppercase(), 16)).is_ok());
        }
    }

    #[test]
    fn rejects_other_types() {
        for mime in ["application/pdf", "image/svg+xml", "image/tiff", "text/plain", ""] {
            assert!(matches!(
                validate(file(mime, 16)).unwrap_err(),
                ValidationError::WrongType { .. }
            ));
        }
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(validate(file("image/png", MAX_FILE_SIZE as usize)).is_ok());
        assert_eq!(
            validate(file("image/png", MAX_FILE_SIZE as usize + 1)).unwrap_err(),
            ValidationError::TooLarge { size_bytes: 10_485_761 }
        );
    }

    #[test]
    fn oversize_wins_over_wrong_type() {
        let err = validate(file("application/zip", 12 * 1024 * 1024)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
    }

    #[test]
    fn accepted_image_keeps_metadata() {
        let image = validate(file("IMAGE/PNG", 42)).unwrap();
        assert_eq!(image.name(), "qr.png");
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.size_bytes(), 42);
    }

    #[test]
    fn mime_inferred_from_extension() {
        assert_eq!(mime_from_extension("Photo.JPG"), Some("image/jpeg"));
        assert_eq!(mime_from_extension("dir.v2/qr.webp"), Some("image/webp"));
        assert_eq!(mime_from_extension("notes.txt"), None);
        assert_eq!(mime_from_extension("README"), None);
    }
}
