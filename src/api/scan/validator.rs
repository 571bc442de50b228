use derive_more::{Display, Error};
use image::ImageFormat;
use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

/// Accepted image types and size ceiling for uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub allowed_types: Vec<String>,
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    pub fn allows(&self, mime: &str) -> bool {
        let mime = normalize_mime(mime);
        self.allowed_types
            .iter()
            .any(|allowed| normalize_mime(allowed) == mime)
    }
}

/// File metadata the validator decides on. No content beyond the header is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub file_name: String,
    pub mime: Option<String>,
    pub size: u64,
    pub path: Option<PathBuf>,
}

impl UploadCandidate {
    pub fn new(file_name: impl Into<String>, mime: Option<String>, size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            mime,
            size,
            path: None,
        }
    }

    /// Describe a file on disk: size from metadata, type sniffed from the
    /// first bytes, falling back to the extension.
    pub fn inspect(path: &Path) -> io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }

        let mut header = [0u8; 64];
        let read = File::open(path)?.read(&mut header)?;
        let format = image::guess_format(&header[..read])
            .ok()
            .or_else(|| ImageFormat::from_path(path).ok());

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            file_name,
            mime: format.map(|f| f.to_mime_type().to_string()),
            size: meta.len(),
            path: Some(path.to_path_buf()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum UploadRejection {
    #[display("Please upload nutrition label image")]
    Missing,

    #[display("Please upload JPEG, PNG, or WebP")]
    UnsupportedType { mime: Option<String> },

    #[display("Max file size is {}", size_label(*limit))]
    TooLarge { size: u64, limit: u64 },
}

/// Decide whether a candidate may be uploaded. Pure: no I/O, no network.
pub fn validate_upload(
    candidate: Option<&UploadCandidate>,
    policy: &UploadPolicy,
) -> Result<(), UploadRejection> {
    let Some(candidate) = candidate else {
        return Err(UploadRejection::Missing);
    };

    if candidate.size == 0 {
        return Err(UploadRejection::Missing);
    }

    match candidate.mime.as_deref() {
        Some(mime) if policy.allows(mime) => {}
        other => {
            return Err(UploadRejection::UnsupportedType {
                mime: other.map(str::to_string),
            })
        }
    }

    if candidate.size > policy.max_bytes {
        return Err(UploadRejection::TooLarge {
            size: candidate.size,
            limit: policy.max_bytes,
        });
    }

    Ok(())
}

/// `10MB`, `5.5MB`, `512KB`; whole units drop the decimal.
pub fn size_label(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    let (unit, suffix) = match bytes {
        b if b >= MB => (MB, "MB"),
        b if b >= KB => (KB, "KB"),
        b => return format!("{b} bytes"),
    };
    if bytes % unit == 0 {
        format!("{}{suffix}", bytes / unit)
    } else {
        let value = format!("{:.1}", bytes as f64 / unit as f64);
        format!("{}{suffix}", value.trim_end_matches(".0"))
    }
}

fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_accepts_allowed_types_within_limit() {
        let policy = UploadPolicy::default();
        for mime in ["image/jpeg", "image/png", "image/webp", "IMAGE/JPEG; q=1"] {
            let candidate = UploadCandidate::new("label", Some(mime.to_string()), 2 * MB);
            assert_eq!(validate_upload(Some(&candidate), &policy), Ok(()), "{mime}");
        }
    }

    #[test]
    fn test_rejects_types_outside_allow_list() {
        let policy = UploadPolicy::default();
        for mime in [Some("image/gif"), Some("application/pdf"), None] {
            let candidate = UploadCandidate::new("label", mime.map(str::to_string), MB);
            let err = validate_upload(Some(&candidate), &policy).unwrap_err();
            assert_eq!(err.to_string(), "Please upload JPEG, PNG, or WebP");
        }
    }

    #[test]
    fn test_rejects_oversized_files() {
        let policy = UploadPolicy::default();
        let candidate = UploadCandidate::new("label.jpg", Some("image/jpeg".to_string()), 11 * MB);
        let err = validate_upload(Some(&candidate), &policy).unwrap_err();
        assert_eq!(err.to_string(), "Max file size is 10MB");

        let at_limit = UploadCandidate::new("label.jpg", Some("image/jpeg".to_string()), 10 * MB);
        assert!(validate_upload(Some(&at_limit), &policy).is_ok());
    }

    #[test]
    fn test_small_and_fractional_limits_keep_their_size() {
        let candidate = UploadCandidate::new("label.jpg", Some("image/jpeg".to_string()), 11 * MB);
        for (max_bytes, message) in [
            (512 * 1024, "Max file size is 512KB"),
            (11 * MB / 2, "Max file size is 5.5MB"),
            (1500, "Max file size is 1.5KB"),
            (900, "Max file size is 900 bytes"),
        ] {
            let policy = UploadPolicy {
                max_bytes,
                ..UploadPolicy::default()
            };
            let err = validate_upload(Some(&candidate), &policy).unwrap_err();
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn test_rejects_missing_or_empty() {
        let policy = UploadPolicy::default();
        assert_eq!(
            validate_upload(None, &policy),
            Err(UploadRejection::Missing)
        );
        let empty = UploadCandidate::new("label.png", Some("image/png".to_string()), 0);
        assert_eq!(
            validate_upload(Some(&empty), &policy),
            Err(UploadRejection::Missing)
        );
    }

    #[test]
    fn test_inspect_sniffs_content_over_extension() {
        let dir = tempfile::tempdir().unwrap();
        // PNG signature behind a misleading extension
        let path = dir.path().join("label.jpg");
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, &bytes).unwrap();

        let candidate = UploadCandidate::inspect(&path).unwrap();
        assert_eq!(candidate.mime.as_deref(), Some("image/png"));
        assert_eq!(candidate.size, bytes.len() as u64);
        assert_eq!(candidate.file_name, "label.jpg");
    }

    #[test]
    fn test_inspect_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.webp");
        std::fs::write(&path, b"not really an image").unwrap();

        let candidate = UploadCandidate::inspect(&path).unwrap();
        assert_eq!(candidate.mime.as_deref(), Some("image/webp"));
    }
}
