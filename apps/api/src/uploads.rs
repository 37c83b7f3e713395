use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use axum::extract::Multipart;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;

pub const SUPPORTED_EXTENSIONS: &[&str] = &[".pdf"];

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

const PDF_SIGNATURE: &[u8] = b"%PDF-";

pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> i64 {
        self.bytes.len() as i64
    }
}

/// Result of checking an upload without processing it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PdfValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub filename: String,
    pub file_size: i64,
}

/// Reads the `file` field of a multipart body.
pub async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Uploaded file has no filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {e}")))?;
        return Ok(UploadedFile { filename, bytes });
    }
    Err(AppError::Validation(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

fn has_supported_extension(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Checks extension, size and the PDF signature.
pub fn check_pdf(filename: &str, bytes: &[u8], max_bytes: usize) -> Result<(), String> {
    if !has_supported_extension(filename) {
        return Err("Only PDF files are supported".to_string());
    }
    if bytes.len() > max_bytes {
        return Err(format!(
            "File is too large; the maximum is {}MB",
            max_bytes / (1024 * 1024)
        ));
    }
    if !bytes.starts_with(PDF_SIGNATURE) {
        return Err("File is not a valid PDF document".to_string());
    }
    Ok(())
}

pub fn validate(file: &UploadedFile, max_bytes: usize) -> PdfValidation {
    let error = check_pdf(&file.filename, &file.bytes, max_bytes).err();
    PdfValidation {
        valid: error.is_none(),
        error,
        filename: file.filename.clone(),
        file_size: file.size(),
    }
}

/// Validates an upload, surfacing problems as a 400.
pub fn require_pdf(file: &UploadedFile, max_bytes: usize) -> Result<(), AppError> {
    check_pdf(&file.filename, &file.bytes, max_bytes).map_err(AppError::Validation)
}

/// Object storage for the original uploads. Carried in `AppState` as `Arc<dyn PdfArchive>`.
#[async_trait]
pub trait PdfArchive: Send + Sync {
    /// Stores the original PDF under `key`.
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), AppError>;

    async fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// S3 / MinIO bucket.
#[derive(Clone)]
pub struct S3Archive {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Archive {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl PdfArchive for S3Archive {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type("application/pdf")
            .send()
            .await
            .map_err(|e| AppError::S3(format!("Upload of {key} failed: {e}")))?;
        info!("Uploaded resume PDF to s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("Delete of {key} failed: {e}")))?;
        info!("Removed resume PDF s3://{}/{key}", self.bucket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    #[test]
    fn test_accepts_pdf_with_uppercase_extension() {
        assert!(check_pdf("CV.PDF", b"%PDF-1.4 body", 10 * MB).is_ok());
    }

    #[test]
    fn test_rejects_non_pdf_extension() {
        let err = check_pdf("cv.docx", b"%PDF-1.4", 10 * MB).unwrap_err();
        assert!(err.contains("Only PDF"));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let bytes = vec![b'%'; 2 * MB + 1];
        let err = check_pdf("cv.pdf", &bytes, 2 * MB).unwrap_err();
        assert!(err.contains("2MB"));
    }

    #[test]
    fn test_rejects_missing_signature() {
        assert!(check_pdf("cv.pdf", b"hello", 10 * MB).is_err());
    }

    #[test]
    fn test_validate_reports_without_failing() {
        let file = UploadedFile {
            filename: "notes.txt".to_string(),
            bytes: Bytes::from_static(b"plain"),
        };
        let report = validate(&file, 10 * MB);
        assert!(!report.valid);
        assert_eq!(report.file_size, 5);
        assert!(report.error.is_some());
    }
}
