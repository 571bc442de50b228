use bytes::Bytes;
use derive_more::{Display, Error, From};
use reqwest::{
    multipart::{Form, Part},
    Body,
};
use std::{path::Path, sync::Arc};

use super::validator::{validate_upload, UploadCandidate, UploadPolicy, UploadRejection};
use crate::{
    api::traits::ScanBackend,
    protocol::{types::Scan, ApiError},
};

/// A validated image ready for `POST /scan`
#[derive(Debug, Clone)]
pub struct ScanUpload {
    pub file_name: String,
    pub mime: String,
    pub data: Bytes,
    pub barcode: Option<String>,
    pub store_image: bool,
}

impl ScanUpload {
    pub fn from_bytes(file_name: impl Into<String>, mime: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            data,
            barcode: None,
            store_image: true,
        }
    }

    pub fn with_barcode(mut self, barcode: Option<String>) -> Self {
        self.barcode = barcode
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());
        self
    }

    pub fn with_store_image(mut self, store_image: bool) -> Self {
        self.store_image = store_image;
        self
    }

    pub fn candidate(&self) -> UploadCandidate {
        UploadCandidate::new(
            self.file_name.clone(),
            Some(self.mime.clone()),
            self.data.len() as u64,
        )
    }

    /// Multipart body: `image`, optional `barcode`, `store_image`.
    pub fn form(&self) -> Result<Form, ApiError> {
        let image = Part::stream_with_length(Body::from(self.data.clone()), self.data.len() as u64)
            .file_name(self.file_name.clone())
            .mime_str(&self.mime)
            .map_err(|_| ApiError::validation(format!("Invalid content type '{}'", self.mime)))?;

        let mut form = Form::new().part("image", image);
        if let Some(barcode) = &self.barcode {
            form = form.text("barcode", barcode.clone());
        }
        Ok(form.text("store_image", self.store_image.to_string()))
    }
}

#[derive(Debug, Display, Error, From)]
pub enum SubmitError {
    #[display("{_0}")]
    Rejected(UploadRejection),

    #[display("{_0}")]
    Api(ApiError),

    #[display("Cannot read {path}: {source}")]
    #[from(ignore)]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl SubmitError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SubmitError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Validates an image and creates the scan resource in a single request
pub struct ScanSubmitter<B: ?Sized> {
    backend: Arc<B>,
    policy: UploadPolicy,
}

impl<B: ScanBackend + ?Sized> ScanSubmitter<B> {
    pub fn new(backend: Arc<B>, policy: UploadPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Submit an in-memory upload. Rejections happen before any request.
    pub async fn submit(&self, upload: &ScanUpload) -> Result<Scan, SubmitError> {
        validate_upload(Some(&upload.candidate()), &self.policy)?;
        let scan = self.backend.create_scan(upload).await?;
        log::info!("Scan {} created with status {}", scan.id, scan.status);
        Ok(scan)
    }

    /// Validate a file from its metadata, then read and submit it.
    pub async fn submit_file(
        &self,
        path: &Path,
        barcode: Option<String>,
        store_image: bool,
    ) -> Result<Scan, SubmitError> {
        let candidate = UploadCandidate::inspect(path).map_err(|err| SubmitError::io(path, err))?;
        validate_upload(Some(&candidate), &self.policy)?;

        let data = tokio::fs::read(path)
            .await
            .map_err(|err| SubmitError::io(path, err))?;
        // validated above, so the type is known
        let mime = candidate.mime.unwrap_or_default();
        let upload = ScanUpload::from_bytes(candidate.file_name, mime, Bytes::from(data))
            .with_barcode(barcode)
            .with_store_image(store_image);

        self.submit(&upload).await
    }
}
