use async_trait::async_trait;

use super::PageQuery;
use crate::{
    api::{scan::ScanUpload, traits::ScanBackend},
    protocol::{
        http::segment,
        types::{PaginatedScans, Scan, ScanImage},
        ApiClient, ApiError,
    },
};

pub struct ScanService<'a> {
    client: &'a ApiClient,
}

impl<'a> ScanService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// `POST /scan` as multipart. Callers validate the upload first.
    pub async fn create(&self, upload: &ScanUpload) -> Result<Scan, ApiError> {
        self.client.post_multipart("/scan", || upload.form()).await
    }

    pub async fn list(&self, page: u32, limit: u32) -> Result<PaginatedScans, ApiError> {
        self.client
            .get_query("/scan", &PageQuery::new(page, limit))
            .await
    }

    pub async fn get(&self, scan_id: &str) -> Result<Scan, ApiError> {
        self.client
            .get(&format!("/scan/{}", segment(scan_id)))
            .await
    }

    /// Short-lived URL of the stored label image.
    pub async fn image_url(&self, scan_id: &str) -> Result<String, ApiError> {
        let image: ScanImage = self
            .client
            .get(&format!("/scan/{}/image", segment(scan_id)))
            .await?;
        Ok(image.image_url)
    }

    pub async fn delete(&self, scan_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/scan/{}", segment(scan_id)))
            .await
    }
}

#[async_trait]
impl ScanBackend for ApiClient {
    async fn create_scan(&self, upload: &ScanUpload) -> Result<Scan, ApiError> {
        self.scans().create(upload).await
    }

    async fn fetch_scan(&self, scan_id: &str) -> Result<Scan, ApiError> {
        self.scans().get(scan_id).await
    }
}
