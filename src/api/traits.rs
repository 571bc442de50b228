/// Core client traits - abstract interfaces at the seams of the scan workflow
///
/// The scan submitter and status poller talk to the backend only through
/// [`ScanBackend`], so tests can script responses without a server. Barcode
/// capture is split the same way: [`BarcodeDecoder`] wraps whatever decoding
/// library or program is available, [`FrameSource`] wraps whatever produces
/// camera frames.
use anyhow::Result;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;

use crate::{
    api::{barcode::DecodeConfig, scan::ScanUpload},
    protocol::{types::Scan, ApiError},
};

/// Backend operations needed to create a scan and follow it to completion
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Create a scan from an already validated upload. Never retried.
    async fn create_scan(&self, upload: &ScanUpload) -> Result<Scan, ApiError>;

    /// Read the authoritative state of a scan
    async fn fetch_scan(&self, scan_id: &str) -> Result<Scan, ApiError>;
}

#[async_trait]
impl<T: ScanBackend + ?Sized> ScanBackend for Arc<T> {
    async fn create_scan(&self, upload: &ScanUpload) -> Result<Scan, ApiError> {
        (**self).create_scan(upload).await
    }

    async fn fetch_scan(&self, scan_id: &str) -> Result<Scan, ApiError> {
        (**self).fetch_scan(scan_id).await
    }
}

/// Decoder for a single still image
///
/// Returns `Ok(None)` when the image was processed but holds no readable
/// barcode, `Err` when the decoder itself could not run.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, image: &DynamicImage, config: &DecodeConfig) -> Result<Option<String>>;
}

/// Producer of camera frames
pub trait FrameSource: Send {
    /// Next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<DynamicImage>>;

    /// Release the underlying device. Must be safe to call more than once.
    fn release(&mut self);

    fn is_released(&self) -> bool;
}
