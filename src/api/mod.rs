//! Client-side workflows over the backend API.

pub mod barcode;
pub mod scan;
pub mod services;
pub mod traits;

pub use barcode::{BarcodeError, DecodeConfig, ExternalDecoder};
pub use scan::{PollConfig, PollHandle, PollOutcome, ScanUpload, ScanWorkflow, UploadPolicy};
pub use traits::{BarcodeDecoder, FrameSource, ScanBackend};
