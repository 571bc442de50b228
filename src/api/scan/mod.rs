//! Scan workflow: validate an image, create the scan, follow it to a
//! terminal state.
//!
//! ```text
//! validator -> submitter -> poller -> outcome
//! ```

pub mod poller;
pub mod submitter;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use poller::{
    poll_scan, PollConfig, PollControl, PollEvent, PollHandle, PollMachine, PollOutcome,
    PollState, Step, Tick,
};
pub use submitter::{ScanSubmitter, ScanUpload, SubmitError};
pub use validator::{validate_upload, UploadCandidate, UploadPolicy, UploadRejection};

use std::{path::Path, sync::Arc};

use crate::api::traits::ScanBackend;

/// Submitter and poller wired to the same backend
pub struct ScanWorkflow<B: ?Sized> {
    backend: Arc<B>,
    submitter: ScanSubmitter<B>,
    poll: PollConfig,
}

impl<B: ScanBackend + ?Sized + 'static> ScanWorkflow<B> {
    pub fn new(backend: Arc<B>, policy: UploadPolicy, poll: PollConfig) -> Self {
        Self {
            submitter: ScanSubmitter::new(backend.clone(), policy),
            backend,
            poll,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        self.submitter.policy()
    }

    /// Submit an in-memory upload and start polling it.
    pub async fn start(&self, upload: &ScanUpload) -> Result<PollHandle, SubmitError> {
        let scan = self.submitter.submit(upload).await?;
        Ok(PollHandle::spawn(self.backend.clone(), scan, self.poll.clone()))
    }

    pub async fn start_file(
        &self,
        path: &Path,
        barcode: Option<String>,
        store_image: bool,
    ) -> Result<PollHandle, SubmitError> {
        let scan = self
            .submitter
            .submit_file(path, barcode, store_image)
            .await?;
        Ok(PollHandle::spawn(self.backend.clone(), scan, self.poll.clone()))
    }

    /// Submit and wait for the poll to resolve.
    pub async fn run(&self, upload: &ScanUpload) -> anyhow::Result<PollOutcome> {
        let handle = self.start(upload).await?;
        handle.wait().await
    }
}
