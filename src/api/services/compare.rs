use crate::protocol::{
    types::{CompareRequest, CompareResponse, Scan, ScanStatus},
    ApiClient, ApiError,
};

pub const SELECT_TWO_MESSAGE: &str = "Please select two products";
pub const SELECT_DIFFERENT_MESSAGE: &str = "Please select a different product";

pub struct CompareService<'a> {
    client: &'a ApiClient,
}

impl<'a> CompareService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn compare(&self, request: &CompareRequest) -> Result<CompareResponse, ApiError> {
        self.client.post_json("/compare", request).await
    }
}

/// Scans worth offering for comparison: completed, with a barcode or a score.
pub fn comparable(scans: &[Scan]) -> Vec<&Scan> {
    scans
        .iter()
        .filter(|scan| {
            scan.status == ScanStatus::Completed
                && (scan.known_barcode().is_some() || scan.nutri_score.is_some())
        })
        .collect()
}

/// Two slots, A and B, each holding a distinct scan
#[derive(Debug, Clone, Default)]
pub struct CompareSelection {
    a: Option<Scan>,
    b: Option<Scan>,
}

impl CompareSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn a(&self) -> Option<&Scan> {
        self.a.as_ref()
    }

    pub fn b(&self) -> Option<&Scan> {
        self.b.as_ref()
    }

    pub fn select_a(&mut self, scan: Scan) -> Result<(), ApiError> {
        ensure_distinct(&scan, self.b.as_ref())?;
        self.a = Some(scan);
        Ok(())
    }

    pub fn select_b(&mut self, scan: Scan) -> Result<(), ApiError> {
        ensure_distinct(&scan, self.a.as_ref())?;
        self.b = Some(scan);
        Ok(())
    }

    /// Request body for the current selection. Product references are the
    /// barcode when the scan has one, else the scan id.
    pub fn request(&self) -> Result<CompareRequest, ApiError> {
        match (&self.a, &self.b) {
            (Some(a), Some(b)) => Ok(CompareRequest {
                product_a: a.product_ref().to_string(),
                product_b: b.product_ref().to_string(),
            }),
            _ => Err(ApiError::validation(SELECT_TWO_MESSAGE)),
        }
    }
}

fn ensure_distinct(scan: &Scan, other: Option<&Scan>) -> Result<(), ApiError> {
    match other {
        Some(other) if other.id == scan.id => Err(ApiError::validation(SELECT_DIFFERENT_MESSAGE)),
        _ => Ok(()),
    }
}
