use crate::protocol::{http::segment, types::Product, ApiClient, ApiError};

pub const EMPTY_BARCODE_MESSAGE: &str = "Please enter or scan a barcode";

pub struct ProductService<'a> {
    client: &'a ApiClient,
}

impl<'a> ProductService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Look up a product in the backend cache or its external catalogue.
    pub async fn by_barcode(&self, barcode: &str) -> Result<Product, ApiError> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Err(ApiError::validation(EMPTY_BARCODE_MESSAGE));
        }
        self.client
            .get(&format!("/product/{}", segment(barcode)))
            .await
    }
}
