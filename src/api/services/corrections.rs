use std::str::FromStr;

use crate::protocol::{
    http::segment,
    types::{Correction, CreateCorrectionRequest, NutrientField},
    ApiClient, ApiError,
};

pub struct CorrectionService<'a> {
    client: &'a ApiClient,
}

impl<'a> CorrectionService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Propose a new value for one nutrient of a scan.
    pub async fn submit(
        &self,
        scan_id: &str,
        field: &str,
        value: &str,
    ) -> Result<Correction, ApiError> {
        let request = correction_request(field, value)?;
        self.client
            .post_json(&format!("/scan/{}/correct", segment(scan_id)), &request)
            .await
    }

    pub async fn list(&self, scan_id: &str) -> Result<Vec<Correction>, ApiError> {
        let corrections = self
            .client
            .get_optional::<Vec<Correction>>(&format!("/scan/{}/corrections", segment(scan_id)))
            .await?;
        Ok(corrections.unwrap_or_default())
    }
}

/// Check a correction locally. Nothing is sent when this fails.
pub fn correction_request(field: &str, value: &str) -> Result<CreateCorrectionRequest, ApiError> {
    let field = NutrientField::from_str(field.trim())
        .map_err(|_| ApiError::validation(format!("Unknown nutrient field '{}'", field.trim())))?;

    let value = value.trim();
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() && number >= 0.0 => {}
        _ => {
            return Err(ApiError::validation(format!(
                "Value for {field} must be a non-negative number"
            )))
        }
    }

    Ok(CreateCorrectionRequest {
        field_name: field.to_string(),
        corrected_value: value.to_string(),
    })
}
