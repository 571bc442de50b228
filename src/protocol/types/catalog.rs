//! Product lookup, comparison and correction payloads.

use serde::{Deserialize, Serialize};
use strum::Display;

use super::{
    display::Tone,
    scan::{optional_grade, NutriScore},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductNutrients {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturated_fat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbohydrate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugars: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<f64>,
}

/// Product resolved from a barcode, either cached by the backend or fetched upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub barcode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrients: Option<ProductNutrients>,
    #[serde(
        default,
        deserialize_with = "optional_grade",
        skip_serializing_if = "Option::is_none"
    )]
    pub nutri_score: Option<NutriScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutri_score_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Winner {
    A,
    B,
    Tie,
}

impl Winner {
    pub fn tone(self) -> Tone {
        match self {
            Winner::A | Winner::B => Tone::Positive,
            Winner::Tie => Tone::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareRequest {
    pub product_a: String,
    pub product_b: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_grade",
        skip_serializing_if = "Option::is_none"
    )]
    pub nutri_score: Option<NutriScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientComparison {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_b: Option<f64>,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
    pub winner: Winner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResponse {
    pub product_a: ProductSummary,
    pub product_b: ProductSummary,
    pub comparisons: Vec<NutrientComparison>,
    pub winner: Winner,
    pub verdict: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CorrectionStatus {
    Pending,
    Approved,
    Rejected,
}

impl CorrectionStatus {
    pub fn tone(self) -> Tone {
        match self {
            CorrectionStatus::Pending => Tone::Info,
            CorrectionStatus::Approved => Tone::Positive,
            CorrectionStatus::Rejected => Tone::Negative,
        }
    }
}

/// User-submitted override of one nutrient value. Approval happens server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub id: String,
    pub scan_id: String,
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_value: Option<String>,
    pub corrected_value: String,
    pub status: CorrectionStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCorrectionRequest {
    pub field_name: String,
    pub corrected_value: String,
}
