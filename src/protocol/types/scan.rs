use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

use super::display::Tone;

/// Lifecycle of a scan on the backend.
///
/// `pending -> processing -> {completed | failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }

    pub fn tone(self) -> Tone {
        match self {
            ScanStatus::Pending => Tone::Muted,
            ScanStatus::Processing => Tone::Info,
            ScanStatus::Completed => Tone::Positive,
            ScanStatus::Failed => Tone::Negative,
        }
    }
}

/// Single-letter health rating. Catalogue grades outside A-E ("unknown",
/// "not-applicable") land on `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum NutriScore {
    #[serde(alias = "a")]
    A,
    #[serde(alias = "b")]
    B,
    #[serde(alias = "c")]
    C,
    #[serde(alias = "d")]
    D,
    #[serde(alias = "e")]
    E,
    #[serde(rename = "unknown")]
    #[serde(other)]
    #[strum(serialize = "unknown")]
    Unknown,
}

impl NutriScore {
    /// Official band colour.
    pub fn color_hex(self) -> &'static str {
        match self {
            NutriScore::A => "#038141",
            NutriScore::B => "#85bb2f",
            NutriScore::C => "#fecb02",
            NutriScore::D => "#ee8100",
            NutriScore::E => "#e63e11",
            NutriScore::Unknown => "#475569",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            NutriScore::A | NutriScore::B => Tone::Positive,
            NutriScore::C => Tone::Caution,
            NutriScore::D | NutriScore::E => Tone::Negative,
            NutriScore::Unknown => Tone::Muted,
        }
    }
}

/// `deserialize_with` for optional grades: null or blank reads as no grade,
/// anything unrecognised as [`NutriScore::Unknown`].
pub(crate) fn optional_grade<'de, D>(deserializer: D) -> Result<Option<NutriScore>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .map(str::trim)
        .filter(|grade| !grade.is_empty())
        .map(|grade| NutriScore::from_str(grade).unwrap_or(NutriScore::Unknown)))
}

/// Nutrient breakdown per serving, every value optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_kcal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturated_fat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbohydrates: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugars: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<f64>,
}

/// Nutrient fields a user may submit a correction for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum NutrientField {
    EnergyKcal,
    Fat,
    SaturatedFat,
    Carbohydrates,
    Sugars,
    Fiber,
    Protein,
    Sodium,
    Salt,
}

impl NutrientField {
    pub fn unit(self) -> &'static str {
        match self {
            NutrientField::EnergyKcal => "kcal",
            NutrientField::Sodium => "mg",
            _ => "g",
        }
    }

    pub fn value_in(self, nutrients: &Nutrients) -> Option<f64> {
        match self {
            NutrientField::EnergyKcal => nutrients.energy_kcal,
            NutrientField::Fat => nutrients.fat,
            NutrientField::SaturatedFat => nutrients.saturated_fat,
            NutrientField::Carbohydrates => nutrients.carbohydrates,
            NutrientField::Sugars => nutrients.sugars,
            NutrientField::Fiber => nutrients.fiber,
            NutrientField::Protein => nutrients.protein,
            NutrientField::Sodium => nutrients.sodium,
            NutrientField::Salt => nutrients.salt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HighlightLevel {
    Low,
    Medium,
    High,
}

impl HighlightLevel {
    pub fn tone(self) -> Tone {
        match self {
            HighlightLevel::Low => Tone::Positive,
            HighlightLevel::Medium => Tone::Caution,
            HighlightLevel::High => Tone::Negative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientHighlight {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub level: HighlightLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InsightType {
    Positive,
    Negative,
    Neutral,
    Warning,
}

impl InsightType {
    pub fn tone(self) -> Tone {
        match self {
            InsightType::Positive => Tone::Positive,
            InsightType::Negative => Tone::Negative,
            InsightType::Warning => Tone::Caution,
            InsightType::Neutral => Tone::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightType,
    pub title: String,
    pub message: String,
}

/// Server-side record of one nutrition-label analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub status: ScanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_grade",
        skip_serializing_if = "Option::is_none"
    )]
    pub nutri_score: Option<NutriScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutri_score_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrients: Option<Nutrients>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<NutrientHighlight>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<Insight>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: String,
}

impl Scan {
    /// Barcode, unless it is missing or blank.
    pub fn known_barcode(&self) -> Option<&str> {
        self.barcode
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// Reference used when comparing products: barcode when known, else the scan id.
    pub fn product_ref(&self) -> &str {
        self.known_barcode().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedScans {
    pub scans: Vec<Scan>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Payload of `GET /scan/{id}/image`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanImage {
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_scan_decodes_wire_record() {
        let json = r#"{
            "id": "s1",
            "status": "completed",
            "nutri_score": "B",
            "nutrients": {"fat": 3.5, "sugars": 12},
            "highlights": [{"name": "sugars", "value": 12, "unit": "g", "level": "high", "message": "High sugar"}],
            "insights": [{"type": "warning", "title": "Sugar", "message": "Watch it"}],
            "created_at": "2024-05-01T10:00:00Z"
        }"#;

        let scan: Scan = serde_json::from_str(json).unwrap();
        assert_eq!(scan.status, ScanStatus::Completed);
        assert_eq!(scan.nutri_score, Some(NutriScore::B));
        assert_eq!(scan.nutrients.as_ref().unwrap().sugars, Some(12.0));
        assert_eq!(scan.highlights.as_ref().unwrap()[0].level, HighlightLevel::High);
        assert_eq!(scan.insights.as_ref().unwrap()[0].kind, InsightType::Warning);
        assert_eq!(scan.product_ref(), "s1");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let json = r#"{"id": "s1", "status": "queued", "created_at": "x"}"#;
        assert!(serde_json::from_str::<Scan>(json).is_err());
    }

    #[test]
    fn test_lowercase_nutri_score_accepted() {
        let score: NutriScore = serde_json::from_str("\"d\"").unwrap();
        assert_eq!(score, NutriScore::D);
        assert_eq!(NutriScore::from_str("e").unwrap(), NutriScore::E);
        assert_eq!(score.tone(), Tone::Negative);
    }

    #[test]
    fn test_unrecognised_grades_do_not_break_decoding() {
        let scan: Scan = serde_json::from_str(
            r#"{"id": "s1", "status": "processing", "nutri_score": "", "created_at": "x"}"#,
        )
        .unwrap();
        assert_eq!(scan.nutri_score, None);

        let scan: Scan = serde_json::from_str(
            r#"{"id": "s1", "status": "completed", "nutri_score": "unknown", "created_at": "x"}"#,
        )
        .unwrap();
        assert_eq!(scan.nutri_score, Some(NutriScore::Unknown));

        let scan: Scan = serde_json::from_str(
            r#"{"id": "s1", "status": "completed", "nutri_score": null, "created_at": "x"}"#,
        )
        .unwrap();
        assert_eq!(scan.nutri_score, None);

        let grade: NutriScore = serde_json::from_str("\"not-applicable\"").unwrap();
        assert_eq!(grade, NutriScore::Unknown);
        assert_eq!(grade.tone(), Tone::Muted);
        assert_eq!(grade.color_hex(), "#475569");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ScanStatus::Pending.is_terminal());
        assert!(!ScanStatus::Processing.is_terminal());
        assert!(ScanStatus::Completed.is_terminal());
        assert!(ScanStatus::Failed.is_terminal());
    }

    #[test]
    fn test_nutrient_fields_round_trip_names() {
        for field in NutrientField::iter() {
            let name = field.to_string();
            assert_eq!(NutrientField::from_str(&name).unwrap(), field);
        }
        assert_eq!(NutrientField::SaturatedFat.to_string(), "saturated_fat");
        assert!(NutrientField::from_str("vitamin_c").is_err());
    }
}
