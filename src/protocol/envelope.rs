use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::error::ApiError;

/// Uniform response wrapper used by every backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Require the `data` member.
    pub fn into_data(self, endpoint: &str) -> Result<T, ApiError> {
        self.data.ok_or_else(|| ApiError::MissingData {
            endpoint: endpoint.to_string(),
        })
    }
}

/// Turn a raw HTTP response into an envelope, mapping error statuses and
/// `success: false` bodies to [`ApiError::Server`].
pub fn decode_envelope<T: DeserializeOwned>(
    endpoint: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<ApiEnvelope<T>, ApiError> {
    if !status.is_success() {
        let detail = serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(body)
            .ok()
            .and_then(|env| env.error.or(env.message));
        return Err(ApiError::Server {
            status: status.as_u16(),
            message: detail.unwrap_or_else(|| fallback_message(status)),
        });
    }

    // Some endpoints (DELETE) answer with an empty body.
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApiEnvelope {
            success: true,
            data: None,
            message: None,
            error: None,
        });
    }

    let envelope: ApiEnvelope<T> =
        serde_json::from_slice(body).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })?;

    if !envelope.success {
        return Err(ApiError::Server {
            status: status.as_u16(),
            message: envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "Request failed".to_string()),
        });
    }

    Ok(envelope)
}

fn fallback_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => format!("Request failed with status {}", status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_yields_data() {
        let body = br#"{"success": true, "data": {"x": 1}}"#;
        let env: ApiEnvelope<serde_json::Value> =
            decode_envelope("/x", StatusCode::OK, body).unwrap();
        assert_eq!(env.into_data("/x").unwrap()["x"], 1);
    }

    #[test]
    fn test_error_status_prefers_error_then_message() {
        let body = br#"{"success": false, "error": "Scan not found", "message": "nope"}"#;
        let err = decode_envelope::<serde_json::Value>("/scan/1", StatusCode::NOT_FOUND, body)
            .unwrap_err();
        assert_eq!(err.to_string(), "Scan not found");
        assert_eq!(err.status(), Some(404));

        let body = br#"{"success": false, "message": "Invalid input"}"#;
        let err = decode_envelope::<serde_json::Value>("/scan", StatusCode::BAD_REQUEST, body)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid input");
    }

    #[test]
    fn test_error_status_without_body_uses_reason() {
        let err = decode_envelope::<serde_json::Value>(
            "/scan",
            StatusCode::INTERNAL_SERVER_ERROR,
            b"<html>",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "500 Internal Server Error");
    }

    #[test]
    fn test_success_false_with_ok_status_is_an_error() {
        let body = br#"{"success": false, "error": "Quota exceeded"}"#;
        let err =
            decode_envelope::<serde_json::Value>("/scan", StatusCode::OK, body).unwrap_err();
        assert_eq!(err.to_string(), "Quota exceeded");
    }

    #[test]
    fn test_missing_data_and_empty_body() {
        let env: ApiEnvelope<serde_json::Value> =
            decode_envelope("/scan/1", StatusCode::NO_CONTENT, b"").unwrap();
        assert!(matches!(
            env.into_data("/scan/1"),
            Err(ApiError::MissingData { .. })
        ));

        let err = decode_envelope::<serde_json::Value>("/x", StatusCode::OK, b"not json")
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
