use derive_more::{Display, Error};

/// Failure of a single backend call.
///
/// Variants follow the client's error taxonomy: `Validation` never touched the
/// network, `Transport` never completed, `Server` completed with an error
/// envelope or status, `SessionExpired` survived the single refresh-and-retry.
#[derive(Debug, Display, Error)]
pub enum ApiError {
    #[display("{message}")]
    Validation { message: String },

    #[display("Network error: {source}")]
    Transport { source: reqwest::Error },

    #[display("{message}")]
    Server { status: u16, message: String },

    #[display("Session expired, please log in again")]
    SessionExpired,

    #[display("Malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },

    #[display("Response from {endpoint} carried no data")]
    MissingData { endpoint: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
        }
    }

    /// HTTP status for server-reported errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(401),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(source: reqwest::Error) -> Self {
        ApiError::Transport { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        let err = ApiError::Server {
            status: 404,
            message: "Product not found".to_string(),
        };
        assert_eq!(err.to_string(), "Product not found");
        assert!(err.is_not_found());

        let err = ApiError::validation("Please enter or scan a barcode");
        assert_eq!(err.to_string(), "Please enter or scan a barcode");
        assert_eq!(err.status(), None);
    }
}
