use crate::GENERIC_DISPATCH_ERROR;
use serde_json::Value;

/// Why a proxy dispatch did not produce content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("backend rejected the request (HTTP {status})")]
    Rejected { status: u16, detail: Option<String> },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unreadable response body: {0}")]
    Body(String),
}

impl DispatchError {
    /// Build the error for a non-2xx response, keeping the backend's `detail`.
    pub fn from_response(status: u16, body: &str) -> Self {
        DispatchError::Rejected {
            status,
            detail: extract_detail(body),
        }
    }

    /// The text shown to the user: the backend's detail when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            DispatchError::Rejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => GENERIC_DISPATCH_ERROR.to_string(),
        }
    }
}

/// Pull a non-blank string `detail` field out of a JSON error body.
pub fn extract_detail(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("detail")?
        .as_str()
        .map(str::trim)
        .filter(|detail| !detail.is_empty())
        .map(ToString::to_string)
}
