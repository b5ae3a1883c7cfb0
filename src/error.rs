use thiserror::Error;

/// Maximum characters of a response body to include in error messages.
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors that can occur when talking to the SSO control-plane.
#[derive(Debug, Error)]
pub enum SsoError {
    /// The requested operation name is not in the supported target list.
    ///
    /// Raised locally, before any request is made.
    #[error("unsupported API target: {0}")]
    UnsupportedTarget(String),

    /// HTTP/network layer error from reqwest.
    #[error("HTTP request failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("API call failed with HTTP {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Response deserialization error.
    #[error("deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// The session provider could not produce an authenticated session.
    #[error("authentication error: {0}")]
    Auth(String),

    /// A workflow step referenced an entity that does not exist.
    #[error("no {entity} named '{name}'")]
    NotFound { entity: &'static str, name: String },
}

impl SsoError {
    /// Builds an [`SsoError::Api`] carrying a truncated copy of the body.
    pub(crate) fn api(status: reqwest::StatusCode, body: &str) -> Self {
        SsoError::Api {
            status,
            body: truncate_str(body, MAX_ERROR_BODY_CHARS).to_string(),
        }
    }

    /// Returns the HTTP status if the remote service rejected the call.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            SsoError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A specialized Result type for SSO operations.
pub type Result<T> = std::result::Result<T, SsoError>;

/// Truncates a string to at most `max_chars` characters on a valid UTF-8 boundary.
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_target_display() {
        let err = SsoError::UnsupportedTarget("DeleteDirectory".to_string());
        assert_eq!(err.to_string(), "unsupported API target: DeleteDirectory");
    }

    #[test]
    fn api_error_display() {
        let err = SsoError::api(reqwest::StatusCode::BAD_GATEWAY, "upstream timed out");
        let msg = err.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("upstream timed out"));
    }

    #[test]
    fn api_error_truncates_body() {
        let body = "x".repeat(1000);
        let err = SsoError::api(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        match err {
            SsoError::Api { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY_CHARS),
            other => panic!("expected SsoError::Api, got: {:?}", other),
        }
    }

    #[test]
    fn status_accessor() {
        let err = SsoError::api(reqwest::StatusCode::FORBIDDEN, "denied");
        assert_eq!(err.status(), Some(reqwest::StatusCode::FORBIDDEN));
        assert!(SsoError::Auth("no session".into()).status().is_none());
    }

    #[test]
    fn not_found_display() {
        let err = SsoError::NotFound {
            entity: "group",
            name: "developers".to_string(),
        };
        assert_eq!(err.to_string(), "no group named 'developers'");
    }

    #[test]
    fn truncate_str_short() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn truncate_str_long() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn truncate_str_multibyte() {
        let s = "中文测试数据";
        assert_eq!(truncate_str(s, 4), "中文测试");
    }
}
