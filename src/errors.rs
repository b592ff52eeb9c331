//! Error types for the archive feed.
//!
//! Nothing here is fatal to the feed itself: a [`FetchError`] becomes a
//! retryable error state on the store, a [`PreferenceError`] falls back to the
//! default language. Only [`ConfigError`] stops the binary at startup.

use thiserror::Error;

/// Failure while talking to the archive API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("archive request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("archive returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not a valid archive response.
    #[error("failed to decode archive response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request URL could not be built from the configured base.
    #[error("invalid archive url: {0}")]
    Url(#[from] url::ParseError),
}

/// Failure while reading or writing the persisted language preference.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference file io: {0}")]
    Io(#[from] std::io::Error),

    #[error("preference file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = FetchError::Status {
            status: 429,
            body: "Too Many Requests".to_string(),
        };
        assert_eq!(err.to_string(), "archive returned status 429: Too Many Requests");
    }

    #[test]
    fn test_decode_error_from_serde() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: FetchError = parse.unwrap_err().into();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_config_invalid_display() {
        let err = ConfigError::Invalid("month must be 1-12".to_string());
        assert_eq!(err.to_string(), "invalid configuration: month must be 1-12");
    }
}
