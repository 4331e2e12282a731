use thiserror::Error;

/// Errors returned while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The SMS provider rejected the request.
    #[error("SMS provider error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid SMS provider base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// No sender credentials are configured, so nothing can be delivered.
    #[error("SMS notifications are not configured")]
    NotConfigured,
}
