//! HTTP client for the Twilio Messages REST API.
//!
//! Wraps `reqwest` with Twilio's account-scoped URL layout, HTTP basic auth,
//! and error-envelope handling. Sends are never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use stockwatch_core::TwilioConfig;

use crate::error::NotifyError;
use crate::sender::{DeliveryId, NotificationSender};
use crate::types::{ApiErrorBody, MessageResource};

const DEFAULT_BASE_URL: &str = "https://api.twilio.com/";

/// Client for the Twilio Messages API.
///
/// Use [`TwilioClient::new`] for production or [`TwilioClient::with_base_url`]
/// to point at a mock server in tests.
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    base_url: Url,
}

impl TwilioClient {
    /// Creates a client pointed at the production Twilio API.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(account_sid: &str, auth_token: &str, timeout_secs: u64) -> Result<Self, NotifyError> {
        Self::with_base_url(account_sid, auth_token, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Convenience constructor from loaded configuration.
    ///
    /// # Errors
    ///
    /// See [`TwilioClient::new`].
    pub fn from_config(config: &TwilioConfig, timeout_secs: u64) -> Result<Self, NotifyError> {
        Self::new(&config.account_sid, &config.auth_token, timeout_secs)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`NotifyError::InvalidBaseUrl`] if `base_url` does
    /// not parse.
    pub fn with_base_url(
        account_sid: &str,
        auth_token: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("stockwatch/0.1 (pickup-alerts)")
            .build()?;

        // Exactly one trailing slash so `join` appends rather than replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| NotifyError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            account_sid: account_sid.to_owned(),
            auth_token: auth_token.to_owned(),
            base_url,
        })
    }

    fn messages_url(&self) -> Result<Url, NotifyError> {
        let path = format!("2010-04-01/Accounts/{}/Messages.json", self.account_sid);
        self.base_url
            .join(&path)
            .map_err(|e| NotifyError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl NotificationSender for TwilioClient {
    /// # Errors
    ///
    /// - [`NotifyError::Api`] when Twilio answers with a non-2xx status.
    /// - [`NotifyError::Http`] on network failure.
    /// - [`NotifyError::Deserialize`] if a 2xx body lacks a message SID.
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<DeliveryId, NotifyError> {
        let url = self.messages_url()?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let api_error: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                code: api_error.code,
                message: api_error
                    .message
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string()),
            });
        }

        let message: MessageResource =
            serde_json::from_str(&text).map_err(|e| NotifyError::Deserialize {
                context: "Messages.json response".to_string(),
                source: e,
            })?;

        tracing::debug!(sid = %message.sid, status = ?message.status, "notify: message accepted");
        Ok(DeliveryId(message.sid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_url_is_account_scoped() {
        let client = TwilioClient::with_base_url("AC123", "token", 5, "https://api.twilio.com")
            .expect("client construction should not fail");
        assert_eq!(
            client.messages_url().unwrap().as_str(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn messages_url_keeps_base_path_prefix() {
        let client = TwilioClient::with_base_url("AC123", "token", 5, "http://127.0.0.1:9000/mock/")
            .expect("client construction should not fail");
        assert_eq!(
            client.messages_url().unwrap().as_str(),
            "http://127.0.0.1:9000/mock/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = TwilioClient::with_base_url("AC123", "token", 5, "not a url");
        assert!(matches!(result, Err(NotifyError::InvalidBaseUrl { .. })));
    }
}
