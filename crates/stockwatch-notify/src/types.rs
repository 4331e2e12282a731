//! Twilio Messages API payloads.
//!
//! Only the fields this crate reads are modelled; everything else in the
//! response is ignored.

use serde::Deserialize;

/// Successful `POST .../Messages.json` response.
#[derive(Debug, Deserialize)]
pub struct MessageResource {
    /// Message SID, e.g. `"SM1f0e..."`.
    pub sid: String,
    /// `queued`, `sending`, `sent`, ...
    #[serde(default)]
    pub status: Option<String>,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub more_info: Option<String>,
}
