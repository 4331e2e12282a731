use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::NotifyError;

/// Provider-assigned identifier of a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeliveryId(pub String);

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport that delivers a text message to a phone number.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<DeliveryId, NotifyError>;
}
