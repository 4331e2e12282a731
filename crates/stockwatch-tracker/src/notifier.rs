//! Gate-checked SMS delivery.

use std::sync::Arc;

use stockwatch_core::{Catalog, Clock, StoreAvailability, TwilioConfig, Variant};
use stockwatch_notify::{
    format_availability_message, DeliveryId, NotificationSender, NotifyError, TEST_MESSAGE,
};
use tokio::sync::Mutex;

use crate::gate::{GateDecision, GateStats, NotificationGate};

/// Sender and recipient numbers for outbound SMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsRoute {
    pub from: String,
    pub to: String,
}

impl From<&TwilioConfig> for SmsRoute {
    fn from(config: &TwilioConfig) -> Self {
        Self {
            from: config.phone_from.clone(),
            to: config.phone_to.clone(),
        }
    }
}

/// What happened to one prospective availability alert.
#[derive(Debug)]
pub enum NotifyOutcome {
    Sent(DeliveryId),
    Suppressed(GateDecision),
    NotConfigured,
    Failed(NotifyError),
}

impl NotifyOutcome {
    /// A send was actually attempted (successfully or not).
    #[must_use]
    pub fn attempted(&self) -> bool {
        matches!(self, Self::Sent(_) | Self::Failed(_))
    }
}

/// Combines the gate, the transport, and message formatting.
///
/// Without a sender every alert resolves to [`NotifyOutcome::NotConfigured`]
/// and the gate is never consulted.
pub struct Notifier {
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    gate: Mutex<NotificationGate>,
    transport: Option<(Arc<dyn NotificationSender>, SmsRoute)>,
}

impl Notifier {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
        cooldown_minutes: u32,
        max_per_day: u32,
    ) -> Self {
        let gate = NotificationGate::new(Arc::clone(&clock), cooldown_minutes, max_per_day);
        Self {
            catalog,
            clock,
            gate: Mutex::new(gate),
            transport: None,
        }
    }

    #[must_use]
    pub fn with_sender(mut self, sender: Arc<dyn NotificationSender>, route: SmsRoute) -> Self {
        self.transport = Some((sender, route));
        self
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Alert that `variant` is now available at `store`, subject to the gate.
    ///
    /// The gate lock is held across the send so concurrent callers cannot
    /// both pass the same check. Gate state changes only on success.
    pub async fn notify_available(
        &self,
        store: &StoreAvailability,
        variant: &Variant,
    ) -> NotifyOutcome {
        let Some((sender, route)) = &self.transport else {
            tracing::warn!(
                store_id = %store.store_id,
                "notifier: SMS not configured; availability alert not sent"
            );
            return NotifyOutcome::NotConfigured;
        };

        let mut gate = self.gate.lock().await;
        let decision = gate.should_notify(&store.store_id);
        if !decision.is_allowed() {
            tracing::info!(
                store_id = %store.store_id,
                ?decision,
                "notifier: alert suppressed"
            );
            return NotifyOutcome::Suppressed(decision);
        }

        let body = format_availability_message(&self.catalog, variant, store, self.clock.now());
        match sender.send(&route.to, &route.from, &body).await {
            Ok(id) => {
                gate.record_sent(&store.store_id);
                tracing::info!(
                    store_id = %store.store_id,
                    store = %store.name,
                    message_id = %id,
                    "notifier: availability SMS sent"
                );
                NotifyOutcome::Sent(id)
            }
            Err(e) => {
                tracing::error!(
                    store_id = %store.store_id,
                    error = %e,
                    "notifier: failed to send availability SMS"
                );
                NotifyOutcome::Failed(e)
            }
        }
    }

    /// Send the fixed test message. Bypasses the gate.
    ///
    /// # Errors
    ///
    /// [`NotifyError::NotConfigured`] without a sender, otherwise whatever the
    /// transport reports.
    pub async fn send_test(&self) -> Result<DeliveryId, NotifyError> {
        let Some((sender, route)) = &self.transport else {
            return Err(NotifyError::NotConfigured);
        };
        let id = sender.send(&route.to, &route.from, TEST_MESSAGE).await?;
        tracing::info!(message_id = %id, "notifier: test SMS sent");
        Ok(id)
    }

    pub async fn stats(&self) -> GateStats {
        self.gate.lock().await.stats(&self.catalog)
    }
}

#[cfg(test)]
#[path = "notifier_test.rs"]
mod tests;
