//! Rate limiting for outbound alerts.
//!
//! Two independent gates apply: a per-store cooldown and a process-wide daily
//! cap. The daily counter resets the first time it is consulted on a new local
//! calendar day.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Serialize;
use stockwatch_core::{Catalog, Clock};

/// Verdict for one prospective notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    DailyLimitReached,
    CoolingDown { remaining: Duration },
}

impl GateDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LastNotification {
    pub store_id: String,
    pub store_name: String,
    pub time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateStats {
    pub daily_count: u32,
    pub daily_limit: u32,
    pub cooldown_minutes: u32,
    pub last_notifications: Vec<LastNotification>,
}

pub struct NotificationGate {
    clock: Arc<dyn Clock>,
    cooldown_minutes: u32,
    max_per_day: u32,
    last_sent: HashMap<String, DateTime<FixedOffset>>,
    daily_count: u32,
    reset_date: NaiveDate,
}

impl NotificationGate {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, cooldown_minutes: u32, max_per_day: u32) -> Self {
        let reset_date = clock.today();
        Self {
            clock,
            cooldown_minutes,
            max_per_day,
            last_sent: HashMap::new(),
            daily_count: 0,
            reset_date,
        }
    }

    /// Decide whether `store_id` may be alerted right now.
    ///
    /// Rolls the daily counter over first when the local date has changed.
    pub fn should_notify(&mut self, store_id: &str) -> GateDecision {
        let now = self.clock.now();
        let today = now.date_naive();
        if today != self.reset_date {
            tracing::info!(
                previous = %self.reset_date,
                today = %today,
                "gate: daily notification counter reset"
            );
            self.daily_count = 0;
            self.reset_date = today;
        }

        if self.daily_count >= self.max_per_day {
            tracing::warn!(
                limit = self.max_per_day,
                "gate: daily notification limit reached"
            );
            return GateDecision::DailyLimitReached;
        }

        if let Some(last) = self.last_sent.get(store_id) {
            let cooldown = Duration::minutes(i64::from(self.cooldown_minutes));
            let elapsed = now.signed_duration_since(*last);
            if elapsed < cooldown {
                let remaining = cooldown - elapsed;
                tracing::debug!(
                    store_id,
                    remaining_minutes = ceil_minutes(remaining),
                    "gate: cooldown active"
                );
                return GateDecision::CoolingDown { remaining };
            }
        }

        GateDecision::Allow
    }

    /// Note a successful send to `store_id`.
    pub fn record_sent(&mut self, store_id: &str) {
        let now = self.clock.now();
        let today = now.date_naive();
        if today != self.reset_date {
            self.daily_count = 0;
            self.reset_date = today;
        }
        self.last_sent.insert(store_id.to_owned(), now);
        self.daily_count = self.daily_count.saturating_add(1);
    }

    /// Counters as they apply today, with store names taken from `catalog`.
    #[must_use]
    pub fn stats(&self, catalog: &Catalog) -> GateStats {
        let daily_count = if self.clock.today() == self.reset_date {
            self.daily_count
        } else {
            0
        };

        let mut last_notifications: Vec<LastNotification> = self
            .last_sent
            .iter()
            .map(|(store_id, time)| LastNotification {
                store_id: store_id.clone(),
                store_name: catalog.store_name(store_id).to_owned(),
                time: *time,
            })
            .collect();
        last_notifications.sort_by(|a, b| a.store_id.cmp(&b.store_id));

        GateStats {
            daily_count,
            daily_limit: self.max_per_day,
            cooldown_minutes: self.cooldown_minutes,
            last_notifications,
        }
    }
}

fn ceil_minutes(d: Duration) -> i64 {
    let secs = d.num_seconds();
    (secs + 59) / 60
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
