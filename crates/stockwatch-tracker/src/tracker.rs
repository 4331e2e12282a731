//! The check cycle: fetch, diff against the previous snapshot, alert on
//! preferred-variant arrivals, replace the snapshot, record history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use stockwatch_core::{AvailabilitySnapshot, Catalog, Clock, StoreAvailability};
use stockwatch_scraper::SourceChain;
use tokio::sync::RwLock;

use crate::notifier::{Notifier, NotifyOutcome};

/// Maximum number of retained check records.
pub const HISTORY_LIMIT: usize = 100;

/// Records included in [`TrackerStatus::recent`].
pub const STATUS_RECENT_RECORDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Scheduled,
    Manual,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub duration_ms: u64,
    pub trigger: Trigger,
    /// Strategy that produced the data, e.g. `"pickup_api"`.
    pub source: String,
    pub results: AvailabilitySnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub timestamp: DateTime<FixedOffset>,
    pub duration_ms: u64,
    pub trigger: Trigger,
    pub source: String,
    pub stores_checked: usize,
    pub available_stores: Vec<String>,
    pub notifications_attempted: usize,
    pub notifications_sent: usize,
}

#[derive(Debug)]
pub enum CheckOutcome {
    Completed(CheckSummary),
    /// Another check was already running; nothing changed.
    Busy,
    /// The fetch failed; snapshot and history are unchanged.
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub last_check: Option<DateTime<FixedOffset>>,
    pub total_checks: u64,
    pub checking: bool,
    pub snapshot: AvailabilitySnapshot,
    pub recent: Vec<CheckRecord>,
}

#[derive(Default)]
struct TrackerState {
    snapshot: AvailabilitySnapshot,
    history: VecDeque<CheckRecord>,
    last_check: Option<DateTime<FixedOffset>>,
    total_checks: u64,
}

/// Clears the busy flag on drop, including on early return and unwind.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the live snapshot and the bounded check history.
pub struct Tracker {
    catalog: Arc<Catalog>,
    sources: SourceChain,
    notifier: Arc<Notifier>,
    clock: Arc<dyn Clock>,
    busy: AtomicBool,
    state: RwLock<TrackerState>,
}

impl Tracker {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        sources: SourceChain,
        notifier: Arc<Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            sources,
            notifier,
            clock,
            busy: AtomicBool::new(false),
            state: RwLock::new(TrackerState::default()),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    #[must_use]
    pub fn is_checking(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run one check cycle unless one is already in flight.
    ///
    /// Alerts go out, one at a time, before the new snapshot is published.
    pub async fn run_check(&self, trigger: Trigger) -> CheckOutcome {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::info!(?trigger, "tracker: check already in progress; skipping");
            return CheckOutcome::Busy;
        };

        let started = Instant::now();
        let timestamp = self.clock.now();
        tracing::info!(?trigger, "tracker: starting availability check");

        let fetched = match self
            .sources
            .fetch(&self.catalog.variants, &self.catalog.stores)
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!(error = %e, "tracker: availability check failed");
                return CheckOutcome::Failed(e.to_string());
            }
        };

        let arrivals = {
            let state = self.state.read().await;
            self.diff(&state.snapshot, &fetched.snapshot)
        };

        let mut notifications_attempted = 0;
        let mut notifications_sent = 0;
        if let Some(preferred) = self.catalog.preferred() {
            for store in &arrivals {
                let outcome = self.notifier.notify_available(store, preferred).await;
                if outcome.attempted() {
                    notifications_attempted += 1;
                }
                if matches!(outcome, NotifyOutcome::Sent(_)) {
                    notifications_sent += 1;
                }
            }
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let available_stores: Vec<String> = fetched
            .snapshot
            .values()
            .filter(|s| s.available)
            .map(|s| s.store_id.clone())
            .collect();
        let summary = CheckSummary {
            timestamp,
            duration_ms,
            trigger,
            source: fetched.source.to_string(),
            stores_checked: fetched.snapshot.len(),
            available_stores,
            notifications_attempted,
            notifications_sent,
        };

        {
            let mut state = self.state.write().await;
            state.history.push_front(CheckRecord {
                timestamp,
                duration_ms,
                trigger,
                source: fetched.source.to_string(),
                results: fetched.snapshot.clone(),
            });
            state.history.truncate(HISTORY_LIMIT);
            state.snapshot = fetched.snapshot;
            state.last_check = Some(timestamp);
            state.total_checks += 1;
        }

        tracing::info!(
            duration_ms,
            source = fetched.source,
            stores = summary.stores_checked,
            available = summary.available_stores.len(),
            "tracker: availability check completed"
        );
        CheckOutcome::Completed(summary)
    }

    /// Stores where the preferred SKU appears now but did not before.
    ///
    /// Stores that became available with other variants only are logged.
    fn diff(
        &self,
        previous: &AvailabilitySnapshot,
        current: &AvailabilitySnapshot,
    ) -> Vec<StoreAvailability> {
        let preferred = self.catalog.preferred_sku.as_str();
        let mut arrivals = Vec::new();

        for (store_id, now) in current {
            let before = previous.get(store_id);
            let was_available = before.is_some_and(|s| s.available);
            let had_preferred = before.is_some_and(|s| s.offers_sku(preferred));

            if now.offers_sku(preferred) && !had_preferred {
                tracing::info!(
                    store_id = %store_id,
                    store = %now.name,
                    sku = preferred,
                    "tracker: preferred variant now available"
                );
                arrivals.push(now.clone());
            } else if now.available && !was_available {
                let skus: Vec<&str> = now
                    .available_variants
                    .iter()
                    .map(|v| v.variant.sku.as_str())
                    .collect();
                tracing::info!(
                    store_id = %store_id,
                    store = %now.name,
                    skus = ?skus,
                    "tracker: store now has stock, but not the preferred variant"
                );
            }
        }

        arrivals
    }

    pub async fn snapshot(&self) -> AvailabilitySnapshot {
        self.state.read().await.snapshot.clone()
    }

    /// Up to `limit` newest records, newest first.
    pub async fn history(&self, limit: usize) -> Vec<CheckRecord> {
        self.state
            .read()
            .await
            .history
            .iter()
            .take(limit.min(HISTORY_LIMIT))
            .cloned()
            .collect()
    }

    pub async fn status(&self) -> TrackerStatus {
        let state = self.state.read().await;
        TrackerStatus {
            last_check: state.last_check,
            total_checks: state.total_checks,
            checking: self.is_checking(),
            snapshot: state.snapshot.clone(),
            recent: state
                .history
                .iter()
                .take(STATUS_RECENT_RECORDS)
                .cloned()
                .collect(),
        }
    }
}
