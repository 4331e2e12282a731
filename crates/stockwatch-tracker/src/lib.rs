pub mod gate;
pub mod notifier;
pub mod tracker;

pub use gate::{GateDecision, GateStats, LastNotification, NotificationGate};
pub use notifier::{Notifier, NotifyOutcome, SmsRoute};
pub use tracker::{
    CheckOutcome, CheckRecord, CheckSummary, Tracker, TrackerStatus, Trigger, HISTORY_LIMIT,
    STATUS_RECENT_RECORDS,
};
