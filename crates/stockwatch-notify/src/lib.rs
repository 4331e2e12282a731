pub mod client;
pub mod error;
pub mod message;
pub mod sender;
pub mod types;

pub use client::TwilioClient;
pub use error::NotifyError;
pub use message::{format_availability_message, TEST_MESSAGE};
pub use sender::{DeliveryId, NotificationSender};
