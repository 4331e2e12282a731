pub mod client;
pub mod error;
pub mod page;
pub mod parse;
mod retry;
pub mod source;
pub mod types;

pub use client::{ClientOptions, PickupClient};
pub use error::ScraperError;
pub use page::{HttpPageRenderer, PageRenderer, PageScraper};
pub use source::{AvailabilitySource, SourceChain, SourcedSnapshot, UnavailableDefault};
pub use types::{PartAvailability, PickupMessageResponse, PickupStore};
