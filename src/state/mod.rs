//! In-memory state built from the record stream

pub mod history;
pub mod store;

pub use history::BoundedHistory;
pub use store::{StateStore, StoreLimits, NO_CHANNEL_DATA};
