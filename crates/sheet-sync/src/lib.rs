//! Copy unread Gmail messages into a Google Sheet.
//!
//! Each run lists unread messages, skips ones already recorded in the run
//! state, appends one row per message (From, Subject, Date, Body), marks the
//! messages read and only then records their ids.

pub mod auth;
pub mod body;
pub mod config;
pub mod error;
pub mod gmail;
pub mod sheets;
pub mod state;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use sync::{RunSummary, SyncRunner};
