//! Data models for the pastry blog.
//!
//! Field names serialize in camelCase to match what the site and admin panel send.

mod article;
mod creation;
mod newsletter;
mod recipe;
mod slug;
mod user;

pub use article::*;
pub use creation::*;
pub use newsletter::*;
pub use recipe::*;
pub use slug::*;
pub use user::*;

use chrono::{DateTime, SecondsFormat, Utc};

/// Stored timestamp format: RFC 3339, UTC, millisecond precision. Strings in
/// this format sort chronologically.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the stored format.
pub fn now_timestamp() -> String {
    timestamp(Utc::now())
}
