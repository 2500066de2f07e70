//! Transactional email delivery for the newsletter.

mod client;
#[cfg(test)]
pub mod memory;
mod template;

pub use client::*;
pub use template::*;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// One message addressed to many recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver in a single API call. Per-recipient failures are not reported.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}
