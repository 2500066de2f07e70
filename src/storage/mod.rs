//! Object storage for uploaded images.
//!
//! The database only keeps public URLs; the bytes live in a storage bucket
//! reached through [`ObjectStore`].

mod client;
mod images;
#[cfg(test)]
pub mod memory;

pub use client::*;
pub use images::*;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("function {name} failed: {message}")]
    Function { name: String, message: String },
}

/// Bucket operations the application relies on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `path`. Fails if the path is taken.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    async fn remove(&self, paths: &[String]) -> Result<()>;

    fn public_url(&self, path: &str) -> String;

    /// Invoke a serverless function with a JSON body.
    async fn invoke(&self, function: &str, body: Value) -> Result<Value>;

    /// Object path behind a URL produced by [`ObjectStore::public_url`].
    fn path_from_url(&self, url: &str) -> Option<String> {
        let prefix = self.public_url("");
        url.strip_prefix(&prefix)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
    }
}
