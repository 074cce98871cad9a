//! Outbound scan notifications.
//!
//! The watch engine only decides *when* a scan should happen. Everything about
//! *how* the downstream service is told lives behind [`Notifier`].

mod stash;

pub use stash::{StashClient, scan_request_body};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from sending a scan request.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Scan request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Scan request rejected with status {status}")]
    Status { status: reqwest::StatusCode },
}

/// Capability to ask the downstream service for a library scan.
///
/// The request carries no information about which path changed.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one scan-trigger request.
    async fn trigger_scan(&self) -> Result<(), NotifyError>;
}
