//! Contract with the external fetch collaborator
//!
//! The controller never talks to the network itself. A `Fetcher` turns a partition
//! key into a payload, and the payload type describes which of its fields are
//! visible to the user and whether the entities it tracks are live or finished.

use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::cache::VisibleState;
use crate::partition::PartitionKey;

/// Errors a fetch can settle with
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body could not be decoded
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The collaborator did not settle within the configured bound
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The fetcher does not know how to resolve this partition
    #[error("unknown partition: {0}")]
    UnknownPartition(String),

    /// Any other upstream failure
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// A fetched value the controller can cache, fingerprint and surface
pub trait Payload: Clone + Send + 'static {
    /// The semantically visible fields of every tracked entity
    fn visible_states(&self) -> Vec<VisibleState>;

    /// Whether any tracked entity is currently in progress
    fn is_live(&self) -> bool;

    /// Whether every tracked entity has reached a terminal state
    fn is_terminal(&self) -> bool;
}

/// Resolves a partition into a payload
///
/// Implementations must not partially apply effects: a returned error means
/// nothing changed. The returned future owns everything it needs so the
/// controller can run it on a separate task.
pub trait Fetcher: Send + Sync + 'static {
    type Payload: Payload;

    fn fetch(&self, key: &PartitionKey) -> BoxFuture<'static, Result<Self::Payload, FetchError>>;
}
