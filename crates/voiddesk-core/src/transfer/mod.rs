//! Transfer records and the per-transfer state machine.

mod id;
mod state;
mod tracker;

pub use id::TransferId;
pub use state::TransferState;
pub use tracker::{IgnoreReason, TrackerError, TrackerInput, Transfer, TransferSnapshot, Transition};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::naming::proposed_name;

/// Opaque id of a content surface (an embedded page or partitioned view).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub String);

impl SurfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage partition a surface lives in (cookies, cache, credentials).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Partition of the embedded chat view.
    pub const PLUS_PARTITION: &'static str = "persist:voiddesk-plus";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(Self::PLUS_PARTITION.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An outbound transfer as signalled by a content surface. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub source_url: String,
    /// Untrusted; sanitized during resolution.
    pub proposed_name: String,
    pub total_bytes_hint: Option<u64>,
    pub origin_surface: SurfaceId,
}

impl TransferRequest {
    /// Request for a transfer the host reports. The proposed name is the
    /// page's suggestion, else the response's `Content-Disposition`, else
    /// whatever the URL yields.
    pub fn from_host(
        origin_surface: SurfaceId,
        source_url: impl Into<String>,
        suggested: Option<&str>,
        content_disposition: Option<&str>,
    ) -> Self {
        let source_url = source_url.into();
        Self {
            proposed_name: proposed_name(&source_url, suggested, content_disposition),
            source_url,
            total_bytes_hint: None,
            origin_surface,
        }
    }

    pub fn with_size_hint(mut self, total_bytes: Option<u64>) -> Self {
        self.total_bytes_hint = total_bytes;
        self
    }
}

/// Where a transfer is saved. Assigned once; never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTarget {
    /// Always inside the downloads root.
    pub absolute_path: PathBuf,
    pub display_name: String,
}

impl ResolvedTarget {
    /// Builds a target whose display name is the path's file name.
    pub fn from_path(absolute_path: PathBuf) -> Self {
        let display_name = absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            absolute_path,
            display_name,
        }
    }
}

/// Inbound signal from the host's transport for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    Progress { received: u64, total: Option<u64> },
    Completed,
    Failed { reason: String },
    /// Cancelled by the transport itself (not through `Coordinator::cancel`).
    Cancelled,
}

/// Milliseconds since the Unix epoch (0 for pre-epoch clocks).
pub(crate) fn unix_millis(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
