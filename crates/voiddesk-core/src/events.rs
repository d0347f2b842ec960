//! Events sent to a content surface about its own transfers.
//!
//! Serialized as `{"type": "start", ...}` for the UI bridge.

use serde::Serialize;
use std::path::PathBuf;

use crate::transfer::{TransferId, TransferState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransferEvent {
    #[serde(rename_all = "camelCase")]
    Start {
        id: TransferId,
        filename: String,
        total_bytes: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Progress {
        id: TransferId,
        received_bytes: u64,
        total_bytes: Option<u64>,
        state: TransferState,
    },
    #[serde(rename_all = "camelCase")]
    Done {
        id: TransferId,
        state: TransferState,
        save_path: PathBuf,
    },
}

impl TransferEvent {
    pub fn id(&self) -> &TransferId {
        match self {
            Self::Start { id, .. } | Self::Progress { id, .. } | Self::Done { id, .. } => id,
        }
    }
}
