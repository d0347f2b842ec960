//! Per-transfer state machine.
//!
//! The coordinator feeds every transport signal through [`Transfer::apply`];
//! the returned [`Transition`] says which event (if any) to publish.

use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;

use super::{unix_millis, ResolvedTarget, SurfaceId, TransferId, TransferRequest, TransferState};

/// Input driving a [`Transfer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerInput {
    /// The transport confirmed it is writing.
    Begin,
    Progress { received: u64, total: Option<u64> },
    /// Settle in a terminal state.
    Finish(TransferState),
}

/// Why an input was dropped without changing the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `received` went backwards.
    Regressed { previous: u64, received: u64 },
    /// `received` is larger than the total the transport reported.
    ExceedsTotal { received: u64, total: u64 },
    /// `Begin` on a transfer that already started.
    AlreadyStarted,
}

/// Effect of an applied input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Left `Pending`. Progress updates carrying the first bytes also report this.
    Started,
    Progressed,
    Finished(TransferState),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("transfer {id} is already {state}")]
    AlreadyTerminal { id: TransferId, state: TransferState },
    #[error("{0} is not a terminal state")]
    NotTerminal(TransferState),
}

/// One tracked transfer. Owned by the coordinator; the UI sees [`TransferSnapshot`]s.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub id: TransferId,
    pub request: TransferRequest,
    pub target: ResolvedTarget,
    state: TransferState,
    received_bytes: u64,
    /// Reported by the transport; bounds progress.
    total_bytes: Option<u64>,
    /// From the request; shown until the transport reports a total.
    size_hint: Option<u64>,
    started_at: SystemTime,
    ended_at: Option<SystemTime>,
}

impl Transfer {
    /// New `Pending` transfer. The request's size hint is displayed as the
    /// total but never rejects progress.
    pub fn new(id: TransferId, request: TransferRequest, target: ResolvedTarget) -> Self {
        let size_hint = request.total_bytes_hint;
        Self {
            id,
            request,
            target,
            state: TransferState::Pending,
            received_bytes: 0,
            total_bytes: None,
            size_hint,
            started_at: SystemTime::now(),
            ended_at: None,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes.or(self.size_hint)
    }

    pub fn ended_at(&self) -> Option<SystemTime> {
        self.ended_at
    }

    /// Applies one input. Inputs after a terminal state are rejected.
    pub fn apply(&mut self, input: TrackerInput) -> Result<Transition, TrackerError> {
        if self.state.is_terminal() {
            return Err(TrackerError::AlreadyTerminal {
                id: self.id.clone(),
                state: self.state,
            });
        }

        match input {
            TrackerInput::Begin => {
                if self.state != TransferState::Pending {
                    return Ok(Transition::Ignored(IgnoreReason::AlreadyStarted));
                }
                self.state = TransferState::InProgress;
                Ok(Transition::Started)
            }
            TrackerInput::Progress { received, total } => Ok(self.progress(received, total)),
            TrackerInput::Finish(state) => {
                if !state.is_terminal() {
                    return Err(TrackerError::NotTerminal(state));
                }
                if state == TransferState::Completed {
                    match self.total_bytes() {
                        Some(total) => self.received_bytes = total,
                        None => self.total_bytes = Some(self.received_bytes),
                    }
                }
                self.state = state;
                self.ended_at = Some(SystemTime::now());
                Ok(Transition::Finished(state))
            }
        }
    }

    fn progress(&mut self, received: u64, total: Option<u64>) -> Transition {
        if received < self.received_bytes {
            return Transition::Ignored(IgnoreReason::Regressed {
                previous: self.received_bytes,
                received,
            });
        }
        let total = total.or(self.total_bytes);
        if let Some(total) = total {
            if received > total {
                return Transition::Ignored(IgnoreReason::ExceedsTotal { received, total });
            }
        }
        if self.size_hint.is_some_and(|hint| received > hint) {
            self.size_hint = None;
        }

        self.received_bytes = received;
        self.total_bytes = total;
        if self.state == TransferState::Pending {
            self.state = TransferState::InProgress;
            Transition::Started
        } else {
            Transition::Progressed
        }
    }

    /// Read-only view for the UI layer.
    pub fn snapshot(&self) -> TransferSnapshot {
        TransferSnapshot {
            id: self.id.clone(),
            surface: self.request.origin_surface.clone(),
            source_url: self.request.source_url.clone(),
            filename: self.target.display_name.clone(),
            save_path: self.target.absolute_path.clone(),
            state: self.state,
            received_bytes: self.received_bytes,
            total_bytes: self.total_bytes(),
            started_at: unix_millis(self.started_at),
            ended_at: self.ended_at.map(unix_millis),
        }
    }
}

/// Read-only copy of a [`Transfer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSnapshot {
    pub id: TransferId,
    pub surface: SurfaceId,
    pub source_url: String,
    pub filename: String,
    pub save_path: PathBuf,
    pub state: TransferState,
    pub received_bytes: u64,
    pub total_bytes: Option<u64>,
    /// Unix milliseconds.
    pub started_at: i64,
    pub ended_at: Option<i64>,
}
