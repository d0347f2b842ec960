//! Per-transfer task: follow transport signals, settle, record.

use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;

use super::{Inner, State};
use crate::events::TransferEvent;
use crate::fallback::{is_refetchable, run_fallback, FailureContext, FallbackDecision};
use crate::history::HistoryEntry;
use crate::prefs::DownloadPrefs;
use crate::transfer::{
    unix_millis, TrackerInput, TransferId, TransferSnapshot, TransferState, Transition,
    TransportSignal,
};

enum Outcome {
    Completed,
    Failed(String),
    Cancelled,
    /// The signal stream closed without a terminal signal.
    Released,
}

pub(super) async fn drive(
    inner: Arc<Inner>,
    id: TransferId,
    mut signals: mpsc::Receiver<TransportSignal>,
) {
    let outcome = loop {
        let Some(signal) = signals.recv().await else {
            break Outcome::Released;
        };
        match signal {
            TransportSignal::Progress { received, total } => {
                inner.apply(&id, TrackerInput::Progress { received, total });
            }
            TransportSignal::Completed => break Outcome::Completed,
            TransportSignal::Failed { reason } => break Outcome::Failed(reason),
            TransportSignal::Cancelled => break Outcome::Cancelled,
        }
    };
    drop(signals);
    settle(&inner, &id, outcome).await;
}

async fn settle(inner: &Arc<Inner>, id: &TransferId, outcome: Outcome) {
    let reported = match outcome {
        Outcome::Completed => return finish(inner, id, TransferState::Completed).await,
        Outcome::Released => {
            tracing::warn!(transfer_id = %id, "transfer handle released mid-flight");
            return finish(inner, id, TransferState::Failed).await;
        }
        Outcome::Failed(reason) => {
            tracing::warn!(transfer_id = %id, "transport failed: {}", reason);
            TransferState::Failed
        }
        Outcome::Cancelled => TransferState::Cancelled,
    };

    let state = if try_fallback(inner, id).await {
        TransferState::Completed
    } else {
        reported
    };
    finish(inner, id, state).await;
}

/// Runs the single re-fetch if the policy allows it. Returns true when the
/// file is now on disk.
pub(super) async fn try_fallback(inner: &Arc<Inner>, id: &TransferId) -> bool {
    let facts = {
        let st = inner.lock();
        st.active.get(id).map(|a| {
            (
                a.transfer.request.source_url.clone(),
                a.transfer.target.absolute_path.clone(),
                a.fallback_attempts,
                a.user_cancelled,
                a.orphaned,
            )
        })
    };
    let Some((url, dest, attempts_made, user_cancelled, orphaned)) = facts else {
        return false;
    };

    let ctx = FailureContext {
        attempts_made,
        target_exists: inner.host.fs.exists(&dest),
        refetchable_source: is_refetchable(&url),
        orphaned,
        user_cancelled,
    };
    if let FallbackDecision::GiveUp(reason) = inner.fallback.decide(&ctx) {
        tracing::debug!(transfer_id = %id, ?reason, "no fallback re-fetch");
        return false;
    }
    if let Some(active) = inner.lock().active.get_mut(id) {
        active.fallback_attempts += 1;
    }

    tracing::info!(transfer_id = %id, "re-fetching {}", url);
    let refetch = inner.host.refetch.clone();
    let result =
        tokio::task::spawn_blocking(move || run_fallback(refetch.as_ref(), &url, &dest)).await;
    match result {
        Ok(Ok(bytes)) => {
            inner.apply(
                id,
                TrackerInput::Progress {
                    received: bytes,
                    total: Some(bytes),
                },
            );
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(transfer_id = %id, "fallback re-fetch failed: {}", e);
            false
        }
        Err(e) => {
            tracing::warn!(transfer_id = %id, "fallback task failed: {}", e);
            false
        }
    }
}

/// Moves the transfer to `state`, records it, tells its surface, and drops it.
pub(super) async fn finish(inner: &Arc<Inner>, id: &TransferId, state: TransferState) {
    let snapshot = {
        let mut st = inner.lock();
        let Some(active) = st.active.get_mut(id) else {
            return;
        };
        if let Err(e) = active.transfer.apply(TrackerInput::Finish(state)) {
            tracing::warn!(transfer_id = %id, "{}", e);
            return;
        }
        active.transfer.snapshot()
    };
    tracing::info!(
        transfer_id = %id,
        state = %state,
        bytes = snapshot.received_bytes,
        "transfer settled: {}",
        snapshot.save_path.display()
    );

    if state == TransferState::Completed {
        record_history(inner, &snapshot).await;
    }
    {
        let mut st = inner.lock();
        st.active.remove(id);
        st.surfaces.send(
            &snapshot.surface,
            TransferEvent::Done {
                id: id.clone(),
                state,
                save_path: snapshot.save_path.clone(),
            },
        );
    }
    if state == TransferState::Completed {
        announce(inner, &snapshot);
    }
}

async fn record_history(inner: &Arc<Inner>, snapshot: &TransferSnapshot) {
    let entry = HistoryEntry {
        filename: snapshot.filename.clone(),
        absolute_path: snapshot.save_path.clone(),
        source_url: snapshot.source_url.clone(),
        completed_at: snapshot
            .ended_at
            .unwrap_or_else(|| unix_millis(SystemTime::now())),
        final_state: snapshot.state,
    };
    let owner = inner.clone();
    match tokio::task::spawn_blocking(move || owner.history.append(entry)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(transfer_id = %snapshot.id, "{}", e),
        Err(e) => tracing::warn!(transfer_id = %snapshot.id, "history task failed: {}", e),
    }
}

/// Reveal and notify, per the current preferences. Failures are logged.
fn announce(inner: &Inner, snapshot: &TransferSnapshot) {
    let prefs = DownloadPrefs::load(inner.host.store.as_ref());
    if prefs.reveal_on_complete {
        if let Err(e) = inner.host.desktop.reveal_in_folder(&snapshot.save_path) {
            tracing::warn!(transfer_id = %snapshot.id, "reveal failed: {:#}", e);
        }
    }
    if prefs.notify_on_complete {
        if let Err(e) = inner
            .host
            .desktop
            .notify("Download complete", &snapshot.filename)
        {
            tracing::warn!(transfer_id = %snapshot.id, "notification failed: {:#}", e);
        }
    }
}

impl Inner {
    /// Feeds one input to the tracker and forwards the resulting progress to
    /// the owning surface. Unknown ids (already settled) yield `None`.
    pub(super) fn apply(&self, id: &TransferId, input: TrackerInput) -> Option<Transition> {
        let mut st = self.lock();
        let State {
            active, surfaces, ..
        } = &mut *st;
        let active = active.get_mut(id)?;
        match active.transfer.apply(input) {
            Ok(t @ (Transition::Started | Transition::Progressed)) => {
                let t_ref = &active.transfer;
                surfaces.send(
                    &t_ref.request.origin_surface,
                    TransferEvent::Progress {
                        id: id.clone(),
                        received_bytes: t_ref.received_bytes(),
                        total_bytes: t_ref.total_bytes(),
                        state: t_ref.state(),
                    },
                );
                Some(t)
            }
            Ok(t @ Transition::Ignored(reason)) => {
                tracing::debug!(transfer_id = %id, ?reason, "progress update ignored");
                Some(t)
            }
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(transfer_id = %id, "{}", e);
                None
            }
        }
    }
}
