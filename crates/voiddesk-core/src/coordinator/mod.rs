//! Privileged transfer coordinator.
//!
//! The single place where signals from untrusted content surfaces turn into
//! file-system writes. Surfaces attach and receive [`TransferEvent`]s for their
//! own transfers only; the host reports each transfer through
//! [`Coordinator::begin_transfer`] and a stream of [`TransportSignal`]s.
//!
//! All shared state sits behind one `std::sync::Mutex` that is never held
//! across an `.await`. Each transfer's signals are consumed on their own task,
//! in delivery order.

mod force_ask;
mod navigation;
mod run;
mod surfaces;

pub use force_ask::ForceAskRegistry;
pub use navigation::NavigationVerdict;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::config::ShellConfig;
use crate::classify::OriginClassifier;
use crate::confine::{confine, normalize};
use crate::events::TransferEvent;
use crate::fallback::{FallbackPolicy, Refetch};
use crate::history::{HistoryEntry, HistoryStore};
use crate::host::{DesktopShell, FileSystem, SaveDialog, TransferHandle};
use crate::prefs::DownloadPrefs;
use crate::resolver::{resolve, ResolveError};
use crate::store::{KvStore, StoreError};
use crate::transfer::{
    ResolvedTarget, SessionId, SurfaceId, Transfer, TransferId, TransferRequest, TransferSnapshot,
    TransferState, TransportSignal,
};

use self::surfaces::Surfaces;

/// Everything the coordinator needs from the outside world.
#[derive(Clone)]
pub struct HostCapabilities {
    pub store: Arc<dyn KvStore>,
    pub fs: Arc<dyn FileSystem>,
    pub desktop: Arc<dyn DesktopShell>,
    pub dialog: Arc<dyn SaveDialog>,
    pub refetch: Arc<dyn Refetch>,
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("surface {0} is not attached")]
    UnknownSurface(SurfaceId),
    #[error("no active transfer {0}")]
    UnknownTransfer(TransferId),
    #[error("save dialog dismissed")]
    SaveDismissed,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    host: HostCapabilities,
    classifier: OriginClassifier,
    history: HistoryStore,
    fallback: FallbackPolicy,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    surfaces: Surfaces,
    force_ask: ForceAskRegistry,
    active: HashMap<TransferId, Active>,
}

struct Active {
    transfer: Transfer,
    handle: Arc<dyn TransferHandle>,
    session: SessionId,
    /// Cancelled through [`Coordinator::cancel`] or [`Coordinator::clear_session`].
    user_cancelled: bool,
    /// The owning surface detached while the transfer was running.
    orphaned: bool,
    fallback_attempts: u32,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Coordinator {
    pub fn new(cfg: &ShellConfig, host: HostCapabilities) -> Self {
        let history = HistoryStore::new(host.store.clone(), cfg.history_max_entries);
        Self {
            inner: Arc::new(Inner {
                classifier: OriginClassifier::from_config(cfg),
                history,
                fallback: FallbackPolicy::from_config(&cfg.fallback),
                host,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Registers a content surface and returns its event stream.
    pub fn attach_surface(
        &self,
        surface: SurfaceId,
        session: SessionId,
    ) -> mpsc::UnboundedReceiver<TransferEvent> {
        tracing::debug!(%surface, %session, "surface attached");
        self.inner.lock().surfaces.attach(surface, session)
    }

    /// Forgets `surface`: its pending "save as" flags are dropped and its
    /// running transfers lose their event channel and any fallback.
    pub fn detach_surface(&self, surface: &SurfaceId) {
        let mut st = self.inner.lock();
        st.surfaces.detach(surface);
        let evicted = st.force_ask.evict_surface(surface);
        let mut orphaned = 0;
        for active in st.active.values_mut() {
            if &active.transfer.request.origin_surface == surface {
                active.orphaned = true;
                orphaned += 1;
            }
        }
        tracing::debug!(%surface, evicted, orphaned, "surface detached");
    }

    /// Takes over a transfer the host just started.
    ///
    /// Picks the save path (asking the user when "always ask" is on or the
    /// link was opened with "Save as…"), hands it to the host, then follows
    /// `signals` on a background task. On error the host transfer is cancelled
    /// and no event is emitted.
    pub async fn begin_transfer(
        &self,
        request: TransferRequest,
        handle: Arc<dyn TransferHandle>,
        signals: mpsc::Receiver<TransportSignal>,
    ) -> Result<TransferId, CoordinatorError> {
        let surface = request.origin_surface.clone();
        let (session, forced) = {
            let mut st = self.inner.lock();
            let session = st.surfaces.session_of(&surface).cloned();
            match session {
                Some(session) => (session, st.force_ask.consume(&surface, &request.source_url)),
                None => {
                    drop(st);
                    cancel_quietly(handle.as_ref());
                    return Err(CoordinatorError::UnknownSurface(surface));
                }
            }
        };

        let prefs = DownloadPrefs::load(self.inner.host.store.as_ref());
        let ask = prefs.always_ask || forced;
        let target = match self.pick_target(&request, &prefs.root, ask).await {
            Ok(target) => target,
            Err(e) => {
                tracing::info!(%surface, url = %request.source_url, "transfer not started: {}", e);
                cancel_quietly(handle.as_ref());
                return Err(e);
            }
        };

        let id = TransferId::generate();
        let save_path = target.absolute_path.clone();
        let transfer = Transfer::new(id.clone(), request, target);
        {
            let mut st = self.inner.lock();
            let orphaned = !st.surfaces.contains(&surface);
            st.surfaces.send(
                &surface,
                TransferEvent::Start {
                    id: id.clone(),
                    filename: transfer.target.display_name.clone(),
                    total_bytes: transfer.total_bytes(),
                },
            );
            st.active.insert(
                id.clone(),
                Active {
                    transfer,
                    handle: handle.clone(),
                    session,
                    user_cancelled: false,
                    orphaned,
                    fallback_attempts: 0,
                },
            );
        }
        tracing::info!(transfer_id = %id, %surface, asked = ask, "saving to {}", save_path.display());

        if let Err(e) = handle.set_save_path(&save_path) {
            tracing::warn!(transfer_id = %id, "cannot assign save path: {}", e);
            run::finish(&self.inner, &id, TransferState::Failed).await;
            return Ok(id);
        }

        tokio::spawn(run::drive(self.inner.clone(), id.clone(), signals));
        Ok(id)
    }

    async fn pick_target(
        &self,
        request: &TransferRequest,
        root: &Path,
        ask: bool,
    ) -> Result<ResolvedTarget, CoordinatorError> {
        let fs = self.inner.host.fs.as_ref();
        let suggested = resolve(root, &request.proposed_name, fs)?;
        if !ask {
            return Ok(suggested);
        }

        let dialog = self.inner.host.dialog.clone();
        let surface = request.origin_surface.clone();
        let chosen = tokio::task::spawn_blocking(move || {
            dialog.ask(&surface, &suggested.absolute_path)
        })
        .await?;
        match chosen {
            Some(path) => Ok(target_from_choice(root, &path, fs)?),
            None => Err(CoordinatorError::SaveDismissed),
        }
    }

    /// User-initiated cancel. The transfer settles as cancelled once the
    /// transport confirms; no fallback runs.
    pub fn cancel(&self, id: &TransferId) -> Result<(), CoordinatorError> {
        let handle = {
            let mut st = self.inner.lock();
            let active = st
                .active
                .get_mut(id)
                .ok_or_else(|| CoordinatorError::UnknownTransfer(id.clone()))?;
            active.user_cancelled = true;
            active.handle.clone()
        };
        tracing::info!(transfer_id = %id, "cancel requested");
        cancel_quietly(handle.as_ref());
        Ok(())
    }

    /// "Log out" of a session: cancels its transfers and drops its pending
    /// "save as" flags. Clearing the partition's storage is up to the host.
    /// Returns the number of transfers cancelled.
    pub fn clear_session(&self, session: &SessionId) -> usize {
        let handles: Vec<_> = {
            let mut st = self.inner.lock();
            for surface in st.surfaces.in_session(session) {
                st.force_ask.evict_surface(&surface);
            }
            st.active
                .values_mut()
                .filter(|a| &a.session == session)
                .map(|a| {
                    a.user_cancelled = true;
                    a.handle.clone()
                })
                .collect()
        };
        for handle in &handles {
            cancel_quietly(handle.as_ref());
        }
        tracing::info!(%session, cancelled = handles.len(), "session cleared");
        handles.len()
    }

    /// Running transfers, oldest first.
    pub fn active_transfers(&self) -> Vec<TransferSnapshot> {
        let mut snapshots: Vec<_> = self
            .inner
            .lock()
            .active
            .values()
            .map(|a| a.transfer.snapshot())
            .collect();
        snapshots.sort_by(|a, b| (a.started_at, &a.id).cmp(&(b.started_at, &b.id)));
        snapshots
    }

    /// Completed downloads, newest first.
    pub fn history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        self.inner.history.entries()
    }

    pub fn classifier(&self) -> &OriginClassifier {
        &self.inner.classifier
    }
}

/// Turns a path picked in the save dialog into a target. A choice outside the
/// downloads root keeps only its file name and is re-resolved under the root.
fn target_from_choice(
    root: &Path,
    chosen: &Path,
    fs: &dyn FileSystem,
) -> Result<ResolvedTarget, ResolveError> {
    if chosen.file_name().is_some() {
        if let Ok(path) = confine(root, chosen) {
            if path != normalize(root) {
                return Ok(ResolvedTarget::from_path(path));
            }
        }
    }
    let name = chosen
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::warn!(chosen = %chosen.display(), "save path outside downloads root, using its name only");
    resolve(root, &name, fs)
}

fn cancel_quietly(handle: &dyn TransferHandle) {
    if let Err(e) = handle.cancel() {
        tracing::debug!("cancel ignored: {}", e);
    }
}
