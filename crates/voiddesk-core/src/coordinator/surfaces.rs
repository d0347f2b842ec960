//! Attached content surfaces and their event channels.

use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::events::TransferEvent;
use crate::transfer::{SessionId, SurfaceId};

#[derive(Debug)]
pub(super) struct SurfaceEntry {
    pub session: SessionId,
    events: mpsc::UnboundedSender<TransferEvent>,
}

#[derive(Debug, Default)]
pub(super) struct Surfaces {
    map: HashMap<SurfaceId, SurfaceEntry>,
}

impl Surfaces {
    /// Registers `surface`. Re-attaching replaces the old channel, which closes
    /// the previous receiver.
    pub fn attach(
        &mut self,
        surface: SurfaceId,
        session: SessionId,
    ) -> mpsc::UnboundedReceiver<TransferEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.map.insert(surface, SurfaceEntry { session, events: tx });
        rx
    }

    pub fn detach(&mut self, surface: &SurfaceId) -> Option<SurfaceEntry> {
        self.map.remove(surface)
    }

    pub fn contains(&self, surface: &SurfaceId) -> bool {
        self.map.contains_key(surface)
    }

    pub fn session_of(&self, surface: &SurfaceId) -> Option<&SessionId> {
        self.map.get(surface).map(|e| &e.session)
    }

    pub fn in_session(&self, session: &SessionId) -> Vec<SurfaceId> {
        self.map
            .iter()
            .filter(|(_, e)| &e.session == session)
            .map(|(s, _)| s.clone())
            .collect()
    }

    /// Sends `event` to `surface` only. Returns false if the surface is gone
    /// or stopped listening.
    pub fn send(&self, surface: &SurfaceId, event: TransferEvent) -> bool {
        let Some(entry) = self.map.get(surface) else {
            tracing::debug!(%surface, transfer_id = %event.id(), "surface detached, event dropped");
            return false;
        };
        entry.events.send(event).is_ok()
    }
}
