//! One-shot "ask where to save" flags keyed by (surface, URL).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::transfer::SurfaceId;

/// How long a flag waits for its transfer.
pub const FORCE_ASK_TTL: Duration = Duration::from_secs(120);

/// Set by "Save as…" on a link; consumed by the first transfer from the same
/// surface for the same URL. A flag whose transfer never arrives (the host
/// reported a redirected URL, say) expires after its TTL and is dropped with
/// the surface, never replayed onto a later surface.
#[derive(Debug)]
pub struct ForceAskRegistry {
    flags: HashMap<(SurfaceId, String), Instant>,
    ttl: Duration,
}

impl Default for ForceAskRegistry {
    fn default() -> Self {
        Self::with_ttl(FORCE_ASK_TTL)
    }
}

impl ForceAskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            flags: HashMap::new(),
            ttl,
        }
    }

    /// Sets the flag, restarting its TTL. Expired flags are swept here.
    pub fn mark(&mut self, surface: &SurfaceId, url: &str) {
        let now = Instant::now();
        self.sweep(now);
        self.flags.insert((surface.clone(), url.to_string()), now);
    }

    /// Returns whether a live flag was set, clearing it.
    pub fn consume(&mut self, surface: &SurfaceId, url: &str) -> bool {
        match self.flags.remove(&(surface.clone(), url.to_string())) {
            Some(marked) => marked.elapsed() <= self.ttl,
            None => false,
        }
    }

    /// Drops every flag of `surface`. Returns how many were dropped.
    pub fn evict_surface(&mut self, surface: &SurfaceId) -> usize {
        let before = self.flags.len();
        self.flags.retain(|(s, _), _| s != surface);
        before - self.flags.len()
    }

    fn sweep(&mut self, now: Instant) {
        let ttl = self.ttl;
        let before = self.flags.len();
        self.flags.retain(|_, marked| now.duration_since(*marked) <= ttl);
        let expired = before - self.flags.len();
        if expired > 0 {
            tracing::debug!(expired, "dropped unclaimed save-as flags");
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
