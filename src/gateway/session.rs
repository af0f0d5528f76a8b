use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};

use crate::models::User;

/// State of one connection attempt.
///
/// The receive loop is the only writer. The heartbeat task and event
/// handlers read it concurrently, so every field is an atomic or an
/// `ArcSwapOption` and a read never observes a half-written value.
#[derive(Debug, Default)]
pub struct SessionState {
    identity: ArcSwapOption<User>,
    /// 0 means no dispatch frame seen yet. The service numbers from 1.
    last_sequence: AtomicU64,
    connected_since: ArcSwapOption<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears everything and stamps a new connection start time.
    pub(crate) fn begin_connection(&self) {
        self.identity.store(None);
        self.last_sequence.store(0, Ordering::SeqCst);
        self.connected_since.store(Some(Arc::new(Utc::now())));
    }

    pub fn identity(&self) -> Option<Arc<User>> {
        self.identity.load_full()
    }

    pub(crate) fn set_identity(&self, user: User) {
        self.identity.store(Some(Arc::new(user)));
    }

    pub fn last_sequence(&self) -> Option<u64> {
        match self.last_sequence.load(Ordering::SeqCst) {
            0 => None,
            seq => Some(seq),
        }
    }

    /// Records a sequence number. Never moves backwards.
    pub(crate) fn observe_sequence(&self, seq: u64) {
        self.last_sequence.fetch_max(seq, Ordering::SeqCst);
    }

    pub fn connected_since(&self) -> Option<DateTime<Utc>> {
        self.connected_since.load_full().map(|t| *t)
    }
}
