//! SessionRegistry: in-flight session ids → cancellation tokens, so a
//! disconnect handler can cancel a turn by id.

use std::sync::Arc;

use dashmap::DashMap;

use crate::cancel::CancellationToken;

/// Concurrent registry, cheap to clone. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, CancellationToken>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session_id: &str, token: CancellationToken) {
        self.sessions.insert(session_id.to_string(), token);
    }

    /// Cancel a session. Returns false if it is not in flight.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.sessions.get(session_id) {
            Some(entry) => {
                entry.value().cancel();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, session_id: &str) -> Option<CancellationToken> {
        self.sessions.remove(session_id).map(|(_, token)| token)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|r| r.key().clone()).collect()
    }

    /// Cancel every in-flight session, e.g. on shutdown. Returns how many.
    pub fn cancel_all(&self) -> usize {
        let mut n = 0;
        for entry in self.sessions.iter() {
            entry.value().cancel();
            n += 1;
        }
        n
    }
}
