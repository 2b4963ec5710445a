//! Ordered queue of blocking requests awaiting an engine halt.
//!
//! Listener tasks insert; the engine's halt callback takes the whole pending
//! list as a snapshot and fulfills each entry through its oneshot sender. A
//! waiter that times out removes its own entry by id. Both operations go
//! through the one mutex, so for any given entry exactly one party (the
//! drain or the timed-out waiter) ends up owning its removal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

use debugger_bridge_core::api::{ApiRequest, ApiResponse};

pub struct PendingRequest {
    pub id: u64,
    pub request: ApiRequest,
    pub reply: oneshot::Sender<ApiResponse>,
}

#[derive(Default)]
pub struct RequestQueue {
    entries: Mutex<Vec<PendingRequest>>,
    next_id: AtomicU64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request, in arrival order. Returns the entry id and the
    /// receiver the caller parks on.
    pub fn push(&self, request: ApiRequest) -> (u64, oneshot::Receiver<ApiResponse>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.entries
            .lock()
            .expect("request queue mutex poisoned")
            .push(PendingRequest {
                id,
                request,
                reply: tx,
            });
        (id, rx)
    }

    /// Remove an entry by id. Returns false when a drain already took it.
    pub fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock().expect("request queue mutex poisoned");
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    /// Take everything queued right now, in insertion order. Requests pushed
    /// after this call wait for the next snapshot.
    pub fn take_all(&self) -> Vec<PendingRequest> {
        std::mem::take(&mut *self.entries.lock().expect("request queue mutex poisoned"))
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("request queue mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
