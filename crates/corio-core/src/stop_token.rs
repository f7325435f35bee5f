//! Cooperative cancellation: `StopSource` / `StopToken` / `StopCallback`
//! (spec §3, grounded on `gvthread-core`'s `CancellationToken`).
//!
//! The teacher's token is a tagged enum (`Owned`/`Metadata`/`Dummy`)
//! that chains up through parent schedulers so a child fiber observes
//! its ancestors' cancellation. This runtime has no fiber hierarchy, so
//! we keep the shared, reference-counted stop-state idea but drop the
//! parent-chain variant machinery: one source, any number of cloned
//! tokens, any number of registered callbacks, matching spec §3's
//! "two-ended signal" vocabulary directly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

struct StopState {
    requested: AtomicBool,
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, Box<dyn FnOnce() + Send>>>,
}

impl StopState {
    fn new() -> Self {
        StopState {
            requested: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(HashMap::new()),
        }
    }
}

/// Owns the ability to request cancellation. Dropping every `StopSource`
/// for a given state does not itself request stop — callers that want
/// "cancel on drop" semantics should call [`StopSource::request_stop`]
/// explicitly, e.g. in a guard's `Drop` impl.
#[derive(Clone)]
pub struct StopSource {
    state: Arc<StopState>,
}

impl Default for StopSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSource {
    pub fn new() -> Self {
        StopSource {
            state: Arc::new(StopState::new()),
        }
    }

    /// A token observing this source's state. Tokens may outlive the
    /// source that created them.
    pub fn token(&self) -> StopToken {
        StopToken {
            state: self.state.clone(),
        }
    }

    /// Request cancellation. Idempotent: returns `true` the first time
    /// it actually transitions the state and runs every registered
    /// callback inline, `false` on any subsequent call.
    pub fn request_stop(&self) -> bool {
        if self.state.requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        let callbacks = std::mem::take(&mut *self.state.callbacks.lock().unwrap());
        for (_, callback) in callbacks {
            callback();
        }
        true
    }

    pub fn is_stop_requested(&self) -> bool {
        self.state.requested.load(Ordering::Acquire)
    }
}

/// A cheaply-cloneable handle for observing whether cancellation has
/// been requested.
#[derive(Clone)]
pub struct StopToken {
    state: Arc<StopState>,
}

impl StopToken {
    pub fn is_stop_requested(&self) -> bool {
        self.state.requested.load(Ordering::Acquire)
    }
}

/// Registers a callback to run the moment cancellation is requested —
/// immediately and inline if it already has been. The callback is
/// deregistered when the `StopCallback` is dropped, unless it has
/// already fired.
pub struct StopCallback {
    state: Arc<StopState>,
    id: Option<u64>,
}

impl StopCallback {
    pub fn new<F>(token: &StopToken, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let state = token.state.clone();
        if state.requested.load(Ordering::Acquire) {
            callback();
            return StopCallback { state, id: None };
        }

        let id = state.next_id.fetch_add(1, Ordering::Relaxed);
        let mut callbacks = state.callbacks.lock().unwrap();
        // Re-check under the lock: request_stop may have run between the
        // fast-path load above and taking the lock.
        if state.requested.load(Ordering::Acquire) {
            drop(callbacks);
            callback();
            return StopCallback { state, id: None };
        }
        callbacks.insert(id, Box::new(callback));
        drop(callbacks);
        StopCallback {
            state,
            id: Some(id),
        }
    }
}

impl Drop for StopCallback {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.state.callbacks.lock().unwrap().remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn request_stop_is_observed_by_cloned_tokens() {
        let source = StopSource::new();
        let token = source.token();
        assert!(!token.is_stop_requested());
        assert!(source.request_stop());
        assert!(token.is_stop_requested());
        assert!(!source.request_stop());
    }

    #[test]
    fn callback_fires_on_request() {
        let source = StopSource::new();
        let token = source.token();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        let _cb = StopCallback::new(&token, move || {
            fired2.store(true, Ordering::SeqCst);
        });
        assert!(!fired.load(Ordering::SeqCst));
        source.request_stop();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn callback_fires_immediately_if_already_stopped() {
        let source = StopSource::new();
        source.request_stop();
        let token = source.token();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let _cb = StopCallback::new(&token, move || {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_callback_does_not_fire() {
        let source = StopSource::new();
        let token = source.token();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        let cb = StopCallback::new(&token, move || {
            fired2.store(true, Ordering::SeqCst);
        });
        drop(cb);
        source.request_stop();
        assert!(!fired.load(Ordering::SeqCst));
    }
}
