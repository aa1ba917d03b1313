//! Cancellation registry for in-flight scheduling requests
//!
//! Each scheduling request registers its id and hands the token to the
//! search. A `taskroute.schedule.cancel` message flips the token; the search
//! notices at its next limit check and returns the best order found so far.
//! `SearchGuard` removes the entry when the request finishes.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use once_cell::sync::Lazy;

/// Global cancellation registry singleton
pub static CANCELLATION: Lazy<CancellationRegistry> = Lazy::new(CancellationRegistry::default);

/// RAII guard that removes the request from the registry when dropped.
/// Must be kept alive until the search has finished.
pub struct SearchGuard {
    request_id: Uuid,
    token: CancellationToken,
    registry: CancellationRegistry,
}

impl SearchGuard {
    /// Token to pass into the search limits
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for SearchGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.request_id);
    }
}

/// Thread-safe registry of in-flight searches and their cancellation tokens
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    searches: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl CancellationRegistry {
    /// Register a request. Keep the returned guard in scope while it runs.
    pub fn register(&self, request_id: Uuid) -> SearchGuard {
        let token = CancellationToken::new();
        self.searches.lock().insert(request_id, token.clone());
        SearchGuard {
            request_id,
            token,
            registry: self.clone(),
        }
    }

    /// Cancel a request. Returns `false` when it is not (or no longer) running.
    pub fn cancel(&self, request_id: &Uuid) -> bool {
        match self.searches.lock().get(request_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_cancelled(&self, request_id: &Uuid) -> bool {
        self.searches
            .lock()
            .get(request_id)
            .is_some_and(|t| t.is_cancelled())
    }

    /// Called automatically by `SearchGuard::drop`
    pub fn remove(&self, request_id: &Uuid) {
        self.searches.lock().remove(request_id);
    }

    #[cfg(test)]
    fn contains(&self, request_id: &Uuid) -> bool {
        self.searches.lock().contains_key(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_registry() -> CancellationRegistry {
        CancellationRegistry::default()
    }

    #[test]
    fn test_register_is_not_cancelled() {
        let reg = new_registry();
        let id = Uuid::new_v4();

        let guard = reg.register(id);

        assert!(!reg.is_cancelled(&id));
        assert!(!guard.token().is_cancelled());
    }

    #[test]
    fn test_cancel_flips_guard_token() {
        let reg = new_registry();
        let id = Uuid::new_v4();
        let guard = reg.register(id);
        let token = guard.token();

        assert!(reg.cancel(&id));

        assert!(reg.is_cancelled(&id));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_unknown_returns_false() {
        let reg = new_registry();
        assert!(!reg.cancel(&Uuid::new_v4()));
    }

    #[test]
    fn test_guard_drop_removes_entry() {
        let reg = new_registry();
        let id = Uuid::new_v4();

        {
            let _guard = reg.register(id);
            assert!(reg.contains(&id));
        }

        assert!(!reg.contains(&id));
        assert!(!reg.cancel(&id));
    }

    #[test]
    fn test_requests_are_independent() {
        let reg = new_registry();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let _ga = reg.register(a);
        let gb = reg.register(b);

        reg.cancel(&a);

        assert!(reg.is_cancelled(&a));
        assert!(!gb.token().is_cancelled());
    }
}
