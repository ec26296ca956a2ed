//! Registry of in-flight route optimizations
//!
//! One optimization per route at a time. `OptimizationGuard` carries the
//! cancellation token and removes the entry when dropped.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::RouteError;

/// RAII guard for one running optimization.
/// Must be kept alive for the duration of the pass.
pub struct OptimizationGuard {
    route_id: Uuid,
    token: CancellationToken,
    registry: OptimizationRegistry,
}

impl OptimizationGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn route_id(&self) -> Uuid {
        self.route_id
    }
}

impl Drop for OptimizationGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.route_id);
    }
}

/// Thread-safe map of route id to cancellation token
#[derive(Clone, Default)]
pub struct OptimizationRegistry {
    running: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl OptimizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an optimization of `route_id`.
    /// Fails if one is already running for that route.
    pub fn register(&self, route_id: Uuid) -> Result<OptimizationGuard, RouteError> {
        self.insert(route_id, CancellationToken::new())
    }

    /// Like `register`, with a token that is also cancelled when `parent` is
    pub fn register_with_parent(
        &self,
        route_id: Uuid,
        parent: &CancellationToken,
    ) -> Result<OptimizationGuard, RouteError> {
        self.insert(route_id, parent.child_token())
    }

    fn insert(&self, route_id: Uuid, token: CancellationToken) -> Result<OptimizationGuard, RouteError> {
        let mut running = self.running.lock();
        if running.contains_key(&route_id) {
            return Err(RouteError::OptimizationInProgress(route_id));
        }
        running.insert(route_id, token.clone());
        Ok(OptimizationGuard {
            route_id,
            token,
            registry: self.clone(),
        })
    }

    /// Cancel the running optimization of a route.
    /// Returns false when nothing is running for it.
    pub fn cancel(&self, route_id: &Uuid) -> bool {
        match self.running.lock().get(route_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, route_id: &Uuid) -> bool {
        self.running.lock().contains_key(route_id)
    }

    fn remove(&self, route_id: &Uuid) {
        self.running.lock().remove(route_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_not_cancelled() {
        let reg = OptimizationRegistry::new();
        let route_id = Uuid::new_v4();

        let guard = reg.register(route_id).unwrap();

        assert!(!guard.token().is_cancelled());
        assert!(reg.is_running(&route_id));
    }

    #[test]
    fn test_second_registration_is_rejected() {
        let reg = OptimizationRegistry::new();
        let route_id = Uuid::new_v4();

        let _guard = reg.register(route_id).unwrap();

        assert_eq!(
            reg.register(route_id).err(),
            Some(RouteError::OptimizationInProgress(route_id))
        );
    }

    #[test]
    fn test_other_routes_are_independent() {
        let reg = OptimizationRegistry::new();
        let _a = reg.register(Uuid::new_v4()).unwrap();
        assert!(reg.register(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_cancel_reaches_the_guard_token() {
        let reg = OptimizationRegistry::new();
        let route_id = Uuid::new_v4();
        let guard = reg.register(route_id).unwrap();

        assert!(reg.cancel(&route_id));
        assert!(guard.token().is_cancelled());
    }

    #[test]
    fn test_parent_cancellation_reaches_child() {
        let reg = OptimizationRegistry::new();
        let parent = CancellationToken::new();
        let guard = reg.register_with_parent(Uuid::new_v4(), &parent).unwrap();

        parent.cancel();
        assert!(guard.token().is_cancelled());
    }

    #[test]
    fn test_cancel_unknown_route() {
        let reg = OptimizationRegistry::new();
        assert!(!reg.cancel(&Uuid::new_v4()));
    }

    #[test]
    fn test_guard_drop_unregisters() {
        let reg = OptimizationRegistry::new();
        let route_id = Uuid::new_v4();

        {
            let guard = reg.register(route_id).unwrap();
            assert_eq!(guard.route_id(), route_id);
        }

        assert!(!reg.is_running(&route_id));
        assert!(reg.register(route_id).is_ok());
    }

    #[test]
    fn test_concurrent_registration_admits_one() {
        let reg = OptimizationRegistry::new();
        let route_id = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = reg.clone();
                std::thread::spawn(move || reg.register(route_id).map(std::mem::forget).is_ok())
            })
            .collect();

        let admitted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(admitted, 1);
    }
}
