//! Thread-safe handle for hosts that accept calls from many callers.

use crate::engine::Engine;
use lucid_types::{InMemoryLedger, TokenLedger};
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable handle serialising mutating calls through a write lock.
///
/// A closure passed to [`SharedEngine::write`] runs as one atomic step;
/// readers never observe a half-applied call.
pub struct SharedEngine<L: TokenLedger = InMemoryLedger> {
    inner: Arc<RwLock<Engine<L>>>,
}

impl<L: TokenLedger> Clone for SharedEngine<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: TokenLedger> SharedEngine<L> {
    pub fn new(engine: Engine<L>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&Engine<L>) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Engine<L>) -> R) -> R {
        f(&mut self.inner.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use lucid_types::{account_id, AuthContext, Role};
    use std::thread;

    #[test]
    fn test_concurrent_recorders_are_serialised() {
        let mut config = EngineConfig::default();
        config.access.base_tier.max_actions_per_day = 1_000;
        let shared = SharedEngine::new(Engine::new(config, InMemoryLedger::new()).unwrap());
        let alice = account_id("alice");

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let auth = AuthContext::with_roles(account_id(&format!("recorder-{n}")), &[Role::Recorder]);
                    for _ in 0..25 {
                        shared
                            .write(|engine| engine.record_action(&auth, alice, 1, 10))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let usage = shared.read(|engine| engine.access().user_access(&alice));
        assert_eq!(usage.total_actions, 100);
        assert_eq!(usage.storage_used, 100);
    }
}
