//! Shared pairing state.
//!
//! One lock-protected [`PairingState`] owned by the heartbeat reporter,
//! which refreshes it from the remote record each tick. The biometric
//! engine only ever reads the linked-user gate; the dispatcher never
//! touches it directly (a RESET_PAIRING clears the remote record and the
//! next heartbeat re-derives the local state from it).

use rollcall_core::{PairingPhase, PairingState};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cloneable handle to the process-wide pairing state.
#[derive(Debug, Clone, Default)]
pub struct SharedPairing {
    inner: Arc<RwLock<PairingState>>,
}

impl SharedPairing {
    /// Create state with no linked user and no token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> PairingState {
        self.inner.read().await.clone()
    }

    /// The linked account identifier, if any.
    pub async fn linked_user(&self) -> Option<String> {
        self.inner.read().await.linked_user_id.clone()
    }

    /// Whether a user is linked. This is the gate for every biometric
    /// operation.
    pub async fn is_linked(&self) -> bool {
        self.inner.read().await.is_linked()
    }

    /// The current pairing phase.
    pub async fn phase(&self) -> PairingPhase {
        self.inner.read().await.phase()
    }

    /// Run `f` with exclusive access to the state.
    pub async fn with_mut<R>(&self, f: impl FnOnce(&mut PairingState) -> R) -> R {
        let mut guard = self.inner.write().await;
        f(&mut guard)
    }
}
