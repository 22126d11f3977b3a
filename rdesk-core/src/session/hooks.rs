//! Callbacks into the host application.
//!
//! The session manager does not own the password or any UI. It asks
//! the host to verify a candidate password and tells it when a
//! controller attaches or detaches.

/// Host-side collaborator for the session lifecycle.
///
/// Implementations must be cheap and must not call back into the
/// [`SessionManager`](super::SessionManager): every hook runs while
/// the session lock is held, which keeps connect and disconnect
/// notifications in session order.
pub trait SessionHooks: Send + Sync {
    /// Returns `true` when `candidate` is the shared password.
    fn verify_password(&self, candidate: u16) -> bool;

    /// A controller was accepted and a token issued.
    fn client_connected(&self) {}

    /// The controller detached, explicitly or by heartbeat timeout.
    fn client_disconnected(&self) {}
}

/// Hooks backed by a fixed password and no notifications.
#[derive(Debug, Clone, Copy)]
pub struct StaticPassword(pub u16);

impl SessionHooks for StaticPassword {
    fn verify_password(&self, candidate: u16) -> bool {
        candidate == self.0
    }
}
