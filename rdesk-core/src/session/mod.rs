//! Single-controller session lifecycle.
//!
//! The [`SessionManager`] owns the one active [`Token`]. At most one
//! controller can be attached at any moment; a second `connect` is
//! rejected without touching the live session. A heartbeat watchdog
//! drops the controller when it stops pinging.
//!
//! ```text
//!   Idle (SENTINEL) ──connect──► Active(token) ──disconnect──► Idle
//!                                    │                          ▲
//!                                    └──── no ping in window ───┘
//! ```

mod heartbeat;
mod hooks;
mod token;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::files::ChunkedFileStore;

pub use hooks::{SessionHooks, StaticPassword};
pub use token::Token;

/// Default heartbeat window: a controller must ping at least this often.
pub const DEFAULT_HEARTBEAT_WINDOW: Duration = Duration::from_secs(5);

// ── SessionConfig ────────────────────────────────────────────────

/// Configuration for [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a session may stay silent before it is dropped.
    pub heartbeat_window: Duration,
    /// Require `disconnect` to present the live token. When `false`,
    /// any non-sentinel token is accepted.
    pub strict_disconnect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_window: DEFAULT_HEARTBEAT_WINDOW,
            strict_disconnect: false,
        }
    }
}

// ── Shared state ─────────────────────────────────────────────────

/// Mutable session state, guarded by a single mutex.
#[derive(Debug, Default)]
struct SessionState {
    token: Token,
    /// Set by `ping`, cleared at every watchdog check.
    ping_received: bool,
    /// Cancels the watchdog of the live session.
    watchdog: Option<CancellationToken>,
}

impl SessionState {
    /// Reset to the sentinel and hand back the watchdog to cancel.
    fn clear(&mut self) -> Option<CancellationToken> {
        self.token = Token::SENTINEL;
        self.ping_received = false;
        self.watchdog.take()
    }
}

/// Session state locked for a change that may end the session.
///
/// Teardown happens before the guard is released, so a `connect`
/// waiting on the lock never sees side effects of the session it
/// replaces. Lock order is session then file store.
struct Locked<'a> {
    shared: &'a Shared,
    state: MutexGuard<'a, SessionState>,
}

impl Locked<'_> {
    /// Clear the live session, cancel its watchdog, drop unfinished
    /// uploads and notify the host.
    fn end_session(&mut self) {
        if let Some(watchdog) = self.state.clear() {
            watchdog.cancel();
        }
        self.shared.files.reset();
        self.shared.hooks.client_disconnected();
    }
}

/// Outcome of one watchdog check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Liveness {
    /// A ping arrived during the last window.
    Alive,
    /// The watched session is no longer the live one.
    Ended,
    /// No ping arrived; the session has just been cleared.
    Expired,
}

/// State shared between the manager and its watchdog task.
struct Shared {
    state: Mutex<SessionState>,
    hooks: Arc<dyn SessionHooks>,
    files: Arc<ChunkedFileStore>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn locked(&self) -> Locked<'_> {
        Locked {
            shared: self,
            state: self.lock(),
        }
    }

    /// Close one heartbeat window for `token`, expiring it when silent.
    fn tick(&self, token: Token) -> Liveness {
        let mut locked = self.locked();
        if locked.state.token != token {
            return Liveness::Ended;
        }
        if locked.state.ping_received {
            locked.state.ping_received = false;
            return Liveness::Alive;
        }
        locked.end_session();
        Liveness::Expired
    }
}

// ── SessionManager ───────────────────────────────────────────────

/// Owns the single active session and its heartbeat watchdog.
///
/// All methods that start a session must be called from within a Tokio
/// runtime, since the watchdog is spawned onto it.
pub struct SessionManager {
    shared: Arc<Shared>,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a manager with default configuration.
    pub fn new(hooks: Arc<dyn SessionHooks>, files: Arc<ChunkedFileStore>) -> Self {
        Self::with_config(hooks, files, SessionConfig::default())
    }

    /// Create a manager with explicit configuration.
    pub fn with_config(
        hooks: Arc<dyn SessionHooks>,
        files: Arc<ChunkedFileStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::default()),
                hooks,
                files,
            }),
            config,
        }
    }

    /// Attach a controller.
    ///
    /// Fails with [`RemoteError::SessionBusy`] while another session is
    /// live (before the password is even looked at), and with
    /// [`RemoteError::InvalidCredentials`] on a wrong password.
    pub fn connect(&self, password: u16) -> Result<Token, RemoteError> {
        let mut state = self.shared.lock();

        if !state.token.is_sentinel() {
            debug!("connect rejected: controller already attached");
            return Err(RemoteError::SessionBusy);
        }
        if !self.shared.hooks.verify_password(password) {
            warn!("connect rejected: invalid password");
            return Err(RemoteError::InvalidCredentials);
        }

        let token = Token::generate();
        let cancel = CancellationToken::new();
        state.token = token;
        state.ping_received = false;
        state.watchdog = Some(cancel.clone());

        // Notified under the lock so it cannot trail this session's end.
        self.shared.hooks.client_connected();
        drop(state);

        heartbeat::spawn(
            Arc::clone(&self.shared),
            token,
            self.config.heartbeat_window,
            cancel,
        );
        info!(%token, "controller connected");
        Ok(token)
    }

    /// Detach the controller.
    ///
    /// Only the sentinel is refused unless `strict_disconnect` is set;
    /// any other token ends the live session. In-flight uploads are
    /// dropped.
    pub fn disconnect(&self, token: Token) -> Result<(), RemoteError> {
        if token.is_sentinel() {
            return Err(RemoteError::InvalidToken(token.raw()));
        }

        let mut locked = self.shared.locked();
        if self.config.strict_disconnect && locked.state.token != token {
            return Err(RemoteError::InvalidToken(token.raw()));
        }
        locked.end_session();
        drop(locked);

        info!(%token, "controller disconnected");
        Ok(())
    }

    /// Confirm liveness for the current heartbeat window.
    pub fn ping(&self, token: Token) -> Result<(), RemoteError> {
        let mut state = self.shared.lock();
        if token.is_sentinel() || state.token != token {
            return Err(RemoteError::InvalidToken(token.raw()));
        }
        state.ping_received = true;
        Ok(())
    }

    /// Whether `token` is the live session token.
    pub fn validate(&self, token: Token) -> bool {
        !token.is_sentinel() && self.shared.lock().token == token
    }

    /// The live token, if a controller is attached.
    pub fn active_token(&self) -> Option<Token> {
        let token = self.shared.lock().token;
        (!token.is_sentinel()).then_some(token)
    }

    /// Whether a controller is attached.
    pub fn is_connected(&self) -> bool {
        self.active_token().is_some()
    }

    /// Drop the live session, if any, without a token.
    ///
    /// Used when the host shuts down.
    pub fn close(&self) {
        let mut locked = self.shared.locked();
        let previous = locked.state.token;
        if previous.is_sentinel() {
            return;
        }
        locked.end_session();
        drop(locked);

        info!(token = %previous, "session closed");
    }
}

// ── Tests ────────────────────────────────────────────────────────
