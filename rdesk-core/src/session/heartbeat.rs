//! Heartbeat watchdog.
//!
//! One watchdog runs per live session. Every window it asks the shared
//! session state whether a ping arrived since the previous check; if
//! not, the session is expired with compare-and-clear semantics so a
//! late watchdog can never tear down a newer session.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Liveness, Shared, Token};

/// Spawn the watchdog for `token`.
///
/// The task exits when `cancel` fires, when the live token changes, or
/// after it has expired the session itself.
pub(super) fn spawn(
    shared: Arc<Shared>,
    token: Token,
    window: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(%token, "heartbeat watchdog started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(window) => {}
            }

            match shared.tick(token) {
                Liveness::Alive => continue,
                Liveness::Ended => break,
                Liveness::Expired => {
                    warn!(%token, "no ping within {window:?}; controller dropped");
                    break;
                }
            }
        }

        debug!(%token, "heartbeat watchdog finished");
    })
}
