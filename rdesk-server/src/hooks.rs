//! Session hooks for the standalone server: a shared password and
//! connection notices in the log.

use rand::Rng;
use tracing::info;

use rdesk_core::SessionHooks;

/// Range of generated passwords; always four digits.
const GENERATED_PASSWORDS: std::ops::RangeInclusive<u16> = 1000..=9998;

/// A random four-digit password.
pub fn generate_password<R: Rng + ?Sized>(rng: &mut R) -> u16 {
    rng.gen_range(GENERATED_PASSWORDS)
}

/// Checks the configured password and logs controller arrivals.
#[derive(Debug, Clone)]
pub struct ConsoleHooks {
    password: u16,
}

impl ConsoleHooks {
    /// Use `configured`, or a generated password when it is `0`.
    pub fn new(configured: u16) -> Self {
        let password = if configured == 0 {
            generate_password(&mut rand::thread_rng())
        } else {
            configured
        };
        Self { password }
    }

    pub fn password(&self) -> u16 {
        self.password
    }
}

impl SessionHooks for ConsoleHooks {
    fn verify_password(&self, candidate: u16) -> bool {
        candidate == self.password
    }

    fn client_connected(&self) {
        info!("client connected");
    }

    fn client_disconnected(&self) {
        info!("client disconnected");
    }
}
