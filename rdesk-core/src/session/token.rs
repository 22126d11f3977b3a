//! Session tokens.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Opaque session credential handed to the controller on connect.
///
/// The wire representation is a plain `i32`; [`Token::SENTINEL`] (`-1`)
/// stands for "no session" and is also what a failed connect returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(i32);

impl Token {
    /// Reserved value meaning "no active session" / "invalid token".
    pub const SENTINEL: Token = Token(-1);

    /// Wrap a raw value received from the transport.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw value sent back over the transport.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Whether this token is the sentinel.
    pub const fn is_sentinel(self) -> bool {
        self.0 == Self::SENTINEL.0
    }

    /// Draw a fresh token.
    ///
    /// The result is always strictly positive, so it can never collide
    /// with the sentinel or with zero.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Draw a fresh token from the given RNG.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(1..i32::MAX))
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::SENTINEL
    }
}

impl From<i32> for Token {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn default_is_sentinel() {
        assert!(Token::default().is_sentinel());
        assert_eq!(Token::SENTINEL.raw(), -1);
    }

    #[test]
    fn generated_tokens_exclude_sentinel_and_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let token = Token::generate_with(&mut rng);
            assert!(!token.is_sentinel());
            assert!(token.raw() > 0);
        }
    }

    #[test]
    fn raw_roundtrip() {
        let token = Token::from_raw(1234);
        assert_eq!(token.raw(), 1234);
        assert_eq!(Token::from(1234), token);
        assert_eq!(token.to_string(), "1234");
    }
}
