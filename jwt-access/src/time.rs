//! Time source abstraction for token issuance.
//!
//! Expiry and renewal decisions read the clock through `TimeSource`, so the
//! issuer uses the system clock in production and a controlled clock in tests.

use std::time::{SystemTime, UNIX_EPOCH};

/// Abstraction over the wall clock.
pub trait TimeSource {
    /// Get the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;

    /// Get the current time in whole seconds since Unix epoch.
    ///
    /// This is the resolution of the `iat` and `exp` claims.
    fn now_secs(&self) -> u64 {
        self.now_ms() / 1000
    }
}

/// Real time source using the system clock.
///
/// This is the default implementation used by `AccessTokenIssuer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    #[allow(clippy::cast_possible_truncation)] // Milliseconds won't overflow u64 for billions of years
    fn now_ms(&self) -> u64 {
        // A clock set before 1970 reads as the epoch; every token issued then is
        // already expired, which is the safe direction.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
