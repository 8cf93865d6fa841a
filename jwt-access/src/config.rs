//! Issuer configuration module.
//!
//! The token lifetime is fixed (`TOKEN_LIFETIME_SECS`); what can be tuned is
//! the signing algorithm and how early a cached assertion is renewed.
//!
//! # Invariants
//!
//! - `algorithm` is always an RSA-family algorithm (`RS*` or `PS*`), since the
//!   service account key is an RSA private key.
//! - `renewal_margin` is always strictly shorter than the token lifetime, so a
//!   freshly signed assertion is usable at least once.

use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::constants::TOKEN_LIFETIME_SECS;

/// Error returned when an issuer configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The algorithm cannot be used with an RSA service account key.
    UnsupportedAlgorithm(Algorithm),
    /// The renewal margin would expire tokens as soon as they are issued.
    RenewalMarginTooLong {
        /// Requested margin in seconds.
        margin_secs: u64,
        /// Fixed token lifetime in seconds.
        lifetime_secs: u64,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedAlgorithm(algorithm) => {
                write!(f, "unsupported signing algorithm: {algorithm:?}")
            }
            Self::RenewalMarginTooLong {
                margin_secs,
                lifetime_secs,
            } => write!(
                f,
                "renewal margin of {margin_secs}s must be shorter than the token lifetime of {lifetime_secs}s"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Issuer configuration.
///
/// # Post-conditions
///
/// - Values returned by `new` or `default` satisfy the module invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuerConfig {
    algorithm: Algorithm,
    renewal_margin: Duration,
}

impl IssuerConfig {
    /// Default signing algorithm.
    pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::RS256;
    /// Default renewal margin: cached assertions are re-signed this long before `exp`.
    pub const DEFAULT_RENEWAL_MARGIN: Duration = Duration::from_secs(60);

    /// Create a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `algorithm` is not `RS256`, `RS384`, `RS512`, `PS256`, `PS384` or `PS512`
    /// - `renewal_margin` is not shorter than `TOKEN_LIFETIME_SECS`
    pub fn new(algorithm: Algorithm, renewal_margin: Duration) -> Result<Self, ConfigError> {
        Self::validate_algorithm(algorithm)?;
        Self::validate_renewal_margin(renewal_margin)?;

        Ok(Self {
            algorithm,
            renewal_margin,
        })
    }

    /// The algorithm placed in the `alg` header and used for signing.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// How long before `exp` a cached assertion is considered stale.
    #[must_use]
    pub const fn renewal_margin(&self) -> Duration {
        self.renewal_margin
    }

    const fn validate_algorithm(algorithm: Algorithm) -> Result<(), ConfigError> {
        match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Ok(()),
            other => Err(ConfigError::UnsupportedAlgorithm(other)),
        }
    }

    const fn validate_renewal_margin(renewal_margin: Duration) -> Result<(), ConfigError> {
        let margin_secs = renewal_margin.as_secs();
        if margin_secs >= TOKEN_LIFETIME_SECS {
            return Err(ConfigError::RenewalMarginTooLong {
                margin_secs,
                lifetime_secs: TOKEN_LIFETIME_SECS,
            });
        }
        Ok(())
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            algorithm: Self::DEFAULT_ALGORITHM,
            renewal_margin: Self::DEFAULT_RENEWAL_MARGIN,
        }
    }
}
