//! Self-signed JWT access tokens.
//!
//! This module issues short-lived assertions signed with a service account's
//! own private key, so outbound requests can be authorized without a round
//! trip to a token server.
//!
//! # Pre-conditions
//! - A service account email and RSA private key must be supplied, directly or
//!   through one of the load operations, before metadata is requested.
//!
//! # Post-conditions
//! - Request metadata is always a single `Authorization: Bearer <jwt>` entry.
//!
//! # Invariants
//! - Issuance never proceeds with a partially populated identity.

mod error;
mod identity;
mod issuer;
mod metadata;
mod signer;

pub use error::AccessTokenError;
pub use identity::{IdentityStore, SigningKey};
pub use issuer::{AccessTokenIssuer, CachedAssertion};
pub use metadata::RequestMetadata;
pub use signer::{AssertionClaims, JsonWebTokenSigner, SignError, TokenSigner};
