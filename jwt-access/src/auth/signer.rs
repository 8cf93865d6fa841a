//! JWT signing collaborator.
//!
//! The issuer treats signing as a black box: a header, a set of claims and a
//! private key go in, a compact `header.payload.signature` token comes out.
//! `JsonWebTokenSigner` is the production implementation on top of the
//! `jsonwebtoken` crate.
//!
//! # Pre-conditions
//! - The signing key must be an RSA private key matching the header's `alg`.
//!
//! # Post-conditions
//! - On success, returns a compact serialized JWT whose claims are exactly the
//!   given `AssertionClaims`.
//!
//! # Invariants
//! - Signing is stateless and does not modify any external state.

use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use super::SigningKey;

/// Claims of a self-signed access assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer: the service account email.
    pub iss: String,
    /// Subject: the service account email.
    pub sub: String,
    /// Audience: the target URI.
    pub aud: String,
    /// Issued-at, seconds since Unix epoch.
    pub iat: u64,
    /// Expiry, seconds since Unix epoch.
    pub exp: u64,
}

/// Error returned when signing an assertion fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    /// The private key could not be parsed or does not fit the algorithm.
    InvalidKey(String),
    /// Encoding the header/claims or computing the signature failed.
    Encoding(String),
}

impl std::fmt::Display for SignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(reason) => write!(f, "invalid signing key: {reason}"),
            Self::Encoding(reason) => write!(f, "failed to encode JWT: {reason}"),
        }
    }
}

impl std::error::Error for SignError {}

/// Produces a compact serialized JWT from a header, claims and private key.
pub trait TokenSigner {
    /// Sign `claims` with `key`, using the algorithm in `header`.
    ///
    /// # Errors
    /// Returns `SignError` if the key is unusable or encoding fails.
    fn sign(
        &self,
        header: &Header,
        claims: &AssertionClaims,
        key: &SigningKey,
    ) -> Result<String, SignError>;
}

/// Signs assertions with the `jsonwebtoken` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWebTokenSigner;

impl TokenSigner for JsonWebTokenSigner {
    fn sign(
        &self,
        header: &Header,
        claims: &AssertionClaims,
        key: &SigningKey,
    ) -> Result<String, SignError> {
        let encoding_key = encoding_key(key)?;
        encode(header, claims, &encoding_key).map_err(map_jwt_error)
    }
}

/// Builds the `jsonwebtoken` key for an RSA private key.
///
/// DER keys are not parsed until the signature is computed, so a malformed
/// DER key surfaces from `encode` rather than from here; `map_jwt_error`
/// still reports it as `InvalidKey`.
fn encoding_key(key: &SigningKey) -> Result<EncodingKey, SignError> {
    match key {
        SigningKey::Pem(pem) => EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| SignError::InvalidKey(e.to_string())),
        SigningKey::Der(der) => Ok(EncodingKey::from_rsa_der(der)),
    }
}

/// Maps jsonwebtoken errors to our `SignError` type.
///
/// Only serialization failures are `Encoding`. Every other kind (key parsing,
/// algorithm mismatch, signature computation) comes from the key material.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> SignError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::Base64(_) => {
            SignError::Encoding(error.to_string())
        }
        _ => SignError::InvalidKey(error.to_string()),
    }
}
