// Life of a request:
// 1. Caller builds an `AccessTokenIssuer`, either with an identity up front
//    or by loading a service account key (JSON value, bytes, or stream)
// 2. Caller asks for request metadata for a target URI
// 3. Issuer checks its per-audience cache:
//     - Hit (not within the renewal margin of expiry): reuse the token
//     - Miss: build iss/sub/aud/iat/exp claims, sign, cache
// 4. Return `Authorization: Bearer <token>`
//
// System components:
//  - Identity store (service account email, private key, key id)
//  - Signing collaborator (jsonwebtoken by default)
//  - Assertion cache keyed by audience

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod auth;
pub mod config;
mod constants;
pub mod time;


pub use auth::{
    AccessTokenError, AccessTokenIssuer, AssertionClaims, CachedAssertion, IdentityStore,
    JsonWebTokenSigner, RequestMetadata, SignError, SigningKey, TokenSigner,
};
pub use config::{ConfigError, IssuerConfig};
pub use constants::{AUTHORIZATION_HEADER, TOKEN_LIFETIME_SECS};
