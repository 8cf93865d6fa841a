//! Self-signed access token issuer.
//!
//! Turns the identity in an `IdentityStore` into `Authorization: Bearer`
//! metadata for a target URI, caching one signed assertion per audience.
//!
//! # Pre-conditions
//! - The identity must be populated before metadata is requested.
//!
//! # Post-conditions
//! - Every returned token carries `iss == sub == issuer email` and
//!   `aud == target URI`.
//! - A cached assertion is reused until `renewal_margin` before its `exp`.
//!
//! # Invariants
//! - Cache entries are replaced wholesale, never mutated in place.
//! - An issuer never signs twice for an audience whose cached assertion is
//!   still fresh.
//! - Loading a new identity discards every cached assertion.

use std::collections::HashMap;
use std::sync::RwLock;

use jsonwebtoken::Header;
use serde_json::Value;
use tokio::io::AsyncRead;

use super::identity::Identity;
use super::{
    AccessTokenError, AssertionClaims, IdentityStore, JsonWebTokenSigner, RequestMetadata,
    TokenSigner,
};
use crate::config::IssuerConfig;
use crate::constants::TOKEN_LIFETIME_SECS;
use crate::time::{SystemTimeSource, TimeSource};

/// A signed assertion cached for one audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAssertion {
    /// The target URI the token is scoped to.
    pub audience: String,
    /// The compact serialized JWT.
    pub token: String,
    /// The token's `exp` claim.
    pub expires_at_epoch_seconds: u64,
}

impl CachedAssertion {
    /// Whether the assertion can still be handed out at `now_secs`.
    #[must_use]
    pub const fn is_fresh(&self, now_secs: u64, renewal_margin_secs: u64) -> bool {
        now_secs.saturating_add(renewal_margin_secs) < self.expires_at_epoch_seconds
    }
}

/// Issues self-signed JWT access tokens for service-to-service calls.
///
/// # Thread Safety
///
/// Identity loads take `&mut self`. Metadata requests take `&self`; the
/// assertion cache sits behind an `RwLock` so an issuer can be shared
/// behind an `Arc` once its identity is loaded.
pub struct AccessTokenIssuer<S = JsonWebTokenSigner, T = SystemTimeSource> {
    identity: IdentityStore,
    config: IssuerConfig,
    signer: S,
    time_source: T,
    /// Signed assertions keyed by audience.
    cache: RwLock<HashMap<String, CachedAssertion>>,
}

impl AccessTokenIssuer {
    /// Create an issuer with no identity.
    ///
    /// Metadata requests fail with `InvalidState` until a load succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::from_identity(IdentityStore::default())
    }

    /// Create an issuer from directly supplied identity fields.
    #[must_use]
    pub fn from_identity(identity: IdentityStore) -> Self {
        Self::with_parts(
            identity,
            IssuerConfig::default(),
            JsonWebTokenSigner,
            SystemTimeSource,
        )
    }
}

impl Default for AccessTokenIssuer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, T> AccessTokenIssuer<S, T>
where
    S: TokenSigner,
    T: TimeSource,
{
    /// Create an issuer with an explicit configuration, signer and clock.
    #[must_use]
    pub fn with_parts(identity: IdentityStore, config: IssuerConfig, signer: S, time_source: T) -> Self {
        Self {
            identity,
            config,
            signer,
            time_source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    #[must_use]
    pub const fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Load the identity from a service account JSON value.
    ///
    /// # Errors
    /// See `IdentityStore::load_from_value`. On error the identity and the
    /// cache are left untouched.
    pub fn load_from_value(&mut self, value: &Value) -> Result<(), AccessTokenError> {
        self.identity.load_from_value(value)?;
        self.clear_cache();
        Ok(())
    }

    /// Load the identity from the bytes of a service account JSON file.
    ///
    /// # Errors
    /// See `IdentityStore::load_from_slice`.
    pub fn load_from_slice(&mut self, bytes: &[u8]) -> Result<(), AccessTokenError> {
        self.identity.load_from_slice(bytes)?;
        self.clear_cache();
        Ok(())
    }

    /// Load the identity from a blocking reader.
    ///
    /// # Errors
    /// See `IdentityStore::load_from_reader`.
    pub fn load_from_reader<R: std::io::Read>(&mut self, reader: R) -> Result<(), AccessTokenError> {
        self.identity.load_from_reader(reader)?;
        self.clear_cache();
        Ok(())
    }

    /// Load the identity from an async byte stream.
    ///
    /// # Errors
    /// See `IdentityStore::load_from_stream`.
    pub async fn load_from_stream<R>(&mut self, reader: R) -> Result<(), AccessTokenError>
    where
        R: AsyncRead + Unpin,
    {
        self.identity.load_from_stream(reader).await?;
        self.clear_cache();
        Ok(())
    }

    /// Always `false`: assertions are bound to an audience, not to scopes.
    #[must_use]
    pub const fn create_scoped_required(&self) -> bool {
        false
    }

    /// Get the `Authorization` metadata for a request to `target_uri`.
    ///
    /// First checks the cache; if no fresh assertion exists for the audience,
    /// signs a new one and caches it.
    ///
    /// # Pre-conditions
    /// - The identity must be populated.
    /// - `target_uri` must be non-empty.
    ///
    /// # Post-conditions
    /// - On success, the cache holds a fresh assertion for `target_uri`.
    ///
    /// # Errors
    /// Returns `AccessTokenError::InvalidState` if the identity is not populated.
    /// Returns `AccessTokenError::InvalidArgument` if `target_uri` is empty.
    /// Returns `AccessTokenError::Signing` if the signer rejects the key or claims.
    /// Returns `AccessTokenError::LockPoisoned` if the cache lock is poisoned.
    #[allow(clippy::significant_drop_tightening)] // The write lock must cover check and insert
    pub fn get_request_metadata(&self, target_uri: &str) -> Result<RequestMetadata, AccessTokenError> {
        let identity = self.identity.require().inspect_err(|e| {
            tracing::warn!("Cannot generate request metadata for '{target_uri}': {e}");
        })?;
        if target_uri.is_empty() {
            return Err(AccessTokenError::InvalidArgument(
                "target URI must not be empty".to_string(),
            ));
        }

        let now = self.time_source.now_secs();
        let margin = self.config.renewal_margin().as_secs();

        // Fast path: fresh assertion under the read lock
        {
            let cache = self.cache.read().map_err(|_| AccessTokenError::LockPoisoned)?;
            if let Some(cached) = cache.get(target_uri)
                && cached.is_fresh(now, margin)
            {
                tracing::debug!("Reusing cached assertion for '{}'", target_uri);
                return Ok(RequestMetadata::bearer(&cached.token));
            }
        }

        // Slow path: sign under the write lock
        let mut cache = self.cache.write().map_err(|_| AccessTokenError::LockPoisoned)?;

        // Double-check: another thread may have signed while we waited for the write lock
        if let Some(cached) = cache.get(target_uri)
            && cached.is_fresh(now, margin)
        {
            return Ok(RequestMetadata::bearer(&cached.token));
        }

        let assertion = self.sign_assertion(identity, target_uri, now)?;
        let metadata = RequestMetadata::bearer(&assertion.token);
        cache.insert(target_uri.to_string(), assertion);

        Ok(metadata)
    }

    /// Get the cached assertion for `audience`, fresh or not.
    ///
    /// # Errors
    /// Returns `AccessTokenError::LockPoisoned` if the cache lock is poisoned.
    pub fn cached_assertion(&self, audience: &str) -> Result<Option<CachedAssertion>, AccessTokenError> {
        let cache = self.cache.read().map_err(|_| AccessTokenError::LockPoisoned)?;
        Ok(cache.get(audience).cloned())
    }

    fn sign_assertion(
        &self,
        identity: Identity<'_>,
        audience: &str,
        now: u64,
    ) -> Result<CachedAssertion, AccessTokenError> {
        let claims = AssertionClaims {
            iss: identity.issuer_subject.to_string(),
            sub: identity.issuer_subject.to_string(),
            aud: audience.to_string(),
            iat: now,
            exp: now.saturating_add(TOKEN_LIFETIME_SECS),
        };

        let mut header = Header::new(self.config.algorithm());
        header.kid = identity.key_id.map(str::to_string);

        let token = self
            .signer
            .sign(&header, &claims, identity.signing_key)
            .inspect_err(|e| {
                tracing::warn!("Failed to sign assertion for '{}': {e}", audience);
            })?;

        tracing::debug!(
            "Signed new assertion for '{}' as '{}', expires at {}",
            audience,
            identity.issuer_subject,
            claims.exp
        );

        Ok(CachedAssertion {
            audience: audience.to_string(),
            token,
            expires_at_epoch_seconds: claims.exp,
        })
    }

    /// Drop every cached assertion and recover a poisoned lock.
    fn clear_cache(&mut self) {
        match self.cache.get_mut() {
            Ok(cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        self.cache.clear_poison();
    }
}
