//! Service account identity store.
//!
//! Holds the identity used to self-sign assertions and loads it from a service
//! account key, given as a JSON value, raw bytes, or a byte stream.
//!
//! # Pre-conditions
//! - Credential JSON must be an object with string `client_email` and
//!   `private_key` fields.
//!
//! # Post-conditions
//! - A successful load replaces every identity field at once.
//! - A failed load leaves the store exactly as it was.
//!
//! # Invariants
//! - Fields are only written after the whole payload has been read, parsed and
//!   validated.
//! - Key material never appears in `Debug` output or logs.

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::AccessTokenError;

/// Private key material used to sign assertions.
#[derive(Clone, PartialEq, Eq)]
pub enum SigningKey {
    /// PEM-encoded RSA private key (PKCS#1 or PKCS#8), as found in
    /// service account JSON files.
    Pem(String),
    /// DER-encoded RSA private key.
    Der(Vec<u8>),
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pem(_) => f.write_str("SigningKey::Pem(<redacted>)"),
            Self::Der(_) => f.write_str("SigningKey::Der(<redacted>)"),
        }
    }
}

impl From<String> for SigningKey {
    fn from(pem: String) -> Self {
        Self::Pem(pem)
    }
}

impl From<&str> for SigningKey {
    fn from(pem: &str) -> Self {
        Self::Pem(pem.to_string())
    }
}

/// Service account key file, decoded from JSON.
///
/// Unknown fields, including `type`, are ignored; only the fields below are
/// read.
#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
}

impl ServiceAccountKey {
    /// Decode and validate a credential JSON value.
    ///
    /// # Errors
    /// Returns `AccessTokenError::InvalidArgument` if the value is null, is not
    /// an object, lacks a required field, or fails validation.
    fn from_value(value: &Value) -> Result<Self, AccessTokenError> {
        match value {
            Value::Object(_) => {}
            Value::Null => {
                return Err(AccessTokenError::InvalidArgument(
                    "credential object is null".to_string(),
                ));
            }
            other => {
                return Err(AccessTokenError::InvalidArgument(format!(
                    "credential must be a JSON object, got {}",
                    json_kind(other)
                )));
            }
        }

        let key = Self::deserialize(value).map_err(|e| {
            AccessTokenError::InvalidArgument(format!("invalid service account credentials: {e}"))
        })?;
        key.validate()?;
        Ok(key)
    }

    fn validate(&self) -> Result<(), AccessTokenError> {
        if self.client_email.is_empty() {
            return Err(AccessTokenError::InvalidArgument(
                "client_email must not be empty".to_string(),
            ));
        }
        if self.private_key.is_empty() {
            return Err(AccessTokenError::InvalidArgument(
                "private_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A populated identity, borrowed from the store for one signing operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Identity<'a> {
    pub issuer_subject: &'a str,
    pub signing_key: &'a SigningKey,
    pub key_id: Option<&'a str>,
}

/// Holds the signing identity for self-signed assertions.
///
/// The store starts either populated (both `issuer_subject` and
/// `signing_key` given) or uninitialized, and is populated by a load
/// operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityStore {
    issuer_subject: Option<String>,
    signing_key: Option<SigningKey>,
    key_id: Option<String>,
    client_id: Option<String>,
}

impl IdentityStore {
    /// Create a store from directly supplied fields.
    ///
    /// No validation happens here; any field may be omitted and populated
    /// later by a load operation.
    #[must_use]
    pub const fn new(
        issuer_subject: Option<String>,
        signing_key: Option<SigningKey>,
        key_id: Option<String>,
    ) -> Self {
        Self {
            issuer_subject,
            signing_key,
            key_id,
            client_id: None,
        }
    }

    /// The service account email used as both `iss` and `sub`.
    #[must_use]
    pub fn issuer_subject(&self) -> Option<&str> {
        self.issuer_subject.as_deref()
    }

    #[must_use]
    pub const fn signing_key(&self) -> Option<&SigningKey> {
        self.signing_key.as_ref()
    }

    /// Key identifier placed in the `kid` header, if known.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// OAuth client id from the last loaded key file. Not used for signing.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Whether both the issuer email and the signing key are set.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.issuer_subject.is_some() && self.signing_key.is_some()
    }

    /// Borrow the identity for signing.
    ///
    /// # Errors
    /// Returns `AccessTokenError::InvalidState` if the issuer email or the
    /// signing key is unset.
    pub(crate) fn require(&self) -> Result<Identity<'_>, AccessTokenError> {
        let issuer_subject = self.issuer_subject.as_deref().ok_or_else(|| {
            AccessTokenError::InvalidState("issuer email is not set".to_string())
        })?;
        let signing_key = self.signing_key.as_ref().ok_or_else(|| {
            AccessTokenError::InvalidState("signing key is not set".to_string())
        })?;

        Ok(Identity {
            issuer_subject,
            signing_key,
            key_id: self.key_id.as_deref(),
        })
    }

    /// Populate the identity from a service account JSON value.
    ///
    /// # Post-conditions
    /// - On success, `issuer_subject == client_email`,
    ///   `signing_key == Pem(private_key)` and `key_id == private_key_id`.
    ///
    /// # Errors
    /// Returns `AccessTokenError::InvalidArgument` if the value is null, not
    /// an object, or missing `client_email` / `private_key`.
    pub fn load_from_value(&mut self, value: &Value) -> Result<(), AccessTokenError> {
        let key = ServiceAccountKey::from_value(value).inspect_err(log_rejected)?;
        self.apply(key);
        Ok(())
    }

    /// Populate the identity from the bytes of a service account JSON file.
    ///
    /// # Errors
    /// Returns `AccessTokenError::InvalidArgument` if `bytes` is empty or the
    /// decoded object fails validation, and `AccessTokenError::Parse` if the
    /// bytes are not valid JSON.
    pub fn load_from_slice(&mut self, bytes: &[u8]) -> Result<(), AccessTokenError> {
        if bytes.is_empty() {
            let e = AccessTokenError::InvalidArgument("credential stream is empty".to_string());
            log_rejected(&e);
            return Err(e);
        }

        let value: Value = serde_json::from_slice(bytes)
            .map_err(AccessTokenError::Parse)
            .inspect_err(log_rejected)?;
        self.load_from_value(&value)
    }

    /// Read a blocking reader to completion and load the identity from it.
    ///
    /// # Errors
    /// Returns `AccessTokenError::Io` if reading fails, otherwise the same
    /// errors as `load_from_slice`.
    pub fn load_from_reader<R: std::io::Read>(&mut self, mut reader: R) -> Result<(), AccessTokenError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(AccessTokenError::Io)
            .inspect_err(log_rejected)?;
        self.load_from_slice(&bytes)
    }

    /// Read an async stream to completion and load the identity from it.
    ///
    /// # Errors
    /// Returns `AccessTokenError::Io` if reading fails, otherwise the same
    /// errors as `load_from_slice`.
    pub async fn load_from_stream<R>(&mut self, mut reader: R) -> Result<(), AccessTokenError>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .map_err(AccessTokenError::Io)
            .inspect_err(log_rejected)?;
        self.load_from_slice(&bytes)
    }

    fn apply(&mut self, key: ServiceAccountKey) {
        tracing::info!(
            "Loaded service account identity '{}' (key id: {:?})",
            key.client_email,
            key.private_key_id
        );

        self.issuer_subject = Some(key.client_email);
        self.signing_key = Some(SigningKey::Pem(key.private_key));
        self.key_id = key.private_key_id;
        self.client_id = key.client_id;
    }
}

fn log_rejected(e: &AccessTokenError) {
    tracing::warn!("Rejected service account credentials: {e}");
}
