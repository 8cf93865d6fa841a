use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use super::AccessTokenError;
use crate::constants::{AUTHORIZATION_HEADER, BEARER_PREFIX};

/// Headers to attach to an outbound request.
///
/// Produced by `AccessTokenIssuer::get_request_metadata`; currently always a
/// single `Authorization: Bearer <token>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMetadata {
    headers: HashMap<String, String>,
}

impl RequestMetadata {
    pub(crate) fn bearer(token: &str) -> Self {
        let mut headers = HashMap::with_capacity(1);
        headers.insert(
            AUTHORIZATION_HEADER.to_string(),
            format!("{BEARER_PREFIX}{token}"),
        );
        Self { headers }
    }

    /// Look up a header value by its exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The full `Authorization` header value, e.g. `Bearer eyJ...`.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.get(AUTHORIZATION_HEADER)
    }

    /// The signed token, without the `Bearer ` prefix.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization()?.strip_prefix(BEARER_PREFIX)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> HashMap<String, String> {
        self.headers
    }

    /// Render the metadata as an HTTP header map.
    ///
    /// # Errors
    /// Returns `AccessTokenError::InvalidArgument` if a name or value is not a
    /// legal HTTP header.
    pub fn to_header_map(&self) -> Result<HeaderMap, AccessTokenError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                AccessTokenError::InvalidArgument(format!("invalid header name '{name}': {e}"))
            })?;
            let mut header_value = HeaderValue::from_str(value).map_err(|e| {
                AccessTokenError::InvalidArgument(format!("invalid value for header '{name}': {e}"))
            })?;
            header_value.set_sensitive(true);
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}
