/// Lifetime of every issued assertion, in seconds.
pub const TOKEN_LIFETIME_SECS: u64 = 3600;

/// Header name carried in the request metadata.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Scheme prefix for the `Authorization` header value.
pub(crate) const BEARER_PREFIX: &str = "Bearer ";
