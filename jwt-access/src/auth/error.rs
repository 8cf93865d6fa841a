use super::signer::SignError;

/// Error returned by identity loading and token issuance.
#[derive(Debug)]
pub enum AccessTokenError {
    /// A required input is absent, empty, or missing required fields.
    InvalidArgument(String),
    /// The credential bytes are not valid JSON.
    Parse(serde_json::Error),
    /// Issuance was attempted before the identity was populated.
    InvalidState(String),
    /// The signing collaborator rejected the key or payload.
    Signing(SignError),
    /// Reading the credential stream failed.
    Io(std::io::Error),
    /// The assertion cache lock was poisoned by a panicking thread.
    LockPoisoned,
}

impl std::fmt::Display for AccessTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            Self::Parse(e) => write!(f, "failed to parse credentials: {e}"),
            Self::InvalidState(reason) => write!(f, "invalid state: {reason}"),
            Self::Signing(e) => write!(f, "signing failed: {e}"),
            Self::Io(e) => write!(f, "failed to read credentials: {e}"),
            Self::LockPoisoned => write!(f, "assertion cache lock poisoned"),
        }
    }
}

impl std::error::Error for AccessTokenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Signing(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::InvalidArgument(_) | Self::InvalidState(_) | Self::LockPoisoned => None,
        }
    }
}

impl From<SignError> for AccessTokenError {
    fn from(e: SignError) -> Self {
        Self::Signing(e)
    }
}

impl From<std::io::Error> for AccessTokenError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
