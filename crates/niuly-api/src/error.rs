use thiserror::Error;

/// Top-level error type for the `niuly-api` crate.
///
/// Every failure of the vendor client lands in one of three kinds:
/// authentication, business-endpoint status, or transport. Match on the
/// variants (or on [`Error::kind`]) to catch narrowly; treat the enum as a
/// whole to catch broadly.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token endpoint rejected the credentials or returned no usable token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Business endpoints ──────────────────────────────────────────
    /// Non-success status from a data endpoint after any applicable retry,
    /// or a success body that could not be decoded.
    #[error("API error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api { message: String, status: Option<u16> },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, reset).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Base URL could not be turned into endpoint URLs. Only raised when
    /// constructing a client.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Fieldless discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Api,
    Network,
    InvalidUrl,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Api { .. } => ErrorKind::Api,
            Self::Network(_) => ErrorKind::Network,
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
        }
    }

    /// HTTP status carried by an [`Api`](Self::Api) error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` for failures where the request never got a response.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
