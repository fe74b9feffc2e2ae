//! Error types for the SSO client.

/// SSO client errors.
#[derive(Debug, thiserror::Error)]
pub enum SsoError {
    /// Missing or invalid configuration (trust material, base URL, metadata).
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Base URL uses a scheme other than http/https.
    #[error("unsupported scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// Socket, timeout or TLS handshake failure.
    #[error("connection failed: {message}")]
    ConnectionFailed { errno: Option<i32>, message: String },

    /// Peer certificate serial does not match the pinned serial.
    #[error("certificate serial mismatch: expected {expected}, got {actual}")]
    CertificateMismatch { expected: String, actual: String },

    /// Response bytes do not follow the expected status-line/header/body shape.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// Identity service answered with an unexpected status code.
    #[error("HTTP response code {code}")]
    HttpStatus { code: u16 },

    /// Identity service answered 401.
    #[error("not authenticated")]
    Unauthorized,

    /// Identity service answered 403.
    #[error("access forbidden to identity service")]
    Forbidden,

    /// Attribute fetch attempted without a token.
    #[error("empty token")]
    EmptyToken,

    /// Attribute lookup with an empty name.
    #[error("empty attribute name")]
    EmptyAttributeName,
}

impl SsoError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub(crate) fn connection(err: &std::io::Error, context: &str) -> Self {
        Self::ConnectionFailed {
            errno: err.raw_os_error(),
            message: format!("{}: {}", context, err),
        }
    }

    /// HTTP-like status code carried by the error, if any.
    ///
    /// Lets callers tell "unauthenticated" (401) from "forbidden" (403) from
    /// any other protocol failure.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::HttpStatus { code } => Some(*code),
            _ => None,
        }
    }

    /// Whether the session facade reports this error as a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::CertificateMismatch { .. }
                | Self::MalformedResponse { .. }
                | Self::HttpStatus { .. }
        )
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Contract violations / config issues
            Self::Config { .. } => 2,
            Self::UnsupportedScheme { .. } => 2,
            Self::EmptyToken => 2,
            Self::EmptyAttributeName => 2,

            // Session not valid
            Self::Unauthorized => 1,

            // Security issues
            Self::Forbidden => 3,
            Self::CertificateMismatch { .. } => 4,

            // Network/protocol
            Self::ConnectionFailed { .. } => 5,
            Self::MalformedResponse { .. } => 5,
            Self::HttpStatus { .. } => 5,
        }
    }
}

/// Result type for SSO operations.
pub type SsoResult<T> = Result<T, SsoError>;
