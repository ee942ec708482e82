//! Error types for the `social-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for social-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in social-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    OAuth(OAuthErrorKind),
    Http(HttpErrorKind),
    Signing(SigningErrorKind),
    Config,
}

/// Errors from OAuth operations.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    RequestTokenFailed,
    TokenExchangeFailed,
    TokenRefreshFailed,
    InvalidResponse,
    /// The operation does not apply to this provider's OAuth version.
    UnsupportedOperation,
}

/// Errors from verifying signed values.
#[derive(Debug, PartialEq)]
pub enum SigningErrorKind {
    Malformed,
    InvalidSignature,
    Expired,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl Error {
    /// True when the provider could not be reached at all.
    pub fn is_network(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::Http(HttpErrorKind::Network) | ErrorKind::Http(HttpErrorKind::RequestFailed)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind)?,
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
            ErrorKind::Signing(kind) => write!(f, "Signing error: {:?}", kind)?,
            ErrorKind::Config => write!(f, "Configuration error")?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create signing errors.
pub fn signing_error(kind: SigningErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Signing(kind),
    }
}

pub fn config_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = oauth_error(OAuthErrorKind::TokenExchangeFailed, "status 400");
        assert_eq!(
            err.to_string(),
            "OAuth error: TokenExchangeFailed (status 400)"
        );
    }

    #[test]
    fn only_http_transport_failures_are_network_errors() {
        let network = Error {
            source: None,
            error_kind: ErrorKind::Http(HttpErrorKind::Network),
        };
        assert!(network.is_network());
        assert!(!oauth_error(OAuthErrorKind::InvalidResponse, "bad json").is_network());
    }
}
