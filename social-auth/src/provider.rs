//! Provider descriptors: the static, table-driven description of one identity provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::providers;

/// Known identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Facebook,
    GitHub,
    LinkedIn,
    Twitter,
    PayPal,
    MovesApp,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Facebook,
        ProviderKind::GitHub,
        ProviderKind::LinkedIn,
        ProviderKind::Twitter,
        ProviderKind::PayPal,
        ProviderKind::MovesApp,
    ];

    /// Get the provider identifier string, as used in URLs and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Facebook => "facebook",
            ProviderKind::GitHub => "github",
            ProviderKind::LinkedIn => "linkedin",
            ProviderKind::Twitter => "twitter",
            ProviderKind::PayPal => "paypal",
            ProviderKind::MovesApp => "moves-app",
        }
    }

    /// Human readable name shown in notices and buttons.
    pub fn service_name(&self) -> &'static str {
        match self {
            ProviderKind::Facebook => "Facebook",
            ProviderKind::GitHub => "GitHub",
            ProviderKind::LinkedIn => "LinkedIn",
            ProviderKind::Twitter => "Twitter",
            ProviderKind::PayPal => "PayPal",
            ProviderKind::MovesApp => "Moves app",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthVersion {
    V1,
    V2,
}

/// Names the provider uses for fields in its requests and responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    /// Callback query parameter carrying the verifier or code.
    pub verifier: &'static str,
    pub request_token: &'static str,
    pub request_token_secret: &'static str,
    pub access_token: &'static str,
    pub access_token_secret: &'static str,
    pub refresh_token: &'static str,
    /// Remote user id in the token response.
    pub uid: &'static str,
    /// Token lifetime in seconds in the token response.
    pub expiration: Option<&'static str>,
}

impl Labels {
    pub const fn oauth1() -> Self {
        Labels {
            verifier: "oauth_verifier",
            request_token: "oauth_token",
            request_token_secret: "oauth_token_secret",
            access_token: "oauth_token",
            access_token_secret: "oauth_token_secret",
            refresh_token: "refresh_token",
            uid: "user_id",
            expiration: None,
        }
    }

    pub const fn oauth2() -> Self {
        Labels {
            verifier: "code",
            request_token: "oauth_token",
            request_token_secret: "oauth_token_secret",
            access_token: "access_token",
            access_token_secret: "access_token_secret",
            refresh_token: "refresh_token",
            uid: "user_id",
            expiration: Some("expires_in"),
        }
    }

    pub fn with_uid(mut self, uid: &'static str) -> Self {
        self.uid = uid;
        self
    }

    pub fn with_expiration(mut self, expiration: &'static str) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

/// How an access token is attached to API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAuth {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// Token passed as a query parameter, with fixed extra parameters.
    QueryParam {
        token_param: &'static str,
        extra: &'static [(&'static str, &'static str)],
    },
    /// HMAC-SHA1 signed `Authorization` header.
    OAuth1,
}

/// How a token's validity is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCheck {
    /// Facebook style debug endpoint, authorized with an app access token.
    AppTokenDebug { url: String },
    /// An authenticated API call; the payload is inspected for an error marker.
    ApiCall { endpoint: &'static str },
    /// A token-info endpoint that answers 200 for valid tokens.
    TokenInfo { url: String },
}

/// Profile fields a provider can supply for a new local user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Provider-specific behaviour that does not fit the table.
#[derive(Clone, Copy)]
pub struct Hooks {
    /// True when a token check payload signals an invalid token.
    pub is_error_payload: fn(&Value) -> bool,
    /// Remote uid from a token check payload.
    pub resolve_uid: fn(&Value) -> Option<String>,
    /// Maps the user data endpoint's payload.
    pub parse_user_data: fn(&Value) -> UserData,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

/// Static configuration for one identity provider.
///
/// URLs are owned strings so they can point elsewhere, e.g. PayPal's sandbox.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub kind: ProviderKind,
    pub version: OAuthVersion,
    pub api_base_url: String,
    /// OAuth1 only.
    pub request_token_url: Option<String>,
    pub authorization_url: String,
    pub access_token_url: String,
    pub refresh_token_url: Option<String>,
    pub labels: Labels,
    pub scope_separator: &'static str,
    pub default_scope: &'static [&'static str],
    pub api_auth: ApiAuth,
    pub token_check: TokenCheck,
    pub user_data_endpoint: &'static str,
    pub user_data_params: &'static [(&'static str, &'static str)],
    pub profile_endpoint: &'static str,
    /// Send the state value as `nonce` too (OpenID Connect).
    pub sends_nonce: bool,
    pub hooks: Hooks,
}

impl Descriptor {
    /// Descriptor for a provider. `is_live` only affects PayPal.
    pub fn for_kind(kind: ProviderKind, is_live: bool) -> Self {
        match kind {
            ProviderKind::Facebook => providers::facebook::descriptor(),
            ProviderKind::GitHub => providers::github::descriptor(),
            ProviderKind::LinkedIn => providers::linkedin::descriptor(),
            ProviderKind::Twitter => providers::twitter::descriptor(),
            ProviderKind::PayPal => providers::paypal::descriptor(is_live),
            ProviderKind::MovesApp => providers::moves::descriptor(),
        }
    }

    /// Joins a relative endpoint to the API base URL; absolute URLs pass through.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.api_base_url, endpoint)
        }
    }
}

/// Splits a display name on the first space. Without a space the last name is empty.
pub fn split_name(name: &str) -> (String, String) {
    match name.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.to_string()),
        None => (name.to_string(), String::new()),
    }
}

pub(crate) fn str_field(data: &Value, label: &str) -> String {
    data.get(label)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn opt_str_field(data: &Value, label: &str) -> Option<String> {
    data.get(label)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugs_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_slug(kind.as_str()), Some(kind));
        }
        assert_eq!(ProviderKind::from_slug("myspace"), None);
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("Ada King Lovelace"),
            ("Ada".to_string(), "King Lovelace".to_string())
        );
        assert_eq!(split_name("Cher"), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn test_endpoint_url() {
        let descriptor = Descriptor::for_kind(ProviderKind::GitHub, false);
        assert_eq!(descriptor.endpoint_url("user"), "https://api.github.com/user");
        assert_eq!(
            descriptor.endpoint_url("https://example.com/x"),
            "https://example.com/x"
        );
    }

    #[test]
    fn test_oauth_versions() {
        for kind in ProviderKind::ALL {
            let descriptor = Descriptor::for_kind(kind, false);
            let expected = if kind == ProviderKind::Twitter {
                OAuthVersion::V1
            } else {
                OAuthVersion::V2
            };
            assert_eq!(descriptor.version, expected);
            assert_eq!(descriptor.kind, kind);
            assert_eq!(
                descriptor.request_token_url.is_some(),
                expected == OAuthVersion::V1
            );
        }
    }
}
