//! In-flight state of one login attempt, kept in the visitor's session between flow steps.

use chrono::{DateTime, Utc};
use entity_api::provider_profile::Tokens;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSession {
    pub next_url: Option<String>,
    /// Originating URL of an only-login button. The flow must not create a user while set.
    pub only_login: Option<String>,
    pub oauth_state: Option<String>,
    pub request_token: Option<String>,
    pub request_token_secret: Option<String>,
    pub service_uid: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub new_user: bool,
}

impl FlowSession {
    /// Session key holding the flow state of one provider.
    pub fn key(slug: &str) -> String {
        format!("socialnetworks:{slug}")
    }

    /// Pops the post-flow redirect target.
    pub fn take_next_url(&mut self) -> String {
        self.next_url
            .take()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| "/".to_string())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn staged_tokens(&self) -> Tokens {
        Tokens {
            access_token: self.access_token.clone(),
            access_token_secret: self.access_token_secret.clone(),
            refresh_token: self.refresh_token.clone(),
            token_expires_at: self.token_expires_at,
        }
    }
}
