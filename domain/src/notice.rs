//! Flash messages the flow leaves for the visitor.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
    /// `social <service lowercase>`, for styling per provider.
    pub tags: String,
}

impl Notice {
    fn new(level: Level, service: &str, message: String) -> Self {
        Self {
            level,
            message,
            tags: format!("social {}", service.to_lowercase()),
        }
    }

    pub fn connected(service: &str) -> Self {
        Self::new(
            Level::Success,
            service,
            format!("Your {service} profile was successfully connected with your user account."),
        )
    }

    pub fn already_connected(service: &str) -> Self {
        Self::new(
            Level::Error,
            service,
            format!("This {service} profile is already connected with another user account."),
        )
    }

    pub fn disconnected(service: &str) -> Self {
        Self::new(
            Level::Success,
            service,
            format!(
                "Your {service} profile was successfully disconnected from your user account."
            ),
        )
    }

    pub fn invalid_token(service: &str) -> Self {
        Self::new(
            Level::Warning,
            service,
            format!(
                "Your access token for {service} is invalid. Please connect your account with your profile again."
            ),
        )
    }

    pub fn no_matching_account(service: &str) -> Self {
        Self::new(
            Level::Error,
            service,
            format!(
                "There is no account that matches your {service} credentials. You need to register with your {service} account before you can log in with its credentials."
            ),
        )
    }
}
