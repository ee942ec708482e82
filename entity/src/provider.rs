use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Identity providers a local user can connect a profile from.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    EnumIter,
    Deserialize,
    Serialize,
    DeriveActiveEnum,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "provider")]
pub enum Provider {
    #[sea_orm(string_value = "facebook")]
    Facebook,
    #[sea_orm(string_value = "github")]
    GitHub,
    #[sea_orm(string_value = "linkedin")]
    LinkedIn,
    #[sea_orm(string_value = "twitter")]
    Twitter,
    #[sea_orm(string_value = "paypal")]
    PayPal,
    #[sea_orm(string_value = "moves_app")]
    #[serde(rename = "moves_app")]
    MovesApp,
}

impl Provider {
    /// URL path segment and configuration prefix for this provider.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::GitHub => "github",
            Self::LinkedIn => "linkedin",
            Self::Twitter => "twitter",
            Self::PayPal => "paypal",
            Self::MovesApp => "moves-app",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider: {}", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(slug: &str) -> Result<Self, Self::Err> {
        Self::iter()
            .find(|provider| provider.slug() == slug)
            .ok_or_else(|| UnknownProvider(slug.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Facebook => write!(f, "Facebook"),
            Self::GitHub => write!(f, "GitHub"),
            Self::LinkedIn => write!(f, "LinkedIn"),
            Self::Twitter => write!(f, "Twitter"),
            Self::PayPal => write!(f, "PayPal"),
            Self::MovesApp => write!(f, "Moves app"),
        }
    }
}
