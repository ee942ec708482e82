//! Fetches the remote profile of a connected user with the stored token.

use crate::error::Error;
use crate::notice::Notice;
use crate::provider_registry::entity_provider;
use crate::store::ProfileStore;
use crate::Id;
use chrono::{Duration, Utc};
use entity_api::provider_profile::Tokens;
use log::*;
use secrecy::ExposeSecret;
use serde_json::Value;
use social_auth::{AccessToken, OAuthClient};

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteProfile {
    /// The user has no profile at this provider.
    NotConnected,
    Fetched(Value),
    /// The token was valid but the profile call failed.
    Failed(Value),
    /// The token is invalid and could not be refreshed.
    Invalid(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileData {
    pub profile: RemoteProfile,
    pub notices: Vec<Notice>,
}

impl ProfileData {
    fn new(profile: RemoteProfile) -> Self {
        Self {
            profile,
            notices: Vec::new(),
        }
    }

    fn with_invalid_token(profile: RemoteProfile, service: &str) -> Self {
        Self {
            profile,
            notices: vec![Notice::invalid_token(service)],
        }
    }
}

pub async fn fetch_remote_profile<S: ProfileStore + ?Sized>(
    client: &dyn OAuthClient,
    store: &S,
    user_id: Id,
) -> Result<ProfileData, Error> {
    let service = client.service_name();
    let Some(profile) = store
        .find_profile_for_user(user_id, entity_provider(client.provider()))
        .await?
    else {
        return Ok(ProfileData::new(RemoteProfile::NotConnected));
    };

    let token = AccessToken::new(
        profile.access_token.as_deref().unwrap_or_default(),
        profile.access_token_secret.as_deref(),
    );
    let status = client.debug_access_token(&token).await?;
    if status.is_valid {
        return fetch(client, &token).await;
    }

    if client.supports_refresh() {
        if let Some(refresh_token) = profile.refresh_token.as_deref() {
            if let Some(refreshed) = client.refresh_access_token(refresh_token).await? {
                info!("Refreshed {service} token of user {user_id}");

                let access_token = refreshed.access_token.expose_secret().to_string();
                store
                    .update_tokens(
                        profile.id,
                        Tokens {
                            access_token: Some(access_token.clone()),
                            access_token_secret: profile.access_token_secret.clone(),
                            refresh_token: refreshed
                                .refresh_token
                                .as_ref()
                                .map(|t| t.expose_secret().to_string())
                                .or_else(|| profile.refresh_token.clone()),
                            token_expires_at: refreshed
                                .expires_in
                                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
                        },
                    )
                    .await?;

                let token =
                    AccessToken::new(&access_token, profile.access_token_secret.as_deref());
                return fetch(client, &token).await;
            }
        }
    }

    warn!("{service} token of user {user_id} is invalid");
    Ok(ProfileData::with_invalid_token(
        RemoteProfile::Invalid(status.data),
        service,
    ))
}

async fn fetch(client: &dyn OAuthClient, token: &AccessToken) -> Result<ProfileData, Error> {
    let response = client.fetch_profile(token).await?;

    if response.is_success() {
        Ok(ProfileData::new(RemoteProfile::Fetched(response.body)))
    } else {
        warn!(
            "{} profile request answered {}",
            client.service_name(),
            response.status
        );
        Ok(ProfileData::with_invalid_token(
            RemoteProfile::Failed(response.body),
            client.service_name(),
        ))
    }
}
