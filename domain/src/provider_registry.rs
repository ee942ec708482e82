//! The enabled providers, each with its OAuth client and flow settings.

use crate::error::Error;
use crate::flow::FlowSettings;
use crate::provider::Provider;
use log::*;
use service::config::{Config, ProviderSettings};
use social_auth::http::{build_client, HttpClientConfig};
use social_auth::{AppCredentials, Client, Descriptor, OAuthClient, ProviderKind};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps a provider kind onto the persisted provider enum.
pub fn entity_provider(kind: ProviderKind) -> Provider {
    match kind {
        ProviderKind::Facebook => Provider::Facebook,
        ProviderKind::GitHub => Provider::GitHub,
        ProviderKind::LinkedIn => Provider::LinkedIn,
        ProviderKind::Twitter => Provider::Twitter,
        ProviderKind::PayPal => Provider::PayPal,
        ProviderKind::MovesApp => Provider::MovesApp,
    }
}

/// One enabled provider.
#[derive(Clone)]
pub struct RegisteredProvider {
    pub kind: ProviderKind,
    pub client: Arc<dyn OAuthClient>,
    pub settings: FlowSettings,
    /// Name of the cookie caching this provider's profile data.
    pub cookie_key: String,
}

impl RegisteredProvider {
    pub fn login_label(&self) -> String {
        format!("Log in with {}", self.kind.service_name())
    }

    pub fn signin_label(&self) -> String {
        format!("Sign in with {}", self.kind.service_name())
    }
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, RegisteredProvider>,
}

impl ProviderRegistry {
    /// Builds one client per enabled provider. Expects a validated [`Config`].
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        config.validate()?;

        let http = build_client(&HttpClientConfig::default())?;
        let mut registry = Self::default();

        for slug in config.enabled_provider_slugs() {
            let (Some(kind), Some(settings)) = (
                ProviderKind::from_slug(&slug),
                config.provider_settings(&slug),
            ) else {
                continue;
            };

            info!("Enabling provider: {}", kind.service_name());
            let flow_settings = FlowSettings {
                public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
                email_is_username: config.email_is_username,
                activate_already_registered_users: config.activate_already_registered_users,
                setup_url: settings.setup_url.clone(),
            };
            registry.register(
                kind,
                client_for(kind, &settings, http.clone()),
                flow_settings,
                settings.cookie_key.clone(),
            );
        }

        Ok(registry)
    }

    pub fn register(
        &mut self,
        kind: ProviderKind,
        client: Arc<dyn OAuthClient>,
        settings: FlowSettings,
        cookie_key: String,
    ) {
        self.providers.insert(
            kind.as_str(),
            RegisteredProvider {
                kind,
                client,
                settings,
                cookie_key,
            },
        );
    }

    /// `None` for unknown or disabled slugs.
    pub fn get(&self, slug: &str) -> Option<&RegisteredProvider> {
        self.providers.get(slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredProvider> {
        self.providers.values()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn client_for(
    kind: ProviderKind,
    settings: &ProviderSettings,
    http: reqwest::Client,
) -> Arc<dyn OAuthClient> {
    Arc::new(Client::new(
        Descriptor::for_kind(kind, settings.is_live),
        AppCredentials {
            app_id: settings.app_id.clone(),
            app_secret: settings.app_secret.clone(),
            app_access_token: settings.app_access_token.clone(),
        },
        settings.scope.clone(),
        http,
    ))
}
