//! In-memory stand-ins for the stores, the provider client, the notifier and the visitor.

use crate::error::Error;
use crate::provider::Provider;
use crate::store::{NewUser, ProfileStore, UserStore};
use crate::visitor::Visitor;
use crate::{provider_profiles, users, Id};
use async_trait::async_trait;
use chrono::Utc;
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use entity_api::provider_profile::Tokens;
use events::{DomainEvent, EventHandler};
use secrecy::SecretString;
use serde_json::{json, Value};
use social_auth::error::{oauth_error, OAuthErrorKind};
use social_auth::provider::Labels;
use social_auth::response::{parse_body, string_field};
use social_auth::{
    AccessToken, ApiResponse, AuthorizationParams, Descriptor, ExchangeParams, OAuthClient,
    OAuthVersion, ProviderKind, RequestToken, TokenResponse, TokenStatus, UserData,
};
use std::sync::Mutex;

fn duplicate() -> Error {
    EntityApiError {
        source: None,
        error_kind: EntityApiErrorKind::DuplicateRecord,
    }
    .into()
}

fn new_profile(provider: Provider, remote_uid: &str, user_id: Option<Id>) -> provider_profiles::Model {
    let now = Utc::now();
    provider_profiles::Model {
        id: Id::new_v4(),
        provider,
        user_id,
        remote_uid: remote_uid.to_string(),
        access_token: None,
        access_token_secret: None,
        refresh_token: None,
        token_expires_at: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    profiles: Mutex<Vec<provider_profiles::Model>>,
    users: Mutex<Vec<users::Model>>,
    token_updates: Mutex<usize>,
    race_next_creation: Mutex<bool>,
}

impl MemoryStore {
    pub(crate) fn add_user(&self, username: &str, email: &str) -> users::Model {
        let now = Utc::now();
        let user = users::Model {
            id: Id::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password: None,
            is_active: true,
            created_at: now.into(),
            updated_at: now.into(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub(crate) fn add_profile(
        &self,
        provider: Provider,
        remote_uid: &str,
        user_id: Option<Id>,
    ) -> provider_profiles::Model {
        let profile = new_profile(provider, remote_uid, user_id);
        self.profiles.lock().unwrap().push(profile.clone());
        profile
    }

    pub(crate) fn profiles(&self) -> Vec<provider_profiles::Model> {
        self.profiles.lock().unwrap().clone()
    }

    pub(crate) fn user(&self, id: Id) -> users::Model {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .unwrap()
    }

    pub(crate) fn deactivate(&self, id: Id) {
        for user in self.users.lock().unwrap().iter_mut() {
            if user.id == id {
                user.is_active = false;
            }
        }
    }

    pub(crate) fn token_updates(&self) -> usize {
        *self.token_updates.lock().unwrap()
    }

    /// The next `create_profile` behaves as if a concurrent request inserted the row first.
    pub(crate) fn race_next_profile_creation(&self) {
        *self.race_next_creation.lock().unwrap() = true;
    }

    fn update_profile<F>(&self, id: Id, change: F) -> Result<provider_profiles::Model, Error>
    where
        F: FnOnce(&mut provider_profiles::Model),
    {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(Error::not_found)?;
        change(profile);
        profile.updated_at = Utc::now().into();
        Ok(profile.clone())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(
        &self,
        provider: Provider,
        remote_uid: &str,
    ) -> Result<Option<provider_profiles::Model>, Error> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.provider == provider && p.remote_uid == remote_uid)
            .cloned())
    }

    async fn find_profile_for_user(
        &self,
        user_id: Id,
        provider: Provider,
    ) -> Result<Option<provider_profiles::Model>, Error> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.provider == provider && p.user_id == Some(user_id))
            .cloned())
    }

    async fn create_profile(
        &self,
        provider: Provider,
        remote_uid: &str,
    ) -> Result<provider_profiles::Model, Error> {
        let mut profiles = self.profiles.lock().unwrap();
        let mut race = self.race_next_creation.lock().unwrap();

        if *race {
            *race = false;
            profiles.push(new_profile(provider, remote_uid, None));
            return Err(duplicate());
        }

        if profiles
            .iter()
            .any(|p| p.provider == provider && p.remote_uid == remote_uid)
        {
            return Err(duplicate());
        }

        let profile = new_profile(provider, remote_uid, None);
        profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_tokens(
        &self,
        id: Id,
        tokens: Tokens,
    ) -> Result<provider_profiles::Model, Error> {
        *self.token_updates.lock().unwrap() += 1;
        self.update_profile(id, |profile| {
            profile.access_token = tokens.access_token;
            profile.access_token_secret = tokens.access_token_secret;
            profile.refresh_token = tokens.refresh_token;
            profile.token_expires_at = tokens.token_expires_at.map(Into::into);
        })
    }

    async fn attach_user(&self, id: Id, user_id: Id) -> Result<provider_profiles::Model, Error> {
        self.update_profile(id, |profile| profile.user_id = Some(user_id))
    }

    async fn delete_profile(&self, id: Id) -> Result<(), Error> {
        self.profiles.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: Id) -> Result<Option<users::Model>, Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>, Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<users::Model>, Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username.to_lowercase() == username.to_lowercase())
            .cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<users::Model, Error> {
        // Column widths of `social_connect.users`.
        let fits = new_user.username.chars().count() <= 254
            && new_user.email.chars().count() <= 75
            && new_user.first_name.chars().count() <= 30
            && new_user.last_name.chars().count() <= 30;
        if !fits {
            return Err(EntityApiError {
                source: None,
                error_kind: EntityApiErrorKind::SystemError,
            }
            .into());
        }

        let mut user = self.add_user(&new_user.username, &new_user.email);
        user.first_name = new_user.first_name;
        user.last_name = new_user.last_name;
        for stored in self.users.lock().unwrap().iter_mut() {
            if stored.id == user.id {
                *stored = user.clone();
            }
        }
        Ok(user)
    }

    async fn activate_user(&self, id: Id) -> Result<users::Model, Error> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(Error::not_found)?;
        user.is_active = true;
        Ok(user.clone())
    }
}

/// An [`OAuthClient`] answering from canned payloads.
pub(crate) struct ScriptedClient {
    kind: ProviderKind,
    version: OAuthVersion,
    labels: Labels,
    token_body: String,
    debug_uid: Option<String>,
    valid_token: bool,
    user_data: UserData,
    refresh_body: Option<String>,
    profile: (u16, Value),
    exchanges: Mutex<usize>,
    request_token_callbacks: Mutex<Vec<String>>,
    fetched_tokens: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(kind: ProviderKind, version: OAuthVersion) -> Self {
        Self {
            kind,
            version,
            labels: Descriptor::for_kind(kind, false).labels,
            token_body: r#"{"access_token":"tok"}"#.to_string(),
            debug_uid: None,
            valid_token: true,
            user_data: UserData::default(),
            refresh_body: None,
            profile: (200, json!({})),
            exchanges: Mutex::new(0),
            request_token_callbacks: Mutex::new(Vec::new()),
            fetched_tokens: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn oauth1(kind: ProviderKind) -> Self {
        Self::new(kind, OAuthVersion::V1)
    }

    pub(crate) fn oauth2(kind: ProviderKind) -> Self {
        Self::new(kind, OAuthVersion::V2)
    }

    /// Raw token endpoint answer, JSON or urlencoded.
    pub(crate) fn with_token_body(mut self, body: &str) -> Self {
        self.token_body = body.to_string();
        self
    }

    pub(crate) fn with_debug_uid(mut self, uid: Option<&str>) -> Self {
        self.debug_uid = uid.map(str::to_string);
        self
    }

    pub(crate) fn with_valid_token(mut self, valid: bool) -> Self {
        self.valid_token = valid;
        self
    }

    pub(crate) fn with_user_data(mut self, data: UserData) -> Self {
        self.user_data = data;
        self
    }

    /// `None` makes the provider reject refresh tokens.
    pub(crate) fn with_refresh(mut self, body: Option<&str>) -> Self {
        self.refresh_body = body.map(str::to_string);
        self
    }

    pub(crate) fn with_profile(mut self, status: u16, body: Value) -> Self {
        self.profile = (status, body);
        self
    }

    pub(crate) fn exchange_count(&self) -> usize {
        *self.exchanges.lock().unwrap()
    }

    pub(crate) fn request_token_callbacks(&self) -> Vec<String> {
        self.request_token_callbacks.lock().unwrap().clone()
    }

    pub(crate) fn fetched_tokens(&self) -> Vec<String> {
        self.fetched_tokens.lock().unwrap().clone()
    }

    fn parse_tokens(&self, body: &str) -> Result<TokenResponse, social_auth::Error> {
        let data = parse_body(body);
        let access_token = string_field(&data, self.labels.access_token).ok_or_else(|| {
            oauth_error(OAuthErrorKind::InvalidResponse, "no access token")
        })?;

        Ok(TokenResponse {
            access_token: SecretString::new(access_token),
            access_token_secret: match self.version {
                OAuthVersion::V1 => {
                    string_field(&data, self.labels.access_token_secret).map(SecretString::new)
                }
                OAuthVersion::V2 => None,
            },
            refresh_token: string_field(&data, self.labels.refresh_token).map(SecretString::new),
            uid: string_field(&data, self.labels.uid),
            expires_in: self
                .labels
                .expiration
                .and_then(|label| string_field(&data, label))
                .and_then(|s| s.parse().ok()),
        })
    }
}

#[async_trait]
impl OAuthClient for ScriptedClient {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn oauth_version(&self) -> OAuthVersion {
        self.version
    }

    fn verifier_label(&self) -> &'static str {
        self.labels.verifier
    }

    fn supports_refresh(&self) -> bool {
        Descriptor::for_kind(self.kind, false)
            .refresh_token_url
            .is_some()
    }

    fn authorization_url(
        &self,
        params: &AuthorizationParams<'_>,
    ) -> Result<String, social_auth::Error> {
        Ok(match self.version {
            OAuthVersion::V1 => format!(
                "https://provider.test/authorize?oauth_token={}",
                params.request_token.unwrap_or_default()
            ),
            OAuthVersion::V2 => format!(
                "https://provider.test/authorize?redirect_uri={}&state={}",
                params.callback_url,
                params.state.unwrap_or_default()
            ),
        })
    }

    async fn request_token(&self, callback_url: &str) -> Result<RequestToken, social_auth::Error> {
        self.request_token_callbacks
            .lock()
            .unwrap()
            .push(callback_url.to_string());
        Ok(RequestToken {
            token: "req-tok".to_string(),
            token_secret: SecretString::new("req-secret".to_string()),
        })
    }

    async fn exchange_for_access_token(
        &self,
        _params: ExchangeParams<'_>,
    ) -> Result<TokenResponse, social_auth::Error> {
        *self.exchanges.lock().unwrap() += 1;
        self.parse_tokens(&self.token_body)
    }

    async fn debug_access_token(
        &self,
        _token: &AccessToken,
    ) -> Result<TokenStatus, social_auth::Error> {
        Ok(TokenStatus {
            is_valid: self.valid_token,
            uid: self.debug_uid.clone().filter(|_| self.valid_token),
            data: json!({ "is_valid": self.valid_token }),
        })
    }

    async fn get(
        &self,
        _endpoint: &str,
        _params: &[(&str, &str)],
        _token: &AccessToken,
    ) -> Result<ApiResponse, social_auth::Error> {
        Ok(ApiResponse {
            status: 200,
            body: Value::Null,
        })
    }

    async fn post(
        &self,
        _endpoint: &str,
        _params: &[(&str, &str)],
        _token: &AccessToken,
    ) -> Result<ApiResponse, social_auth::Error> {
        Ok(ApiResponse {
            status: 200,
            body: Value::Null,
        })
    }

    async fn retrieve_user_data(&self, _token: &AccessToken) -> Result<UserData, social_auth::Error> {
        Ok(self.user_data.clone())
    }

    async fn refresh_access_token(
        &self,
        _refresh_token: &str,
    ) -> Result<Option<TokenResponse>, social_auth::Error> {
        self.refresh_body
            .as_deref()
            .map(|body| self.parse_tokens(body))
            .transpose()
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<ApiResponse, social_auth::Error> {
        use secrecy::ExposeSecret;

        self.fetched_tokens
            .lock()
            .unwrap()
            .push(token.token.expose_secret().to_string());
        Ok(ApiResponse {
            status: self.profile.0,
            body: self.profile.1.clone(),
        })
    }
}

/// Records every published event.
#[derive(Default)]
pub(crate) struct Recorder {
    seen: Mutex<Vec<DomainEvent>>,
}

impl Recorder {
    pub(crate) fn events(&self) -> Vec<DomainEvent> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for Recorder {
    async fn handle(&self, event: &DomainEvent) {
        self.seen.lock().unwrap().push(event.clone());
    }
}

pub(crate) struct TestVisitor {
    user: Option<users::Model>,
    pub(crate) logged_in: Vec<Id>,
}

impl TestVisitor {
    pub(crate) fn anonymous() -> Self {
        Self {
            user: None,
            logged_in: Vec::new(),
        }
    }

    pub(crate) fn authenticated(user: users::Model) -> Self {
        Self {
            user: Some(user),
            logged_in: Vec::new(),
        }
    }
}

#[async_trait]
impl Visitor for TestVisitor {
    fn user(&self) -> Option<&users::Model> {
        self.user.as_ref()
    }

    async fn login(&mut self, user: &users::Model) -> Result<(), Error> {
        self.logged_in.push(user.id);
        self.user = Some(user.clone());
        Ok(())
    }
}
