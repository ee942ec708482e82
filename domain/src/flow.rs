//! The connect-and-login flow every provider shares.
//!
//! A flow runs in up to four requests. `redirect` sends the visitor to the provider,
//! `callback` exchanges the provider's verifier for tokens and reconciles the remote
//! identity with a local user, and `setup_get`/`setup_post` complete a sign-up when
//! no local user could be matched. `disconnect` removes a link again.
//!
//! Steps never touch HTTP directly. Each one returns a [`Step`] that the web layer
//! turns into a response, plus the [`Notice`]s to flash to the visitor.

use crate::error::Error;
use crate::flow_session::FlowSession;
use crate::notice::Notice;
use crate::provider::Provider;
use crate::provider_registry::entity_provider;
use crate::setup_form::{self, SetupForm, SetupInput};
use crate::store::{NewUser, ProfileStore, UserStore};
use crate::username::compose_username;
use crate::visitor::Visitor;
use crate::{provider_profiles, users, Id};
use chrono::{Duration, Utc};
use events::{DomainEvent, EventPublisher};
use log::*;
use secrecy::ExposeSecret;
use serde::Deserialize;
use social_auth::state::generate_state;
use social_auth::{AccessToken, AuthorizationParams, ExchangeParams, OAuthClient, OAuthVersion};
use std::collections::HashMap;
use url::{Position, Url};

/// Per-provider policy of a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSettings {
    /// Externally visible origin, without a trailing slash.
    pub public_base_url: String,
    pub email_is_username: bool,
    pub activate_already_registered_users: bool,
    /// Custom page completing the setup step instead of the built-in form.
    pub setup_url: Option<String>,
}

impl FlowSettings {
    pub fn callback_url(&self, slug: &str) -> String {
        format!("{}/{slug}/callback", self.public_base_url)
    }
}

/// Form fields posted to the login route.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct RedirectParams {
    pub next: Option<String>,
    pub only_login: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepResponse {
    Redirect(String),
    /// Blank 403; nothing was changed.
    Forbidden,
    RenderSetup(SetupForm),
    /// Redirect to a custom setup page, carrying the data in the temporary setup cookie.
    StageSetup {
        location: String,
        data: SetupInput,
    },
    /// Redirect after a completed setup, deleting the temporary setup cookie.
    FinishSetup(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub response: StepResponse,
    pub notices: Vec<Notice>,
}

impl Step {
    fn new(response: StepResponse) -> Self {
        Self {
            response,
            notices: Vec::new(),
        }
    }

    fn redirect(url: String) -> Self {
        Self::new(StepResponse::Redirect(url))
    }

    fn forbidden() -> Self {
        Self::new(StepResponse::Forbidden)
    }

    fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices;
        self
    }
}

/// Appends `oauth_error=True` to an only-login origin, keeping only its path and query.
fn rejected_login_url(only_login: &str) -> String {
    let parsed = Url::parse("http://localhost/").and_then(|base| base.join(only_login));

    match parsed {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("oauth_error", "True");
            url[Position::BeforePath..Position::AfterQuery].to_string()
        }
        Err(_) => "/?oauth_error=True".to_string(),
    }
}

pub struct Flow<'a, S> {
    client: &'a dyn OAuthClient,
    store: &'a S,
    events: &'a EventPublisher,
    settings: &'a FlowSettings,
}

impl<'a, S> Flow<'a, S>
where
    S: ProfileStore + UserStore,
{
    pub fn new(
        client: &'a dyn OAuthClient,
        store: &'a S,
        events: &'a EventPublisher,
        settings: &'a FlowSettings,
    ) -> Self {
        Self {
            client,
            store,
            events,
            settings,
        }
    }

    fn provider(&self) -> Provider {
        entity_provider(self.client.provider())
    }

    fn slug(&self) -> &'static str {
        self.client.provider().as_str()
    }

    fn service(&self) -> &'static str {
        self.client.service_name()
    }

    fn setup_path(&self) -> String {
        format!("/{}/setup", self.slug())
    }

    async fn emit<F>(&self, user_id: Id, event: F)
    where
        F: FnOnce(Id, String) -> DomainEvent,
    {
        self.events
            .publish(event(user_id, self.service().to_lowercase()))
            .await;
    }

    async fn emit_connect(&self, user_id: Id) {
        self.emit(user_id, |user_id, provider| DomainEvent::ProfileConnected {
            user_id,
            provider,
        })
        .await
    }

    async fn emit_login(&self, user_id: Id) {
        self.emit(user_id, |user_id, provider| DomainEvent::UserLoggedIn {
            user_id,
            provider,
        })
        .await
    }

    /// START → AWAITING_AUTHORIZATION
    pub async fn redirect(
        &self,
        session: &mut FlowSession,
        params: RedirectParams,
    ) -> Result<Step, Error> {
        session.clear();
        session.next_url = params.next.filter(|next| !next.is_empty());
        session.only_login = params.only_login.filter(|origin| !origin.is_empty());

        let callback_url = self.settings.callback_url(self.slug());

        let location = match self.client.oauth_version() {
            OAuthVersion::V1 => {
                let request_token = self.client.request_token(&callback_url).await?;
                let location = self.client.authorization_url(&AuthorizationParams {
                    callback_url: &callback_url,
                    request_token: Some(&request_token.token),
                    state: None,
                })?;
                session.request_token = Some(request_token.token);
                session.request_token_secret =
                    Some(request_token.token_secret.expose_secret().to_string());
                location
            }
            OAuthVersion::V2 => {
                let state = generate_state();
                let location = self.client.authorization_url(&AuthorizationParams {
                    callback_url: &callback_url,
                    request_token: None,
                    state: Some(&state),
                })?;
                session.oauth_state = Some(state);
                location
            }
        };

        debug!("Redirecting visitor to {} authorization", self.service());
        Ok(Step::redirect(location))
    }

    /// AWAITING_AUTHORIZATION → LOGGED_IN, NEEDS_SETUP, CONFLICT or REJECTED
    pub async fn callback(
        &self,
        session: &mut FlowSession,
        visitor: &mut dyn Visitor,
        query: &HashMap<String, String>,
    ) -> Result<Step, Error> {
        let Some(verifier) = query
            .get(self.client.verifier_label())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
        else {
            warn!("{} callback without a verifier", self.service());
            return Ok(Step::forbidden());
        };

        let callback_url = self.settings.callback_url(self.slug());

        let exchange = match self.client.oauth_version() {
            OAuthVersion::V1 => {
                let (Some(request_token), Some(request_token_secret)) = (
                    session.request_token.as_deref(),
                    session.request_token_secret.as_deref(),
                ) else {
                    warn!("{} callback without a request token", self.service());
                    return Ok(Step::forbidden());
                };
                ExchangeParams::OAuth1 {
                    request_token,
                    request_token_secret,
                    verifier,
                }
            }
            OAuthVersion::V2 => {
                if let Some(expected) = session.oauth_state.as_deref() {
                    if query.get("state").map(String::as_str) != Some(expected) {
                        warn!("{} callback with a mismatched state", self.service());
                        return Ok(Step::forbidden());
                    }
                }
                ExchangeParams::OAuth2 {
                    code: verifier,
                    redirect_uri: &callback_url,
                }
            }
        };

        let tokens = self.client.exchange_for_access_token(exchange).await?;

        let remote_uid = match tokens.uid.clone() {
            Some(uid) => Some(uid),
            None => {
                let status = self
                    .client
                    .debug_access_token(&AccessToken {
                        token: tokens.access_token.clone(),
                        secret: tokens.access_token_secret.clone(),
                    })
                    .await?;
                status.uid.filter(|_| status.is_valid)
            }
        };

        let Some(remote_uid) = remote_uid else {
            error!(
                "Could not resolve the {} user id from a fresh access token",
                self.service()
            );
            return Err(Error::provider("remote user id could not be resolved"));
        };

        session.request_token = None;
        session.request_token_secret = None;
        session.oauth_state = None;
        session.service_uid = Some(remote_uid.clone());
        session.access_token = Some(tokens.access_token.expose_secret().to_string());
        session.access_token_secret = tokens
            .access_token_secret
            .as_ref()
            .map(|s| s.expose_secret().to_string());
        session.refresh_token = tokens
            .refresh_token
            .as_ref()
            .map(|s| s.expose_secret().to_string());
        session.token_expires_at = tokens
            .expires_in
            .map(|seconds| Utc::now() + Duration::seconds(seconds));

        debug!(
            "Staged {} tokens for remote uid {remote_uid}",
            self.service()
        );

        let provider = self.provider();
        let (profile, created) = match self.store.find_profile(provider, &remote_uid).await? {
            Some(profile) => (profile, false),
            None => {
                if let Some(origin) = session.only_login.take() {
                    warn!(
                        "{} login rejected, no account for remote uid {remote_uid}",
                        self.service()
                    );
                    return Ok(Step::redirect(rejected_login_url(&origin))
                        .with_notices(vec![Notice::no_matching_account(self.service())]));
                }
                self.create_profile(provider, &remote_uid).await?
            }
        };

        let profile = self
            .store
            .update_tokens(profile.id, session.staged_tokens())
            .await?;

        let visitor_id = visitor.user().map(|user| user.id);
        let mut notices = Vec::new();

        match (profile.user_id, visitor_id) {
            (None, Some(visitor_id)) => {
                self.store.attach_user(profile.id, visitor_id).await?;
                info!(
                    "Connected {} profile {remote_uid} to user {visitor_id}",
                    self.service()
                );
                self.emit_connect(visitor_id).await;
                notices.push(Notice::connected(self.service()));
            }
            (None, None) => {
                debug!(
                    "{} profile {remote_uid} needs setup (created: {created})",
                    self.service()
                );
                session.new_user = true;
            }
            (Some(owner), Some(visitor_id)) if owner != visitor_id => {
                warn!(
                    "{} profile {remote_uid} is connected to another user than {visitor_id}",
                    self.service()
                );
                notices.push(Notice::already_connected(self.service()));
            }
            (Some(owner), visitor_id) => {
                if visitor_id.is_none() {
                    let user = self
                        .store
                        .find_user_by_id(owner)
                        .await?
                        .ok_or_else(Error::not_found)?;
                    visitor.login(&user).await?;
                    info!("Logged in user {owner} with {}", self.service());
                    self.emit_login(owner).await;
                }
                self.emit_connect(owner).await;
            }
        }

        let location = if session.new_user {
            self.setup_path()
        } else {
            session.take_next_url()
        };

        Ok(Step::redirect(location).with_notices(notices))
    }

    /// A concurrent callback may win the unique constraint; its row is used instead.
    async fn create_profile(
        &self,
        provider: Provider,
        remote_uid: &str,
    ) -> Result<(provider_profiles::Model, bool), Error> {
        match self.store.create_profile(provider, remote_uid).await {
            Ok(profile) => Ok((profile, true)),
            Err(err) if err.is_conflict() => {
                debug!("{provider} profile {remote_uid} was created concurrently");
                let profile = self
                    .store
                    .find_profile(provider, remote_uid)
                    .await?
                    .ok_or(err)?;
                Ok((profile, false))
            }
            Err(err) => Err(err),
        }
    }

    /// Profile staged by the callback, or `None` when the setup step must be refused.
    async fn staged_profile(
        &self,
        session: &FlowSession,
        visitor: &dyn Visitor,
    ) -> Result<Option<provider_profiles::Model>, Error> {
        if visitor.user().is_some() {
            return Ok(None);
        }

        match session.service_uid.as_deref() {
            Some(remote_uid) => self.store.find_profile(self.provider(), remote_uid).await,
            None => Ok(None),
        }
    }

    /// Links the user to the profile and logs them in. Returns the post-flow target.
    async fn complete_signup(
        &self,
        session: &mut FlowSession,
        visitor: &mut dyn Visitor,
        profile: &provider_profiles::Model,
        user: users::Model,
        existing_user: bool,
    ) -> Result<String, Error> {
        self.store.attach_user(profile.id, user.id).await?;
        info!(
            "Connected {} profile {} to user {}",
            self.service(),
            profile.remote_uid,
            user.id
        );
        self.emit_connect(user.id).await;

        let user = if existing_user
            && !user.is_active
            && self.settings.activate_already_registered_users
        {
            let user = self.store.activate_user(user.id).await?;
            self.emit(user.id, |user_id, provider| DomainEvent::UserActivated {
                user_id,
                provider,
            })
            .await;
            user
        } else {
            user
        };

        visitor.login(&user).await?;
        info!("Logged in user {} with {}", user.id, self.service());
        self.emit_login(user.id).await;

        let next = session.take_next_url();
        session.clear();
        Ok(next)
    }

    fn setup_response(&self, values: SetupInput, errors: setup_form::FieldErrors) -> Step {
        match &self.settings.setup_url {
            Some(location) => Step::new(StepResponse::StageSetup {
                location: location.clone(),
                data: values,
            }),
            None => Step::new(StepResponse::RenderSetup(SetupForm::new(
                values,
                errors,
                self.settings.email_is_username,
            ))),
        }
    }

    /// NEEDS_SETUP: matches or creates a user from the provider's data, or asks for it.
    pub async fn setup_get(
        &self,
        session: &mut FlowSession,
        visitor: &mut dyn Visitor,
    ) -> Result<Step, Error> {
        let Some(profile) = self.staged_profile(session, visitor).await? else {
            return Ok(Step::forbidden());
        };

        if profile.user_id.is_some() {
            return Ok(Step::redirect(session.take_next_url()));
        }

        let token = AccessToken::new(
            profile.access_token.as_deref().unwrap_or_default(),
            profile.access_token_secret.as_deref(),
        );
        let mut data = self.client.retrieve_user_data(&token).await?;
        data.email = data.email.filter(|email| !email.trim().is_empty());
        data.first_name = setup_form::clip_name(&data.first_name);
        data.last_name = setup_form::clip_name(&data.last_name);

        if self.settings.email_is_username {
            if let Some(email) = &data.email {
                data.username = Some(email.clone());
            }
        }

        if let Some(email) = data.email.clone().filter(|e| setup_form::is_storable_email(e)) {
            let matched = match self.store.find_user_by_email(&email).await? {
                Some(user) => Some((user, true)),
                None => match data.username.as_deref().filter(|u| !u.is_empty()) {
                    Some(username) if self.store.find_user_by_username(username).await?.is_none() => {
                        let user = self
                            .store
                            .create_user(NewUser {
                                username: username.to_string(),
                                email: email.clone(),
                                first_name: data.first_name.clone(),
                                last_name: data.last_name.clone(),
                            })
                            .await?;
                        Some((user, false))
                    }
                    _ => None,
                },
            };

            if let Some((user, existing_user)) = matched {
                let next = self
                    .complete_signup(session, visitor, &profile, user, existing_user)
                    .await?;
                return Ok(Step::redirect(next));
            }
        }

        let username = compose_username(self.store, &data).await?;
        let values = SetupInput {
            email: data.email.unwrap_or_default(),
            first_name: data.first_name,
            last_name: data.last_name,
            username,
        };

        Ok(self.setup_response(values, setup_form::FieldErrors::new()))
    }

    /// NEEDS_SETUP → LOGGED_IN with the submitted form.
    pub async fn setup_post(
        &self,
        session: &mut FlowSession,
        visitor: &mut dyn Visitor,
        input: SetupInput,
    ) -> Result<Step, Error> {
        let Some(profile) = self.staged_profile(session, visitor).await? else {
            return Ok(Step::forbidden());
        };

        if profile.user_id.is_some() {
            return Ok(Step::redirect(session.take_next_url()));
        }

        let errors =
            setup_form::validate(self.store, &input, self.settings.email_is_username).await?;
        if !errors.is_empty() {
            debug!("{} setup form has errors: {errors:?}", self.service());
            return Ok(self.setup_response(input, errors));
        }

        let user = self
            .store
            .create_user(input.into_new_user(self.settings.email_is_username))
            .await?;
        let next = self
            .complete_signup(session, visitor, &profile, user, false)
            .await?;

        Ok(Step::new(StepResponse::FinishSetup(next)))
    }

    /// Removes the visitor's profile for this provider, if any.
    pub async fn disconnect(
        &self,
        visitor: &dyn Visitor,
        next: Option<String>,
    ) -> Result<Step, Error> {
        let Some(user_id) = visitor.user().map(|user| user.id) else {
            return Ok(Step::forbidden());
        };

        let mut notices = Vec::new();
        if let Some(profile) = self
            .store
            .find_profile_for_user(user_id, self.provider())
            .await?
        {
            self.store.delete_profile(profile.id).await?;
            info!("Disconnected {} profile from user {user_id}", self.service());
            self.emit(user_id, |user_id, provider| {
                DomainEvent::ProfileDisconnected { user_id, provider }
            })
            .await;
            notices.push(Notice::disconnected(self.service()));
        }

        let location = next
            .filter(|next| !next.is_empty())
            .unwrap_or_else(|| "/".to_string());
        Ok(Step::redirect(location).with_notices(notices))
    }
}
