//! The OAuth client: token dance and authenticated API calls for one provider.

use async_trait::async_trait;
use log::*;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};
use crate::oauth1::{self, SigningKeys};
use crate::provider::{ApiAuth, Descriptor, OAuthVersion, ProviderKind, TokenCheck, UserData};
use crate::response::{parse_body, string_field};

/// The app's credentials at a provider.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub app_secret: SecretString,
    /// Facebook only; fetched with client credentials when absent.
    pub app_access_token: Option<SecretString>,
}

/// Inputs for the authorization redirect.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationParams<'a> {
    pub callback_url: &'a str,
    /// OAuth1 only, from [`OAuthClient::request_token`].
    pub request_token: Option<&'a str>,
    /// OAuth2 anti-forgery value.
    pub state: Option<&'a str>,
}

/// Temporary OAuth1 credentials obtained before the redirect.
#[derive(Debug, Clone)]
pub struct RequestToken {
    pub token: String,
    pub token_secret: SecretString,
}

#[derive(Debug, Clone)]
pub enum ExchangeParams<'a> {
    OAuth1 {
        request_token: &'a str,
        request_token_secret: &'a str,
        verifier: &'a str,
    },
    OAuth2 {
        code: &'a str,
        redirect_uri: &'a str,
    },
}

/// Tokens from an access-token exchange or a refresh.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub access_token: SecretString,
    pub access_token_secret: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    /// Remote user id, when the provider includes it in the token response.
    pub uid: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: Option<i64>,
}

/// A user's access token, plus its secret for OAuth1 providers.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub secret: Option<SecretString>,
}

impl AccessToken {
    pub fn new(token: &str, secret: Option<&str>) -> Self {
        Self {
            token: SecretString::new(token.to_string()),
            secret: secret.map(|s| SecretString::new(s.to_string())),
        }
    }
}

/// Outcome of a token check. An invalid token is a value, never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStatus {
    pub is_valid: bool,
    pub uid: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The capability the flow controller needs from a provider.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    fn provider(&self) -> ProviderKind;

    fn oauth_version(&self) -> OAuthVersion;

    /// Callback query parameter carrying the verifier or code.
    fn verifier_label(&self) -> &'static str;

    fn service_name(&self) -> &'static str {
        self.provider().service_name()
    }

    /// True when expired tokens can be renewed with a refresh token.
    fn supports_refresh(&self) -> bool;

    fn authorization_url(&self, params: &AuthorizationParams<'_>) -> Result<String, Error>;

    /// OAuth1 only: obtains temporary credentials for the authorization redirect.
    async fn request_token(&self, callback_url: &str) -> Result<RequestToken, Error>;

    async fn exchange_for_access_token(
        &self,
        params: ExchangeParams<'_>,
    ) -> Result<TokenResponse, Error>;

    /// Checks a token with the provider. Only transport failures are errors.
    async fn debug_access_token(&self, token: &AccessToken) -> Result<TokenStatus, Error>;

    async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<ApiResponse, Error>;

    async fn post(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<ApiResponse, Error>;

    async fn retrieve_user_data(&self, token: &AccessToken) -> Result<UserData, Error>;

    /// Returns `None` when the provider rejects the refresh token.
    async fn refresh_access_token(&self, refresh_token: &str)
        -> Result<Option<TokenResponse>, Error>;

    /// Raw profile payload of the token's owner.
    async fn fetch_profile(&self, token: &AccessToken) -> Result<ApiResponse, Error>;
}

/// [`OAuthClient`] driven entirely by a [`Descriptor`].
pub struct Client {
    descriptor: Descriptor,
    credentials: AppCredentials,
    scope: Vec<String>,
    http: reqwest::Client,
}

impl Client {
    /// An empty `scope` falls back to the provider's default.
    pub fn new(
        descriptor: Descriptor,
        credentials: AppCredentials,
        scope: Vec<String>,
        http: reqwest::Client,
    ) -> Self {
        let scope = if scope.is_empty() {
            descriptor
                .default_scope
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            scope
        };

        Self {
            descriptor,
            credentials,
            scope,
            http,
        }
    }

    fn signing_keys<'a>(
        &'a self,
        token: Option<&'a str>,
        token_secret: Option<&'a str>,
    ) -> SigningKeys<'a> {
        SigningKeys {
            consumer_key: &self.credentials.app_id,
            consumer_secret: self.credentials.app_secret.expose_secret(),
            token,
            token_secret,
        }
    }

    fn parse_token_response(&self, body: &str) -> Result<TokenResponse, Error> {
        let data = parse_body(body);
        let labels = &self.descriptor.labels;

        let access_token = string_field(&data, labels.access_token).ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::InvalidResponse,
                "token response has no access token",
            )
        })?;

        let access_token_secret = match self.descriptor.version {
            OAuthVersion::V1 => string_field(&data, labels.access_token_secret),
            OAuthVersion::V2 => None,
        };

        Ok(TokenResponse {
            access_token: SecretString::new(access_token),
            access_token_secret: access_token_secret.map(SecretString::new),
            refresh_token: string_field(&data, labels.refresh_token).map(SecretString::new),
            uid: string_field(&data, labels.uid),
            expires_in: labels
                .expiration
                .and_then(|label| string_field(&data, label))
                .and_then(|s| s.parse().ok()),
        })
    }

    async fn app_access_token(&self) -> Result<SecretString, Error> {
        if let Some(token) = &self.credentials.app_access_token {
            return Ok(token.clone());
        }

        debug!(
            "Fetching {} app access token",
            self.descriptor.kind.service_name()
        );

        let response = self
            .http
            .get(&self.descriptor.access_token_url)
            .query(&[
                ("client_id", self.credentials.app_id.as_str()),
                ("client_secret", self.credentials.app_secret.expose_secret()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("App access token request failed: {}", response.status());
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("app access token request failed: {}", response.status()),
            ));
        }

        let body = response.text().await?;
        string_field(&parse_body(&body), "access_token")
            .map(SecretString::new)
            .ok_or_else(|| {
                oauth_error(
                    OAuthErrorKind::InvalidResponse,
                    "app token response has no access token",
                )
            })
    }

    fn authorize(
        &self,
        builder: RequestBuilder,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<RequestBuilder, Error> {
        match self.descriptor.api_auth {
            ApiAuth::Bearer => Ok(builder.bearer_auth(token.token.expose_secret())),
            ApiAuth::QueryParam { token_param, extra } => Ok(builder
                .query(&[(token_param, token.token.expose_secret().as_str())])
                .query(extra)),
            ApiAuth::OAuth1 => {
                let secret = token.secret.as_ref().ok_or_else(|| {
                    oauth_error(
                        OAuthErrorKind::UnsupportedOperation,
                        "OAuth1 calls need a token secret",
                    )
                })?;
                let keys = self.signing_keys(
                    Some(token.token.expose_secret()),
                    Some(secret.expose_secret()),
                );
                let header = oauth1::authorization_header(&keys, method, url, params, &[])?;
                Ok(builder.header(AUTHORIZATION, header))
            }
        }
    }

    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<ApiResponse, Error> {
        let url = self.descriptor.endpoint_url(endpoint);

        let builder = if method == Method::GET {
            self.http.get(&url).query(params)
        } else {
            self.http.request(method.clone(), &url).form(params)
        };
        let builder = self.authorize(builder, method.as_str(), &url, params, token)?;

        let response = builder.header(ACCEPT, "application/json").send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        debug!(
            "{} {} {endpoint} answered {status}",
            self.descriptor.kind.service_name(),
            method
        );

        Ok(ApiResponse {
            status,
            body: serde_json::from_str(&text).unwrap_or(Value::String(text)),
        })
    }

    fn status_from_payload(&self, status: u16, body: Value) -> TokenStatus {
        let hooks = &self.descriptor.hooks;
        let is_valid =
            (200..300).contains(&status) && body.is_object() && !(hooks.is_error_payload)(&body);

        TokenStatus {
            is_valid,
            uid: if is_valid {
                (hooks.resolve_uid)(&body)
            } else {
                None
            },
            data: body,
        }
    }
}

#[async_trait]
impl OAuthClient for Client {
    fn provider(&self) -> ProviderKind {
        self.descriptor.kind
    }

    fn oauth_version(&self) -> OAuthVersion {
        self.descriptor.version
    }

    fn verifier_label(&self) -> &'static str {
        self.descriptor.labels.verifier
    }

    fn supports_refresh(&self) -> bool {
        self.descriptor.refresh_token_url.is_some()
    }

    fn authorization_url(&self, params: &AuthorizationParams<'_>) -> Result<String, Error> {
        let mut query: Vec<(&str, String)> = Vec::new();

        match self.descriptor.version {
            OAuthVersion::V1 => {
                let request_token = params.request_token.ok_or_else(|| {
                    oauth_error(
                        OAuthErrorKind::RequestTokenFailed,
                        "authorization needs a request token",
                    )
                })?;
                query.push((self.descriptor.labels.request_token, request_token.to_string()));
            }
            OAuthVersion::V2 => {
                query.push(("client_id", self.credentials.app_id.clone()));
                query.push(("redirect_uri", params.callback_url.to_string()));
                if !self.scope.is_empty() {
                    query.push(("scope", self.scope.join(self.descriptor.scope_separator)));
                }
                query.push(("response_type", "code".to_string()));
                if let Some(state) = params.state {
                    query.push(("state", state.to_string()));
                    if self.descriptor.sends_nonce {
                        query.push(("nonce", state.to_string()));
                    }
                }
            }
        }

        Url::parse_with_params(&self.descriptor.authorization_url, &query)
            .map(String::from)
            .map_err(|e| oauth_error(OAuthErrorKind::InvalidResponse, &e.to_string()))
    }

    async fn request_token(&self, callback_url: &str) -> Result<RequestToken, Error> {
        let url = match (&self.descriptor.version, &self.descriptor.request_token_url) {
            (OAuthVersion::V1, Some(url)) => url,
            _ => {
                return Err(oauth_error(
                    OAuthErrorKind::UnsupportedOperation,
                    "request tokens only exist in OAuth1",
                ))
            }
        };

        let keys = self.signing_keys(None, None);
        let header = oauth1::authorization_header(
            &keys,
            "POST",
            url,
            &[],
            &[("oauth_callback", callback_url)],
        )?;

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, header)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "{} request token failed: {}",
                self.descriptor.kind.service_name(),
                response.status()
            );
            return Err(oauth_error(
                OAuthErrorKind::RequestTokenFailed,
                &format!("request token endpoint answered {}", response.status()),
            ));
        }

        let data = parse_body(&response.text().await?);
        let labels = &self.descriptor.labels;

        match (
            string_field(&data, labels.request_token),
            string_field(&data, labels.request_token_secret),
        ) {
            (Some(token), Some(secret)) => Ok(RequestToken {
                token,
                token_secret: SecretString::new(secret),
            }),
            _ => Err(oauth_error(
                OAuthErrorKind::InvalidResponse,
                "request token response is incomplete",
            )),
        }
    }

    async fn exchange_for_access_token(
        &self,
        params: ExchangeParams<'_>,
    ) -> Result<TokenResponse, Error> {
        let url = &self.descriptor.access_token_url;

        let request = match (self.descriptor.version, params) {
            (
                OAuthVersion::V1,
                ExchangeParams::OAuth1 {
                    request_token,
                    request_token_secret,
                    verifier,
                },
            ) => {
                let keys = self.signing_keys(Some(request_token), Some(request_token_secret));
                let header = oauth1::authorization_header(
                    &keys,
                    "POST",
                    url,
                    &[],
                    &[("oauth_verifier", verifier)],
                )?;
                self.http.post(url).header(AUTHORIZATION, header)
            }
            (OAuthVersion::V2, ExchangeParams::OAuth2 { code, redirect_uri }) => {
                self.http.post(url).form(&[
                    ("grant_type", "authorization_code"),
                    ("client_id", self.credentials.app_id.as_str()),
                    ("client_secret", self.credentials.app_secret.expose_secret()),
                    ("redirect_uri", redirect_uri),
                    (self.descriptor.labels.verifier, code),
                ])
            }
            _ => {
                return Err(oauth_error(
                    OAuthErrorKind::UnsupportedOperation,
                    "exchange parameters do not match the provider's OAuth version",
                ))
            }
        };

        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                "{} token exchange failed: {status}",
                self.descriptor.kind.service_name()
            );
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("token endpoint answered {status}"),
            ));
        }

        self.parse_token_response(&body)
    }

    async fn debug_access_token(&self, token: &AccessToken) -> Result<TokenStatus, Error> {
        match &self.descriptor.token_check {
            TokenCheck::AppTokenDebug { url } => {
                let app_token = match self.app_access_token().await {
                    Ok(app_token) => app_token,
                    Err(err) if matches!(err.error_kind, ErrorKind::OAuth(_)) => {
                        warn!("Cannot check a token without an app access token: {err}");
                        return Ok(TokenStatus {
                            is_valid: false,
                            uid: None,
                            data: Value::Null,
                        });
                    }
                    Err(err) => return Err(err),
                };
                let response = self
                    .http
                    .get(url)
                    .query(&[
                        ("input_token", token.token.expose_secret().as_str()),
                        ("access_token", app_token.expose_secret().as_str()),
                    ])
                    .send()
                    .await?;
                let status = response.status().as_u16();
                let body = serde_json::from_str(&response.text().await?).unwrap_or(Value::Null);

                Ok(self.status_from_payload(status, body))
            }
            TokenCheck::ApiCall { endpoint } => {
                let response = self.get(endpoint, &[], token).await?;
                Ok(self.status_from_payload(response.status, response.body))
            }
            TokenCheck::TokenInfo { url } => {
                let response = self
                    .http
                    .get(url)
                    .query(&[("access_token", token.token.expose_secret().as_str())])
                    .send()
                    .await?;
                let is_valid = response.status() == StatusCode::OK;
                let body = serde_json::from_str(&response.text().await?).unwrap_or(Value::Null);

                Ok(TokenStatus {
                    is_valid,
                    uid: if is_valid {
                        (self.descriptor.hooks.resolve_uid)(&body)
                    } else {
                        None
                    },
                    data: body,
                })
            }
        }
    }

    async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<ApiResponse, Error> {
        self.call(Method::GET, endpoint, params, token).await
    }

    async fn post(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<ApiResponse, Error> {
        self.call(Method::POST, endpoint, params, token).await
    }

    async fn retrieve_user_data(&self, token: &AccessToken) -> Result<UserData, Error> {
        let response = self
            .get(
                self.descriptor.user_data_endpoint,
                self.descriptor.user_data_params,
                token,
            )
            .await?;

        if !response.is_success() {
            return Err(oauth_error(
                OAuthErrorKind::InvalidResponse,
                &format!("user data request answered {}", response.status),
            ));
        }

        Ok((self.descriptor.hooks.parse_user_data)(&response.body))
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<TokenResponse>, Error> {
        let url = self.descriptor.refresh_token_url.as_ref().ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::UnsupportedOperation,
                "provider does not refresh tokens",
            )
        })?;

        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                (self.descriptor.labels.refresh_token, refresh_token),
                ("client_id", self.credentials.app_id.as_str()),
                ("client_secret", self.credentials.app_secret.expose_secret()),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            info!(
                "{} rejected a refresh token: {}",
                self.descriptor.kind.service_name(),
                response.status()
            );
            return Ok(None);
        }

        let body = response.text().await?;
        self.parse_token_response(&body).map(Some)
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<ApiResponse, Error> {
        self.get(self.descriptor.profile_endpoint, &[], token).await
    }
}
