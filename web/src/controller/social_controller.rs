//! The per-provider connect, login and sign-up flow.
//!
//! Every handler loads the provider's `FlowSession` from the visitor's session, runs one
//! step of [`Flow`], stores the state back and turns the resulting [`Step`] into a response.

use crate::controller::ApiResponse;
use crate::cookies::{self, SETUP_COOKIE, SETUP_COOKIE_MAX_AGE};
use crate::error::Result as WebResult;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, enabled_provider::EnabledProvider,
};
use crate::session;
use crate::visitor::SessionVisitor;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form, Json,
};
use domain::flow::{Flow, RedirectParams, Step, StepResponse};
use domain::profile_data::{fetch_remote_profile, ProfileData, RemoteProfile};
use domain::setup_form::SetupInput;
use domain::store::DbStore;
use domain::{AuthSession, Id};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use social_auth::Signer;
use std::collections::HashMap;
use tower_sessions::Session;

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct DisconnectParams {
    pub next: Option<String>,
}

/// What the profile route answers with.
#[derive(Debug, Serialize)]
struct ProfileView {
    connected: bool,
    /// False when the stored token was rejected or the profile call failed.
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Profile data cached in the provider's cookie, bound to the user it was fetched for.
#[derive(Debug, Serialize, Deserialize)]
struct CachedProfile {
    user_id: Id,
    data: Value,
}

async fn respond(step: Step, session: &Session, signer: &Signer) -> WebResult<Response> {
    session::push_notices(session, step.notices).await?;

    let response = match step.response {
        StepResponse::Redirect(location) => Redirect::to(&location).into_response(),
        StepResponse::Forbidden => StatusCode::FORBIDDEN.into_response(),
        StepResponse::RenderSetup(form) => {
            let status = if form.is_valid() {
                StatusCode::OK
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (status, Json(ApiResponse::new(status.into(), form))).into_response()
        }
        StepResponse::StageSetup { location, data } => {
            let cookie = cookies::signed(signer, SETUP_COOKIE, &data, SETUP_COOKIE_MAX_AGE)?;
            (AppendHeaders([cookie]), Redirect::to(&location)).into_response()
        }
        StepResponse::FinishSetup(next) => {
            let cookie = cookies::removal(SETUP_COOKIE)?;
            (AppendHeaders([cookie]), Redirect::to(&next)).into_response()
        }
    };

    Ok(response)
}

/// POST start a login or connect flow
///
/// Redirects to the provider's authorization page. `next` is where the flow ends up,
/// `only_login` names the page to return to when no local account matches.
#[utoipa::path(
    post,
    path = "/{provider}/login",
    params(
        ("provider" = String, Path, description = "Provider slug, e.g. github"),
    ),
    responses(
        (status = 303, description = "Redirect to the provider's authorization page"),
        (status = 404, description = "Unknown or disabled provider"),
        (status = 502, description = "The provider could not issue a request token")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    EnabledProvider(provider): EnabledProvider,
    session: Session,
    Form(params): Form<RedirectParams>,
) -> WebResult<Response> {
    let slug = provider.kind.as_str();
    let store = DbStore::new(&app_state.database_connection);
    let flow = Flow::new(
        provider.client.as_ref(),
        &store,
        &app_state.events,
        &provider.settings,
    );

    let mut flow_session = session::load_flow(&session, slug).await?;
    let step = flow.redirect(&mut flow_session, params).await?;
    session::store_flow(&session, slug, &flow_session).await?;

    respond(step, &session, &app_state.signer).await
}

/// GET the provider's authorization callback
#[utoipa::path(
    get,
    path = "/{provider}/callback",
    params(
        ("provider" = String, Path, description = "Provider slug, e.g. github"),
    ),
    responses(
        (status = 303, description = "Logged in, connected, or on to the setup step"),
        (status = 403, description = "The callback does not belong to a flow of this visitor"),
        (status = 404, description = "Unknown or disabled provider"),
        (status = 502, description = "The provider rejected the token exchange")
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    EnabledProvider(provider): EnabledProvider,
    session: Session,
    mut auth_session: AuthSession,
    Query(query): Query<HashMap<String, String>>,
) -> WebResult<Response> {
    let slug = provider.kind.as_str();
    let store = DbStore::new(&app_state.database_connection);
    let flow = Flow::new(
        provider.client.as_ref(),
        &store,
        &app_state.events,
        &provider.settings,
    );

    let mut flow_session = session::load_flow(&session, slug).await?;
    let step = flow
        .callback(
            &mut flow_session,
            &mut SessionVisitor(&mut auth_session),
            &query,
        )
        .await?;

    if step.response != StepResponse::Forbidden {
        session::store_flow(&session, slug, &flow_session).await?;
    }

    respond(step, &session, &app_state.signer).await
}

/// GET the sign-up step for a profile without a local user
///
/// Logs the visitor in right away when the provider's data matches or creates a user.
/// Otherwise answers with the form to fill in, or redirects to the provider's custom
/// setup page with the data in the `dsnstp` cookie.
#[utoipa::path(
    get,
    path = "/{provider}/setup",
    params(
        ("provider" = String, Path, description = "Provider slug, e.g. github"),
    ),
    responses(
        (status = 200, description = "The setup form's fields and pre-filled values"),
        (status = 303, description = "Signed up, or on to the custom setup page"),
        (status = 403, description = "No setup is pending for this visitor"),
        (status = 404, description = "Unknown or disabled provider")
    )
)]
pub async fn setup_get(
    State(app_state): State<AppState>,
    EnabledProvider(provider): EnabledProvider,
    session: Session,
    mut auth_session: AuthSession,
) -> WebResult<Response> {
    let slug = provider.kind.as_str();
    let store = DbStore::new(&app_state.database_connection);
    let flow = Flow::new(
        provider.client.as_ref(),
        &store,
        &app_state.events,
        &provider.settings,
    );

    let mut flow_session = session::load_flow(&session, slug).await?;
    let step = flow
        .setup_get(&mut flow_session, &mut SessionVisitor(&mut auth_session))
        .await?;
    session::store_flow(&session, slug, &flow_session).await?;

    respond(step, &session, &app_state.signer).await
}

/// POST the completed setup form
#[utoipa::path(
    post,
    path = "/{provider}/setup",
    params(
        ("provider" = String, Path, description = "Provider slug, e.g. github"),
    ),
    responses(
        (status = 303, description = "Signed up and logged in"),
        (status = 403, description = "No setup is pending for this visitor"),
        (status = 404, description = "Unknown or disabled provider"),
        (status = 422, description = "The form has errors")
    )
)]
pub async fn setup_post(
    State(app_state): State<AppState>,
    EnabledProvider(provider): EnabledProvider,
    session: Session,
    mut auth_session: AuthSession,
    Form(input): Form<SetupInput>,
) -> WebResult<Response> {
    let slug = provider.kind.as_str();
    let store = DbStore::new(&app_state.database_connection);
    let flow = Flow::new(
        provider.client.as_ref(),
        &store,
        &app_state.events,
        &provider.settings,
    );

    let mut flow_session = session::load_flow(&session, slug).await?;
    let step = flow
        .setup_post(
            &mut flow_session,
            &mut SessionVisitor(&mut auth_session),
            input,
        )
        .await?;
    session::store_flow(&session, slug, &flow_session).await?;

    respond(step, &session, &app_state.signer).await
}

/// POST remove the logged in user's link to a provider
#[utoipa::path(
    post,
    path = "/{provider}/disconnect",
    params(
        ("provider" = String, Path, description = "Provider slug, e.g. github"),
    ),
    responses(
        (status = 303, description = "Redirect to next, or /"),
        (status = 403, description = "Nobody is logged in"),
        (status = 404, description = "Unknown or disabled provider")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn disconnect(
    State(app_state): State<AppState>,
    EnabledProvider(provider): EnabledProvider,
    session: Session,
    mut auth_session: AuthSession,
    Form(params): Form<DisconnectParams>,
) -> WebResult<Response> {
    let store = DbStore::new(&app_state.database_connection);
    let flow = Flow::new(
        provider.client.as_ref(),
        &store,
        &app_state.events,
        &provider.settings,
    );

    let step = flow
        .disconnect(&SessionVisitor(&mut auth_session), params.next)
        .await?;
    let forbidden = step.response == StepResponse::Forbidden;
    let response = respond(step, &session, &app_state.signer).await?;

    if forbidden {
        return Ok(response);
    }

    let cookie = cookies::removal(&provider.cookie_key)?;
    Ok((AppendHeaders([cookie]), response).into_response())
}

/// GET the logged in user's profile at a provider
///
/// Served from the provider's signed cookie while it is fresh, otherwise fetched with the
/// stored token. Problems with the token are reported through the notices.
#[utoipa::path(
    get,
    path = "/{provider}/profile",
    params(
        ("provider" = String, Path, description = "Provider slug, e.g. github"),
    ),
    responses(
        (status = 200, description = "The remote profile, or connected: false"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown or disabled provider"),
        (status = 502, description = "The provider could not be reached")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn profile(
    State(app_state): State<AppState>,
    EnabledProvider(provider): EnabledProvider,
    AuthenticatedUser(user): AuthenticatedUser,
    session: Session,
    headers: HeaderMap,
) -> WebResult<Response> {
    let max_age = app_state.config.cookie_max_age as i64;

    let cached = cookies::read_signed::<CachedProfile>(
        &headers,
        &app_state.signer,
        &provider.cookie_key,
        max_age,
    )
    .filter(|cached| cached.user_id == user.id);

    if let Some(cached) = cached {
        trace!("Serving cached {} profile of user {}", provider.kind.as_str(), user.id);
        return Ok(profile_response(true, true, Some(cached.data)).into_response());
    }

    let store = DbStore::new(&app_state.database_connection);
    let ProfileData { profile, notices } =
        fetch_remote_profile(provider.client.as_ref(), &store, user.id).await?;
    session::push_notices(&session, notices).await?;

    let response = match profile {
        RemoteProfile::NotConnected => {
            let cookie = cookies::removal(&provider.cookie_key)?;
            (AppendHeaders([cookie]), profile_response(false, false, None)).into_response()
        }
        RemoteProfile::Fetched(data) => {
            let cached = CachedProfile {
                user_id: user.id,
                data,
            };
            let cookie =
                cookies::signed(&app_state.signer, &provider.cookie_key, &cached, max_age)?;
            (
                AppendHeaders([cookie]),
                profile_response(true, true, Some(cached.data)),
            )
                .into_response()
        }
        RemoteProfile::Failed(data) | RemoteProfile::Invalid(data) => {
            profile_response(true, false, Some(data)).into_response()
        }
    };

    Ok(response)
}

fn profile_response(connected: bool, valid: bool, data: Option<Value>) -> impl IntoResponse {
    Json(ApiResponse::new(
        StatusCode::OK.into(),
        ProfileView {
            connected,
            valid,
            data,
        },
    ))
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use crate::test_app::{app, empty_state};
    use axum::{
        body::{to_bytes, Body},
        http::{header::LOCATION, header::SET_COOKIE, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    fn session_cookie(response: &Response) -> String {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("id="))
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
            .expect("response should carry a session cookie")
    }

    fn form_post(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let app = app(empty_state());

        let response = app
            .oneshot(form_post("/myspace/login", "next=/home"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn disabled_provider_is_not_found() {
        let app = app(empty_state());

        let request = Request::builder()
            .uri("/twitter/callback?oauth_verifier=v1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn login_redirects_to_the_provider_with_a_state() {
        let app = app(empty_state());

        let response = app
            .oneshot(form_post("/github/login", "next=/home"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(location.contains("client_id=gh-app"));
        assert!(location.contains("state="));
        assert!(location.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A4000%2Fgithub%2Fcallback"
        ));
        session_cookie(&response);
    }

    #[tokio::test]
    async fn callback_without_code_is_a_blank_forbidden() {
        let app = app(empty_state());

        let request = Request::builder()
            .uri("/github/callback?state=abc")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn callback_with_a_foreign_state_is_forbidden() {
        let app = app(empty_state());

        let login = app
            .clone()
            .oneshot(form_post("/github/login", ""))
            .await
            .unwrap();
        let cookie = session_cookie(&login);

        let request = Request::builder()
            .uri("/github/callback?code=c1&state=forged")
            .header("cookie", cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn setup_without_a_pending_flow_is_forbidden() {
        let app = app(empty_state());

        let request = Request::builder()
            .uri("/github/setup")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn disconnect_needs_a_logged_in_user() {
        let app = app(empty_state());

        let response = app
            .oneshot(form_post("/github/disconnect", "next=/settings"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn profile_needs_a_logged_in_user() {
        let app = app(empty_state());

        let request = Request::builder()
            .uri("/github/profile")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
