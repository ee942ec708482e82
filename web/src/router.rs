use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

use crate::controller::{
    health_check_controller, notice_controller, provider_controller, social_controller,
    user_session_controller,
};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Social Connect API"
        ),
        paths(
            health_check_controller::health_check,
            notice_controller::index,
            provider_controller::index,
            social_controller::login,
            social_controller::callback,
            social_controller::setup_get,
            social_controller::setup_post,
            social_controller::disconnect,
            social_controller::profile,
            user_session_controller::logout,
        ),
        components(
            schemas(
                provider_controller::ProviderEntry,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "social_connect", description = "Log in with and connect social network accounts")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our cookie session based authentication requirement for gaining access to our
// API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "id",
                    "Session id value returned from a completed provider login via Set-Cookie header",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(notice_routes())
        .merge(provider_routes(app_state.clone()))
        .merge(social_routes(app_state))
        .merge(user_session_routes())
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn notice_routes() -> Router {
    Router::new().route("/notices", get(notice_controller::index))
}

fn provider_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/providers", get(provider_controller::index))
        .with_state(app_state)
}

fn social_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/{provider}/login", post(social_controller::login))
        .route("/{provider}/callback", get(social_controller::callback))
        .route(
            "/{provider}/setup",
            get(social_controller::setup_get).post(social_controller::setup_post),
        )
        .route("/{provider}/disconnect", post(social_controller::disconnect))
        .route("/{provider}/profile", get(social_controller::profile))
        .with_state(app_state)
}

fn user_session_routes() -> Router {
    Router::new().route("/logout", post(user_session_controller::logout))
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use crate::test_app::{app, empty_state};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app(empty_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_check_answers() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app(empty_state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"healthy");
    }

    #[tokio::test]
    async fn providers_lists_enabled_providers_with_labels() {
        let (status, body) = get_json("/providers").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            json!([{
                "slug": "github",
                "service": "GitHub",
                "login_label": "Log in with GitHub",
                "signin_label": "Sign in with GitHub",
                "login_url": "/github/login",
                "disconnect_url": "/github/disconnect",
            }])
        );
    }

    #[tokio::test]
    async fn notices_are_empty_for_a_new_visitor() {
        let (status, body) = get_json("/notices").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status_code": 200, "data": []}));
    }

    #[tokio::test]
    async fn logout_without_a_session_succeeds() {
        let request = Request::builder()
            .uri("/logout")
            .method("POST")
            .body(Body::empty())
            .unwrap();
        let response = app(empty_state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
