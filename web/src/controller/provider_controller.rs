use crate::controller::ApiResponse;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

/// An enabled provider and what a client needs to render its buttons.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderEntry {
    pub slug: &'static str,
    pub service: &'static str,
    /// Label of a button that may only log in an existing user.
    pub login_label: String,
    /// Label of a button that logs in or signs up.
    pub signin_label: String,
    pub login_url: String,
    pub disconnect_url: String,
}

/// GET the enabled providers
#[utoipa::path(
    get,
    path = "/providers",
    responses(
        (status = 200, description = "Enabled providers ordered by slug", body = [ProviderEntry]),
    )
)]
pub async fn index(State(app_state): State<AppState>) -> impl IntoResponse {
    let providers: Vec<ProviderEntry> = app_state
        .registry
        .iter()
        .map(|provider| {
            let slug = provider.kind.as_str();
            ProviderEntry {
                slug,
                service: provider.kind.service_name(),
                login_label: provider.login_label(),
                signin_label: provider.signin_label(),
                login_url: format!("/{slug}/login"),
                disconnect_url: format!("/{slug}/disconnect"),
            }
        })
        .collect();

    Json(ApiResponse::new(StatusCode::OK.into(), providers))
}
