use axum::{http::StatusCode, response::IntoResponse};
use domain::AuthSession;
use log::*;

/// Logs the user out of the platform by destroying their session.
/// Test this with curl: curl -v \
/// --header "Cookie: id=07bbbe54-bd35-425f-8e63-618a8d8612df" \
/// --request POST http://localhost:4000/logout
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Successfully logged out"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn logout(mut auth_session: AuthSession) -> impl IntoResponse {
    trace!("UserSessionController::logout()");
    match auth_session.logout().await {
        Ok(Some(user)) => {
            info!("Logged out user {}", user.id);
            StatusCode::OK.into_response()
        }
        Ok(None) => StatusCode::OK.into_response(),
        Err(logout_error) => {
            warn!("Session logout failed: {logout_error:?}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
