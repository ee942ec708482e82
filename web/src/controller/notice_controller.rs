use crate::controller::ApiResponse;
use crate::error::Result as WebResult;
use crate::session;
use axum::{http::StatusCode, response::IntoResponse, Json};
use tower_sessions::Session;

/// GET the flash notices left by the social flows. Each notice is returned once.
#[utoipa::path(
    get,
    path = "/notices",
    responses(
        (status = 200, description = "Pending notices, oldest first"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn index(session: Session) -> WebResult<impl IntoResponse> {
    let notices = session::take_notices(&session).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), notices)))
}
