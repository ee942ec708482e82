pub(crate) mod authenticated_user;
pub(crate) mod enabled_provider;

use axum::http::StatusCode;

type RejectionType = (StatusCode, String);
