use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{
    DomainErrorKind, EntityErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl Error {
    /// Failures of the web plumbing itself, e.g. the session store.
    pub(crate) fn internal<E>(message: &str, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(DomainError {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(message.to_string())),
        })
    }

    pub(crate) fn not_found() -> Self {
        Self(DomainError::not_found())
    }
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                    EntityErrorKind::NotFound => {
                        warn!("EntityErrorKind::NotFound: Responding with 404 Not Found");
                        (StatusCode::NOT_FOUND, "NOT FOUND").into_response()
                    }
                    EntityErrorKind::Invalid => {
                        warn!("EntityErrorKind::Invalid: Responding with 422 Unprocessable Entity");
                        (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE ENTITY").into_response()
                    }
                    EntityErrorKind::Conflict => {
                        warn!("EntityErrorKind::Conflict: Responding with 409 Conflict");
                        (StatusCode::CONFLICT, "CONFLICT").into_response()
                    }
                    EntityErrorKind::Unauthenticated => {
                        warn!("EntityErrorKind::Unauthenticated: Responding with 401 Unauthorized");
                        (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
                    }
                    EntityErrorKind::DbTransaction | EntityErrorKind::Other(_) => {
                        error!("EntityErrorKind: Responding with 500 Internal Server Error");
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR")
                            .into_response()
                    }
                },
                InternalErrorKind::Config => {
                    error!("InternalErrorKind::Config: Responding with 500 Internal Server Error");
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
                InternalErrorKind::Other(message) => {
                    error!("InternalErrorKind::Other({message}): Responding with 500 Internal Server Error");
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Network | ExternalErrorKind::Provider => {
                    warn!("ExternalErrorKind: Responding with 502 Bad Gateway");
                    (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
                }
                ExternalErrorKind::Other(message) => {
                    error!("ExternalErrorKind::Other({message}): Responding with 500 Internal Server Error");
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::config::ConfigError;

    fn status_of(kind: DomainErrorKind) -> StatusCode {
        Error(DomainError {
            source: None,
            error_kind: kind,
        })
        .into_response()
        .status()
    }

    fn entity(kind: EntityErrorKind) -> DomainErrorKind {
        DomainErrorKind::Internal(InternalErrorKind::Entity(kind))
    }

    #[test]
    fn entity_errors_map_to_client_statuses() {
        assert_eq!(status_of(entity(EntityErrorKind::NotFound)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(entity(EntityErrorKind::Invalid)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(entity(EntityErrorKind::Conflict)), StatusCode::CONFLICT);
        assert_eq!(
            status_of(entity(EntityErrorKind::Unauthenticated)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(entity(EntityErrorKind::DbTransaction)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn provider_failures_are_bad_gateway() {
        assert_eq!(
            status_of(DomainErrorKind::External(ExternalErrorKind::Network)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(DomainErrorKind::External(ExternalErrorKind::Provider)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn config_errors_convert_into_server_errors() {
        let err: Error = ConfigError::MissingSecretKey.into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
