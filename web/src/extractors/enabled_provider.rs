use crate::error::Error;
use crate::AppState;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use domain::provider_registry::RegisteredProvider;
use log::*;

/// The provider named by the `{provider}` path segment. Unknown or disabled slugs are 404.
pub(crate) struct EnabledProvider(pub RegisteredProvider);

impl FromRequestParts<AppState> for EnabledProvider {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(slug) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| Error::not_found())?;

        match state.registry.get(&slug) {
            Some(provider) => Ok(EnabledProvider(provider.clone())),
            None => {
                debug!("Request for unknown or disabled provider: {slug}");
                Err(Error::not_found())
            }
        }
    }
}
