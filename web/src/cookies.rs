//! Signed cookies for the temporary setup data and the profile-data cache.

use crate::error::{Error, Result};
use axum::http::{header::COOKIE, header::SET_COOKIE, HeaderMap, HeaderValue};
use serde::{de::DeserializeOwned, Serialize};
use social_auth::Signer;
use tower_sessions::cookie::{time::Duration, Cookie, SameSite};

/// Carries provider data to a custom setup page.
pub(crate) const SETUP_COOKIE: &str = "dsnstp";
pub(crate) const SETUP_COOKIE_MAX_AGE: i64 = 120;

/// Raw value of a request cookie.
pub(crate) fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(|cookie| cookie.ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// Verified payload of a signed request cookie. Tampered or expired values read as absent.
pub(crate) fn read_signed<T: DeserializeOwned>(
    headers: &HeaderMap,
    signer: &Signer,
    name: &str,
    max_age: i64,
) -> Option<T> {
    let value = read(headers, name)?;
    signer.verify_json(&value, max_age).ok()
}

/// `Set-Cookie` header for a signed JSON value.
pub(crate) fn signed<T: Serialize>(
    signer: &Signer,
    name: &str,
    value: &T,
    max_age: i64,
) -> Result<(axum::http::HeaderName, HeaderValue)> {
    let cookie = Cookie::build((name.to_string(), signer.sign_json(value)?))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age))
        .build();
    header(cookie)
}

/// `Set-Cookie` header expiring a cookie.
pub(crate) fn removal(name: &str) -> Result<(axum::http::HeaderName, HeaderValue)> {
    let mut cookie = Cookie::build((name.to_string(), "")).path("/").build();
    cookie.make_removal();
    header(cookie)
}

fn header(cookie: Cookie<'static>) -> Result<(axum::http::HeaderName, HeaderValue)> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|err| Error::internal("Invalid Set-Cookie header", err))?;
    Ok((SET_COOKIE, value))
}
