//! HMAC-SHA256 signed values with a timestamp, used for cookies.
//!
//! A signed value reads `base64url(payload).timestamp.base64url(mac)`, where the MAC covers
//! everything before the last dot.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use sha2::Sha256;

use crate::error::{signing_error, Error, SigningErrorKind};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct Signer {
    secret: SecretString,
}

impl Signer {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    pub fn sign(&self, payload: &[u8]) -> Result<String, Error> {
        self.sign_at(payload, Utc::now().timestamp())
    }

    fn sign_at(&self, payload: &[u8], timestamp: i64) -> Result<String, Error> {
        let message = format!("{}.{}", URL_SAFE_NO_PAD.encode(payload), timestamp);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&message)?.finalize().into_bytes());
        Ok(format!("{message}.{signature}"))
    }

    /// Returns the payload if the signature matches and the value is at most `max_age_secs` old.
    pub fn verify(&self, value: &str, max_age_secs: i64) -> Result<Vec<u8>, Error> {
        self.verify_at(value, max_age_secs, Utc::now().timestamp())
    }

    fn verify_at(&self, value: &str, max_age_secs: i64, now: i64) -> Result<Vec<u8>, Error> {
        let (message, signature) = value
            .rsplit_once('.')
            .ok_or_else(|| signing_error(SigningErrorKind::Malformed, "missing signature"))?;
        let (encoded, timestamp) = message
            .split_once('.')
            .ok_or_else(|| signing_error(SigningErrorKind::Malformed, "missing timestamp"))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| signing_error(SigningErrorKind::Malformed, "signature is not base64"))?;

        self.mac(message)?
            .verify_slice(&signature)
            .map_err(|_| signing_error(SigningErrorKind::InvalidSignature, "signature mismatch"))?;

        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| signing_error(SigningErrorKind::Malformed, "invalid timestamp"))?;
        if now - timestamp > max_age_secs {
            return Err(signing_error(
                SigningErrorKind::Expired,
                "signed value is too old",
            ));
        }

        URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| signing_error(SigningErrorKind::Malformed, "payload is not base64"))
    }

    pub fn sign_json<T: Serialize>(&self, value: &T) -> Result<String, Error> {
        let payload = serde_json::to_vec(value)
            .map_err(|e| signing_error(SigningErrorKind::Malformed, &e.to_string()))?;
        self.sign(&payload)
    }

    pub fn verify_json<T: DeserializeOwned>(
        &self,
        value: &str,
        max_age_secs: i64,
    ) -> Result<T, Error> {
        let payload = self.verify(value, max_age_secs)?;
        serde_json::from_slice(&payload)
            .map_err(|e| signing_error(SigningErrorKind::Malformed, &e.to_string()))
    }

    fn mac(&self, message: &str) -> Result<HmacSha256, Error> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| signing_error(SigningErrorKind::Malformed, "Invalid HMAC key"))?;
        mac.update(message.as_bytes());
        Ok(mac)
    }
}
