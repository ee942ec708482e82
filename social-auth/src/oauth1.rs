//! OAuth 1.0a request signing with HMAC-SHA1 (RFC 5849).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::{Position, Url};

use crate::error::{oauth_error, Error, OAuthErrorKind};
use crate::state::generate_nonce;

type HmacSha1 = Hmac<Sha1>;

/// Keys used to sign one request. The token pair is absent while fetching a request token.
#[derive(Debug, Clone, Copy)]
pub struct SigningKeys<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: Option<&'a str>,
    pub token_secret: Option<&'a str>,
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Builds the `Authorization` header for a request.
///
/// `params` are the request's query or form parameters; `protocol_params` are extra
/// `oauth_*` values such as `oauth_callback` or `oauth_verifier`.
pub fn authorization_header(
    keys: &SigningKeys<'_>,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    protocol_params: &[(&str, &str)],
) -> Result<String, Error> {
    authorization_header_with(
        keys,
        method,
        url,
        params,
        protocol_params,
        &generate_nonce(),
        Utc::now().timestamp(),
    )
}

fn authorization_header_with(
    keys: &SigningKeys<'_>,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    protocol_params: &[(&str, &str)],
    nonce: &str,
    timestamp: i64,
) -> Result<String, Error> {
    let timestamp = timestamp.to_string();
    let mut oauth_params: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", keys.consumer_key),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", &timestamp),
        ("oauth_version", "1.0"),
    ];
    if let Some(token) = keys.token {
        oauth_params.push(("oauth_token", token));
    }
    oauth_params.extend_from_slice(protocol_params);

    let mut all_params = oauth_params.clone();
    all_params.extend_from_slice(params);
    let signature = sign(keys, method, url, &all_params)?;

    oauth_params.push(("oauth_signature", &signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {fields}"))
}

/// Computes the base64 HMAC-SHA1 signature over the signature base string.
pub fn sign(
    keys: &SigningKeys<'_>,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
) -> Result<String, Error> {
    let parsed = Url::parse(url)
        .map_err(|e| oauth_error(OAuthErrorKind::InvalidResponse, &e.to_string()))?;

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .collect();
    pairs.extend(params.iter().map(|(k, v)| (encode(k), encode(v))));
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_url = &parsed[..Position::AfterPath];
    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(base_url),
        encode(&normalized)
    );

    let signing_key = format!(
        "{}&{}",
        encode(keys.consumer_secret),
        encode(keys.token_secret.unwrap_or_default())
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|_| oauth_error(OAuthErrorKind::InvalidResponse, "Invalid HMAC key"))?;
    mac.update(base_string.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from Twitter's "Creating a signature" documentation.
    const KEYS: SigningKeys<'static> = SigningKeys {
        consumer_key: "xvz1evFS4wEEPTGEFPHBog",
        consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
        token: Some("370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
        token_secret: Some("LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"),
    };
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: i64 = 1318622958;

    #[test]
    fn test_signature_matches_reference_vector() {
        let timestamp = TIMESTAMP.to_string();
        let signature = sign(
            &KEYS,
            "post",
            "https://api.twitter.com/1.1/statuses/update.json?include_entities=true",
            &[
                ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
                ("oauth_consumer_key", KEYS.consumer_key),
                ("oauth_nonce", NONCE),
                ("oauth_signature_method", "HMAC-SHA1"),
                ("oauth_timestamp", &timestamp),
                ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
                ("oauth_version", "1.0"),
            ],
        )
        .unwrap();

        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_header_carries_encoded_signature() {
        let header = authorization_header_with(
            &KEYS,
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &[
                ("include_entities", "true"),
                ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ],
            &[],
            NONCE,
            TIMESTAMP,
        )
        .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.contains("oauth_token=\"370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb\""));
    }

    #[test]
    fn test_request_token_header_includes_callback_without_token() {
        let keys = SigningKeys {
            token: None,
            token_secret: None,
            ..KEYS
        };

        let header = authorization_header(
            &keys,
            "POST",
            "https://api.twitter.com/oauth/request_token",
            &[],
            &[("oauth_callback", "http://localhost:4000/twitter/callback")],
        )
        .unwrap();

        assert!(header.contains(
            "oauth_callback=\"http%3A%2F%2Flocalhost%3A4000%2Ftwitter%2Fcallback\""
        ));
        assert!(!header.contains("oauth_token="));
    }
}
