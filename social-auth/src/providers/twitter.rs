//! Twitter REST API 1.1, the only OAuth1 provider.

use serde_json::Value;

use crate::provider::{
    opt_str_field, split_name, ApiAuth, Descriptor, Hooks, Labels, OAuthVersion, ProviderKind,
    TokenCheck, UserData,
};
use crate::response::string_field;

const VERIFY_CREDENTIALS: &str = "account/verify_credentials.json";

pub fn descriptor() -> Descriptor {
    Descriptor {
        kind: ProviderKind::Twitter,
        version: OAuthVersion::V1,
        api_base_url: "https://api.twitter.com/1.1/".to_string(),
        request_token_url: Some("https://api.twitter.com/oauth/request_token".to_string()),
        authorization_url: "https://api.twitter.com/oauth/authorize".to_string(),
        access_token_url: "https://api.twitter.com/oauth/access_token".to_string(),
        refresh_token_url: None,
        labels: Labels::oauth1(),
        scope_separator: ",",
        default_scope: &[],
        api_auth: ApiAuth::OAuth1,
        token_check: TokenCheck::ApiCall {
            endpoint: VERIFY_CREDENTIALS,
        },
        user_data_endpoint: VERIFY_CREDENTIALS,
        user_data_params: &[],
        profile_endpoint: VERIFY_CREDENTIALS,
        sends_nonce: false,
        hooks: Hooks {
            is_error_payload,
            resolve_uid,
            parse_user_data,
        },
    }
}

fn is_error_payload(payload: &Value) -> bool {
    payload.get("errors").is_some()
}

// `id` overflows JavaScript numbers; `id_str` is authoritative.
fn resolve_uid(payload: &Value) -> Option<String> {
    string_field(payload, "id_str")
}

fn parse_user_data(payload: &Value) -> UserData {
    let (first_name, last_name) = split_name(payload["name"].as_str().unwrap_or_default());

    UserData {
        first_name,
        last_name,
        email: None,
        username: opt_str_field(payload, "screen_name"),
    }
}
