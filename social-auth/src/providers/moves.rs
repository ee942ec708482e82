//! Moves app activity tracker. Tokens expire and can be refreshed.

use serde_json::Value;

use crate::provider::{
    ApiAuth, Descriptor, Hooks, Labels, OAuthVersion, ProviderKind, TokenCheck, UserData,
};
use crate::response::string_field;

pub fn descriptor() -> Descriptor {
    Descriptor {
        kind: ProviderKind::MovesApp,
        version: OAuthVersion::V2,
        api_base_url: "https://api.moves-app.com/api/1.1/".to_string(),
        request_token_url: None,
        authorization_url: "https://api.moves-app.com/oauth/v1/authorize".to_string(),
        access_token_url: "https://api.moves-app.com/oauth/v1/access_token".to_string(),
        refresh_token_url: Some("https://api.moves-app.com/oauth/v1/access_token".to_string()),
        labels: Labels::oauth2(),
        scope_separator: ",",
        default_scope: &["activity"],
        api_auth: ApiAuth::Bearer,
        token_check: TokenCheck::TokenInfo {
            url: "https://api.moves-app.com/oauth/v1/tokeninfo".to_string(),
        },
        user_data_endpoint: "user/profile",
        user_data_params: &[],
        profile_endpoint: "user/profile",
        sends_nonce: false,
        hooks: Hooks {
            is_error_payload,
            resolve_uid,
            parse_user_data,
        },
    }
}

// Validity comes from the status code alone.
fn is_error_payload(_payload: &Value) -> bool {
    false
}

fn resolve_uid(payload: &Value) -> Option<String> {
    string_field(payload, "user_id")
}

// Moves profiles carry neither names nor email.
fn parse_user_data(_payload: &Value) -> UserData {
    UserData::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_user_id() {
        let payload = json!({"user_id": 23138311640030064_u64, "client_id": "abc"});
        assert_eq!(
            resolve_uid(&payload).as_deref(),
            Some("23138311640030064")
        );
    }

    #[test]
    fn test_refresh_uses_token_endpoint() {
        let descriptor = descriptor();
        assert_eq!(
            descriptor.refresh_token_url.as_deref(),
            Some(descriptor.access_token_url.as_str())
        );
    }
}
