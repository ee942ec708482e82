//! Facebook Graph API, v2.2.

use serde_json::Value;

use crate::provider::{
    opt_str_field, str_field, ApiAuth, Descriptor, Hooks, Labels, OAuthVersion, ProviderKind,
    TokenCheck, UserData,
};
use crate::response::string_field;

pub fn descriptor() -> Descriptor {
    Descriptor {
        kind: ProviderKind::Facebook,
        version: OAuthVersion::V2,
        api_base_url: "https://graph.facebook.com/v2.2/".to_string(),
        request_token_url: None,
        authorization_url: "https://www.facebook.com/v2.2/dialog/oauth".to_string(),
        access_token_url: "https://graph.facebook.com/v2.2/oauth/access_token".to_string(),
        refresh_token_url: None,
        labels: Labels::oauth2().with_expiration("expires"),
        scope_separator: ",",
        default_scope: &["email"],
        api_auth: ApiAuth::Bearer,
        token_check: TokenCheck::AppTokenDebug {
            url: "https://graph.facebook.com/v2.2/debug_token".to_string(),
        },
        user_data_endpoint: "me",
        user_data_params: &[("fields", "first_name,last_name,email")],
        profile_endpoint: "me",
        sends_nonce: false,
        hooks: Hooks {
            is_error_payload,
            resolve_uid,
            parse_user_data,
        },
    }
}

// The debug endpoint wraps its answer in `data`.
fn is_error_payload(payload: &Value) -> bool {
    !payload["data"]["is_valid"].as_bool().unwrap_or(false)
}

fn resolve_uid(payload: &Value) -> Option<String> {
    string_field(&payload["data"], "user_id")
}

fn parse_user_data(payload: &Value) -> UserData {
    UserData {
        first_name: str_field(payload, "first_name"),
        last_name: str_field(payload, "last_name"),
        email: opt_str_field(payload, "email"),
        username: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_payload_validity() {
        let valid = json!({"data": {"is_valid": true, "user_id": "10153"}});
        let invalid = json!({"data": {"is_valid": false}});

        assert!(!is_error_payload(&valid));
        assert!(is_error_payload(&invalid));
        assert!(is_error_payload(&json!({"error": {"code": 190}})));
        assert_eq!(resolve_uid(&valid).as_deref(), Some("10153"));
    }

    #[test]
    fn test_parse_user_data() {
        let data = parse_user_data(&json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com"
        }));

        assert_eq!(data.first_name, "Ada");
        assert_eq!(data.last_name, "Lovelace");
        assert_eq!(data.email.as_deref(), Some("ada@example.com"));
        assert_eq!(data.username, None);
    }
}
