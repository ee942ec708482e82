//! GitHub OAuth apps.

use serde_json::Value;

use crate::provider::{
    opt_str_field, split_name, ApiAuth, Descriptor, Hooks, Labels, OAuthVersion, ProviderKind,
    TokenCheck, UserData,
};
use crate::response::string_field;

pub fn descriptor() -> Descriptor {
    Descriptor {
        kind: ProviderKind::GitHub,
        version: OAuthVersion::V2,
        api_base_url: "https://api.github.com/".to_string(),
        request_token_url: None,
        authorization_url: "https://github.com/login/oauth/authorize".to_string(),
        access_token_url: "https://github.com/login/oauth/access_token".to_string(),
        refresh_token_url: None,
        labels: Labels::oauth2().with_uid("id").with_expiration("expires"),
        scope_separator: ",",
        default_scope: &["email"],
        api_auth: ApiAuth::Bearer,
        token_check: TokenCheck::ApiCall { endpoint: "user" },
        user_data_endpoint: "user",
        user_data_params: &[],
        profile_endpoint: "user",
        sends_nonce: false,
        hooks: Hooks {
            is_error_payload,
            resolve_uid,
            parse_user_data,
        },
    }
}

// Error answers carry a `message`, e.g. "Bad credentials".
fn is_error_payload(payload: &Value) -> bool {
    payload.get("message").is_some()
}

fn resolve_uid(payload: &Value) -> Option<String> {
    string_field(payload, "id")
}

fn parse_user_data(payload: &Value) -> UserData {
    let (first_name, last_name) = split_name(payload["name"].as_str().unwrap_or_default());

    UserData {
        first_name,
        last_name,
        email: opt_str_field(payload, "email"),
        username: opt_str_field(payload, "login"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_payload() {
        assert!(is_error_payload(&json!({"message": "Bad credentials"})));
        assert!(!is_error_payload(&json!({"id": 583231, "login": "octocat"})));
    }

    #[test]
    fn test_numeric_id_is_stringified() {
        assert_eq!(
            resolve_uid(&json!({"id": 583231})).as_deref(),
            Some("583231")
        );
    }

    #[test]
    fn test_parse_user_data() {
        let data = parse_user_data(&json!({
            "login": "octocat",
            "name": "The Octocat",
            "email": null
        }));

        assert_eq!(data.first_name, "The");
        assert_eq!(data.last_name, "Octocat");
        assert_eq!(data.email, None);
        assert_eq!(data.username.as_deref(), Some("octocat"));
    }
}
