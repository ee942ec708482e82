//! LinkedIn REST API v1.

use serde_json::Value;

use crate::provider::{
    opt_str_field, str_field, ApiAuth, Descriptor, Hooks, Labels, OAuthVersion, ProviderKind,
    TokenCheck, UserData,
};
use crate::response::string_field;

pub fn descriptor() -> Descriptor {
    Descriptor {
        kind: ProviderKind::LinkedIn,
        version: OAuthVersion::V2,
        api_base_url: "https://api.linkedin.com/v1/".to_string(),
        request_token_url: None,
        authorization_url: "https://www.linkedin.com/uas/oauth2/authorization".to_string(),
        access_token_url: "https://www.linkedin.com/uas/oauth2/accessToken".to_string(),
        refresh_token_url: None,
        labels: Labels::oauth2().with_uid("id"),
        scope_separator: " ",
        default_scope: &[],
        // LinkedIn wants the token and the response format as query parameters.
        api_auth: ApiAuth::QueryParam {
            token_param: "oauth2_access_token",
            extra: &[("format", "json")],
        },
        token_check: TokenCheck::ApiCall {
            endpoint: "people/~:(id)",
        },
        user_data_endpoint: "people/~:(first-name,last-name,email-address)",
        user_data_params: &[],
        profile_endpoint: "people/~",
        sends_nonce: false,
        hooks: Hooks {
            is_error_payload,
            resolve_uid,
            parse_user_data,
        },
    }
}

fn is_error_payload(payload: &Value) -> bool {
    payload.get("errorCode").is_some()
}

fn resolve_uid(payload: &Value) -> Option<String> {
    string_field(payload, "id")
}

fn parse_user_data(payload: &Value) -> UserData {
    UserData {
        first_name: str_field(payload, "firstName"),
        last_name: str_field(payload, "lastName"),
        email: opt_str_field(payload, "emailAddress"),
        username: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_payload() {
        assert!(is_error_payload(&json!({"errorCode": 0, "status": 401})));
        assert!(!is_error_payload(&json!({"id": "Xk2y"})));
    }

    #[test]
    fn test_parse_user_data() {
        let data = parse_user_data(&json!({
            "firstName": "Grace",
            "lastName": "Hopper",
            "emailAddress": "grace@example.com"
        }));

        assert_eq!(data.first_name, "Grace");
        assert_eq!(data.last_name, "Hopper");
        assert_eq!(data.email.as_deref(), Some("grace@example.com"));
    }
}
