//! PayPal identity (OpenID Connect), live or sandbox.

use serde_json::Value;

use crate::provider::{
    opt_str_field, str_field, ApiAuth, Descriptor, Hooks, Labels, OAuthVersion, ProviderKind,
    TokenCheck, UserData,
};
use crate::response::string_field;

const USERINFO: &str = "identity/openidconnect/userinfo/?schema=openid";

pub fn descriptor(is_live: bool) -> Descriptor {
    let (www, api) = if is_live {
        ("www.paypal.com", "api.paypal.com")
    } else {
        ("www.sandbox.paypal.com", "api.sandbox.paypal.com")
    };

    Descriptor {
        kind: ProviderKind::PayPal,
        version: OAuthVersion::V2,
        api_base_url: format!("https://{api}/v1/"),
        request_token_url: None,
        authorization_url: format!(
            "https://{www}/webapps/auth/protocol/openidconnect/v1/authorize"
        ),
        access_token_url: format!("https://{api}/v1/identity/openidconnect/tokenservice"),
        refresh_token_url: None,
        labels: Labels::oauth2(),
        scope_separator: " ",
        default_scope: &["openid", "email"],
        api_auth: ApiAuth::Bearer,
        token_check: TokenCheck::ApiCall { endpoint: USERINFO },
        user_data_endpoint: USERINFO,
        user_data_params: &[],
        profile_endpoint: USERINFO,
        sends_nonce: true,
        hooks: Hooks {
            is_error_payload,
            resolve_uid,
            parse_user_data,
        },
    }
}

// Userinfo is only trustworthy when it names the user.
fn is_error_payload(payload: &Value) -> bool {
    payload.get("user_id").is_none()
}

fn resolve_uid(payload: &Value) -> Option<String> {
    string_field(payload, "user_id")
}

fn parse_user_data(payload: &Value) -> UserData {
    UserData {
        first_name: str_field(payload, "given_name"),
        last_name: str_field(payload, "family_name"),
        email: opt_str_field(payload, "email"),
        username: None,
    }
}
