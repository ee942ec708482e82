//! Parsing of provider token responses.

use serde_json::{Map, Value};

/// Parses a response body as JSON, falling back to a urlencoded query string.
///
/// OAuth1 providers and some OAuth2 token endpoints answer with `a=1&b=2` bodies.
pub fn parse_body(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => {
            let map: Map<String, Value> = url::form_urlencoded::parse(body.trim().as_bytes())
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect();
            Value::Object(map)
        }
    }
}

/// Reads a field as a string. Numbers are stringified; empty strings and nulls are absent.
pub fn string_field(data: &Value, label: &str) -> Option<String> {
    match data.get(label)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body() {
        let data = parse_body(r#"{"access_token":"tok1","user_id":42}"#);
        assert_eq!(string_field(&data, "access_token").as_deref(), Some("tok1"));
        assert_eq!(string_field(&data, "user_id").as_deref(), Some("42"));
    }

    #[test]
    fn test_urlencoded_body() {
        let data = parse_body("oauth_token=abc&oauth_token_secret=s%26t&user_id=12");
        assert_eq!(
            data,
            json!({"oauth_token": "abc", "oauth_token_secret": "s&t", "user_id": "12"})
        );
    }

    #[test]
    fn test_missing_and_empty_fields() {
        let data = json!({"expires": "", "refresh_token": null});
        assert_eq!(string_field(&data, "expires"), None);
        assert_eq!(string_field(&data, "refresh_token"), None);
        assert_eq!(string_field(&data, "absent"), None);
    }
}
