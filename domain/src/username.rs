//! Suggests a free username for a user signing up through a provider.

use crate::error::Error;
use crate::store::UserStore;
use deunicode::deunicode;
use log::*;
use rand::Rng;
use social_auth::UserData;
use uuid::Uuid;

const MAX_LENGTH: usize = 30;
const SUFFIX_LENGTH: usize = 4;
const FALLBACK_SUFFIX_LENGTH: usize = 12;
const MAX_ATTEMPTS: usize = 100;

/// ASCII base of a username: transliterated, stripped to `[a-z0-9_.@+-]`.
pub fn username_base(data: &UserData) -> String {
    let raw = match data.username.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(username) => username.to_string(),
        None => format!("{}{}", data.first_name, data.last_name),
    };

    let cleaned: String = deunicode(&raw)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "_.@+-".contains(*c))
        .collect::<String>()
        .to_lowercase();

    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

/// Returns `base` followed by a random number, retried until no user has that username.
pub async fn compose_username<S: UserStore + ?Sized>(
    store: &S,
    data: &UserData,
) -> Result<String, Error> {
    let base = username_base(data);
    let short_base: String = base.chars().take(MAX_LENGTH - SUFFIX_LENGTH).collect();

    for _ in 0..MAX_ATTEMPTS {
        let candidate = format!(
            "{short_base}{}",
            rand::thread_rng().gen_range(1..=9999u32)
        );
        if store.find_user_by_username(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }

    warn!("No free numbered username for base {base}, falling back to a uuid suffix");

    let uuid_base: String = base
        .chars()
        .take(MAX_LENGTH - FALLBACK_SUFFIX_LENGTH)
        .collect();
    let suffix = Uuid::new_v4().simple().to_string();
    Ok(format!("{uuid_base}{}", &suffix[..FALLBACK_SUFFIX_LENGTH]))
}
