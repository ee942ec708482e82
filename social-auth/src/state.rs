//! Anti-forgery values for OAuth flows.

use rand::Rng;

/// Generates a random state value: 32 bytes, hex encoded.
pub fn generate_state() -> String {
    let random_bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(random_bytes)
}

/// Random alphanumeric nonce for OAuth1 signatures.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
