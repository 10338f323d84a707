//! ID generation helpers.

use rand::Rng;
use uuid::Uuid;

/// Default short-id length for session/page ids.
pub const SHORT_ID_LEN: usize = 16;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a unique event id (UUID v4).
pub fn event_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a short alphanumeric id of the given length.
pub fn short_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generates a session id.
pub fn session_id() -> String {
    short_id(SHORT_ID_LEN)
}

/// Generates a page id.
pub fn page_id() -> String {
    short_id(SHORT_ID_LEN)
}
