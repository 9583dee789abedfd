//! Session id generation

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use tracing::warn;

/// Number of random bytes behind every session id
pub const SESSION_ID_BYTES: usize = 32;

/// Generate a new session id
///
/// 32 bytes from the OS entropy source, encoded with the URL-safe base64 alphabet.
/// If the entropy source fails the id degrades to the current nanosecond timestamp,
/// which is no longer unguessable and only probably unique.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => URL_SAFE_NO_PAD.encode(bytes),
        Err(err) => {
            warn!("Entropy source failed, falling back to timestamp session id: {}", err);
            fallback_session_id()
        }
    }
}

fn fallback_session_id() -> String {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(id.len(), 43);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_session_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_fallback_is_numeric() {
        let id = fallback_session_id();
        assert!(id.parse::<i64>().is_ok());
    }
}
