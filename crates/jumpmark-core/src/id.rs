//! Link identifiers
//!
//! IDs are a base-36 millisecond timestamp followed by a short random
//! suffix, e.g. `lz3k9q2a-4f1c9e`. There is no global counter and the
//! generator never checks the store for collisions.

use chrono::Utc;
use uuid::Uuid;

/// Length of the random suffix
const SUFFIX_LEN: usize = 6;

/// Generate a new link ID
pub fn new_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}", to_base36(millis), &random[..SUFFIX_LEN])
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn test_id_shape() {
        let id = new_id();
        let (prefix, suffix) = id.split_once('-').unwrap();
        assert!(!prefix.is_empty());
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn test_ids_are_distinct() {
        let ids: HashSet<String> = (0..500).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 500);
    }
}
