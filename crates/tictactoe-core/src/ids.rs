//! Chain and application identifier handling
//!
//! Identifiers travel through user input and URLs, so anything outside
//! `[0-9a-fA-F:]` is stripped before an identifier reaches a query or a
//! comparison.

use crate::{Error, Result};

/// Strip every character outside `[0-9a-fA-F:]`.
pub fn normalize_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_hexdigit() || *c == ':')
        .collect()
}

/// True when the identifier is non-empty and already normalized.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit() || c == ':')
}

/// Normalize an identifier, rejecting input that normalizes to nothing.
pub fn require_id(raw: &str) -> Result<String> {
    let normalized = normalize_id(raw);
    if normalized.is_empty() {
        return Err(Error::InvalidIdentifier(format!(
            "{:?} contains no hexadecimal characters",
            raw
        )));
    }
    Ok(normalized)
}

/// Display name used when the player leaves the name empty.
pub fn default_player_name(chain_id: Option<&str>) -> String {
    match chain_id {
        Some(id) if !id.is_empty() => {
            let prefix: String = id.chars().take(6).collect();
            format!("Player-{}", prefix)
        }
        _ => "Player".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize_id("ab-12:34 "), "ab12:34");
        assert_eq!(normalize_id("  DEADbeef\n"), "DEADbeef");
        assert_eq!(normalize_id("xyz"), "");
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id("e476-187f").unwrap(), "e476187f");
        assert!(matches!(require_id("--"), Err(Error::InvalidIdentifier(_))));
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("e476187f:01"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("e476 187f"));
    }

    #[test]
    fn test_default_player_name() {
        assert_eq!(default_player_name(Some("e476187f6ddfeb9d")), "Player-e47618");
        assert_eq!(default_player_name(Some("ab")), "Player-ab");
        assert_eq!(default_player_name(Some("")), "Player");
        assert_eq!(default_player_name(None), "Player");
    }
}
