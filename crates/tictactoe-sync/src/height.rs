//! Block height extraction from notification payloads
//!
//! Notifications are opaque JSON. The height is looked up by an ordered list
//! of extractors; the first one that yields a value wins. Missing heights are
//! not an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tictactoe_storage_sqlite::parse_height;

const HEIGHT_FIELDS: [&str; 3] = ["height", "blockHeight", "block_height"];

type Extractor = fn(&Value) -> Option<u64>;

const EXTRACTORS: &[Extractor] = &[direct_field, new_block_field, textual_scan];

static TEXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["block_height", "blockHeight", "height"]
        .iter()
        .filter_map(|name| Regex::new(&format!(r#"(?i){}"?\s*[:=]\s*"?(\d+)"?"#, name)).ok())
        .collect()
});

/// Height carried by `event`, if any
pub fn extract_height(event: &Value) -> Option<u64> {
    EXTRACTORS.iter().find_map(|extract| extract(event))
}

/// True when the event announces a new block on the chain
pub fn is_new_block(event: &Value) -> bool {
    matches!(new_block(event), Some(v) if !v.is_null())
}

/// Numbers are floored, strings read their leading digits
fn height_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f.floor() as u64)
        }),
        Value::String(s) => parse_height(s),
        _ => None,
    }
}

fn first_field(object: &Value) -> Option<u64> {
    HEIGHT_FIELDS
        .iter()
        .find_map(|field| object.get(field).and_then(height_of))
}

fn new_block(event: &Value) -> Option<&Value> {
    event.get("reason")?.get("NewBlock")
}

fn direct_field(event: &Value) -> Option<u64> {
    first_field(event)
}

fn new_block_field(event: &Value) -> Option<u64> {
    let block = new_block(event)?;
    height_of(block).or_else(|| first_field(block))
}

fn textual_scan(event: &Value) -> Option<u64> {
    let text = serde_json::to_string(event).ok()?;
    TEXT_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_fields_in_order() {
        assert_eq!(extract_height(&json!({"height": 5})), Some(5));
        assert_eq!(extract_height(&json!({"blockHeight": "6"})), Some(6));
        assert_eq!(extract_height(&json!({"block_height": 7.9})), Some(7));
        assert_eq!(
            extract_height(&json!({"height": 1, "blockHeight": 2, "block_height": 3})),
            Some(1)
        );
    }

    #[test]
    fn test_unusable_direct_field_falls_through() {
        assert_eq!(extract_height(&json!({"height": null, "blockHeight": 4})), Some(4));
        assert_eq!(extract_height(&json!({"height": "abc", "block_height": 8})), Some(8));
    }

    #[test]
    fn test_new_block_reason() {
        let event = json!({"chain_id": "aa", "reason": {"NewBlock": {"height": 11, "hash": "ff"}}});
        assert_eq!(extract_height(&event), Some(11));
        assert!(is_new_block(&event));

        assert_eq!(extract_height(&json!({"reason": {"NewBlock": 12}})), Some(12));
        assert_eq!(
            extract_height(&json!({"reason": {"NewBlock": {"block_height": "13"}}})),
            Some(13)
        );
    }

    #[test]
    fn test_textual_fallback_precedence() {
        let event = json!({"reason": {"NewRound": {"height": 3, "round": 1}}, "meta": {"BLOCK_HEIGHT": 9}});
        assert_eq!(extract_height(&event), Some(9));

        let event = json!({"reason": {"NewIncomingBundle": {"origin": "x", "height": 21}}});
        assert_eq!(extract_height(&event), Some(21));
        assert!(!is_new_block(&event));
    }

    #[test]
    fn test_no_height() {
        assert_eq!(extract_height(&json!({"reason": {"NewRound": {"round": 2}}})), None);
        assert_eq!(extract_height(&json!("garbage")), None);
        assert_eq!(extract_height(&Value::Null), None);
        assert_eq!(extract_height(&json!({"height": -4})), None);
    }

    #[test]
    fn test_null_new_block_is_not_a_block() {
        assert!(!is_new_block(&json!({"reason": {"NewBlock": null}})));
        assert!(!is_new_block(&json!({"height": 3})));
    }
}
