// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `"k1:v1, k2:v2"` encoding used for map-typed fields (e.g. cluster labels).
//!
//! The encoding is kept for compatibility with data already in storage. It is
//! lossy: keys containing `:` or keys/values containing `", "` do not survive a
//! round trip. Values may contain `:` since only the first one splits.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::value::display_of;

const PAIR_SEPARATOR: &str = ", ";
const KEY_SEPARATOR: char = ':';

/// Encode a map as `"k1:v1, k2:v2"` (empty map encodes as `""`).
pub fn encode_map(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}{KEY_SEPARATOR}{v}"))
        .collect::<Vec<_>>()
        .join(PAIR_SEPARATOR)
}

/// Parse the `"k1:v1, k2:v2"` encoding. A pair without `:` becomes a key with an empty value.
pub fn decode_map(encoded: &str) -> BTreeMap<String, String> {
    if encoded.is_empty() {
        return BTreeMap::new();
    }
    encoded
        .split(PAIR_SEPARATOR)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(KEY_SEPARATOR) {
            Some((k, v)) => (k.to_owned(), v.to_owned()),
            None => (pair.to_owned(), String::new()),
        })
        .collect()
}

/// Read a control value holding a JSON object as a string map.
///
/// Non-object values yield an empty map; non-string members use their display text.
pub fn map_from_value(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), display_of(v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Turn a string map back into a JSON object control value.
pub fn map_to_value(map: BTreeMap<String, String>) -> Value {
    Value::Object(
        map.into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<String, Value>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn encodes_without_trailing_separator() {
        let map = labels(&[("env", "prod"), ("team", "infra")]);
        assert_eq!(encode_map(&map), "env:prod, team:infra");
        assert_eq!(encode_map(&BTreeMap::new()), "");
    }

    #[test]
    fn decode_inverts_encode_for_plain_labels() {
        let map = labels(&[("app", "web"), ("tier", "frontend"), ("zone", "a")]);
        assert_eq!(decode_map(&encode_map(&map)), map);
        assert!(decode_map("").is_empty());
    }

    #[test]
    fn values_keep_extra_colons() {
        assert_eq!(
            decode_map("url:https://example.com"),
            labels(&[("url", "https://example.com")])
        );
    }

    #[test]
    fn separator_in_value_corrupts_round_trip() {
        let map = labels(&[("note", "a, b")]);
        assert_ne!(decode_map(&encode_map(&map)), map);
    }

    #[test]
    fn value_conversions() {
        let value = json!({"a": "1", "b": 2});
        let map = map_from_value(&value);
        assert_eq!(map, labels(&[("a", "1"), ("b", "2")]));
        assert_eq!(map_to_value(map), json!({"a": "1", "b": "2"}));
        assert!(map_from_value(&json!("nope")).is_empty());
    }
}
