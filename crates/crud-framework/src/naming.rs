//! Naming and shape helpers.
//!
//! Case conversion and pluralization used to derive action types and public
//! operation names from a resource name, plus the list/map conversion used by
//! the reducer when it normalizes a fetched list.

use crate::key::{Key, KeyCodec};
use serde_json::Value;
use std::collections::BTreeMap;

/// `some_name` / `SOME_NAME` / `some-name` to `someName`.
pub fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.to_lowercase().chars() {
        if c == '_' || c == '-' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `fooCategories` to `FOO_CATEGORIES`.
pub fn camel_to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push('_');
        }
        out.extend(c.to_uppercase());
    }
    out
}

/// Uppercase the first character only.
pub fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `_id` / `user_id` / `userId` to `Id` / `UserId`.
pub fn to_upper_camel(s: &str) -> String {
    // Only snake-like input is folded, camelCase passes through unchanged.
    if s.contains('_') || s.contains('-') {
        title_case(&snake_to_camel(s))
    } else {
        title_case(s)
    }
}

/// Naive singular form: `categories` -> `category`, `users` -> `user`.
pub fn plural_to_single(s: &str) -> String {
    if !s.to_lowercase().ends_with('s') {
        s.to_owned()
    } else if let Some(stem) = s.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = s.strip_suffix("IES") {
        format!("{stem}Y")
    } else {
        s[..s.len() - 1].to_owned()
    }
}

/// Naive plural form: `category` -> `categories`, `Id` -> `Ids`. Already plural words are kept.
pub fn single_to_plural(s: &str) -> String {
    if s.to_lowercase().ends_with('s') {
        s.to_owned()
    } else if let Some(stem) = s.strip_suffix('y') {
        format!("{stem}ies")
    } else {
        format!("{s}s")
    }
}

/// Normalize a list of entities into a map keyed by `by_key`.
///
/// Entities that do not carry a usable key are returned separately so the
/// caller can report them.
pub fn array_to_map(
    entities: &[Value],
    by_key: &str,
    codec: KeyCodec,
) -> (BTreeMap<Key, Value>, Vec<Value>) {
    let mut map = BTreeMap::new();
    let mut rejected = Vec::new();
    for entity in entities {
        match entity.get(by_key).and_then(|v| codec.encode(v)) {
            Some(key) => {
                map.insert(key, entity.clone());
            }
            None => rejected.push(entity.clone()),
        }
    }
    (map, rejected)
}

/// Read a normalized map back as a list (key order).
pub fn map_to_array(map: &BTreeMap<Key, Value>) -> Vec<Value> {
    map.values().cloned().collect()
}
