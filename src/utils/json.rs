//! Read-only dotted-path getters over `serde_json::Value`.
//!
//! On-chain payloads embed deeply nested JSON documents; these helpers pull
//! typed scalars out of them without intermediate deserialization. Absent
//! paths yield the type's empty value rather than an error.

use serde_json::Value;

/// Resolves a dotted path against a JSON value.
///
/// Numeric segments index into arrays, so `"authors.0"` selects the first
/// element of the `authors` array.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Returns the string at `path`, or an empty string when the path is absent
/// or not a string.
pub fn get_string(value: &Value, path: &str) -> String {
    get(value, path)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Returns the unsigned integer at `path`, or `0` when the path is absent.
///
/// Numeric strings are accepted; some platforms emit timestamps as strings.
pub fn get_u64(value: &Value, path: &str) -> u64 {
    match get(value, path) {
        Some(Value::Number(number)) => number.as_u64().unwrap_or_default(),
        Some(Value::String(text)) => text.parse().unwrap_or_default(),
        _ => 0,
    }
}

/// Returns the strings of the array at `path`, or an empty list.
///
/// Non-string elements are skipped.
pub fn get_string_array(value: &Value, path: &str) -> Vec<String> {
    get(value, path)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "title": "Yu Test Post",
            "authors": ["mKwDzWEHQDof8Hpw9pyr", "second"],
            "publishedAt": 1_697_091_376_816_u64,
            "updatedAt": "1697091375612",
            "cover_img": { "img": { "src": "https://example.com/a.jpg" } },
            "categories": ["data", 42],
            "wnft": { "imageURI": "bafybeigdyrzt" },
        })
    }

    #[test]
    fn test_get_nested_path() {
        let doc = document();
        assert_eq!(
            get_string(&doc, "cover_img.img.src"),
            "https://example.com/a.jpg"
        );
    }

    #[test]
    fn test_get_array_index() {
        let doc = document();
        assert_eq!(get_string(&doc, "authors.0"), "mKwDzWEHQDof8Hpw9pyr");
        assert_eq!(get_string(&doc, "authors.1"), "second");
        assert_eq!(get_string(&doc, "authors.2"), "");
    }

    #[test]
    fn test_get_u64_number_and_string() {
        let doc = document();
        assert_eq!(get_u64(&doc, "publishedAt"), 1_697_091_376_816);
        assert_eq!(get_u64(&doc, "updatedAt"), 1_697_091_375_612);
        assert_eq!(get_u64(&doc, "missing"), 0);
    }

    #[test]
    fn test_get_absent_path_is_empty() {
        let doc = document();
        assert_eq!(get_string(&doc, "content.body"), "");
        assert!(get(&doc, "title.inner").is_none());
    }

    #[test]
    fn test_get_string_array_skips_non_strings() {
        let doc = document();
        assert_eq!(get_string_array(&doc, "categories"), vec!["data"]);
        assert!(get_string_array(&doc, "title").is_empty());
    }
}
