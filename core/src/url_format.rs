//! URL assembly for host requests.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Scheme prefixed onto scheme-less URLs.
pub const DEFAULT_PROTOCOL: &str = "https:";

/// Append `query` to `url` and prefix `protocol` unless the URL is already
/// absolute (`http://` or `https://`).
///
/// String values are encoded as-is, `null` as an empty value, anything else
/// as its JSON text.
pub fn format_url(protocol: &str, url: &str, query: Option<&Map<String, Value>>) -> String {
    let mut full = url.to_string();
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let mut encoder = form_urlencoded::Serializer::new(String::new());
        for (key, value) in query {
            match value {
                Value::String(s) => encoder.append_pair(key, s),
                Value::Null => encoder.append_pair(key, ""),
                other => encoder.append_pair(key, &other.to_string()),
            };
        }
        let separator = match full.find('?') {
            None => "?",
            Some(idx) if idx + 1 == full.len() || full.ends_with('&') => "",
            Some(_) => "&",
        };
        full.push_str(separator);
        full.push_str(&encoder.finish());
    }
    if is_absolute(&full) {
        full
    } else {
        format!("{protocol}{full}")
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn query(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn prefixes_protocol_relative_urls() {
        assert_eq!(format_url("https:", "//tcb.example.com/web", None), "https://tcb.example.com/web");
    }

    #[test]
    fn leaves_absolute_urls_alone() {
        assert_eq!(format_url("https:", "http://a.com/x", None), "http://a.com/x");
        assert_eq!(format_url("https:", "https://a.com/x", None), "https://a.com/x");
    }

    #[test]
    fn appends_query_with_question_mark() {
        let q = query(json!({ "env": "prod", "n": 3 }));
        assert_eq!(
            format_url("https:", "//a.com/x", Some(&q)),
            "https://a.com/x?env=prod&n=3"
        );
    }

    #[test]
    fn joins_existing_query_with_ampersand() {
        let q = query(json!({ "b": "2" }));
        assert_eq!(format_url("https:", "https://a.com/x?a=1", Some(&q)), "https://a.com/x?a=1&b=2");
        assert_eq!(format_url("https:", "https://a.com/x?", Some(&q)), "https://a.com/x?b=2");
    }

    #[test]
    fn encodes_reserved_characters() {
        let q = query(json!({ "q": "a b&c", "empty": null }));
        assert_eq!(
            format_url("https:", "https://a.com/s", Some(&q)),
            "https://a.com/s?empty=&q=a+b%26c"
        );
    }

    #[test]
    fn empty_query_changes_nothing() {
        let q = Map::new();
        assert_eq!(format_url("https:", "https://a.com/x", Some(&q)), "https://a.com/x");
    }
}
