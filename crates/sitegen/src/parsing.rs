use crate::error::{Result, SitegenError};
use crate::types::FrontMatter;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::LazyLock;

pub const FRONT_MATTER_SEPARATOR: &str = "---";

// String literals are matched first so that `key:` sequences inside values stay untouched.
static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""(?:[^"\\]|\\.)*"|([{,]\s*)(?:'([^'\\]*)'|([A-Za-z_$][A-Za-z0-9_$]*))(\s*):"#,
    )
    .expect("bare key pattern is valid")
});

/// Splits a source file into its JSON metadata block and body.
///
/// Everything before the first `---` is metadata, everything after it is
/// the body with a single leading newline removed. Files without the
/// separator have empty metadata and are all body. The returned front
/// matter always carries `body` and `summary` strings.
pub fn parse_front_matter(content: &str, path: &Path) -> Result<FrontMatter> {
    let (metadata, body) = match content.find(FRONT_MATTER_SEPARATOR) {
        Some(index) => (
            &content[..index],
            strip_leading_newline(&content[index + FRONT_MATTER_SEPARATOR.len()..]),
        ),
        None => ("", content),
    };

    let mut raw = parse_metadata(metadata, path)?;

    let body = Value::String(body.to_string());
    if raw.get("summary").map(Value::is_null).unwrap_or(true) {
        raw.insert("summary".to_string(), body.clone());
    }
    raw.insert("body".to_string(), body);

    Ok(FrontMatter { raw })
}

fn strip_leading_newline(body: &str) -> &str {
    body.strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body)
}

fn parse_metadata(metadata: &str, path: &Path) -> Result<Map<String, Value>> {
    if metadata.trim().is_empty() {
        return Ok(Map::new());
    }

    let value = match serde_json::from_str::<Value>(metadata) {
        Ok(value) => value,
        Err(strict_error) => {
            let repaired = quote_bare_keys(metadata);
            serde_json::from_str::<Value>(&repaired).map_err(|_| SitegenError::Parse {
                path: path.to_path_buf(),
                message: strict_error.to_string(),
            })?
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(SitegenError::Parse {
            path: path.to_path_buf(),
            message: format!("front matter must be an object, found {}", json_kind(&other)),
        }),
    }
}

/// Rewrites legacy metadata such as `{title: "Hi"}` into strict JSON by
/// quoting bare and single-quoted keys.
pub fn quote_bare_keys(metadata: &str) -> String {
    BARE_KEY
        .replace_all(metadata, |captures: &Captures| {
            let Some(prefix) = captures.get(1) else {
                return captures[0].to_string();
            };
            let key = captures
                .get(2)
                .or_else(|| captures.get(3))
                .map(|key| key.as_str())
                .unwrap_or_default();
            let spacing = captures.get(4).map(|m| m.as_str()).unwrap_or_default();
            format!("{}\"{}\"{}:", prefix.as_str(), key, spacing)
        })
        .into_owned()
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(content: &str) -> FrontMatter {
        parse_front_matter(content, Path::new("test.tera")).unwrap()
    }

    #[test]
    fn test_metadata_and_body() {
        let front_matter = parse("{\"title\":\"Hi\"}---\nBody text");
        assert_eq!(front_matter.get_string("title"), Some("Hi".to_string()));
        assert_eq!(front_matter.body(), "Body text");
        assert_eq!(front_matter.summary(), "Body text");
    }

    #[test]
    fn test_only_one_leading_newline_is_stripped() {
        let front_matter = parse("{}---\n\nSecond line");
        assert_eq!(front_matter.body(), "\nSecond line");

        let front_matter = parse("{}---\r\nWindows");
        assert_eq!(front_matter.body(), "Windows");
    }

    #[test]
    fn test_missing_separator_is_all_body() {
        let front_matter = parse("<p>No metadata here</p>\n");
        assert_eq!(front_matter.body(), "<p>No metadata here</p>\n");
        assert_eq!(front_matter.raw.len(), 2);
    }

    #[test]
    fn test_empty_metadata_block() {
        let front_matter = parse("---\nJust a body");
        assert_eq!(front_matter.body(), "Just a body");
        assert!(front_matter.get_string("title").is_none());
    }

    #[test]
    fn test_explicit_summary_is_kept() {
        let front_matter = parse("{\"summary\": \"Short\"}---\nLong body");
        assert_eq!(front_matter.summary(), "Short");
        assert_eq!(front_matter.body(), "Long body");
    }

    #[test]
    fn test_null_summary_defaults_to_body() {
        let front_matter = parse("{\"summary\": null}---\nLong body");
        assert_eq!(front_matter.summary(), "Long body");
    }

    #[test]
    fn test_body_key_in_metadata_is_replaced() {
        let front_matter = parse("{\"body\": \"ignored\"}---\nActual");
        assert_eq!(front_matter.body(), "Actual");
    }

    #[test]
    fn test_body_survives_serialized_metadata() {
        let metadata = json!({"title": "Round", "tags": ["a", "b"], "draft": false});
        let body = "<p>Content with --- dashes</p>\n";
        let content = format!("{}---\n{}", serde_json::to_string(&metadata).unwrap(), body);

        let front_matter = parse(&content);
        assert_eq!(front_matter.body(), body);
        assert_eq!(front_matter.raw.get("tags"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_unquoted_keys_are_repaired() {
        let front_matter = parse("{title: \"Hi, there: you\", 'draft': true,\n  date: \"2024-01-02\"}---\nBody");
        assert_eq!(
            front_matter.get_string("title"),
            Some("Hi, there: you".to_string())
        );
        assert_eq!(front_matter.raw.get("draft"), Some(&json!(true)));
        assert_eq!(front_matter.get_string("date"), Some("2024-01-02".to_string()));
    }

    #[test]
    fn test_quote_bare_keys_leaves_strict_json_alone() {
        let strict = r#"{"title": "a, b: c", "nested": {"x": 1}}"#;
        assert_eq!(quote_bare_keys(strict), strict);
    }

    #[test]
    fn test_malformed_metadata_reports_path() {
        let error = parse_front_matter("{title: }---\nBody", Path::new("posts/bad/index.tera"))
            .unwrap_err();
        match error {
            SitegenError::Parse { path, message } => {
                assert_eq!(path, Path::new("posts/bad/index.tera"));
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_object_metadata_is_rejected() {
        let error = parse_front_matter("[1, 2]---\nBody", Path::new("list.tera")).unwrap_err();
        assert!(error.to_string().contains("must be an object"));
    }
}
