use crate::error::{IoContext, Result, SitegenError};
use crate::parsing::parse_front_matter;
use crate::types::{Document, FileStats};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Front matter keys consulted, in order, for an explicit document date.
const DATE_KEYS: [&str; 2] = ["date", "mtime"];

/// Reads a template source file into a [`Document`].
///
/// `href` is the site-relative path of the rendered output, so
/// `posts/hello/index.tera` under `indir` becomes `/posts/hello/index.html`.
/// `mtime` prefers an explicit front matter date over the file's
/// modification time.
pub async fn read_template_file(path: &Path, indir: &Path) -> Result<Document> {
    let metadata = tokio::fs::metadata(path)
        .await
        .io_context("reading metadata of", path)?;
    let content = tokio::fs::read_to_string(path)
        .await
        .io_context("reading template", path)?;

    let front_matter = parse_front_matter(&content, path)?;
    let href = href_for(path, indir)?;
    let stats = file_stats(&metadata);

    let explicit = DATE_KEYS
        .iter()
        .find_map(|key| front_matter.raw.get(*key).filter(|value| !value.is_null()));
    let mtime = match explicit {
        Some(value) => coerce_date(value).ok_or_else(|| SitegenError::Parse {
            path: path.to_path_buf(),
            message: format!("unrecognized date {value}"),
        })?,
        None => stats.modified.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
    };

    Ok(Document {
        source: path.to_path_buf(),
        front_matter,
        href,
        stats,
        mtime,
    })
}

/// Output path of a template relative to the input root, with the
/// template extension swapped for `.html`.
pub fn output_relative(path: &Path, indir: &Path) -> Result<PathBuf> {
    let relative = path
        .strip_prefix(indir)
        .map_err(|_| SitegenError::InvalidPath {
            path: path.to_path_buf(),
        })?;
    Ok(relative.with_extension("html"))
}

fn href_for(path: &Path, indir: &Path) -> Result<String> {
    let relative = output_relative(path, indir)?;
    Ok(format!(
        "/{}",
        relative.to_string_lossy().replace('\\', "/")
    ))
}

fn file_stats(metadata: &Metadata) -> FileStats {
    FileStats {
        size: metadata.len(),
        modified: metadata.modified().ok().map(to_utc),
        created: metadata.created().ok().map(to_utc),
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Interprets a date-like JSON value: RFC 3339 or RFC 2822 strings, plain
/// `YYYY-MM-DD[ HH:MM:SS]` strings (taken as UTC), or epoch milliseconds.
pub fn coerce_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_date(text.trim()),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|millis| millis as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_post_document() {
        let dir = TempDir::new().unwrap();
        let post_dir = dir.path().join("posts/hello");
        fs::create_dir_all(&post_dir).unwrap();
        let path = post_dir.join("index.tera");
        fs::write(&path, "{\"title\":\"Hi\"}---\nBody text").unwrap();

        let document = read_template_file(&path, dir.path()).await.unwrap();

        assert_eq!(document.href, "/posts/hello/index.html");
        assert_eq!(document.front_matter.body(), "Body text");
        assert_eq!(document.stats.size, 27);
        assert_eq!(Some(document.mtime), document.stats.modified);
    }

    #[tokio::test]
    async fn test_front_matter_date_wins_over_file_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.tera");
        fs::write(&path, "{\"date\": \"2020-02-29\"}---\nBody").unwrap();

        let document = read_template_file(&path, dir.path()).await.unwrap();
        assert_eq!(
            document.mtime,
            Utc.with_ymd_and_hms(2020, 2, 29, 0, 0, 0).unwrap()
        );
        assert_eq!(document.href, "/page.html");
    }

    #[tokio::test]
    async fn test_file_modification_time_is_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.tera");
        fs::write(&path, "Body").unwrap();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(stamp)
            .unwrap();

        let document = read_template_file(&path, dir.path()).await.unwrap();
        assert_eq!(document.mtime, DateTime::<Utc>::from(stamp));
    }

    #[tokio::test]
    async fn test_invalid_date_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.tera");
        fs::write(&path, "{\"date\": \"someday\"}---\nBody").unwrap();

        let error = read_template_file(&path, dir.path()).await.unwrap_err();
        assert!(matches!(error, SitegenError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.tera");

        let error = read_template_file(&path, dir.path()).await.unwrap_err();
        match error {
            SitegenError::Io { path: error_path, .. } => assert_eq!(error_path, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_coerce_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(coerce_date(&json!("2024-01-15T10:30:00Z")), Some(expected));
        assert_eq!(coerce_date(&json!("2024-01-15 10:30:00")), Some(expected));
        assert_eq!(
            coerce_date(&json!("Mon, 15 Jan 2024 10:30:00 +0000")),
            Some(expected)
        );
        assert_eq!(
            coerce_date(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(coerce_date(&json!(true)), None);
        assert_eq!(coerce_date(&json!("not a date")), None);
    }

    #[test]
    fn test_output_relative_outside_root() {
        let error = output_relative(Path::new("/elsewhere/a.tera"), Path::new("/site")).unwrap_err();
        assert!(matches!(error, SitegenError::InvalidPath { .. }));
    }
}
