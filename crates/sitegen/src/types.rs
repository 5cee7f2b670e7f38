use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub raw: Map<String, Value>,
}

impl FrontMatter {
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.raw.get(key).and_then(|v| v.as_str().map(String::from))
    }

    pub fn body(&self) -> &str {
        self.raw.get("body").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn summary(&self) -> &str {
        self.raw
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.body())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStats {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
}

/// A parsed template source file with the fields derived from its location
/// and metadata on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: PathBuf,
    pub front_matter: FrontMatter,
    pub href: String,
    pub stats: FileStats,
    pub mtime: DateTime<Utc>,
}

/// Entries of the posts collection are ordinary documents.
pub type Post = Document;

impl Document {
    /// Front matter followed by the derived fields, which win on collision.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.front_matter.raw.clone();
        map.insert("href".to_string(), Value::String(self.href.clone()));
        map.insert(
            "stats".to_string(),
            serde_json::to_value(&self.stats).unwrap_or(Value::Null),
        );
        map.insert("mtime".to_string(), Value::String(self.mtime.to_rfc3339()));
        map
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub rendered: usize,
    pub compiled: usize,
    pub copied: usize,
}

impl TransformSummary {
    pub fn total(&self) -> usize {
        self.rendered + self.compiled + self.copied
    }

    pub(crate) fn record(mut self, action: Transform) -> Self {
        match action {
            Transform::Render => self.rendered += 1,
            Transform::Compile => self.compiled += 1,
            Transform::Copy => self.copied += 1,
        }
        self
    }
}

/// The action selected for one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Render,
    Compile,
    Copy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub posts: usize,
    pub files: TransformSummary,
    pub feed: PathBuf,
}
